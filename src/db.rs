mod schema;

pub use schema::Database;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: String,
    /// Username for login.
    pub username: String,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Account creation timestamp.
    pub created_at: i64,
    /// Last login timestamp.
    pub last_login: Option<i64>,
}

/// Authentication session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Bearer token.
    pub token: String,
    /// User ID.
    pub user_id: String,
    /// Device ID (optional).
    pub device_id: Option<String>,
    /// Expiration timestamp.
    pub expires_at: i64,
}

/// Book row as stored in the catalog table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredBook {
    /// Book ID.
    pub id: String,
    /// Book title.
    pub title: String,
    /// Author.
    pub author: Option<String>,
    /// Book description.
    pub description: Option<String>,
    /// Declared page count.
    pub page_count: Option<i64>,
    /// Path of the content file, if one is attached.
    pub file_path: Option<String>,
    /// Content format (file extension).
    pub format: Option<String>,
    /// Language.
    pub language: Option<String>,
    /// Genres (JSON array).
    pub genres_json: Option<String>,
    /// Publication date.
    pub published: Option<String>,
    /// Creation timestamp.
    pub created_at: i64,
}

/// Reading progress for one (user, book) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingProgress {
    /// User ID.
    pub user_id: String,
    /// Book ID.
    pub book_id: String,
    /// Last page read (1-based).
    pub last_page: u32,
    /// Reading percentage (0.0 - 100.0).
    pub progress: f64,
    /// Whether the book was finished.
    pub completed: bool,
    /// Last update timestamp.
    pub updated_at: i64,
}

/// Bookmark in a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Bookmark ID.
    pub id: String,
    /// User ID.
    pub user_id: String,
    /// Book ID.
    pub book_id: String,
    /// Bookmarked page (1-based).
    pub page_number: u32,
    /// Optional annotation.
    pub note: Option<String>,
    /// Creation timestamp.
    pub created_at: i64,
}

/// Reader preferences saved for a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredPreferences {
    /// Theme name.
    pub theme: Option<String>,
    /// Font size in pixels.
    pub font_size: Option<i64>,
    /// Font family.
    pub font_family: Option<String>,
}

/// Timestamp helper.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Convert timestamp to DateTime.
pub fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now)
}
