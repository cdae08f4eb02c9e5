//! Book metadata model.

use crate::config::BookFormat;
use crate::db::{self, StoredBook};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// A book in the catalog. Immutable once loaded into a reader session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Unique identifier for the book.
    pub id: String,

    /// Book title.
    pub title: String,

    /// Author.
    pub author: Option<String>,

    /// Book description or summary.
    pub description: Option<String>,

    /// Declared number of pages.
    pub page_count: Option<u32>,

    /// Content format, when a file is attached.
    pub format: Option<BookFormat>,

    /// Path to the content file.
    pub file_path: Option<PathBuf>,

    /// Language code or name.
    pub language: Option<String>,

    /// Genres.
    pub genres: Vec<String>,

    /// Publication date.
    pub published: Option<String>,

    /// When the book was added to the catalog.
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// Create a catalog entry with no content file and a random id.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            author: None,
            description: None,
            page_count: None,
            format: None,
            file_path: None,
            language: None,
            genres: Vec::new(),
            published: None,
            created_at: Utc::now(),
        }
    }

    /// Create a book backed by a content file.
    ///
    /// The id is derived from the path, so importing the same file twice
    /// updates the existing entry.
    pub fn from_file(path: PathBuf, format: BookFormat) -> Self {
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unknown")
            .to_string();

        let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, path.to_string_lossy().as_bytes()).to_string();

        Self {
            id,
            format: Some(format),
            file_path: Some(path),
            ..Self::new(title)
        }
    }

    /// Placeholder used when a book cannot be loaded.
    pub fn unavailable(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::new("Unknown")
        }
    }

    /// Get display name for the author.
    pub fn author_display(&self) -> &str {
        self.author.as_deref().unwrap_or("Unknown Author")
    }

    /// Convert a catalog row.
    pub fn from_stored(sb: &StoredBook) -> Self {
        let genres = sb
            .genres_json
            .as_ref()
            .and_then(|j| serde_json::from_str::<Vec<String>>(j).ok())
            .unwrap_or_default();

        Self {
            id: sb.id.clone(),
            title: sb.title.clone(),
            author: sb.author.clone(),
            description: sb.description.clone(),
            page_count: sb.page_count.and_then(|n| u32::try_from(n).ok()),
            format: sb.format.as_deref().and_then(BookFormat::from_extension),
            file_path: sb.file_path.as_ref().map(PathBuf::from),
            language: sb.language.clone(),
            genres,
            published: sb.published.clone(),
            created_at: db::timestamp_to_datetime(sb.created_at),
        }
    }

    /// Convert to a catalog row.
    pub fn to_stored(&self) -> StoredBook {
        StoredBook {
            id: self.id.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            description: self.description.clone(),
            page_count: self.page_count.map(i64::from),
            file_path: self
                .file_path
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            format: self.format.map(|f| f.extension().to_string()),
            language: self.language.clone(),
            genres_json: if self.genres.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&self.genres).unwrap_or_default())
            },
            published: self.published.clone(),
            created_at: self.created_at.timestamp(),
        }
    }
}
