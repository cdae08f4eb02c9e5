use crate::db::*;
use crate::error::{AppError, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;

/// Database wrapper for thread-safe access.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Open in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            -- Users table
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                last_login INTEGER
            );

            -- Sessions table
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                device_id TEXT,
                expires_at INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Reader preferences table
            CREATE TABLE IF NOT EXISTS preferences (
                user_id TEXT PRIMARY KEY,
                theme TEXT,
                font_size INTEGER,
                font_family TEXT,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Books table
            CREATE TABLE IF NOT EXISTS books (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                author TEXT,
                description TEXT,
                page_count INTEGER,
                file_path TEXT,
                format TEXT,
                language TEXT,
                genres_json TEXT,
                published TEXT,
                created_at INTEGER NOT NULL
            );

            -- Reading progress table, one row per (user, book)
            CREATE TABLE IF NOT EXISTS reading_progress (
                user_id TEXT NOT NULL,
                book_id TEXT NOT NULL,
                last_page INTEGER NOT NULL,
                progress REAL NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, book_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE
            );

            -- Bookmarks table
            CREATE TABLE IF NOT EXISTS bookmarks (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                book_id TEXT NOT NULL,
                page_number INTEGER NOT NULL,
                note TEXT,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_bookmarks_user_book ON bookmarks(user_id, book_id);
            CREATE INDEX IF NOT EXISTS idx_progress_user ON reading_progress(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);
            "#,
        )
        .map_err(|e| AppError::Database(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    // ========== USER OPERATIONS ==========

    /// Create a new user.
    pub fn create_user(&self, user: &User) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (id, username, password_hash, created_at, last_login)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id,
                user.username,
                user.password_hash,
                user.created_at,
                user.last_login,
            ],
        )
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                AppError::InvalidFormat(format!("Username '{}' already exists", user.username))
            } else {
                AppError::Database(format!("Failed to create user: {}", e))
            }
        })?;
        Ok(())
    }

    /// Get user by username.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, username, password_hash, created_at, last_login
             FROM users WHERE username = ?1",
            params![username],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| AppError::Database(format!("Failed to get user: {}", e)))
    }

    /// Get user by ID.
    pub fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, username, password_hash, created_at, last_login
             FROM users WHERE id = ?1",
            params![id],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| AppError::Database(format!("Failed to get user: {}", e)))
    }

    /// List all users.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, username, password_hash, created_at, last_login
                 FROM users ORDER BY username",
            )
            .map_err(|e| AppError::Database(format!("Failed to prepare query: {}", e)))?;

        let users = stmt
            .query_map([], Self::row_to_user)
            .map_err(|e| AppError::Database(format!("Failed to list users: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Database(format!("Failed to collect users: {}", e)))?;

        Ok(users)
    }

    fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            created_at: row.get(3)?,
            last_login: row.get(4)?,
        })
    }

    /// Update user password.
    pub fn update_user_password(&self, username: &str, password_hash: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE users SET password_hash = ?1 WHERE username = ?2",
                params![password_hash, username],
            )
            .map_err(|e| AppError::Database(format!("Failed to update password: {}", e)))?;
        Ok(rows > 0)
    }

    /// Update user last login.
    pub fn update_user_last_login(&self, user_id: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![now_timestamp(), user_id],
        )
        .map_err(|e| AppError::Database(format!("Failed to update last login: {}", e)))?;
        Ok(())
    }

    /// Delete user together with their sessions, progress and bookmarks.
    pub fn delete_user(&self, username: &str) -> Result<bool> {
        let mut conn = self.conn.lock();
        let user_id: Option<String> = conn
            .query_row(
                "SELECT id FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::Database(format!("Failed to get user: {}", e)))?;

        let Some(user_id) = user_id else {
            return Ok(false);
        };

        Self::delete_user_rows(&mut *conn, &user_id)
            .map_err(|e| AppError::Database(format!("Failed to delete user: {}", e)))?;
        Ok(true)
    }

    fn delete_user_rows(conn: &mut Connection, user_id: &str) -> rusqlite::Result<()> {
        let tx = conn.transaction()?;
        for table in ["sessions", "preferences", "reading_progress", "bookmarks"] {
            tx.execute(
                &format!("DELETE FROM {} WHERE user_id = ?1", table),
                params![user_id],
            )?;
        }
        tx.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
        tx.commit()
    }

    // ========== SESSION OPERATIONS ==========

    /// Create session.
    pub fn create_session(&self, session: &Session) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sessions (token, user_id, device_id, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.token,
                session.user_id,
                session.device_id,
                session.expires_at,
            ],
        )
        .map_err(|e| AppError::Database(format!("Failed to create session: {}", e)))?;
        Ok(())
    }

    /// Get session by token.
    pub fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT token, user_id, device_id, expires_at FROM sessions WHERE token = ?1",
            params![token],
            |row| {
                Ok(Session {
                    token: row.get(0)?,
                    user_id: row.get(1)?,
                    device_id: row.get(2)?,
                    expires_at: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(|e| AppError::Database(format!("Failed to get session: {}", e)))
    }

    /// Delete session.
    pub fn delete_session(&self, token: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])
            .map_err(|e| AppError::Database(format!("Failed to delete session: {}", e)))?;
        Ok(())
    }

    /// Cleanup expired sessions.
    pub fn cleanup_expired_sessions(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "DELETE FROM sessions WHERE expires_at < ?1",
                params![now_timestamp()],
            )
            .map_err(|e| AppError::Database(format!("Failed to cleanup sessions: {}", e)))?;
        Ok(rows)
    }

    // ========== PREFERENCE OPERATIONS ==========

    /// Save reader preferences for a user.
    pub fn save_preferences(&self, user_id: &str, prefs: &StoredPreferences) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO preferences (user_id, theme, font_size, font_family)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id) DO UPDATE SET
                theme = COALESCE(excluded.theme, preferences.theme),
                font_size = COALESCE(excluded.font_size, preferences.font_size),
                font_family = COALESCE(excluded.font_family, preferences.font_family)",
            params![user_id, prefs.theme, prefs.font_size, prefs.font_family],
        )
        .map_err(|e| AppError::Database(format!("Failed to save preferences: {}", e)))?;
        Ok(())
    }

    /// Get reader preferences for a user.
    pub fn get_preferences(&self, user_id: &str) -> Result<Option<StoredPreferences>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT theme, font_size, font_family FROM preferences WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(StoredPreferences {
                    theme: row.get(0)?,
                    font_size: row.get(1)?,
                    font_family: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(|e| AppError::Database(format!("Failed to get preferences: {}", e)))
    }

    // ========== BOOK OPERATIONS ==========

    /// Save or update a book.
    pub fn save_book(&self, book: &StoredBook) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO books
             (id, title, author, description, page_count, file_path, format,
              language, genres_json, published, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT (id) DO UPDATE SET
                title = excluded.title,
                author = excluded.author,
                description = excluded.description,
                page_count = excluded.page_count,
                file_path = excluded.file_path,
                format = excluded.format,
                language = excluded.language,
                genres_json = excluded.genres_json,
                published = excluded.published",
            params![
                book.id,
                book.title,
                book.author,
                book.description,
                book.page_count,
                book.file_path,
                book.format,
                book.language,
                book.genres_json,
                book.published,
                book.created_at,
            ],
        )
        .map_err(|e| AppError::Database(format!("Failed to save book: {}", e)))?;
        Ok(())
    }

    /// Get book by ID.
    pub fn get_book(&self, id: &str) -> Result<Option<StoredBook>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, title, author, description, page_count, file_path, format,
                    language, genres_json, published, created_at
             FROM books WHERE id = ?1",
            params![id],
            Self::row_to_stored_book,
        )
        .optional()
        .map_err(|e| AppError::Database(format!("Failed to get book: {}", e)))
    }

    /// Get all books, newest first.
    pub fn get_all_books(&self) -> Result<Vec<StoredBook>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, title, author, description, page_count, file_path, format,
                        language, genres_json, published, created_at
                 FROM books ORDER BY created_at DESC, title",
            )
            .map_err(|e| AppError::Database(format!("Failed to prepare query: {}", e)))?;

        let books = stmt
            .query_map([], Self::row_to_stored_book)
            .map_err(|e| AppError::Database(format!("Failed to get all books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Database(format!("Failed to collect books: {}", e)))?;

        Ok(books)
    }

    /// Helper to convert a row to StoredBook.
    fn row_to_stored_book(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredBook> {
        Ok(StoredBook {
            id: row.get(0)?,
            title: row.get(1)?,
            author: row.get(2)?,
            description: row.get(3)?,
            page_count: row.get(4)?,
            file_path: row.get(5)?,
            format: row.get(6)?,
            language: row.get(7)?,
            genres_json: row.get(8)?,
            published: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    /// Delete a book and everything readers stored against it.
    pub fn delete_book(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn.lock();
        let delete = |conn: &mut Connection| -> rusqlite::Result<usize> {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM reading_progress WHERE book_id = ?1",
                params![id],
            )?;
            tx.execute("DELETE FROM bookmarks WHERE book_id = ?1", params![id])?;
            let rows = tx.execute("DELETE FROM books WHERE id = ?1", params![id])?;
            tx.commit()?;
            Ok(rows)
        };

        let rows = delete(&mut *conn)
            .map_err(|e| AppError::Database(format!("Failed to delete book: {}", e)))?;
        Ok(rows > 0)
    }

    // ========== PROGRESS OPERATIONS ==========

    /// Insert or update reading progress.
    ///
    /// `completed` is only set on first insert; updates keep the stored value.
    pub fn upsert_progress(
        &self,
        user_id: &str,
        book_id: &str,
        last_page: u32,
        progress: f64,
    ) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO reading_progress
             (user_id, book_id, last_page, progress, completed, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)
             ON CONFLICT (user_id, book_id) DO UPDATE SET
                last_page = excluded.last_page,
                progress = excluded.progress,
                updated_at = excluded.updated_at",
            params![user_id, book_id, last_page, progress, now_timestamp()],
        )
        .map_err(|e| AppError::Database(format!("Failed to save progress: {}", e)))?;
        Ok(())
    }

    /// Mark a progress row as finished or not.
    pub fn set_completed(&self, user_id: &str, book_id: &str, completed: bool) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE reading_progress SET completed = ?1, updated_at = ?2
                 WHERE user_id = ?3 AND book_id = ?4",
                params![completed, now_timestamp(), user_id, book_id],
            )
            .map_err(|e| AppError::Database(format!("Failed to update progress: {}", e)))?;
        Ok(rows > 0)
    }

    /// Get reading progress for a book.
    pub fn get_progress(&self, user_id: &str, book_id: &str) -> Result<Option<ReadingProgress>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT user_id, book_id, last_page, progress, completed, updated_at
             FROM reading_progress
             WHERE user_id = ?1 AND book_id = ?2",
            params![user_id, book_id],
            Self::row_to_progress,
        )
        .optional()
        .map_err(|e| AppError::Database(format!("Failed to get progress: {}", e)))
    }

    /// Get all progress rows for a user, most recently read first.
    pub fn list_progress(&self, user_id: &str) -> Result<Vec<ReadingProgress>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT user_id, book_id, last_page, progress, completed, updated_at
                 FROM reading_progress WHERE user_id = ?1
                 ORDER BY updated_at DESC, rowid DESC",
            )
            .map_err(|e| AppError::Database(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![user_id], Self::row_to_progress)
            .map_err(|e| AppError::Database(format!("Failed to list progress: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Database(format!("Failed to collect progress: {}", e)))?;

        Ok(rows)
    }

    fn row_to_progress(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReadingProgress> {
        Ok(ReadingProgress {
            user_id: row.get(0)?,
            book_id: row.get(1)?,
            last_page: row.get(2)?,
            progress: row.get(3)?,
            completed: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    // ========== BOOKMARK OPERATIONS ==========

    /// Insert a bookmark.
    pub fn insert_bookmark(&self, bookmark: &Bookmark) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO bookmarks (id, user_id, book_id, page_number, note, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                bookmark.id,
                bookmark.user_id,
                bookmark.book_id,
                bookmark.page_number,
                bookmark.note,
                bookmark.created_at,
            ],
        )
        .map_err(|e| AppError::Database(format!("Failed to save bookmark: {}", e)))?;
        Ok(())
    }

    /// Get bookmarks for a book in insertion order.
    pub fn get_bookmarks(&self, user_id: &str, book_id: &str) -> Result<Vec<Bookmark>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, book_id, page_number, note, created_at
                 FROM bookmarks WHERE user_id = ?1 AND book_id = ?2
                 ORDER BY created_at, rowid",
            )
            .map_err(|e| AppError::Database(format!("Failed to prepare query: {}", e)))?;

        let bookmarks = stmt
            .query_map(params![user_id, book_id], |row| {
                Ok(Bookmark {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    book_id: row.get(2)?,
                    page_number: row.get(3)?,
                    note: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .map_err(|e| AppError::Database(format!("Failed to get bookmarks: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Database(format!("Failed to collect bookmarks: {}", e)))?;

        Ok(bookmarks)
    }

    /// Delete bookmark.
    pub fn delete_bookmark(&self, id: &str, user_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "DELETE FROM bookmarks WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .map_err(|e| AppError::Database(format!("Failed to delete bookmark: {}", e)))?;
        Ok(rows > 0)
    }
}
