//! Collaborators a reader session talks to, and their SQLite adapters.

use crate::db::{Bookmark, Database, ReadingProgress};
use crate::error::Result;
use crate::formats;
use crate::library::book::Book;
use std::sync::Arc;

/// Book metadata and content lookup.
pub trait BookStore: Send + Sync {
    /// Fetch a book by id.
    fn get_by_id(&self, book_id: &str) -> Result<Option<Book>>;

    /// Load the raw text of a book.
    fn load_content(&self, book: &Book) -> Result<Option<String>> {
        formats::load_content(book)
    }
}

/// Per-user, per-book reading progress.
pub trait ProgressStore: Send + Sync {
    /// Fetch saved progress.
    fn get(&self, user_id: &str, book_id: &str) -> Result<Option<ReadingProgress>>;

    /// Insert or update progress. Never touches `completed`.
    fn upsert(&self, user_id: &str, book_id: &str, page: u32, progress: f64) -> Result<()>;
}

/// Per-user, per-book bookmark lists.
pub trait BookmarkStore: Send + Sync {
    /// Bookmarks in insertion order.
    fn list(&self, user_id: &str, book_id: &str) -> Result<Vec<Bookmark>>;

    /// Append a bookmark and return it as stored.
    fn append(&self, user_id: &str, book_id: &str, bookmark: Bookmark) -> Result<Bookmark>;

    /// Remove a bookmark owned by `user_id`.
    fn remove(&self, user_id: &str, bookmark_id: &str) -> Result<bool>;
}

impl BookStore for Database {
    fn get_by_id(&self, book_id: &str) -> Result<Option<Book>> {
        Ok(self.get_book(book_id)?.as_ref().map(Book::from_stored))
    }
}

impl ProgressStore for Database {
    fn get(&self, user_id: &str, book_id: &str) -> Result<Option<ReadingProgress>> {
        self.get_progress(user_id, book_id)
    }

    fn upsert(&self, user_id: &str, book_id: &str, page: u32, progress: f64) -> Result<()> {
        self.upsert_progress(user_id, book_id, page, progress)
    }
}

impl BookmarkStore for Database {
    fn list(&self, user_id: &str, book_id: &str) -> Result<Vec<Bookmark>> {
        self.get_bookmarks(user_id, book_id)
    }

    fn append(&self, user_id: &str, book_id: &str, bookmark: Bookmark) -> Result<Bookmark> {
        let bookmark = Bookmark {
            user_id: user_id.to_string(),
            book_id: book_id.to_string(),
            ..bookmark
        };
        self.insert_bookmark(&bookmark)?;
        Ok(bookmark)
    }

    fn remove(&self, user_id: &str, bookmark_id: &str) -> Result<bool> {
        self.delete_bookmark(bookmark_id, user_id)
    }
}

/// The set of stores a session is opened against.
#[derive(Clone)]
pub struct ReaderStores {
    /// Book metadata and content.
    pub books: Arc<dyn BookStore>,
    /// Reading progress.
    pub progress: Arc<dyn ProgressStore>,
    /// Bookmarks.
    pub bookmarks: Arc<dyn BookmarkStore>,
}

impl ReaderStores {
    /// Back every store with the same database.
    pub fn from_database(db: &Database) -> Self {
        Self {
            books: Arc::new(db.clone()),
            progress: Arc::new(db.clone()),
            bookmarks: Arc::new(db.clone()),
        }
    }
}
