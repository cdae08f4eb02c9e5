//! Reading session for one open book.
//!
//! A session owns the current page, the paginated content and a cached copy
//! of the reader's bookmarks. Navigation is synchronous and never waits on
//! storage: authenticated sessions hand progress writes to a
//! [`ProgressWriter`] and move on.

use crate::db::{self, Bookmark, ReadingProgress};
use crate::error::{AppError, Result};
use crate::library::book::Book;
use crate::reader::paginator::{ContentPaginator, Pagination};
use crate::reader::preferences::ReaderPreferences;
use crate::reader::store::{BookStore, ReaderStores};
use crate::reader::writer::{ProgressUpdate, ProgressWriter};
use uuid::Uuid;

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Fetching book, progress and bookmarks.
    Loading,
    /// Open for navigation.
    Ready,
    /// Closed; navigation is ignored.
    Closed,
}

/// Options fixed when a session is opened.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Theme and font settings.
    pub preferences: ReaderPreferences,
    /// Page splitting.
    pub paginator: ContentPaginator,
}

/// Clamp a requested page into `1..=total_pages`.
pub fn clamp_page(page: i64, total_pages: u32) -> u32 {
    page.clamp(1, i64::from(total_pages.max(1))) as u32
}

/// Parse typed page input.
///
/// Reads an optional sign and leading digits, ignoring anything after them.
/// Input without digits, or a value of zero, means page 1.
pub fn parse_page_input(input: &str) -> i64 {
    let input = input.trim_start();
    let (negative, digits) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    let mut value: Option<i64> = None;
    for c in digits.chars().map_while(|c| c.to_digit(10)) {
        let v = value.unwrap_or(0);
        value = Some(v.saturating_mul(10).saturating_add(i64::from(c)));
    }

    match value {
        None | Some(0) => 1,
        Some(v) if negative => -v,
        Some(v) => v,
    }
}

/// Run a store call on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Store task failed: {}", e)))?
}

fn fetch_book(books: &dyn BookStore, book_id: &str) -> Result<Option<(Book, Option<String>)>> {
    let Some(book) = books.get_by_id(book_id)? else {
        return Ok(None);
    };

    let content = match books.load_content(&book) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(book_id, error = %e, "Failed to load book content");
            None
        }
    };

    Ok(Some((book, content)))
}

/// One open book.
pub struct ReaderSession {
    book: Book,
    user_id: Option<String>,
    pagination: Pagination,
    current_page: u32,
    bookmarks: Vec<Bookmark>,
    preferences: ReaderPreferences,
    stores: ReaderStores,
    writer: Option<ProgressWriter>,
    state: SessionState,
}

impl ReaderSession {
    /// Open a book for reading.
    ///
    /// Book, progress and bookmarks are fetched concurrently. Fetch failures
    /// are logged and the session opens degraded instead of failing.
    pub async fn open(
        book_id: &str,
        user_id: Option<String>,
        stores: ReaderStores,
        config: SessionConfig,
    ) -> Self {
        tracing::debug!(book_id, user_id = ?user_id, state = ?SessionState::Loading, "Opening book");

        let book_fut = {
            let books = stores.books.clone();
            let book_id = book_id.to_string();
            blocking(move || fetch_book(books.as_ref(), &book_id))
        };

        let progress_fut = {
            let progress = stores.progress.clone();
            let user_id = user_id.clone();
            let book_id = book_id.to_string();
            async move {
                match user_id {
                    Some(user_id) => blocking(move || progress.get(&user_id, &book_id)).await,
                    None => Ok(None),
                }
            }
        };

        let bookmarks_fut = {
            let bookmarks = stores.bookmarks.clone();
            let user_id = user_id.clone();
            let book_id = book_id.to_string();
            async move {
                match user_id {
                    Some(user_id) => blocking(move || bookmarks.list(&user_id, &book_id)).await,
                    None => Ok(Vec::new()),
                }
            }
        };

        let (book, progress, bookmarks) = tokio::join!(book_fut, progress_fut, bookmarks_fut);

        let (book, content) = match book {
            Ok(Some(found)) => found,
            Ok(None) => {
                tracing::warn!(book_id, "Book not found");
                (Book::unavailable(book_id), None)
            }
            Err(e) => {
                tracing::warn!(book_id, error = %e, "Failed to fetch book");
                (Book::unavailable(book_id), None)
            }
        };

        let progress: Option<ReadingProgress> = progress.unwrap_or_else(|e| {
            tracing::warn!(book_id, error = %e, "Failed to fetch reading progress");
            None
        });

        let bookmarks = bookmarks.unwrap_or_else(|e| {
            tracing::warn!(book_id, error = %e, "Failed to fetch bookmarks");
            Vec::new()
        });

        let pagination = config
            .paginator
            .paginate(content.as_deref(), book.page_count);
        let total_pages = pagination.total_pages();
        let current_page = progress
            .map(|p| clamp_page(i64::from(p.last_page), total_pages))
            .unwrap_or(1);

        let writer = user_id
            .is_some()
            .then(|| ProgressWriter::spawn(stores.progress.clone()));

        tracing::info!(
            book_id = %book.id,
            title = %book.title,
            page = current_page,
            total_pages,
            bookmarks = bookmarks.len(),
            authenticated = user_id.is_some(),
            "Book opened"
        );

        Self {
            book,
            user_id,
            pagination,
            current_page,
            bookmarks,
            preferences: config.preferences,
            stores,
            writer,
            state: SessionState::Ready,
        }
    }

    /// Go to a page, clamped into range, and queue a progress write.
    ///
    /// Returns the page now shown.
    pub fn go_to_page(&mut self, page: i64) -> u32 {
        if self.state != SessionState::Ready {
            tracing::debug!(page, "Ignoring navigation on closed session");
            return self.current_page;
        }

        self.current_page = clamp_page(page, self.total_pages());
        self.save_progress();
        self.current_page
    }

    /// Go to a page typed by the reader.
    pub fn go_to_page_input(&mut self, input: &str) -> u32 {
        self.go_to_page(parse_page_input(input))
    }

    /// Advance one page. Does nothing on the last page.
    pub fn next_page(&mut self) -> u32 {
        if self.current_page >= self.total_pages() {
            return self.current_page;
        }
        self.go_to_page(i64::from(self.current_page) + 1)
    }

    /// Go back one page. Does nothing on the first page.
    pub fn prev_page(&mut self) -> u32 {
        if self.current_page <= 1 {
            return self.current_page;
        }
        self.go_to_page(i64::from(self.current_page) - 1)
    }

    /// Go to a bookmarked page.
    pub fn jump_to_bookmark(&mut self, page_number: u32) -> u32 {
        self.go_to_page(i64::from(page_number))
    }

    fn save_progress(&self) {
        let (Some(user_id), Some(writer)) = (&self.user_id, &self.writer) else {
            tracing::debug!(page = self.current_page, "Anonymous session, progress not saved");
            return;
        };

        let update = ProgressUpdate {
            user_id: user_id.clone(),
            book_id: self.book.id.clone(),
            page: self.current_page,
            progress: self.progress(),
        };

        if !writer.submit(update) {
            tracing::warn!(book_id = %self.book.id, "Progress writer stopped, update dropped");
        }
    }

    /// Bookmark the current page.
    ///
    /// Returns the stored bookmark, or `None` for anonymous sessions and on
    /// store failure.
    pub async fn add_bookmark(&mut self, note: Option<String>) -> Option<Bookmark> {
        let Some(user_id) = self.user_id.clone() else {
            tracing::debug!("Anonymous session, bookmark not added");
            return None;
        };
        if self.state != SessionState::Ready {
            return None;
        }

        let note = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Bookmark at page {}", self.current_page));
        let bookmark = Bookmark {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.clone(),
            book_id: self.book.id.clone(),
            page_number: self.current_page,
            note: Some(note),
            created_at: db::now_timestamp(),
        };

        let store = self.stores.bookmarks.clone();
        let book_id = self.book.id.clone();
        match blocking(move || store.append(&user_id, &book_id, bookmark)).await {
            Ok(saved) => {
                tracing::debug!(book_id = %self.book.id, page = saved.page_number, "Bookmark added");
                self.bookmarks.push(saved.clone());
                Some(saved)
            }
            Err(e) => {
                tracing::warn!(book_id = %self.book.id, error = %e, "Failed to add bookmark");
                None
            }
        }
    }

    /// Remove a bookmark by id. Returns whether one was removed.
    pub async fn remove_bookmark(&mut self, bookmark_id: &str) -> bool {
        let Some(user_id) = self.user_id.clone() else {
            tracing::debug!("Anonymous session, bookmark not removed");
            return false;
        };
        if self.state != SessionState::Ready {
            return false;
        }

        let store = self.stores.bookmarks.clone();
        let id = bookmark_id.to_string();
        match blocking(move || store.remove(&user_id, &id)).await {
            Ok(removed) => {
                self.bookmarks.retain(|b| b.id != bookmark_id);
                removed
            }
            Err(e) => {
                tracing::warn!(bookmark_id, error = %e, "Failed to remove bookmark");
                false
            }
        }
    }

    /// Close the session and wait for queued progress writes.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;

        if let Some(writer) = self.writer.take() {
            writer.shutdown().await;
        }

        tracing::info!(book_id = %self.book.id, page = self.current_page, "Book closed");
    }

    /// Current page (1-based).
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Number of pages.
    pub fn total_pages(&self) -> u32 {
        self.pagination.total_pages()
    }

    /// Reading percentage for the current page.
    pub fn progress(&self) -> f64 {
        f64::from(self.current_page) / f64::from(self.total_pages()) * 100.0
    }

    /// Text of the current page.
    pub fn page_text(&self) -> &str {
        self.pagination.page(self.current_page)
    }

    /// Cached bookmarks in insertion order.
    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    /// The open book.
    pub fn book(&self) -> &Book {
        &self.book
    }

    /// Display preferences.
    pub fn preferences(&self) -> &ReaderPreferences {
        &self.preferences
    }

    /// Lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Reader, if authenticated.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}
