//! Pagination, progress tracking and bookmarks for an open book.

mod paginator;
mod preferences;
mod session;
mod store;
mod writer;

pub use paginator::{ContentPaginator, DEFAULT_PAGE_COUNT, Pagination};
pub use preferences::{
    DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, MAX_FONT_SIZE, MIN_FONT_SIZE, ReaderPreferences,
    ReaderStyle, Theme,
};
pub use session::{ReaderSession, SessionConfig, SessionState, clamp_page, parse_page_input};
pub use store::{BookStore, BookmarkStore, ProgressStore, ReaderStores};
pub use writer::{ProgressUpdate, ProgressWriter};
