//! ebook-reader: a terminal eBook reader with synced progress and bookmarks.
//!
//! The core is [`reader::ReaderSession`], which paginates a book, tracks
//! the current page and keeps the reader's bookmarks. Authenticated sessions
//! persist progress in the background while the reader keeps turning pages.
//!
//! # Features
//!
//! - Deterministic pagination into a declared number of pages
//! - Reading progress saved per user and book
//! - Bookmarks with optional notes
//! - EPUB, HTML, Markdown and plain text books
//! - User accounts with Argon2 passwords and bearer tokens
//! - Theme and font preferences

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authentication and user management.
pub mod auth;
/// Configuration and CLI.
pub mod config;
/// Database operations.
pub mod db;
/// Error types.
pub mod error;
/// Book format handlers.
pub mod formats;
/// Book catalog model.
pub mod library;
/// Reader sessions.
pub mod reader;
/// Terminal front end.
pub mod terminal;

#[cfg(test)]
mod tests;

pub use config::{Cli, Command, Config};
pub use db::Database;
pub use error::{AppError, Result};
pub use reader::{ReaderSession, ReaderStores};
