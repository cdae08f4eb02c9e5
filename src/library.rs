//! Book catalog model.

pub mod book;

pub use book::Book;
