mod epub;
mod html;
pub mod placeholder;

pub use epub::EpubHandler;
pub use html::{HtmlHandler, strip_markup, xhtml_to_text};

use crate::config::BookFormat;
use crate::error::{AppError, Result};
use crate::library::book::Book;
use std::path::Path;

/// Trait for format-specific book handlers.
pub trait FormatHandler: Send + Sync {
    /// Fill in metadata found inside the book file.
    fn extract_metadata(&self, book: &mut Book) -> Result<()>;

    /// Extract the readable text, paragraphs separated by blank lines.
    fn extract_text(&self, path: &Path) -> Result<String>;
}

/// Get the appropriate handler for a book format.
pub fn get_handler(format: BookFormat) -> Box<dyn FormatHandler> {
    match format {
        BookFormat::Epub => Box::new(EpubHandler),
        BookFormat::Html => Box::new(HtmlHandler),
        BookFormat::Txt | BookFormat::Md => Box::new(PlainTextHandler),
    }
}

/// Load the text a reader should paginate for `book`.
///
/// Books without a file get placeholder content built from their metadata.
pub fn load_content(book: &Book) -> Result<Option<String>> {
    let Some(path) = book.file_path.as_deref() else {
        return Ok(Some(placeholder::placeholder_content(book)));
    };

    let format = match book.format {
        Some(format) => format,
        None => detect_format(path)?,
    };

    let text = get_handler(format).extract_text(path)?;
    tracing::debug!(
        book_id = %book.id,
        format = format.extension(),
        chars = text.len(),
        "Loaded book content"
    );
    Ok(Some(text))
}

/// Detect a book format from the file extension.
pub fn detect_format(path: &Path) -> Result<BookFormat> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(BookFormat::from_extension)
        .ok_or_else(|| {
            AppError::InvalidFormat(format!("Unsupported book file: {}", path.display()))
        })
}

/// Handler for plain text and Markdown.
struct PlainTextHandler;

impl FormatHandler for PlainTextHandler {
    fn extract_metadata(&self, _book: &mut Book) -> Result<()> {
        Ok(())
    }

    fn extract_text(&self, path: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }
}
