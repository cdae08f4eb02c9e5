//! Stand-in content for catalog entries that have no file attached.

use crate::library::book::Book;

/// How many times the synthesized chapter is repeated.
pub const PLACEHOLDER_REPEAT: usize = 50;

/// Build readable content from a book's title and description.
pub fn placeholder_content(book: &Book) -> String {
    let chapter = format!(
        "Chapter 1: {}\n\n{}\n\n",
        book.title,
        book.description.as_deref().unwrap_or_default()
    );
    chapter.repeat(PLACEHOLDER_REPEAT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_repeats_title_and_description() {
        let mut book = Book::new("Dune");
        book.description = Some("Desert planet.".to_string());

        let content = placeholder_content(&book);
        assert!(content.starts_with("Chapter 1: Dune\n\nDesert planet.\n\n"));
        assert_eq!(content.matches("Chapter 1: Dune").count(), PLACEHOLDER_REPEAT);
    }
}
