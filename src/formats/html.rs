//! HTML and XHTML text extraction.

use crate::error::{AppError, Result};
use crate::formats::FormatHandler;
use crate::library::book::Book;
use html2text::render::TrivialDecorator;
use roxmltree::{Document, Node, ParsingOptions};
use std::path::Path;

/// Elements that end a paragraph.
const BLOCK_TAGS: &[&str] = &[
    "p",
    "div",
    "br",
    "li",
    "tr",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "section",
    "article",
    "pre",
    "hr",
];

/// Line width handed to html2text, wide enough that paragraphs stay whole.
const RENDER_WIDTH: usize = 10_000;

/// Elements whose content is never shown.
const HIDDEN_TAGS: &[&str] = &["head", "script", "style", "title"];

/// Handler for standalone HTML files.
pub struct HtmlHandler;

impl FormatHandler for HtmlHandler {
    fn extract_metadata(&self, book: &mut Book) -> Result<()> {
        let content = match book.file_path.as_deref() {
            Some(path) => std::fs::read_to_string(path)?,
            None => return Ok(()),
        };
        if let Some(title) = find_title(&content) {
            book.title = title;
        }
        Ok(())
    }

    fn extract_text(&self, path: &Path) -> Result<String> {
        let content = std::fs::read_to_string(path)?;
        xhtml_to_text(&content)
    }
}

/// Convert an (X)HTML document to paragraphs of plain text.
///
/// Well-formed XHTML is walked as a tree; anything roxmltree rejects
/// (HTML entities, unclosed tags) goes through [`strip_markup`].
pub fn xhtml_to_text(content: &str) -> Result<String> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };

    match Document::parse_with_options(content, options) {
        Ok(doc) => {
            let mut paragraphs = Paragraphs::default();
            let root = doc
                .descendants()
                .find(|n| n.has_tag_name("body"))
                .unwrap_or_else(|| doc.root_element());
            collect_text(root, &mut paragraphs);
            Ok(paragraphs.finish())
        }
        Err(e) => {
            tracing::trace!(error = %e, "Falling back to HTML rendering");
            strip_markup(content)
        }
    }
}

fn collect_text(node: Node<'_, '_>, out: &mut Paragraphs) {
    for child in node.children() {
        if child.is_text() {
            if let Some(text) = child.text() {
                out.push_text(text);
            }
        } else if child.is_element() {
            let name = child.tag_name().name().to_ascii_lowercase();
            if HIDDEN_TAGS.contains(&name.as_str()) {
                continue;
            }
            collect_text(child, out);
            if BLOCK_TAGS.contains(&name.as_str()) {
                out.break_paragraph();
            }
        }
    }
}

/// Render HTML that is not well-formed XML through html2text.
///
/// Each rendered line becomes a paragraph. Entities are decoded by the
/// HTML parser and non-breaking spaces collapse like any other whitespace.
pub fn strip_markup(content: &str) -> Result<String> {
    let rendered =
        html2text::from_read_with_decorator(content.as_bytes(), RENDER_WIDTH, TrivialDecorator::new())
            .map_err(|e| AppError::InvalidFormat(format!("HTML rendering failed: {e}")))?;

    let mut paragraphs = Paragraphs::default();
    for line in rendered.lines() {
        paragraphs.push_text(line);
        paragraphs.break_paragraph();
    }
    Ok(paragraphs.finish())
}

/// Extract `<title>` from a document, if present.
fn find_title(content: &str) -> Option<String> {
    let lower = content.to_ascii_lowercase();
    let start = lower.find("<title")?;
    let open_end = start + lower[start..].find('>')? + 1;
    let close = open_end + lower[open_end..].find("</title>")?;
    let title = strip_markup(&content[open_end..close]).ok()?.replace("\n\n", " ");
    (!title.is_empty()).then_some(title)
}

/// Accumulates whitespace-collapsed paragraphs.
#[derive(Default)]
struct Paragraphs {
    done: Vec<String>,
    current: String,
}

impl Paragraphs {
    fn push_text(&mut self, text: &str) {
        if text.starts_with(char::is_whitespace) {
            self.push_space();
        }
        let mut words = text.split_whitespace().peekable();
        while let Some(word) = words.next() {
            self.current.push_str(word);
            if words.peek().is_some() {
                self.current.push(' ');
            }
        }
        if text.ends_with(char::is_whitespace) {
            self.push_space();
        }
    }

    fn push_space(&mut self) {
        if !self.current.is_empty() && !self.current.ends_with(' ') {
            self.current.push(' ');
        }
    }

    fn break_paragraph(&mut self) {
        let paragraph = self.current.trim();
        if !paragraph.is_empty() {
            self.done.push(paragraph.to_string());
        }
        self.current.clear();
    }

    fn finish(mut self) -> String {
        self.break_paragraph();
        self.done.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xhtml_paragraphs_are_separated() {
        let doc = r#"<?xml version="1.0"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>Ignored</title></head>
<body><h1>Chapter One</h1><p>It was a <em>dark</em>
   and stormy night.</p><p>Second.</p></body></html>"#;

        assert_eq!(
            xhtml_to_text(doc).unwrap(),
            "Chapter One\n\nIt was a dark and stormy night.\n\nSecond."
        );
    }

    #[test]
    fn malformed_html_is_rendered() {
        let doc = "<html><body><p>Tom &amp; Jerry&nbsp;again<br>next line</body></html>";

        assert_eq!(strip_markup(doc).unwrap(), "Tom & Jerry again\n\nnext line");
    }

    #[test]
    fn quoted_angle_brackets_stay_inside_attributes() {
        let doc = "<html><body><p title=\"a>b\">Hello&nbsp;world</p></body></html>";

        assert_eq!(xhtml_to_text(doc).unwrap(), "Hello world");
    }

    #[test]
    fn numeric_entities_decode() {
        assert_eq!(strip_markup("<p>&#65;&#x42; &amp; done</p>").unwrap(), "AB & done");
    }

    #[test]
    fn title_is_found() {
        assert_eq!(
            find_title("<html><head><TITLE> A &amp; B </TITLE></head></html>"),
            Some("A & B".to_string())
        );
        assert_eq!(find_title("<p>none</p>"), None);
    }
}
