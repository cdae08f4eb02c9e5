//! EPUB format handler.

use crate::error::{AppError, Result};
use crate::formats::{FormatHandler, xhtml_to_text};
use crate::library::book::Book;
use roxmltree::Document;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// Handler for EPUB files.
pub struct EpubHandler;

impl EpubHandler {
    /// Find the OPF file path from container.xml.
    fn find_opf_path(archive: &mut ZipArchive<File>) -> Result<String> {
        let content = Self::read_entry(archive, "META-INF/container.xml")?;
        let doc = Document::parse(&content)?;

        doc.descendants()
            .find(|n| n.has_tag_name("rootfile"))
            .and_then(|n| n.attribute("full-path"))
            .map(String::from)
            .ok_or_else(|| AppError::InvalidFormat("No rootfile in container.xml".into()))
    }

    fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Result<String> {
        let mut entry = archive.by_name(name)?;
        let mut content = String::new();
        entry.read_to_string(&mut content)?;
        Ok(content)
    }

    /// Parse Dublin Core metadata from the OPF file.
    fn parse_metadata(content: &str, book: &mut Book) -> Result<()> {
        let doc = Document::parse(content)?;

        for node in doc.descendants() {
            let Some(text) = node.text().map(str::trim).filter(|t| !t.is_empty()) else {
                continue;
            };

            match node.tag_name().name() {
                "title" => book.title = text.to_string(),
                "creator" if book.author.is_none() => book.author = Some(text.to_string()),
                "description" => book.description = Some(text.to_string()),
                "language" => book.language = Some(text.to_string()),
                "date" => book.published = Some(text.to_string()),
                "subject" => book.genres.push(text.to_string()),
                _ => {}
            }
        }

        Ok(())
    }

    /// Content documents listed in the spine, in reading order.
    fn spine_hrefs(content: &str) -> Result<Vec<String>> {
        let doc = Document::parse(content)?;

        let manifest: HashMap<&str, &str> = doc
            .descendants()
            .filter(|n| n.has_tag_name("item"))
            .filter_map(|n| Some((n.attribute("id")?, n.attribute("href")?)))
            .collect();

        let hrefs = doc
            .descendants()
            .filter(|n| n.has_tag_name("itemref"))
            .filter(|n| n.attribute("linear") != Some("no"))
            .filter_map(|n| n.attribute("idref"))
            .filter_map(|idref| manifest.get(idref).map(|href| href.to_string()))
            .collect();

        Ok(hrefs)
    }

    /// Resolve a manifest href against the OPF directory.
    ///
    /// Hrefs are URLs, so `%20` and friends are decoded to match zip entry names.
    fn resolve_href(opf_dir: &str, href: &str) -> String {
        let href = href.split('#').next().unwrap_or(href);
        let href = urlencoding::decode(href).unwrap_or(Cow::Borrowed(href));
        let mut parts: Vec<&str> = opf_dir.split('/').filter(|p| !p.is_empty()).collect();

        for segment in href.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                other => parts.push(other),
            }
        }

        parts.join("/")
    }
}

impl FormatHandler for EpubHandler {
    fn extract_metadata(&self, book: &mut Book) -> Result<()> {
        let Some(path) = book.file_path.clone() else {
            return Ok(());
        };
        let file = File::open(&path)?;
        let mut archive = ZipArchive::new(file)?;

        let opf_path = Self::find_opf_path(&mut archive)?;
        let opf_content = Self::read_entry(&mut archive, &opf_path)?;

        Self::parse_metadata(&opf_content, book)
    }

    fn extract_text(&self, path: &Path) -> Result<String> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)?;

        let opf_path = Self::find_opf_path(&mut archive)?;
        let opf_dir = opf_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        let opf_content = Self::read_entry(&mut archive, &opf_path)?;

        let mut chapters = Vec::new();
        for href in Self::spine_hrefs(&opf_content)? {
            let entry = Self::resolve_href(opf_dir, &href);
            match Self::read_entry(&mut archive, &entry).and_then(|xhtml| xhtml_to_text(&xhtml)) {
                Ok(text) => {
                    if !text.is_empty() {
                        chapters.push(text);
                    }
                }
                Err(e) => {
                    tracing::warn!(entry = %entry, error = %e, "Skipping unreadable spine item");
                }
            }
        }

        Ok(chapters.join("\n\n"))
    }
}
