//! Word document loader.
//!
//! A `.docx` file is a zip archive; the visible text lives in
//! `word/document.xml` as `<w:t>` runs grouped into `<w:p>` paragraphs.
//! Only that one entry is read.

use std::io::Read as _;
use std::path::Path;

use super::checked_path;
use crate::document::{DEFAULT_MAX_FILE_SIZE, DocumentLoader, LoadFuture};
use crate::error::RagError;
use crate::types::{ContentType, Document, DocumentMetadata};

pub struct DocxLoader {
    pub max_file_size: u64,
}

impl Default for DocxLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DocumentLoader for DocxLoader {
    fn load(&self, path: &Path) -> LoadFuture<'_> {
        let path = path.to_path_buf();
        let max_size = self.max_file_size;
        Box::pin(async move {
            let path = checked_path(&path, max_size).await?;

            let source = path.display().to_string();
            let extract_path = path.clone();
            let xml = tokio::task::spawn_blocking(move || read_document_xml(&extract_path))
                .await
                .map_err(|e| RagError::load(&path, e))?
                .map_err(|e| RagError::load(&path, e))?;

            Ok(Document {
                content: extract_document_text(&xml),
                metadata: DocumentMetadata {
                    source,
                    content_type: ContentType::Docx,
                },
            })
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["docx"]
    }
}

fn read_document_xml(path: &Path) -> Result<String, zip::result::ZipError> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut entry = archive.by_name("word/document.xml")?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Collect the text of every `<w:t>` run; paragraph ends, line breaks
/// and tabs become `\n` and `\t`.
fn extract_document_text(xml: &str) -> String {
    let mut out = String::new();
    let mut rest = xml;
    while let Some(open) = rest.find('<') {
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        let tag = &rest[open + 1..open + close];
        let after = &rest[open + close + 1..];
        match tag.split_whitespace().next().unwrap_or("") {
            "w:t" => {
                if let Some(end) = after.find('<') {
                    out.push_str(&unescape(&after[..end]));
                }
            }
            "/w:p" | "w:br" | "w:br/" => out.push('\n'),
            "w:tab" | "w:tab/" => out.push('\t'),
            _ => {}
        }
        rest = after;
    }
    out.trim().to_owned()
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
