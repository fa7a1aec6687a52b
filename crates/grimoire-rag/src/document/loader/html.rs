use std::path::Path;

use super::checked_path;
use crate::document::{DEFAULT_MAX_FILE_SIZE, DocumentLoader, LoadFuture};
use crate::error::RagError;
use crate::types::{ContentType, Document, DocumentMetadata};

pub struct HtmlLoader {
    pub max_file_size: u64,
}

impl Default for HtmlLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DocumentLoader for HtmlLoader {
    fn load(&self, path: &Path) -> LoadFuture<'_> {
        let path = path.to_path_buf();
        let max_size = self.max_file_size;
        Box::pin(async move {
            let path = checked_path(&path, max_size).await?;

            let raw = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| RagError::load(&path, e))?;

            Ok(Document {
                content: extract_text(&raw),
                metadata: DocumentMetadata {
                    source: path.display().to_string(),
                    content_type: ContentType::Html,
                },
            })
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["html", "htm"]
    }
}

/// Strip markup and return the visible text, one line per non-empty
/// source line.
pub(crate) fn extract_text(html: &str) -> String {
    let soup = scrape_core::Soup::parse(html);

    // Prefer the body; fragments without one fall back to a plain strip.
    for selector in ["body", "html"] {
        if let Ok(tags) = soup.find_all(selector)
            && let Some(tag) = tags.first()
        {
            return normalize(&tag.text());
        }
    }

    normalize(&strip_tags(html))
}

/// Minimal tag stripper for markup fragments the parser has no root for.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn normalize(text: &str) -> String {
    let lines: Vec<String> = text
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect();
    lines.join("\n")
}
