use std::path::Path;

use super::checked_path;
use crate::document::{DEFAULT_MAX_FILE_SIZE, DocumentLoader, LoadFuture};
use crate::error::RagError;
use crate::types::{ContentType, Document, DocumentMetadata};

pub struct PdfLoader {
    pub max_file_size: u64,
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> LoadFuture<'_> {
        let path = path.to_path_buf();
        let max_size = self.max_file_size;
        Box::pin(async move {
            let path = checked_path(&path, max_size).await?;

            let source = path.display().to_string();
            let extract_path = path.clone();
            let content = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text(&extract_path)
            })
            .await
            .map_err(|e| RagError::load(&path, e))?
            .map_err(|e| RagError::load(&path, e))?;

            Ok(Document {
                content,
                metadata: DocumentMetadata {
                    source,
                    content_type: ContentType::Pdf,
                },
            })
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn garbage_pdf_fails_with_file_identity() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("broken.pdf");
        std::fs::write(&file, "not a pdf at all").unwrap();

        let err = PdfLoader::default().load(&file).await.unwrap_err();
        match err {
            RagError::Load { path, .. } => assert!(path.ends_with("broken.pdf")),
            other => panic!("expected Load, got {other}"),
        }
    }

    #[tokio::test]
    async fn missing_pdf_fails() {
        let result = PdfLoader::default().load(Path::new("/nonexistent/x.pdf")).await;
        assert!(result.is_err());
    }
}
