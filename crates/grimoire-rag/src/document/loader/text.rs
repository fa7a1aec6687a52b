use std::path::Path;

use super::checked_path;
use crate::document::{DEFAULT_MAX_FILE_SIZE, DocumentLoader, LoadFuture};
use crate::error::RagError;
use crate::types::{ContentType, Document, DocumentMetadata};

pub struct TextLoader {
    pub max_file_size: u64,
}

impl Default for TextLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DocumentLoader for TextLoader {
    fn load(&self, path: &Path) -> LoadFuture<'_> {
        let path = path.to_path_buf();
        let max_size = self.max_file_size;
        Box::pin(async move {
            let path = checked_path(&path, max_size).await?;

            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            let content_type = match ext {
                "md" | "markdown" => ContentType::Markdown,
                "csv" => ContentType::Csv,
                _ => ContentType::PlainText,
            };

            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| RagError::load(&path, e))?;

            Ok(Document {
                content,
                metadata: DocumentMetadata {
                    source: path.display().to_string(),
                    content_type,
                },
            })
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt", "md", "markdown", "csv"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("test.txt");
        std::fs::write(&file, "hello world").unwrap();

        let doc = TextLoader::default().load(&file).await.unwrap();
        assert_eq!(doc.content, "hello world");
        assert_eq!(doc.metadata.content_type, ContentType::PlainText);
    }

    #[tokio::test]
    async fn load_markdown_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("readme.md");
        std::fs::write(&file, "# Title").unwrap();

        let doc = TextLoader::default().load(&file).await.unwrap();
        assert_eq!(doc.metadata.content_type, ContentType::Markdown);
    }

    #[tokio::test]
    async fn load_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.csv");
        std::fs::write(&file, "name,age\nada,36").unwrap();

        let doc = TextLoader::default().load(&file).await.unwrap();
        assert_eq!(doc.metadata.content_type, ContentType::Csv);
        assert!(doc.content.contains("ada"));
    }

    #[tokio::test]
    async fn load_nonexistent_file() {
        let result = TextLoader::default()
            .load(Path::new("/nonexistent/file.txt"))
            .await;
        assert!(matches!(result, Err(RagError::Load { .. })));
    }

    #[tokio::test]
    async fn load_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("empty.txt");
        std::fs::write(&file, "").unwrap();

        let doc = TextLoader::default().load(&file).await.unwrap();
        assert!(doc.content.is_empty());
    }

    #[tokio::test]
    async fn metadata_source_is_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("test.txt");
        std::fs::write(&file, "data").unwrap();

        let doc = TextLoader::default().load(&file).await.unwrap();
        let canonical = std::fs::canonicalize(&file).unwrap();
        assert_eq!(doc.metadata.source, canonical.display().to_string());
    }

    #[tokio::test]
    async fn file_too_large_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.txt");
        std::fs::write(&file, "x").unwrap();

        let loader = TextLoader { max_file_size: 0 };
        let result = loader.load(&file).await;
        assert!(matches!(result, Err(RagError::FileTooLarge(_))));
    }

    #[tokio::test]
    async fn invalid_utf8_fails_with_file_identity() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.txt");
        std::fs::write(&file, [0xFF, 0xFE, 0x00]).unwrap();

        let err = TextLoader::default().load(&file).await.unwrap_err();
        match err {
            RagError::Load { path, .. } => assert!(path.ends_with("bad.txt")),
            other => panic!("expected Load, got {other}"),
        }
    }
}
