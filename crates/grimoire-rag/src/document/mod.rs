//! Document loading: one loader variant per supported file format,
//! resolved through a static extension map.

pub mod loader;
pub mod splitter;

use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::Deserialize;

use crate::error::{RagError, Result};
use crate::types::Document;

pub use loader::{EmailLoader, HtmlLoader, TextLoader};
pub use splitter::{SplitterConfig, TextSplitter};

#[cfg(feature = "docx")]
pub use loader::DocxLoader;
#[cfg(feature = "pdf")]
pub use loader::PdfLoader;

/// Default maximum file size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = Result<Document>> + Send + 'a>>;

pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> LoadFuture<'_>;

    fn supported_extensions(&self) -> &[&str];
}

/// What a batch ingestion does when loading one file fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchErrorPolicy {
    /// First failure aborts the whole batch.
    Abort,
    /// Log the failure and continue with the remaining files.
    Skip,
}

/// Extension-keyed set of loader variants.
pub struct LoaderRegistry {
    loaders: Vec<Box<dyn DocumentLoader>>,
}

impl LoaderRegistry {
    /// Registry with every built-in loader, sharing one size limit.
    #[must_use]
    pub fn with_defaults(max_file_size: u64) -> Self {
        let loaders: Vec<Box<dyn DocumentLoader>> = vec![
            Box::new(TextLoader { max_file_size }),
            Box::new(HtmlLoader { max_file_size }),
            Box::new(EmailLoader { max_file_size }),
            #[cfg(feature = "docx")]
            Box::new(DocxLoader { max_file_size }),
            #[cfg(feature = "pdf")]
            Box::new(PdfLoader { max_file_size }),
        ];
        Self { loaders }
    }

    fn loader_for(&self, extension: &str) -> Option<&dyn DocumentLoader> {
        self.loaders
            .iter()
            .map(AsRef::as_ref)
            .find(|l| l.supported_extensions().contains(&extension))
    }

    fn is_supported(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.loader_for(&ext).is_some())
    }

    /// Load a single file through the loader registered for its extension.
    ///
    /// # Errors
    ///
    /// `UnsupportedFormat` for unknown extensions; the loader's own
    /// error (carrying the file path) otherwise.
    pub async fn load(&self, path: &Path) -> Result<Document> {
        let ext = extension_of(path)
            .ok_or_else(|| RagError::UnsupportedFormat(display_extension(path)))?;
        let loader = self
            .loader_for(&ext)
            .ok_or(RagError::UnsupportedFormat(ext))?;
        loader.load(path).await
    }

    /// Load every supported file under `dir`, recursively, in sorted
    /// path order.
    ///
    /// # Errors
    ///
    /// With [`BatchErrorPolicy::Abort`], the first unreadable file fails
    /// the whole batch. With [`BatchErrorPolicy::Skip`], failures are
    /// logged and skipped; only an unreadable root directory is fatal.
    pub async fn load_all(
        &self,
        dir: &Path,
        on_error: BatchErrorPolicy,
    ) -> Result<Vec<Document>> {
        if !dir.is_dir() {
            return Err(RagError::load(dir, "not a directory"));
        }

        let mut files: Vec<PathBuf> = ignore::WalkBuilder::new(dir)
            .hidden(true)
            .git_ignore(false)
            .build()
            .flatten()
            .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()))
            .map(ignore::DirEntry::into_path)
            .filter(|p| self.is_supported(p))
            .collect();
        files.sort();

        let mut documents = Vec::with_capacity(files.len());
        for path in files {
            match self.load(&path).await {
                Ok(doc) => documents.push(doc),
                Err(err) => match on_error {
                    BatchErrorPolicy::Abort => return Err(err),
                    BatchErrorPolicy::Skip => {
                        tracing::warn!(path = %path.display(), error = %err, "skipping document");
                    }
                },
            }
        }

        Ok(documents)
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn display_extension(path: &Path) -> String {
    extension_of(path).unwrap_or_default()
}
