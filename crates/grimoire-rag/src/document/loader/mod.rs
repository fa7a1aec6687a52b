#[cfg(feature = "docx")]
pub mod docx;
pub mod email;
pub mod html;
#[cfg(feature = "pdf")]
pub mod pdf;
pub mod text;

#[cfg(feature = "docx")]
pub use docx::DocxLoader;
pub use email::EmailLoader;
pub use html::HtmlLoader;
#[cfg(feature = "pdf")]
pub use pdf::PdfLoader;
pub use text::TextLoader;

use std::path::Path;

use crate::error::{RagError, Result};

/// Common preamble for every loader: resolve the path and enforce the
/// size limit before reading anything.
pub(crate) async fn checked_path(path: &Path, max_size: u64) -> Result<std::path::PathBuf> {
    let path = std::fs::canonicalize(path).map_err(|e| RagError::load(path, e))?;

    let meta = tokio::fs::metadata(&path)
        .await
        .map_err(|e| RagError::load(&path, e))?;
    if meta.len() > max_size {
        return Err(RagError::FileTooLarge(meta.len()));
    }

    Ok(path)
}
