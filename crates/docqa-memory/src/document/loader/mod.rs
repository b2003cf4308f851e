mod page_labels;
mod pdf;
mod text;

pub use pdf::PdfLoader;
pub use text::TextLoader;

use std::path::{Path, PathBuf};

use super::DocumentError;

/// Where a document's bytes come from: a file on disk or an upload held in memory.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Path(PathBuf),
    Bytes { name: String, bytes: Vec<u8> },
}

impl DocumentSource {
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    #[must_use]
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Bytes {
            name: name.into(),
            bytes,
        }
    }

    /// Human-readable name used in errors and chunk provenance.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes { name, .. } => name.clone(),
        }
    }

    #[must_use]
    pub fn extension(&self) -> Option<String> {
        let name = match self {
            Self::Path(path) => path.as_path(),
            Self::Bytes { name, .. } => Path::new(name),
        };
        name.extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
    }

    /// Resolve the source into `(name, bytes)`, enforcing `max_size`.
    pub(crate) async fn read(self, max_size: u64) -> Result<(String, Vec<u8>), DocumentError> {
        match self {
            Self::Path(path) => {
                let read_error = |source| DocumentError::Read {
                    path: path.display().to_string(),
                    source,
                };
                let resolved = tokio::fs::canonicalize(&path).await.map_err(read_error)?;
                let meta = tokio::fs::metadata(&resolved).await.map_err(read_error)?;
                if meta.len() > max_size {
                    return Err(DocumentError::FileTooLarge(meta.len()));
                }
                let bytes = tokio::fs::read(&resolved).await.map_err(read_error)?;
                Ok((resolved.display().to_string(), bytes))
            }
            Self::Bytes { name, bytes } => {
                let len = bytes.len() as u64;
                if len > max_size {
                    return Err(DocumentError::FileTooLarge(len));
                }
                Ok((name, bytes))
            }
        }
    }
}
