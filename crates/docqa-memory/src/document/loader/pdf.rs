use std::io::Write;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use super::super::{Document, DocumentError, DocumentLoader, Page};
use super::{DocumentSource, page_labels};

pub struct PdfLoader {
    /// Size cap in bytes. Unlimited by default; callers impose their own policy.
    pub max_file_size: u64,
    /// Directory for the transient copy handed to the parser. System temp dir when unset.
    pub temp_dir: Option<PathBuf>,
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self {
            max_file_size: u64::MAX,
            temp_dir: None,
        }
    }
}

impl DocumentLoader for PdfLoader {
    fn load(
        &self,
        source: DocumentSource,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Document, DocumentError>> + Send + '_>>
    {
        let max_size = self.max_file_size;
        let temp_dir = self.temp_dir.clone();
        Box::pin(async move {
            let (name, bytes) = source.read(max_size).await?;

            let task_name = name.clone();
            let (bytes, pages) = tokio::task::spawn_blocking(move || {
                let pages = extract_pages(&task_name, &bytes, temp_dir.as_deref());
                (bytes, pages)
            })
            .await
            .map_err(|e| DocumentError::Parse {
                source_name: name.clone(),
                reason: format!("PDF parser aborted: {e}"),
            })?;
            let pages = pages?;

            tracing::debug!(source = %name, pages = pages.len(), "PDF extracted");
            Ok(Document::new(name, "application/pdf", &bytes, pages))
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }
}

/// Spill `bytes` to a scoped temporary file and extract per-page text and labels.
///
/// The temporary file is removed when this returns, including on error or panic.
fn extract_pages(
    name: &str,
    bytes: &[u8],
    temp_dir: Option<&Path>,
) -> Result<Vec<Page>, DocumentError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("docqa-upload-").suffix(".pdf");
    let mut tmp = match temp_dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    tmp.write_all(bytes)?;
    tmp.flush()?;

    let texts =
        pdf_extract::extract_text_by_pages(tmp.path()).map_err(|e| DocumentError::Parse {
            source_name: name.to_owned(),
            reason: e.to_string(),
        })?;

    let labels = match page_labels::read_page_labels(tmp.path(), texts.len()) {
        Ok(labels) => labels,
        Err(e) => {
            tracing::debug!(source = %name, "page labels unavailable: {e}");
            page_labels::default_labels(texts.len())
        }
    };

    Ok(texts
        .into_iter()
        .zip(labels)
        .enumerate()
        .map(|(i, (text, label))| Page::new(i + 1, text).with_label(label))
        .collect())
}
