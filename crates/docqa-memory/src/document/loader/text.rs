use std::pin::Pin;

use super::super::{Document, DocumentError, DocumentLoader, Page};
use super::DocumentSource;

/// Plain text and markdown. A form feed (`\x0c`) starts a new page.
pub struct TextLoader {
    pub max_file_size: u64,
}

impl Default for TextLoader {
    fn default() -> Self {
        Self {
            max_file_size: u64::MAX,
        }
    }
}

impl DocumentLoader for TextLoader {
    fn load(
        &self,
        source: DocumentSource,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Document, DocumentError>> + Send + '_>>
    {
        let max_size = self.max_file_size;
        Box::pin(async move {
            let content_type = match source.extension().as_deref() {
                Some("md" | "markdown") => "text/markdown",
                _ => "text/plain",
            };
            let (name, bytes) = source.read(max_size).await?;

            let content =
                std::str::from_utf8(&bytes).map_err(|e| DocumentError::Parse {
                    source_name: name.clone(),
                    reason: format!("invalid UTF-8: {e}"),
                })?;

            let pages = content
                .split('\x0c')
                .enumerate()
                .map(|(i, text)| Page::new(i + 1, text))
                .collect();

            Ok(Document::new(name, content_type, &bytes, pages))
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt", "md", "markdown"]
    }
}
