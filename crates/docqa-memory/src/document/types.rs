use serde::{Deserialize, Serialize};

/// One page of extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub text: String,
    /// 1-based position in the document.
    pub page_number: usize,
    /// Printed folio from the document's logical structure, or the page number.
    pub page_label: String,
}

impl Page {
    #[must_use]
    pub fn new(page_number: usize, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            page_number,
            page_label: page_number.to_string(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.page_label = label.into();
        self
    }
}

/// A loaded source file. Immutable once built; discarded after chunking.
#[derive(Debug, Clone)]
pub struct Document {
    /// BLAKE3 digest of the source bytes, hex encoded.
    pub id: String,
    pub source: String,
    pub content_type: String,
    pub pages: Vec<Page>,
}

impl Document {
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        content_type: impl Into<String>,
        bytes: &[u8],
        pages: Vec<Page>,
    ) -> Self {
        Self {
            id: blake3::hash(bytes).to_hex().to_string(),
            source: source.into(),
            content_type: content_type.into(),
            pages,
        }
    }
}

/// Provenance of a chunk: enough to trace it back to `(page, start..end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub page_number: usize,
    pub page_label: String,
    /// Char offset of the first character within the page text.
    pub start_offset: usize,
    /// Char offset one past the last character.
    pub end_offset: usize,
    /// Position in the document's chunk sequence.
    pub chunk_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}
