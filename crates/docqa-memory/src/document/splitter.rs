use super::error::DocumentError;
use super::types::{Chunk, ChunkMetadata, Document, Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitterConfig {
    /// Window length in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive windows of the same page.
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Fixed-size sliding window over each page. Page boundaries are hard splits.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidChunking`] unless `0 < chunk_overlap < chunk_size`.
    pub fn new(config: SplitterConfig) -> Result<Self, DocumentError> {
        if config.chunk_overlap == 0 || config.chunk_overlap >= config.chunk_size {
            return Err(DocumentError::InvalidChunking {
                chunk_size: config.chunk_size,
                overlap: config.chunk_overlap,
            });
        }
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> SplitterConfig {
        self.config
    }

    /// Chunk every page in order. `chunk_index` runs across the whole document.
    #[must_use]
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in &document.pages {
            self.split_page(&document.source, page, &mut chunks);
        }
        chunks
    }

    fn split_page(&self, source: &str, page: &Page, out: &mut Vec<Chunk>) {
        let chars: Vec<char> = page.text.chars().collect();
        if chars.is_empty() {
            return;
        }

        if chars.len() <= self.config.chunk_size {
            Self::push_window(source, page, &chars, 0, out);
            return;
        }

        // Every window position inside the page is emitted, so the tail may hold
        // windows shorter than the overlap.
        let step = self.config.chunk_size - self.config.chunk_overlap;
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.config.chunk_size).min(chars.len());
            Self::push_window(source, page, &chars[..end], start, out);
            start += step;
        }
    }

    fn push_window(source: &str, page: &Page, chars: &[char], start: usize, out: &mut Vec<Chunk>) {
        out.push(Chunk {
            text: chars[start..].iter().collect(),
            metadata: ChunkMetadata {
                source: source.to_owned(),
                page_number: page.page_number,
                page_label: page.page_label.clone(),
                start_offset: start,
                end_offset: chars.len(),
                chunk_index: out.len(),
            },
        });
    }
}
