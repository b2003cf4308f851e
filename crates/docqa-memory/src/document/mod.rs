pub mod error;
pub mod loader;
pub mod splitter;
pub mod types;

pub use error::DocumentError;
pub use loader::{DocumentSource, PdfLoader, TextLoader};
pub use splitter::{SplitterConfig, TextSplitter};
pub use types::{Chunk, ChunkMetadata, Document, Page};

pub trait DocumentLoader: Send + Sync {
    fn load(
        &self,
        source: DocumentSource,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Document, DocumentError>> + Send + '_>,
    >;

    fn supported_extensions(&self) -> &[&str];
}
