//! Retrieval-augmented question answering over a single ingested document.

pub mod bootstrap;
pub mod collection;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod persona;
pub mod rag;
pub mod session;
pub mod vault;

pub use collection::{Collection, CollectionHandle, CollectionManager};
pub use config::Config;
pub use docqa_memory::document::DocumentSource;
pub use engine::{Answer, QueryEngine, Source};
pub use error::RagError;
pub use ingest::{IngestProgress, IngestSettings, IngestionPipeline};
pub use persona::Persona;
pub use rag::{DocQa, IngestTask, RagSettings};
pub use session::Session;
