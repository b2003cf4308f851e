#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("file too large: {0} bytes")]
    FileTooLarge(u64),

    #[error("failed to parse {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    #[error("chunk overlap {overlap} must be greater than 0 and less than chunk size {chunk_size}")]
    InvalidChunking { chunk_size: usize, overlap: usize },
}
