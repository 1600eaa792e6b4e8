use std::sync::Arc;
use thiserror::Error;

/// Unified error type for the Mimir cache manager
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    // Configuration / API misuse
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Snapshot errors
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),
    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(Arc::new(err))
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, CacheError>;
