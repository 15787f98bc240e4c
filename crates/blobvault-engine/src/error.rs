//! Error types for the deduplication engine.

use blobvault_catalog::CatalogError;
use blobvault_store::StoreError;
use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Error variants for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Upload stream read failure during hashing; nothing was committed.
    #[error("upload I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blob store failure, after bounded retries where applicable.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Metadata catalog failure, including NotFound and InvalidFilter.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Upload exceeds the configured size limit; rejected before commit.
    #[error("upload of {size} bytes exceeds limit of {limit}")]
    TooLarge {
        /// Size the upload reached before rejection.
        size: u64,
        /// The configured limit.
        limit: u64,
    },
}

impl EngineError {
    /// True if this error means the requested entry or blob does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::Catalog(CatalogError::EntryNotFound { .. })
                | EngineError::Store(StoreError::BlobNotFound { .. })
        )
    }
}
