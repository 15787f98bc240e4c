//! Error types for the blob store subsystem.

use blobvault_core::ContentHash;
use thiserror::Error;

/// Result type alias for blob store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error variants for blob store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Wraps standard I/O errors from the backing storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No blob exists under the requested content hash.
    #[error("blob not found: {hash}")]
    BlobNotFound {
        /// The content hash that was not found.
        hash: ContentHash,
    },

    /// The store root is missing or not a directory.
    #[error("invalid store root: {reason}")]
    InvalidRoot {
        /// Description of the problem.
        reason: String,
    },
}
