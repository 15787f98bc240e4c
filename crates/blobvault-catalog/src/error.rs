//! Error types for the metadata catalog.

use blobvault_core::FileId;
use thiserror::Error;

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Error variants for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Wraps I/O errors from the journal file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No entry exists for the requested id.
    #[error("file entry {id} not found")]
    EntryNotFound {
        /// The id that was not found.
        id: FileId,
    },

    /// An entry with this id already exists.
    #[error("file entry {id} already exists")]
    DuplicateId {
        /// The conflicting id.
        id: FileId,
    },

    /// Malformed filter parameters; surfaced to the caller, never a crash.
    #[error("invalid filter: {reason}")]
    InvalidFilter {
        /// What is wrong with the filter.
        reason: String,
    },

    /// The journal contains data that cannot be decoded.
    #[error("corrupt journal: {reason}")]
    CorruptJournal {
        /// Description of the corruption.
        reason: String,
    },
}
