#![warn(missing_docs)]

//! Blobvault blob store: exactly one physical copy of bytes per content hash.
//!
//! The store is a leaf component. It knows nothing about reference counts;
//! deciding when a blob may be deleted is the deduplication engine's duty.

pub mod error;
pub mod fs;
pub mod memory;
pub mod retry;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;
pub use retry::with_retries;
pub use store::BlobStore;
