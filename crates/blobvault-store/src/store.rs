//! Blob store trait: content-addressed byte storage.

use crate::error::StoreResult;
use blobvault_core::ContentHash;
use bytes::Bytes;

/// Content-addressed blob storage.
///
/// Implementations persist at most one physical copy per content hash.
/// `put` is idempotent: storing bytes under a hash that already exists is a
/// successful no-op. Callers are trusted to pass the hash of `data`; the
/// engine computes it on the upload path.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores bytes under their content hash.
    ///
    /// Returns `true` if bytes were physically written, `false` if a blob for
    /// the hash already existed (still success).
    async fn put(&self, hash: ContentHash, data: Bytes) -> StoreResult<bool>;

    /// Retrieves the blob for a hash, or `BlobNotFound`.
    async fn get(&self, hash: ContentHash) -> StoreResult<Bytes>;

    /// Returns true if a blob exists for the hash.
    async fn contains(&self, hash: ContentHash) -> StoreResult<bool>;

    /// Removes the physical blob. `BlobNotFound` if absent.
    ///
    /// Only the engine's last-reference-removal path may call this; the
    /// store itself performs no reference counting.
    async fn delete(&self, hash: ContentHash) -> StoreResult<()>;

    /// Physical size in bytes of the stored blob, or `BlobNotFound`.
    async fn blob_size(&self, hash: ContentHash) -> StoreResult<u64>;

    /// Enumerates the content hashes of all stored blobs. Used by the
    /// orphan sweep to find blobs no catalog entry references.
    async fn list_hashes(&self) -> StoreResult<Vec<ContentHash>>;
}
