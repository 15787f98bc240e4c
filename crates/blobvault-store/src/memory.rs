//! In-memory blob store for tests and ephemeral deployments.

use crate::error::{StoreError, StoreResult};
use crate::store::BlobStore;
use blobvault_core::ContentHash;
use bytes::Bytes;
use dashmap::DashMap;
use tracing::debug;

/// DashMap-backed blob store. Does not persist across restarts.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<ContentHash, Bytes>,
}

impl MemoryBlobStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs held.
    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }

    /// Sum of physical blob sizes.
    pub fn total_bytes(&self) -> u64 {
        self.blobs.iter().map(|e| e.value().len() as u64).sum()
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, hash: ContentHash, data: Bytes) -> StoreResult<bool> {
        if self.blobs.contains_key(&hash) {
            debug!(hash = %hash, "blob already present, idempotent put");
            return Ok(false);
        }
        self.blobs.insert(hash, data);
        Ok(true)
    }

    async fn get(&self, hash: ContentHash) -> StoreResult<Bytes> {
        self.blobs
            .get(&hash)
            .map(|e| e.value().clone())
            .ok_or(StoreError::BlobNotFound { hash })
    }

    async fn contains(&self, hash: ContentHash) -> StoreResult<bool> {
        Ok(self.blobs.contains_key(&hash))
    }

    async fn delete(&self, hash: ContentHash) -> StoreResult<()> {
        self.blobs
            .remove(&hash)
            .map(|_| ())
            .ok_or(StoreError::BlobNotFound { hash })
    }

    async fn blob_size(&self, hash: ContentHash) -> StoreResult<u64> {
        self.blobs
            .get(&hash)
            .map(|e| e.value().len() as u64)
            .ok_or(StoreError::BlobNotFound { hash })
    }

    async fn list_hashes(&self) -> StoreResult<Vec<ContentHash>> {
        Ok(self.blobs.iter().map(|e| *e.key()).collect())
    }
}
