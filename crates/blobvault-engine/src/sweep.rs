//! Orphan-blob sweep.
//!
//! An upload can write a blob and then fail (or be cancelled) before the
//! catalog insert runs; the rollback path can itself fail. Either way a blob
//! with zero catalog references is left on disk. The sweep enumerates stored
//! blobs and reclaims any the catalog no longer references, re-checking under
//! the per-hash lock so an in-flight upload of the same content is never
//! raced.

use crate::engine::DedupEngine;
use crate::error::EngineResult;
use blobvault_store::{BlobStore, StoreError};
use tracing::{debug, info, warn};

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Blobs enumerated from the store.
    pub blobs_scanned: u64,
    /// Orphan blobs deleted.
    pub blobs_reclaimed: u64,
    /// Physical bytes freed.
    pub bytes_reclaimed: u64,
}

impl<S: BlobStore> DedupEngine<S> {
    /// Deletes every stored blob with no referencing catalog entry.
    ///
    /// Safe to run while uploads and deletes are in flight: each candidate is
    /// re-checked under its per-hash lock before removal, so a blob written
    /// by a concurrent upload survives once its catalog entry lands.
    pub async fn sweep_orphans(&self) -> EngineResult<SweepStats> {
        let hashes = self.store.list_hashes().await?;
        let mut stats = SweepStats {
            blobs_scanned: hashes.len() as u64,
            ..Default::default()
        };

        for hash in hashes {
            // Cheap unlocked pre-check keeps referenced blobs off the slow path.
            if self.catalog.reference_count(hash) > 0 {
                continue;
            }

            let guard = self.locks.acquire(hash).await;
            let reclaimed = async {
                if self.catalog.reference_count(hash) > 0 {
                    return Ok::<Option<u64>, StoreError>(None);
                }
                let size = match self.store.blob_size(hash).await {
                    Ok(size) => size,
                    // Deleted between listing and locking.
                    Err(StoreError::BlobNotFound { .. }) => return Ok(None),
                    Err(e) => return Err(e),
                };
                match self.store.delete(hash).await {
                    Ok(()) => Ok(Some(size)),
                    Err(StoreError::BlobNotFound { .. }) => Ok(None),
                    Err(e) => Err(e),
                }
            }
            .await;
            drop(guard);
            self.locks.prune(hash);

            match reclaimed {
                Ok(Some(size)) => {
                    debug!(hash = %hash, bytes = size, "orphan blob reclaimed");
                    stats.blobs_reclaimed += 1;
                    stats.bytes_reclaimed += size;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(hash = %hash, error = %e, "orphan sweep skipped blob");
                }
            }
        }

        info!(
            scanned = stats.blobs_scanned,
            reclaimed = stats.blobs_reclaimed,
            bytes = stats.bytes_reclaimed,
            "orphan sweep finished"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use blobvault_catalog::Catalog;
    use blobvault_core::hash_bytes;
    use blobvault_store::MemoryBlobStore;
    use bytes::Bytes;
    use std::sync::Arc;

    fn engine_with_store() -> (Arc<MemoryBlobStore>, DedupEngine<MemoryBlobStore>) {
        let store = Arc::new(MemoryBlobStore::new());
        let engine = DedupEngine::new(
            store.clone(),
            Arc::new(Catalog::in_memory()),
            EngineConfig::default(),
        );
        (store, engine)
    }

    #[tokio::test]
    async fn sweep_on_clean_store_reclaims_nothing() {
        let (_store, engine) = engine_with_store();
        engine.upload("a.txt", &b"kept"[..]).await.unwrap();
        engine.upload("b.txt", &b"kept"[..]).await.unwrap();

        let stats = engine.sweep_orphans().await.unwrap();
        assert_eq!(stats.blobs_scanned, 1);
        assert_eq!(stats.blobs_reclaimed, 0);
        assert_eq!(stats.bytes_reclaimed, 0);
    }

    #[tokio::test]
    async fn sweep_removes_unreferenced_blob_only() {
        let (store, engine) = engine_with_store();
        let kept = engine.upload("kept.bin", &b"referenced"[..]).await.unwrap();

        // Simulate a crashed upload: blob on disk, no catalog entry.
        let orphan_body = Bytes::from_static(b"orphaned bytes");
        let orphan_hash = hash_bytes(&orphan_body);
        store.put(orphan_hash, orphan_body.clone()).await.unwrap();
        assert_eq!(store.blob_count(), 2);

        let stats = engine.sweep_orphans().await.unwrap();
        assert_eq!(stats.blobs_scanned, 2);
        assert_eq!(stats.blobs_reclaimed, 1);
        assert_eq!(stats.bytes_reclaimed, orphan_body.len() as u64);

        assert_eq!(store.blob_count(), 1);
        assert!(!store.contains(orphan_hash).await.unwrap());
        let (_, bytes) = engine.download(kept.id).await.unwrap();
        assert_eq!(&bytes[..], b"referenced");
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let (store, engine) = engine_with_store();
        let body = Bytes::from_static(b"one-shot orphan");
        store.put(hash_bytes(&body), body).await.unwrap();

        let first = engine.sweep_orphans().await.unwrap();
        assert_eq!(first.blobs_reclaimed, 1);

        let second = engine.sweep_orphans().await.unwrap();
        assert_eq!(second.blobs_scanned, 0);
        assert_eq!(second.blobs_reclaimed, 0);
        assert_eq!(store.blob_count(), 0);
    }

    #[tokio::test]
    async fn content_reuploaded_after_sweep_behaves_as_new() {
        let (store, engine) = engine_with_store();
        let body = Bytes::from_static(b"returning content");
        store.put(hash_bytes(&body), body.clone()).await.unwrap();
        engine.sweep_orphans().await.unwrap();

        let record = engine.upload("back.bin", &body[..]).await.unwrap();
        assert!(!record.is_duplicate);
        assert_eq!(store.blob_count(), 1);
    }
}
