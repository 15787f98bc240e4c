//! Upload/download/delete orchestration over the blob store and catalog.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::locks::HashLocks;
use blobvault_catalog::{Catalog, FileFilter, SortSpec};
use blobvault_core::{
    detect_file_type, ContentHash, ContentHasher, FileEntry, FileId, FileRecord, StorageStats,
};
use blobvault_store::{with_retries, BlobStore, FsBlobStore, StoreError};
use bytes::Bytes;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

/// Read buffer size for the upload stream (64 KiB).
const UPLOAD_BUF_SIZE: usize = 64 * 1024;

/// The deduplication engine.
///
/// All operations touching one content hash serialize on a per-hash lock;
/// the check-and-decide in `upload` and the last-reference check in
/// `delete` run entirely under it, so concurrent identical uploads cannot
/// both believe they are first.
pub struct DedupEngine<S: BlobStore> {
    pub(crate) store: Arc<S>,
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) locks: HashLocks,
    config: EngineConfig,
}

impl DedupEngine<FsBlobStore> {
    /// Opens a filesystem-backed engine under `data_dir`: blobs in
    /// `data_dir/blobs`, the catalog journal at `data_dir/catalog.journal`.
    pub async fn open(data_dir: impl AsRef<Path>, config: EngineConfig) -> EngineResult<Self> {
        let data_dir = data_dir.as_ref();
        let store = FsBlobStore::open(data_dir.join("blobs")).await?;
        let catalog = Catalog::open(data_dir.join("catalog.journal"))?;
        info!(data_dir = %data_dir.display(), "engine opened");
        Ok(Self::new(Arc::new(store), Arc::new(catalog), config))
    }
}

impl<S: BlobStore> DedupEngine<S> {
    /// Builds an engine over existing store and catalog instances.
    pub fn new(store: Arc<S>, catalog: Arc<Catalog>, config: EngineConfig) -> Self {
        Self {
            store,
            catalog,
            locks: HashLocks::new(),
            config,
        }
    }

    /// The underlying catalog.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Uploads a file body, deduplicating against existing content.
    ///
    /// The stream is hashed and buffered in one pass. A read failure or an
    /// exceeded size limit aborts with nothing committed. On first sighting
    /// of a hash the bytes go to the blob store (bounded retries); repeat
    /// content records a duplicate entry without writing bytes.
    pub async fn upload<R: AsyncRead + Unpin>(
        &self,
        filename: &str,
        mut body: R,
    ) -> EngineResult<FileRecord> {
        let mut hasher = ContentHasher::new();
        let mut payload: Vec<u8> = Vec::new();
        let mut buf = vec![0u8; UPLOAD_BUF_SIZE];
        loop {
            let n = body.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            payload.extend_from_slice(&buf[..n]);
            if let Some(limit) = self.config.max_upload_bytes {
                if hasher.bytes_seen() > limit {
                    return Err(EngineError::TooLarge {
                        size: hasher.bytes_seen(),
                        limit,
                    });
                }
            }
        }
        let (hash, size) = hasher.finalize();
        let payload = Bytes::from(payload);

        let guard = self.locks.acquire(hash).await;
        let result = self.commit_upload(filename, hash, size, payload).await;
        drop(guard);
        self.locks.prune(hash);
        result
    }

    /// Check-and-decide plus commit, executed under the per-hash lock.
    async fn commit_upload(
        &self,
        filename: &str,
        hash: ContentHash,
        size: u64,
        payload: Bytes,
    ) -> EngineResult<FileRecord> {
        let existing = self.catalog.list_by_hash(hash);
        let is_duplicate = !existing.is_empty();

        let mut wrote_blob = false;
        if !is_duplicate {
            wrote_blob = with_retries(self.config.put_retries, || {
                self.store.put(hash, payload.clone())
            })
            .await?;
        }

        let entry = FileEntry {
            id: FileId::new(),
            original_filename: filename.to_string(),
            file_type: detect_file_type(filename),
            size,
            uploaded_at: Utc::now(),
            content_hash: hash,
            is_duplicate,
        };

        if let Err(e) = self.catalog.insert(entry.clone()) {
            // A blob written by this upload would be orphaned and uncounted;
            // compensate before surfacing the failure.
            if wrote_blob {
                match self.store.delete(hash).await {
                    Ok(()) => debug!(hash = %hash, "rolled back blob after catalog failure"),
                    Err(rollback) => {
                        warn!(hash = %hash, error = %rollback, "blob rollback failed, orphan left")
                    }
                }
            }
            return Err(e.into());
        }

        if is_duplicate {
            info!(id = %entry.id, hash = %hash, size, "dedup hit, stored reference only");
        } else {
            info!(id = %entry.id, hash = %hash, size, "new content stored");
        }
        let canonical = self.catalog.canonical_for(hash);
        Ok(FileRecord::from_entry(entry, canonical))
    }

    /// Fetches one entry as an API record.
    pub fn get(&self, id: FileId) -> EngineResult<FileRecord> {
        let entry = self
            .catalog
            .get(id)
            .ok_or(blobvault_catalog::CatalogError::EntryNotFound { id })?;
        let canonical = self.catalog.canonical_for(entry.content_hash);
        Ok(FileRecord::from_entry(entry, canonical))
    }

    /// Streams back the physical bytes for an entry, resolved through the
    /// blob store via the entry's content hash.
    pub async fn download(&self, id: FileId) -> EngineResult<(FileRecord, Bytes)> {
        let record = self.get(id)?;
        let bytes = self.store.get(record.content_hash).await?;
        Ok((record, bytes))
    }

    /// Deletes an entry. The blob is removed only when this entry was the
    /// last referencer of its content hash. Survivors need no re-pointing:
    /// duplicate references resolve through the hash at read time.
    pub async fn delete(&self, id: FileId) -> EngineResult<()> {
        let entry = self
            .catalog
            .get(id)
            .ok_or(blobvault_catalog::CatalogError::EntryNotFound { id })?;
        let hash = entry.content_hash;

        let guard = self.locks.acquire(hash).await;
        let result = async {
            // The entry may have been deleted while we waited for the lock.
            let removed = self.catalog.delete(id)?;
            if self.catalog.reference_count(hash) == 0 {
                match self.store.delete(hash).await {
                    Ok(()) => debug!(hash = %hash, "last reference removed, blob deleted"),
                    Err(StoreError::BlobNotFound { .. }) => {
                        warn!(hash = %hash, "blob already absent on last-reference delete")
                    }
                    Err(e) => return Err(e.into()),
                }
            } else {
                debug!(
                    id = %removed.id,
                    hash = %hash,
                    remaining = self.catalog.reference_count(hash),
                    "entry deleted, blob retained"
                );
            }
            Ok(())
        }
        .await;
        drop(guard);
        self.locks.prune(hash);
        result
    }

    /// Filtered listing with the default newest-first ordering.
    pub fn query(&self, filter: &FileFilter) -> EngineResult<Vec<FileRecord>> {
        self.query_sorted(filter, SortSpec::default())
    }

    /// Filtered listing with a caller-supplied sort.
    pub fn query_sorted(
        &self,
        filter: &FileFilter,
        sort: SortSpec,
    ) -> EngineResult<Vec<FileRecord>> {
        let entries = self.catalog.query_sorted(filter, sort)?;
        Ok(entries
            .into_iter()
            .map(|entry| {
                let canonical = self.catalog.canonical_for(entry.content_hash);
                FileRecord::from_entry(entry, canonical)
            })
            .collect())
    }

    /// All entries, newest first.
    pub fn list(&self) -> EngineResult<Vec<FileRecord>> {
        self.query(&FileFilter::any())
    }

    /// Distinct file types present, for filter-option discovery.
    pub fn distinct_file_types(&self) -> Vec<String> {
        self.catalog.distinct_file_types()
    }

    /// Current storage-efficiency statistics.
    pub fn stats(&self) -> StorageStats {
        self.catalog.stats()
    }
}
