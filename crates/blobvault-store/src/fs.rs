//! Filesystem blob store with content-addressed layout.
//!
//! Blobs live at `<root>/<hh>/<hex>` where `hh` is the first hex byte of the
//! hash, keeping per-directory entry counts manageable. Writes go to a
//! `.tmp` sibling first and become visible only via rename, so readers never
//! observe a partially written blob and a crash leaves no committed state.

use crate::error::{StoreError, StoreResult};
use crate::store::BlobStore;
use blobvault_core::ContentHash;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Blob store rooted at a local directory. Survives process restart.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Opens (creating if needed) a blob store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        if root.exists() && !root.is_dir() {
            return Err(StoreError::InvalidRoot {
                reason: format!("{} exists and is not a directory", root.display()),
            });
        }
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Path of the blob file for a hash.
    fn blob_path(&self, hash: ContentHash) -> PathBuf {
        let hex = hash.to_hex();
        self.root.join(&hex[..2]).join(hex)
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait::async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, hash: ContentHash, data: Bytes) -> StoreResult<bool> {
        let hex = hash.to_hex();
        let shard = self.root.join(&hex[..2]);
        let path = shard.join(hex);
        match tokio::fs::metadata(&path).await {
            Ok(_) => {
                debug!(hash = %hash, "blob already on disk, idempotent put");
                return Ok(false);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tokio::fs::create_dir_all(&shard).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        if let Err(e) = async {
            file.write_all(&data).await?;
            file.sync_all().await
        }
        .await
        {
            warn!(hash = %hash, error = %e, "blob write failed, removing temp file");
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tokio::fs::rename(&tmp, &path).await?;
        // The rename itself must be durable before callers record the blob
        // elsewhere, so sync the shard directory too.
        tokio::fs::File::open(&shard).await?.sync_all().await?;
        debug!(hash = %hash, bytes = data.len(), "blob written");
        Ok(true)
    }

    async fn get(&self, hash: ContentHash) -> StoreResult<Bytes> {
        match tokio::fs::read(self.blob_path(hash)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::BlobNotFound { hash })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn contains(&self, hash: ContentHash) -> StoreResult<bool> {
        match tokio::fs::metadata(self.blob_path(hash)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, hash: ContentHash) -> StoreResult<()> {
        match tokio::fs::remove_file(self.blob_path(hash)).await {
            Ok(()) => {
                debug!(hash = %hash, "blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::BlobNotFound { hash })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn blob_size(&self, hash: ContentHash) -> StoreResult<u64> {
        match tokio::fs::metadata(self.blob_path(hash)).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::BlobNotFound { hash })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_hashes(&self) -> StoreResult<Vec<ContentHash>> {
        let mut hashes = Vec::new();
        let mut shards = tokio::fs::read_dir(&self.root).await?;
        while let Some(shard) = shards.next_entry().await? {
            if !shard.file_type().await?.is_dir() {
                continue;
            }
            let mut blobs = tokio::fs::read_dir(shard.path()).await?;
            while let Some(blob) = blobs.next_entry().await? {
                let name = blob.file_name();
                // Skip temp files and anything that is not a hash-named blob.
                if let Some(hash) = name.to_str().and_then(ContentHash::from_hex) {
                    hashes.push(hash);
                }
            }
        }
        Ok(hashes)
    }
}
