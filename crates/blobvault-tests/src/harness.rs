//! Shared test scaffolding.

use blobvault_catalog::Catalog;
use blobvault_core::{FileEntry, FileId, FileRecord};
use blobvault_engine::{DedupEngine, EngineConfig};
use blobvault_store::{FsBlobStore, MemoryBlobStore};
use chrono::{TimeZone, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Installs a test log subscriber once per process, honoring `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Deterministic pseudo-random payload for upload tests.
pub fn random_payload(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

/// A disposable engine environment for integration tests.
///
/// Holds the temp directory alive for the lifetime of the environment so
/// filesystem-backed state is not reclaimed mid-test.
pub struct TestEnv {
    /// Kept for its Drop; the engine stores data beneath it.
    pub dir: tempfile::TempDir,
    /// Filesystem-backed engine rooted in `dir`.
    pub engine: Arc<DedupEngine<FsBlobStore>>,
}

impl TestEnv {
    /// Creates a filesystem-backed environment with default config.
    pub async fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = DedupEngine::open(dir.path(), EngineConfig::default())
            .await
            .expect("open engine");
        tracing::info!(dir = %dir.path().display(), "test environment ready");
        Self {
            dir,
            engine: Arc::new(engine),
        }
    }

    /// Reopens the engine over the same directory, simulating a restart.
    pub async fn reopen(&mut self) {
        let engine = DedupEngine::open(self.dir.path(), EngineConfig::default())
            .await
            .expect("reopen engine");
        self.engine = Arc::new(engine);
    }

    /// Uploads a string body under a filename.
    pub async fn upload(&self, filename: &str, body: &str) -> FileRecord {
        self.engine
            .upload(filename, body.as_bytes())
            .await
            .expect("upload")
    }
}

/// An in-memory engine shared across tasks, for concurrency tests.
pub fn memory_engine() -> (Arc<MemoryBlobStore>, Arc<DedupEngine<MemoryBlobStore>>) {
    init_tracing();
    let store = Arc::new(MemoryBlobStore::new());
    let engine = Arc::new(DedupEngine::new(
        store.clone(),
        Arc::new(Catalog::in_memory()),
        EngineConfig::default(),
    ));
    (store, engine)
}

/// Builds a catalog entry with an explicit upload date, for query tests
/// that need control over `uploaded_at`.
pub fn entry_on_date(
    name: &str,
    file_type: &str,
    size: u64,
    (y, m, d): (i32, u32, u32),
) -> FileEntry {
    FileEntry {
        id: FileId::new(),
        original_filename: name.to_string(),
        file_type: file_type.to_string(),
        size,
        uploaded_at: Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap(),
        content_hash: blobvault_core::hash_bytes(name.as_bytes()),
        is_duplicate: false,
    }
}

impl std::fmt::Debug for TestEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestEnv")
            .field("dir", &self.dir.path())
            .finish()
    }
}
