//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Default upload size cap (1 GiB). The upload path holds the whole payload
/// in memory while hashing, so the cap is also the per-upload memory bound.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1024 * 1024 * 1024;

/// Tunables for the deduplication engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Attempts for a blob write before surfacing the I/O error.
    pub put_retries: u32,
    /// Maximum accepted upload size in bytes; `None` disables the check and
    /// leaves per-upload memory unbounded. Oversized uploads are rejected
    /// before any state is committed.
    pub max_upload_bytes: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            put_retries: 3,
            max_upload_bytes: Some(DEFAULT_MAX_UPLOAD_BYTES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.put_retries, 3);
        assert_eq!(config.max_upload_bytes, Some(DEFAULT_MAX_UPLOAD_BYTES));
    }

    #[test]
    fn default_cap_is_finite() {
        let config = EngineConfig::default();
        let limit = config.max_upload_bytes.unwrap();
        assert!(limit > 0);
        assert_eq!(limit, 1 << 30);
    }
}
