//! Bounded retry for transient blob I/O failures.

use crate::error::{StoreError, StoreResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Delay between retry attempts.
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Runs `op` up to `attempts` times, retrying only on I/O errors.
///
/// `BlobNotFound` and other non-transient errors surface immediately.
/// Exhausting the budget surfaces the last I/O error.
pub async fn with_retries<T, F, Fut>(attempts: u32, mut op: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let attempts = attempts.max(1);
    let mut last_err = None;
    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(StoreError::Io(e)) => {
                warn!(attempt, max = attempts, error = %e, "transient blob I/O failure");
                last_err = Some(StoreError::Io(e));
                if attempt < attempts {
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
            }
            Err(e) => return Err(e),
        }
    }
    // attempts >= 1, so an error was recorded on every path reaching here.
    Err(last_err.unwrap_or_else(|| {
        StoreError::Io(std::io::Error::other("retry budget exhausted"))
    }))
}
