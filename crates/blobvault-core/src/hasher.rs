//! Streaming BLAKE3 content hashing.
//!
//! Hashing and byte counting happen in one pass over the input so large
//! uploads never need to be resident in memory for identity computation.

use crate::types::ContentHash;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

/// Read buffer size for streaming hashes (64 KiB).
const HASH_BUF_SIZE: usize = 64 * 1024;

/// Incremental content hasher tracking the byte count alongside the digest.
#[derive(Default)]
pub struct ContentHasher {
    inner: blake3::Hasher,
    bytes_seen: u64,
}

impl ContentHasher {
    /// Creates a fresh hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a slice of input bytes.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
        self.bytes_seen += data.len() as u64;
    }

    /// Number of bytes fed so far.
    pub fn bytes_seen(&self) -> u64 {
        self.bytes_seen
    }

    /// Finalizes, returning the digest and the total byte count.
    pub fn finalize(self) -> (ContentHash, u64) {
        let hash = self.inner.finalize();
        (ContentHash(*hash.as_bytes()), self.bytes_seen)
    }
}

/// Hashes a byte slice in one shot.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
    let hash = blake3::hash(data);
    ContentHash(*hash.as_bytes())
}

/// Stream-hashes a reader with a fixed-size buffer, returning the digest and
/// the byte count. A read failure mid-stream surfaces as the I/O error and
/// the partial digest is discarded.
pub async fn hash_reader<R: AsyncRead + Unpin>(
    mut reader: R,
) -> std::io::Result<(ContentHash, u64)> {
    let mut hasher = ContentHasher::new();
    let mut buf = vec![0u8; HASH_BUF_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    trace!(bytes = hasher.bytes_seen(), "stream hash complete");
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_bytes(b"hello world"), hash_bytes(b"hello world"));
    }

    #[test]
    fn different_content_different_hash() {
        assert_ne!(hash_bytes(b"hello"), hash_bytes(b"world"));
    }

    #[test]
    fn incremental_matches_one_shot() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut hasher = ContentHasher::new();
        for chunk in data.chunks(7919) {
            hasher.update(chunk);
        }
        let (hash, count) = hasher.finalize();
        assert_eq!(hash, hash_bytes(&data));
        assert_eq!(count, data.len() as u64);
    }

    #[tokio::test]
    async fn reader_hash_matches_one_shot() {
        let data: Vec<u8> = (0..300_000u32).map(|i| (i % 157) as u8).collect();
        let (hash, count) = hash_reader(&data[..]).await.unwrap();
        assert_eq!(hash, hash_bytes(&data));
        assert_eq!(count, data.len() as u64);
    }

    #[tokio::test]
    async fn empty_reader() {
        let (hash, count) = hash_reader(&b""[..]).await.unwrap();
        assert_eq!(hash, hash_bytes(b""));
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn truncated_reader_surfaces_error() {
        struct FailingReader;
        impl AsyncRead for FailingReader {
            fn poll_read(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "stream truncated",
                )))
            }
        }
        let err = hash_reader(FailingReader).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    proptest! {
        #[test]
        fn prop_hash_deterministic(data in prop::collection::vec(0u8..=255, 0..10_000)) {
            prop_assert_eq!(hash_bytes(&data), hash_bytes(&data));
        }

        #[test]
        fn prop_incremental_chunking_invariant(
            data in prop::collection::vec(0u8..=255, 0..50_000),
            split in 1usize..4096,
        ) {
            let mut hasher = ContentHasher::new();
            for chunk in data.chunks(split) {
                hasher.update(chunk);
            }
            let (hash, count) = hasher.finalize();
            prop_assert_eq!(hash, hash_bytes(&data));
            prop_assert_eq!(count, data.len() as u64);
        }
    }
}
