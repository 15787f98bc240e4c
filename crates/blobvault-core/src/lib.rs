#![warn(missing_docs)]

//! Blobvault core: shared types, BLAKE3 content hashing, file-type detection
//!
//! Upload path: bytes → hash (BLAKE3, streamed) → dedup decision → catalog entry

pub mod file_type;
pub mod hasher;
pub mod types;

pub use file_type::detect_file_type;
pub use hasher::{hash_bytes, hash_reader, ContentHasher};
pub use types::{ContentHash, FileEntry, FileId, FileRecord, StorageStats};
