//! Shared data model: file identifiers, content hashes, catalog entries, stats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a logical file entry, assigned at upload time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(Uuid);

impl FileId {
    /// Creates a fresh random identifier.
    pub fn new() -> Self {
        FileId(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        FileId(id)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 32-byte BLAKE3 digest identifying a file's content. Used as the
/// content-addressed storage key: identical bytes always share one blob.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Return the hash as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Parse a 64-character lowercase/uppercase hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != 64 {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let hi = (chunk[0] as char).to_digit(16)?;
            let lo = (chunk[1] as char).to_digit(16)?;
            bytes[i] = ((hi << 4) | lo) as u8;
        }
        Some(ContentHash(bytes))
    }

    /// Return the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

/// A logical file entry in the metadata catalog — one per upload event,
/// created once and never mutated afterwards.
///
/// Duplicates reference their content hash rather than a specific entry id,
/// so deleting the canonical entry never leaves dangling references. The
/// canonical entry for a hash is resolved at read time (see [`FileRecord`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Unique entry identifier.
    pub id: FileId,
    /// User-supplied filename; not required to be unique.
    pub original_filename: String,
    /// MIME-style type derived from the filename extension.
    pub file_type: String,
    /// Logical byte length of the uploaded content.
    pub size: u64,
    /// Upload timestamp, set at creation.
    pub uploaded_at: DateTime<Utc>,
    /// BLAKE3 digest of the content; physical storage identity.
    pub content_hash: ContentHash,
    /// True iff another entry with the same hash existed at creation time.
    pub is_duplicate: bool,
}

impl FileEntry {
    /// Bytes not physically written because this entry deduplicated against
    /// an existing blob. Equals `size` for duplicates, 0 otherwise.
    pub fn storage_saved(&self) -> u64 {
        if self.is_duplicate {
            self.size
        } else {
            0
        }
    }
}

/// API view of a [`FileEntry`] with the duplicate reference resolved.
///
/// `reference_file` points at the earliest surviving entry sharing this
/// entry's content hash, or `None` for originals (and for a duplicate that
/// has itself become the earliest survivor).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Unique entry identifier.
    pub id: FileId,
    /// User-supplied filename.
    pub original_filename: String,
    /// MIME-style file type.
    pub file_type: String,
    /// Logical size in bytes.
    pub size: u64,
    /// Upload timestamp.
    pub uploaded_at: DateTime<Utc>,
    /// Content digest.
    pub content_hash: ContentHash,
    /// Whether this upload deduplicated against existing content.
    pub is_duplicate: bool,
    /// Canonical entry this duplicate references, resolved at read time.
    pub reference_file: Option<FileId>,
    /// Bytes saved by deduplication for this entry.
    pub storage_saved: u64,
}

impl FileRecord {
    /// Builds the API view from a catalog entry and the resolved canonical id.
    ///
    /// A duplicate whose canonical resolves to itself (every earlier entry
    /// with the hash was deleted) reports no reference.
    pub fn from_entry(entry: FileEntry, canonical: Option<FileId>) -> Self {
        let reference_file = match canonical {
            Some(id) if entry.is_duplicate && id != entry.id => Some(id),
            _ => None,
        };
        let storage_saved = entry.storage_saved();
        Self {
            id: entry.id,
            original_filename: entry.original_filename,
            file_type: entry.file_type,
            size: entry.size,
            uploaded_at: entry.uploaded_at,
            content_hash: entry.content_hash,
            is_duplicate: entry.is_duplicate,
            reference_file,
            storage_saved,
        }
    }
}

/// Aggregate storage-efficiency statistics, derived from the catalog.
///
/// Invariants: `total_files == unique_files + duplicate_files` and
/// `total_size_bytes == actual_storage_bytes + saved_storage_bytes`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageStats {
    /// Count of all catalog entries, duplicates included.
    pub total_files: u64,
    /// Count of distinct content hashes present.
    pub unique_files: u64,
    /// `total_files - unique_files`.
    pub duplicate_files: u64,
    /// Sum of logical sizes over all entries.
    pub total_size_bytes: u64,
    /// Sum of physical blob sizes, one per distinct hash.
    pub actual_storage_bytes: u64,
    /// `total_size_bytes - actual_storage_bytes`.
    pub saved_storage_bytes: u64,
    /// Fraction of logical demand avoided, as a percentage. Full precision;
    /// 0 when the catalog holds no bytes.
    pub efficiency_percentage: f64,
}

impl StorageStats {
    /// Derives the dependent fields from the four base counters.
    pub fn from_counters(
        total_files: u64,
        unique_files: u64,
        total_size_bytes: u64,
        actual_storage_bytes: u64,
    ) -> Self {
        let saved_storage_bytes = total_size_bytes.saturating_sub(actual_storage_bytes);
        let efficiency_percentage = if total_size_bytes > 0 {
            saved_storage_bytes as f64 / total_size_bytes as f64 * 100.0
        } else {
            0.0
        };
        Self {
            total_files,
            unique_files,
            duplicate_files: total_files.saturating_sub(unique_files),
            total_size_bytes,
            actual_storage_bytes,
            saved_storage_bytes,
            efficiency_percentage,
        }
    }

    /// Efficiency rounded to two decimals for display.
    pub fn efficiency_rounded(&self) -> f64 {
        (self.efficiency_percentage * 100.0).round() / 100.0
    }
}
