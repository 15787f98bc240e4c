//! Append-only journal for catalog durability.
//!
//! Each mutation is one length-prefixed bincode frame (`u32` LE length,
//! then the record). `replay` rebuilds catalog state on open; a torn
//! trailing frame from a crash mid-append is truncated and replay keeps
//! everything before it.

use crate::error::{CatalogError, CatalogResult};
use blobvault_core::{FileEntry, FileId};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A single durable catalog mutation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum JournalRecord {
    /// A new entry was inserted.
    Insert(FileEntry),
    /// An entry was deleted.
    Delete(FileId),
}

/// Append-only journal file backing a catalog.
pub struct CatalogJournal {
    file: File,
    path: PathBuf,
}

impl CatalogJournal {
    /// Opens the journal for appending, creating it if missing.
    pub fn open(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { file, path })
    }

    /// Appends one record and syncs it to disk.
    pub fn append(&mut self, record: &JournalRecord) -> CatalogResult<()> {
        let payload = bincode::serialize(record).map_err(|e| CatalogError::CorruptJournal {
            reason: format!("encode failed: {}", e),
        })?;
        let len = payload.len() as u32;
        self.file.write_all(&len.to_le_bytes())?;
        self.file.write_all(&payload)?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all records from a journal file. A partial trailing frame is
    /// truncated off the file and replay returns the records before it.
    pub fn replay(path: impl AsRef<Path>) -> CatalogResult<Vec<JournalRecord>> {
        let path = path.as_ref();
        let mut data = Vec::new();
        match File::open(path) {
            Ok(mut file) => {
                file.read_to_end(&mut data)?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        }

        let mut records = Vec::new();
        let mut offset = 0usize;
        while offset < data.len() {
            if offset + 4 > data.len() {
                break; // torn length prefix
            }
            let len =
                u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
                    as usize;
            let start = offset + 4;
            if start + len > data.len() {
                break; // torn payload
            }
            let record: JournalRecord =
                bincode::deserialize(&data[start..start + len]).map_err(|e| {
                    CatalogError::CorruptJournal {
                        reason: format!("decode failed at offset {}: {}", offset, e),
                    }
                })?;
            records.push(record);
            offset = start + len;
        }

        if offset < data.len() {
            warn!(
                path = %path.display(),
                valid_bytes = offset,
                total_bytes = data.len(),
                "truncating torn journal tail"
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(offset as u64)?;
            file.sync_all()?;
        }

        info!(path = %path.display(), records = records.len(), "journal replayed");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobvault_core::{hash_bytes, ContentHash};
    use chrono::Utc;

    fn test_entry(name: &str) -> FileEntry {
        FileEntry {
            id: FileId::new(),
            original_filename: name.to_string(),
            file_type: "text/plain".to_string(),
            size: 5,
            uploaded_at: Utc::now(),
            content_hash: hash_bytes(name.as_bytes()),
            is_duplicate: false,
        }
    }

    #[test]
    fn append_and_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.journal");
        let entry = test_entry("a.txt");

        let mut journal = CatalogJournal::open(&path).unwrap();
        journal.append(&JournalRecord::Insert(entry.clone())).unwrap();
        journal.append(&JournalRecord::Delete(entry.id)).unwrap();
        drop(journal);

        let records = CatalogJournal::replay(&path).unwrap();
        assert_eq!(records.len(), 2);
        match &records[0] {
            JournalRecord::Insert(e) => assert_eq!(*e, entry),
            other => panic!("unexpected record {:?}", other),
        }
        match &records[1] {
            JournalRecord::Delete(id) => assert_eq!(*id, entry.id),
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn replay_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let records = CatalogJournal::replay(dir.path().join("absent.journal")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn torn_tail_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.journal");
        let entry = test_entry("a.txt");

        let mut journal = CatalogJournal::open(&path).unwrap();
        journal.append(&JournalRecord::Insert(entry.clone())).unwrap();
        drop(journal);

        // Simulate a crash mid-append: a length prefix with half a payload.
        let intact_len = std::fs::metadata(&path).unwrap().len();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&100u32.to_le_bytes()).unwrap();
        file.write_all(&[0xFF; 10]).unwrap();
        drop(file);

        let records = CatalogJournal::replay(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), intact_len);

        // Appending after truncation continues cleanly.
        let mut journal = CatalogJournal::open(&path).unwrap();
        journal.append(&JournalRecord::Delete(entry.id)).unwrap();
        drop(journal);
        assert_eq!(CatalogJournal::replay(&path).unwrap().len(), 2);
    }

    #[test]
    fn garbage_payload_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.journal");
        let mut file = File::create(&path).unwrap();
        // Valid length prefix, undecodable payload.
        file.write_all(&4u32.to_le_bytes()).unwrap();
        file.write_all(&[0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
        drop(file);

        assert!(matches!(
            CatalogJournal::replay(&path),
            Err(CatalogError::CorruptJournal { .. })
        ));
    }

    #[test]
    fn hash_survives_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.journal");
        let mut entry = test_entry("b.bin");
        entry.content_hash = ContentHash([0xA5; 32]);

        let mut journal = CatalogJournal::open(&path).unwrap();
        journal.append(&JournalRecord::Insert(entry.clone())).unwrap();
        drop(journal);

        match &CatalogJournal::replay(&path).unwrap()[0] {
            JournalRecord::Insert(e) => assert_eq!(e.content_hash, entry.content_hash),
            other => panic!("unexpected record {:?}", other),
        }
    }
}
