//! The metadata catalog: entries keyed by id with a secondary content-hash
//! index, incremental accounting counters, and optional journal durability.

use crate::error::{CatalogError, CatalogResult};
use crate::journal::{CatalogJournal, JournalRecord};
use crate::query::{FileFilter, SortSpec};
use blobvault_core::{ContentHash, FileEntry, FileId, StorageStats};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// Ordered per-hash reference: earliest upload first, id as tie-break.
type HashRefs = BTreeSet<(DateTime<Utc>, FileId)>;

struct CatalogState {
    entries: HashMap<FileId, FileEntry>,
    by_hash: HashMap<ContentHash, HashRefs>,
    /// Incremental accounting counters, updated in the same critical
    /// section as every mutation.
    total_files: u64,
    total_size: u64,
    actual_bytes: u64,
    journal: Option<CatalogJournal>,
}

impl CatalogState {
    fn empty(journal: Option<CatalogJournal>) -> Self {
        Self {
            entries: HashMap::new(),
            by_hash: HashMap::new(),
            total_files: 0,
            total_size: 0,
            actual_bytes: 0,
            journal,
        }
    }

    fn apply_insert(&mut self, entry: FileEntry) {
        let refs = self.by_hash.entry(entry.content_hash).or_default();
        if refs.is_empty() {
            self.actual_bytes += entry.size;
        }
        refs.insert((entry.uploaded_at, entry.id));
        self.total_files += 1;
        self.total_size += entry.size;
        self.entries.insert(entry.id, entry);
    }

    fn apply_delete(&mut self, id: FileId) -> Option<FileEntry> {
        let entry = self.entries.remove(&id)?;
        if let Some(refs) = self.by_hash.get_mut(&entry.content_hash) {
            refs.remove(&(entry.uploaded_at, entry.id));
            if refs.is_empty() {
                self.by_hash.remove(&entry.content_hash);
                self.actual_bytes -= entry.size;
            }
        }
        self.total_files -= 1;
        self.total_size -= entry.size;
        Some(entry)
    }

    fn journal_append(&mut self, record: &JournalRecord) -> CatalogResult<()> {
        if let Some(journal) = &mut self.journal {
            journal.append(record)?;
        }
        Ok(())
    }
}

/// Durable record store for file entries.
///
/// All entries for one content hash are kept ordered by upload time, so
/// duplicate lookup and canonical resolution are index reads rather than
/// scans. Statistics are maintained incrementally and can be recomputed
/// from scratch for verification.
pub struct Catalog {
    state: RwLock<CatalogState>,
}

impl Catalog {
    /// Creates an in-memory catalog with no durability. For tests and
    /// ephemeral deployments.
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(CatalogState::empty(None)),
        }
    }

    /// Opens a journal-backed catalog, replaying any existing records.
    pub fn open(journal_path: impl AsRef<Path>) -> CatalogResult<Self> {
        let records = CatalogJournal::replay(&journal_path)?;
        let mut state = CatalogState::empty(None);
        for record in records {
            match record {
                JournalRecord::Insert(entry) => state.apply_insert(entry),
                JournalRecord::Delete(id) => {
                    state.apply_delete(id);
                }
            }
        }
        state.journal = Some(CatalogJournal::open(&journal_path)?);
        info!(
            entries = state.entries.len(),
            path = %journal_path.as_ref().display(),
            "catalog opened"
        );
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Inserts a new entry, journaling it before it becomes visible.
    /// Counter updates share the insert's critical section.
    pub fn insert(&self, entry: FileEntry) -> CatalogResult<()> {
        let mut state = self.state.write();
        if state.entries.contains_key(&entry.id) {
            return Err(CatalogError::DuplicateId { id: entry.id });
        }
        state.journal_append(&JournalRecord::Insert(entry.clone()))?;
        debug!(id = %entry.id, hash = %entry.content_hash, dup = entry.is_duplicate, "entry inserted");
        state.apply_insert(entry);
        Ok(())
    }

    /// Fetches an entry by id.
    pub fn get(&self, id: FileId) -> Option<FileEntry> {
        self.state.read().entries.get(&id).cloned()
    }

    /// Deletes an entry, returning it. `EntryNotFound` if absent.
    pub fn delete(&self, id: FileId) -> CatalogResult<FileEntry> {
        let mut state = self.state.write();
        if !state.entries.contains_key(&id) {
            return Err(CatalogError::EntryNotFound { id });
        }
        state.journal_append(&JournalRecord::Delete(id))?;
        let entry = state
            .apply_delete(id)
            .ok_or(CatalogError::EntryNotFound { id })?;
        debug!(id = %id, hash = %entry.content_hash, "entry deleted");
        Ok(entry)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// True if the catalog holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries sharing a content hash, ordered by upload time then id.
    pub fn list_by_hash(&self, hash: ContentHash) -> Vec<FileEntry> {
        let state = self.state.read();
        state
            .by_hash
            .get(&hash)
            .map(|refs| {
                refs.iter()
                    .filter_map(|(_, id)| state.entries.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The earliest surviving entry for a hash, if any.
    pub fn canonical_for(&self, hash: ContentHash) -> Option<FileId> {
        let state = self.state.read();
        state
            .by_hash
            .get(&hash)
            .and_then(|refs| refs.iter().next().map(|(_, id)| *id))
    }

    /// Number of entries currently referencing a hash.
    pub fn reference_count(&self, hash: ContentHash) -> usize {
        self.state
            .read()
            .by_hash
            .get(&hash)
            .map(|refs| refs.len())
            .unwrap_or(0)
    }

    /// Runs a filtered query with the default ordering
    /// (`uploaded_at` descending).
    pub fn query(&self, filter: &FileFilter) -> CatalogResult<Vec<FileEntry>> {
        self.query_sorted(filter, SortSpec::default())
    }

    /// Runs a filtered query with a caller-supplied sort.
    pub fn query_sorted(
        &self,
        filter: &FileFilter,
        sort: SortSpec,
    ) -> CatalogResult<Vec<FileEntry>> {
        filter.validate()?;
        let state = self.state.read();
        let mut result: Vec<FileEntry> = state
            .entries
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        drop(state);
        sort.sort(&mut result);
        Ok(result)
    }

    /// Distinct file types currently present, sorted. Supports
    /// filter-option discovery in clients.
    pub fn distinct_file_types(&self) -> Vec<String> {
        let state = self.state.read();
        let set: BTreeSet<&str> = state.entries.values().map(|e| e.file_type.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Storage statistics from the incrementally maintained counters.
    pub fn stats(&self) -> StorageStats {
        let state = self.state.read();
        StorageStats::from_counters(
            state.total_files,
            state.by_hash.len() as u64,
            state.total_size,
            state.actual_bytes,
        )
    }

    /// Recomputes statistics from a full scan. Must always agree with
    /// [`Catalog::stats`]; used to detect counter drift.
    pub fn recompute_stats(&self) -> StorageStats {
        let state = self.state.read();
        let total_files = state.entries.len() as u64;
        let total_size: u64 = state.entries.values().map(|e| e.size).sum();
        let mut per_hash: HashMap<ContentHash, u64> = HashMap::new();
        for entry in state.entries.values() {
            per_hash.entry(entry.content_hash).or_insert(entry.size);
        }
        let actual: u64 = per_hash.values().sum();
        StorageStats::from_counters(total_files, per_hash.len() as u64, total_size, actual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobvault_core::hash_bytes;
    use chrono::TimeZone;

    fn entry_at(name: &str, content: &[u8], secs: u32) -> FileEntry {
        FileEntry {
            id: FileId::new(),
            original_filename: name.to_string(),
            file_type: "text/plain".to_string(),
            size: content.len() as u64,
            uploaded_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, secs).unwrap(),
            content_hash: hash_bytes(content),
            is_duplicate: false,
        }
    }

    #[test]
    fn insert_get_delete() {
        let catalog = Catalog::in_memory();
        let entry = entry_at("a.txt", b"hello", 0);
        catalog.insert(entry.clone()).unwrap();
        assert_eq!(catalog.get(entry.id), Some(entry.clone()));
        assert_eq!(catalog.len(), 1);

        let removed = catalog.delete(entry.id).unwrap();
        assert_eq!(removed, entry);
        assert!(catalog.is_empty());
        assert!(matches!(
            catalog.delete(entry.id),
            Err(CatalogError::EntryNotFound { .. })
        ));
    }

    #[test]
    fn duplicate_id_rejected() {
        let catalog = Catalog::in_memory();
        let entry = entry_at("a.txt", b"hello", 0);
        catalog.insert(entry.clone()).unwrap();
        assert!(matches!(
            catalog.insert(entry),
            Err(CatalogError::DuplicateId { .. })
        ));
    }

    #[test]
    fn list_by_hash_ordered_by_upload_time() {
        let catalog = Catalog::in_memory();
        let first = entry_at("first.txt", b"same", 0);
        let mut second = entry_at("second.txt", b"same", 1);
        second.is_duplicate = true;
        catalog.insert(second.clone()).unwrap();
        catalog.insert(first.clone()).unwrap();

        let listed = catalog.list_by_hash(first.content_hash);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
        assert_eq!(catalog.canonical_for(first.content_hash), Some(first.id));
        assert_eq!(catalog.reference_count(first.content_hash), 2);
    }

    #[test]
    fn canonical_moves_to_next_earliest_after_delete() {
        let catalog = Catalog::in_memory();
        let first = entry_at("first.txt", b"same", 0);
        let mut second = entry_at("second.txt", b"same", 1);
        second.is_duplicate = true;
        let mut third = entry_at("third.txt", b"same", 2);
        third.is_duplicate = true;
        catalog.insert(first.clone()).unwrap();
        catalog.insert(second.clone()).unwrap();
        catalog.insert(third.clone()).unwrap();

        catalog.delete(first.id).unwrap();
        assert_eq!(catalog.canonical_for(first.content_hash), Some(second.id));
        catalog.delete(second.id).unwrap();
        assert_eq!(catalog.canonical_for(first.content_hash), Some(third.id));
        catalog.delete(third.id).unwrap();
        assert_eq!(catalog.canonical_for(first.content_hash), None);
    }

    #[test]
    fn incremental_stats_track_dedup() {
        let catalog = Catalog::in_memory();
        let original = entry_at("a.txt", b"hello", 0);
        catalog.insert(original).unwrap();

        let stats = catalog.stats();
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.unique_files, 1);
        assert_eq!(stats.duplicate_files, 0);
        assert_eq!(stats.total_size_bytes, 5);
        assert_eq!(stats.actual_storage_bytes, 5);
        assert_eq!(stats.saved_storage_bytes, 0);
        assert_eq!(stats.efficiency_percentage, 0.0);

        let mut dup = entry_at("b.txt", b"hello", 1);
        dup.is_duplicate = true;
        catalog.insert(dup).unwrap();

        let stats = catalog.stats();
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.unique_files, 1);
        assert_eq!(stats.duplicate_files, 1);
        assert_eq!(stats.total_size_bytes, 10);
        assert_eq!(stats.actual_storage_bytes, 5);
        assert_eq!(stats.saved_storage_bytes, 5);
        assert!((stats.efficiency_percentage - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stats_agree_with_recompute_after_mixed_workload() {
        let catalog = Catalog::in_memory();
        let mut ids = Vec::new();
        for i in 0u32..20 {
            let content = format!("content-{}", i % 7);
            let mut entry = entry_at(&format!("f{}.txt", i), content.as_bytes(), i);
            entry.is_duplicate = i >= 7;
            catalog.insert(entry.clone()).unwrap();
            ids.push(entry.id);
        }
        for id in ids.iter().step_by(3) {
            catalog.delete(*id).unwrap();
        }
        assert_eq!(catalog.stats(), catalog.recompute_stats());
    }

    #[test]
    fn query_validates_filter() {
        let catalog = Catalog::in_memory();
        let filter = FileFilter {
            min_size: Some(10),
            max_size: Some(1),
            ..Default::default()
        };
        assert!(matches!(
            catalog.query(&filter),
            Err(CatalogError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn query_default_order_is_newest_first() {
        let catalog = Catalog::in_memory();
        let a = entry_at("a.txt", b"1", 0);
        let b = entry_at("b.txt", b"2", 10);
        let c = entry_at("c.txt", b"3", 5);
        for e in [&a, &b, &c] {
            catalog.insert(e.clone()).unwrap();
        }
        let result = catalog.query(&FileFilter::any()).unwrap();
        let names: Vec<_> = result.iter().map(|e| e.original_filename.as_str()).collect();
        assert_eq!(names, ["b.txt", "c.txt", "a.txt"]);
    }

    #[test]
    fn distinct_file_types_sorted_and_deduped() {
        let catalog = Catalog::in_memory();
        let mut a = entry_at("a.png", b"1", 0);
        a.file_type = "image/png".to_string();
        let mut b = entry_at("b.txt", b"2", 1);
        b.file_type = "text/plain".to_string();
        let mut c = entry_at("c.png", b"3", 2);
        c.file_type = "image/png".to_string();
        for e in [a, b, c] {
            catalog.insert(e).unwrap();
        }
        assert_eq!(
            catalog.distinct_file_types(),
            vec!["image/png".to_string(), "text/plain".to_string()]
        );
    }

    #[test]
    fn journal_backed_catalog_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.journal");

        let kept = entry_at("kept.txt", b"hello", 0);
        let mut dup = entry_at("dup.txt", b"hello", 1);
        dup.is_duplicate = true;
        let dropped = entry_at("dropped.txt", b"other", 2);
        {
            let catalog = Catalog::open(&path).unwrap();
            catalog.insert(kept.clone()).unwrap();
            catalog.insert(dup.clone()).unwrap();
            catalog.insert(dropped.clone()).unwrap();
            catalog.delete(dropped.id).unwrap();
        }

        let catalog = Catalog::open(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(kept.id), Some(kept.clone()));
        assert_eq!(catalog.get(dropped.id), None);
        assert_eq!(catalog.canonical_for(kept.content_hash), Some(kept.id));

        let stats = catalog.stats();
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.unique_files, 1);
        assert_eq!(stats.saved_storage_bytes, 5);
        assert_eq!(stats, catalog.recompute_stats());
    }
}
