#![warn(missing_docs)]

//! Blobvault metadata catalog: durable file entries, hash-indexed duplicate
//! lookup, filtered queries, and storage-efficiency accounting.
//!
//! All mutations and their accounting-counter updates happen inside one
//! critical section, so derived statistics never drift from the entries.

pub mod catalog;
pub mod error;
pub mod journal;
pub mod query;

pub use catalog::Catalog;
pub use error::{CatalogError, CatalogResult};
pub use journal::{CatalogJournal, JournalRecord};
pub use query::{FileFilter, SortField, SortSpec};
