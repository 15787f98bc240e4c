//! Query/filter engine over catalog entries.
//!
//! Every filter field is optional; an absent field places no constraint on
//! that dimension. Provided fields combine with logical AND. Filename
//! matching is a case-insensitive substring match.

use crate::error::{CatalogError, CatalogResult};
use blobvault_core::FileEntry;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Filter configuration for catalog queries.
///
/// Optional fields model "no constraint" explicitly instead of sentinel
/// values, so an unset size bound is distinguishable from a zero bound.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileFilter {
    /// Case-insensitive substring match against the original filename.
    pub filename: Option<String>,
    /// Exact match against the file type.
    pub file_type: Option<String>,
    /// Inclusive lower bound on logical size in bytes.
    pub min_size: Option<u64>,
    /// Inclusive upper bound on logical size in bytes.
    pub max_size: Option<u64>,
    /// Inclusive lower bound on the upload calendar date (UTC).
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the upload calendar date (UTC);
    /// covers the whole day.
    pub date_to: Option<NaiveDate>,
}

impl FileFilter {
    /// A filter matching every entry.
    pub fn any() -> Self {
        Self::default()
    }

    /// Checks the filter for internal consistency.
    pub fn validate(&self) -> CatalogResult<()> {
        if let (Some(min), Some(max)) = (self.min_size, self.max_size) {
            if max < min {
                return Err(CatalogError::InvalidFilter {
                    reason: format!("max_size {} is less than min_size {}", max, min),
                });
            }
        }
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if to < from {
                return Err(CatalogError::InvalidFilter {
                    reason: format!("date_to {} is before date_from {}", to, from),
                });
            }
        }
        Ok(())
    }

    /// Parses `%Y-%m-%d` date strings into the filter's date bounds.
    /// Non-parseable input is rejected as an invalid filter.
    pub fn with_date_strings(
        mut self,
        date_from: Option<&str>,
        date_to: Option<&str>,
    ) -> CatalogResult<Self> {
        if let Some(s) = date_from {
            self.date_from = Some(parse_date(s)?);
        }
        if let Some(s) = date_to {
            self.date_to = Some(parse_date(s)?);
        }
        Ok(self)
    }

    /// Returns true if the entry satisfies every provided predicate.
    pub fn matches(&self, entry: &FileEntry) -> bool {
        if let Some(needle) = &self.filename {
            let haystack = entry.original_filename.to_lowercase();
            if !haystack.contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(file_type) = &self.file_type {
            if entry.file_type != *file_type {
                return false;
            }
        }
        if let Some(min) = self.min_size {
            if entry.size < min {
                return false;
            }
        }
        if let Some(max) = self.max_size {
            if entry.size > max {
                return false;
            }
        }
        let date = entry.uploaded_at.date_naive();
        if let Some(from) = self.date_from {
            if date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if date > to {
                return false;
            }
        }
        true
    }
}

fn parse_date(s: &str) -> CatalogResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| CatalogError::InvalidFilter {
        reason: format!("unparseable date '{}': {}", s, e),
    })
}

/// Sortable fields for query results.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    /// Sort by upload timestamp.
    UploadedAt,
    /// Sort by logical size.
    Size,
    /// Sort by original filename (lexicographic).
    Filename,
}

/// Caller-supplied sort specification.
///
/// The default is `uploaded_at` descending, keeping listing pagination
/// stable as new uploads arrive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Field to sort by.
    pub field: SortField,
    /// Descending order when true.
    pub descending: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: SortField::UploadedAt,
            descending: true,
        }
    }
}

impl SortSpec {
    /// Orders entries in place, breaking ties by id for stability.
    pub fn sort(&self, entries: &mut [FileEntry]) {
        entries.sort_by(|a, b| {
            let ordering = match self.field {
                SortField::UploadedAt => a.uploaded_at.cmp(&b.uploaded_at),
                SortField::Size => a.size.cmp(&b.size),
                SortField::Filename => a.original_filename.cmp(&b.original_filename),
            };
            let ordering = if self.descending {
                ordering.reverse()
            } else {
                ordering
            };
            ordering.then_with(|| a.id.cmp(&b.id))
        });
    }
}
