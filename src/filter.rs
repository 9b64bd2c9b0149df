//! Filtering and ordering of scan entries.
//!
//! Everything here is pure: the input slice is never touched and the same
//! inputs always give the same output, so a shell can re-run it on every
//! filter change without rescanning.

use crate::entry::FileEntry;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Extension filter. `All` disables filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtensionFilter {
    #[default]
    All,
    /// Lowercase, no leading dot. An empty string matches extension-less entries.
    Exact(String),
}

impl FromStr for ExtensionFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            Ok(ExtensionFilter::All)
        } else {
            Ok(ExtensionFilter::Exact(s.trim_start_matches('.').to_lowercase()))
        }
    }
}

/// AND-combined predicates. `Filters::default()` keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    /// Case-insensitive substring of the entry name.
    pub name: String,
    pub extension: ExtensionFilter,
    /// Minimum days since last access.
    pub min_age_days: u64,
    /// Minimum size in bytes.
    pub min_size: u64,
    pub files_only: bool,
}

impl Filters {
    pub fn matches(&self, entry: &FileEntry, now: u64) -> bool {
        if self.files_only && entry.is_directory {
            return false;
        }
        if !self.name.is_empty()
            && !entry
                .name
                .to_lowercase()
                .contains(&self.name.to_lowercase())
        {
            return false;
        }
        if let ExtensionFilter::Exact(ext) = &self.extension {
            if !entry.extension.eq_ignore_ascii_case(ext) {
                return false;
            }
        }
        entry.age_days(now) >= self.min_age_days && entry.size >= self.min_size
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    SizeAsc,
    SizeDesc,
    ModifiedAsc,
    #[default]
    ModifiedDesc,
    AccessedAsc,
    AccessedDesc,
    NameAsc,
    NameDesc,
}

impl SortKey {
    pub fn all() -> Vec<SortKey> {
        vec![
            SortKey::SizeAsc,
            SortKey::SizeDesc,
            SortKey::ModifiedAsc,
            SortKey::ModifiedDesc,
            SortKey::AccessedAsc,
            SortKey::AccessedDesc,
            SortKey::NameAsc,
            SortKey::NameDesc,
        ]
    }

    fn compare(&self, a: &FileEntry, b: &FileEntry) -> Ordering {
        match self {
            SortKey::SizeAsc => a.size.cmp(&b.size),
            SortKey::SizeDesc => b.size.cmp(&a.size),
            SortKey::ModifiedAsc => a.modified.cmp(&b.modified),
            SortKey::ModifiedDesc => b.modified.cmp(&a.modified),
            SortKey::AccessedAsc => a.accessed.cmp(&b.accessed),
            SortKey::AccessedDesc => b.accessed.cmp(&a.accessed),
            SortKey::NameAsc => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::NameDesc => b.name.to_lowercase().cmp(&a.name.to_lowercase()),
        }
    }
}

/// Keep the entries matching `filters`, ordered by `sort`. Ties keep their
/// input order. `now` is the reference time for ages, in epoch seconds.
pub fn apply<'a>(
    entries: &'a [FileEntry],
    filters: &Filters,
    sort: SortKey,
    now: u64,
) -> Vec<&'a FileEntry> {
    let mut kept: Vec<&FileEntry> = entries.iter().filter(|e| filters.matches(e, now)).collect();
    kept.sort_by(|a, b| sort.compare(a, b));
    kept
}
