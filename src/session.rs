//! Shell-side application state.
//!
//! The engine keeps nothing between calls. A shell that wants to remember the
//! last scan, the current filters and the selection owns a [`Session`].

use crate::cleaner::BatchOutcome;
use crate::entry::FileEntry;
use crate::filter::{self, Filters, SortKey};
use crate::scanner::ScanResult;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct Session {
    scan: Option<ScanResult>,
    pub filters: Filters,
    pub sort: SortKey,
    selection: BTreeSet<PathBuf>,
}

impl Session {
    pub fn new(scan: ScanResult) -> Self {
        Self {
            scan: Some(scan),
            ..Self::default()
        }
    }

    pub fn scan(&self) -> Option<&ScanResult> {
        self.scan.as_ref()
    }

    /// Replace the cached scan. The selection is cleared.
    pub fn load(&mut self, scan: ScanResult) {
        self.scan = Some(scan);
        self.selection.clear();
    }

    /// Current filtered, sorted view of the cached scan.
    pub fn view(&self, now: u64) -> Vec<&FileEntry> {
        match &self.scan {
            Some(scan) => filter::apply(&scan.entries, &self.filters, self.sort, now),
            None => Vec::new(),
        }
    }

    pub fn toggle(&mut self, path: &Path) {
        if !self.selection.remove(path) {
            self.selection.insert(path.to_path_buf());
        }
    }

    pub fn select_all_visible(&mut self, now: u64) {
        let visible: Vec<PathBuf> = self
            .view(now)
            .into_iter()
            .map(|e| PathBuf::from(&e.path))
            .collect();
        self.selection.extend(visible);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, path: &Path) -> bool {
        self.selection.contains(path)
    }

    pub fn selected(&self) -> impl Iterator<Item = &Path> {
        self.selection.iter().map(PathBuf::as_path)
    }

    /// Fold a finished batch into the cached scan: entries that are gone, and
    /// anything beneath a removed directory, drop out of the list, the counts
    /// shrink, and they leave the selection.
    pub fn reconcile(&mut self, outcome: &BatchOutcome) {
        let gone: Vec<&Path> = outcome.gone().collect();
        if gone.is_empty() {
            return;
        }
        if let Some(scan) = self.scan.take() {
            self.scan = Some(without(&scan, &gone));
        }
        self.selection.retain(|p| !gone.iter().any(|g| p.starts_with(g)));
    }
}

/// A copy of `scan` minus `gone` and everything under it.
pub fn without(scan: &ScanResult, gone: &[&Path]) -> ScanResult {
    let entries: Vec<FileEntry> = scan
        .entries
        .iter()
        .filter(|e| {
            let path = Path::new(&e.path);
            !gone.iter().any(|g| path.starts_with(g))
        })
        .cloned()
        .collect();

    let removed_count = scan.entries.len() - entries.len();
    let kept_size: u64 = entries.iter().map(|e| e.size).sum();
    let removed_size = scan.entries.iter().map(|e| e.size).sum::<u64>() - kept_size;

    ScanResult {
        scan_path: scan.scan_path.clone(),
        total_count: scan.total_count.saturating_sub(removed_count),
        total_size: scan.total_size.saturating_sub(removed_size),
        entries,
        limited: scan.limited,
        max_entries: scan.max_entries,
        skipped: scan.skipped,
    }
}
