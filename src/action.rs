//! Two-step destructive actions.
//!
//! [`propose`] describes what would happen, the caller shows that to the user,
//! and only then hands the descriptor to [`execute`]. A descriptor is consumed
//! by execution, so the same confirmation cannot be replayed.

use crate::cleaner::{BatchOutcome, Cleaner, TrashStore};
use crate::scanner::ScanResult;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Delete,
    Trash,
    MoveTo(PathBuf),
}

impl ActionKind {
    pub fn verb(&self) -> &'static str {
        match self {
            ActionKind::Delete => "Permanently delete",
            ActionKind::Trash => "Move to trash",
            ActionKind::MoveTo(_) => "Move",
        }
    }

    pub fn is_reversible(&self) -> bool {
        !matches!(self, ActionKind::Delete)
    }
}

/// A pending action awaiting confirmation.
#[derive(Debug, Clone)]
pub struct ActionDescriptor {
    kind: ActionKind,
    paths: Vec<PathBuf>,
    known_size: u64,
    unknown: usize,
}

impl ActionDescriptor {
    pub fn kind(&self) -> &ActionKind {
        &self.kind
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Bytes covered according to the scan the proposal was built from.
    pub fn known_size(&self) -> u64 {
        self.known_size
    }

    /// Paths that were not part of that scan.
    pub fn unknown(&self) -> usize {
        self.unknown
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn summary(&self) -> String {
        let target = match &self.kind {
            ActionKind::MoveTo(dest) => format!(" to {}", dest.display()),
            _ => String::new(),
        };
        format!(
            "{} {} item(s){} ({})",
            self.kind.verb(),
            self.paths.len(),
            target,
            crate::size::format_size(self.known_size)
        )
    }
}

/// Describe `kind` applied to `paths`. Sizes are looked up in `scan`; paths
/// are not checked against it otherwise. Duplicate paths are kept once.
pub fn propose<I, P>(kind: ActionKind, paths: I, scan: &ScanResult) -> ActionDescriptor
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let sizes: HashMap<&Path, u64> = scan
        .entries
        .iter()
        .map(|e| (Path::new(e.path.as_str()), e.size))
        .collect();

    let mut seen = HashSet::new();
    let mut descriptor = ActionDescriptor {
        kind,
        paths: Vec::new(),
        known_size: 0,
        unknown: 0,
    };

    for path in paths {
        let path = path.as_ref();
        if !seen.insert(path.to_path_buf()) {
            continue;
        }
        match sizes.get(path) {
            Some(size) => descriptor.known_size += size,
            None => descriptor.unknown += 1,
        }
        descriptor.paths.push(path.to_path_buf());
    }

    descriptor
}

/// Carry out a confirmed action.
pub fn execute<T: TrashStore>(descriptor: ActionDescriptor, cleaner: &Cleaner<T>) -> BatchOutcome {
    let ActionDescriptor { kind, paths, .. } = descriptor;
    match kind {
        ActionKind::Delete => cleaner.delete_many(&paths),
        ActionKind::Trash => cleaner.trash_many(&paths),
        ActionKind::MoveTo(dest) => cleaner.relocate_many(&paths, &dest),
    }
}
