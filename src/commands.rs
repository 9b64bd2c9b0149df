//! The command surface a shell calls into. Each call is synchronous and
//! blocking; run it off any interactive thread.

use crate::cleaner::Cleaner;
use crate::error::Result;
use crate::scanner::{self, MAX_ENTRIES, ScanResult};
use std::path::Path;

/// Scan `path` with the engine's fixed entry cap.
pub fn scan_folder(path: &str) -> Result<ScanResult> {
    scanner::walk(Path::new(path), MAX_ENTRIES)
}

/// Permanently delete one path.
pub fn delete_file(path: &str) -> Result<()> {
    Cleaner::new().delete(Path::new(path))
}

/// Move one path to the system trash.
pub fn move_to_trash(path: &str) -> Result<()> {
    Cleaner::new().trash(Path::new(path))
}

/// Move one path to an exact new location.
pub fn move_file(from: &str, to: &str) -> Result<()> {
    Cleaner::new().move_to(Path::new(from), Path::new(to))
}
