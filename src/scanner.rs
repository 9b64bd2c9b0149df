use crate::entry::FileEntry;
use crate::error::{CleanupError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Entry cap applied by `scan_folder`.
pub const MAX_ENTRIES: usize = 50_000;

/// Output of one traversal. Never mutated after it is returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// The root exactly as the caller gave it.
    pub scan_path: String,
    /// Discovery order.
    pub entries: Vec<FileEntry>,
    pub total_count: usize,
    pub total_size: u64,
    /// The cap was hit; totals are lower bounds.
    pub limited: bool,
    pub max_entries: usize,
    /// Entries or directories that could not be read and were left out.
    pub skipped: usize,
}

/// Walk `root` and record at most `max_entries` entries.
pub fn walk(root: &Path, max_entries: usize) -> Result<ScanResult> {
    walk_with_progress(root, max_entries, |_| {})
}

/// Same as [`walk`], calling `on_entry` for every recorded entry.
pub fn walk_with_progress<F>(
    root: &Path,
    max_entries: usize,
    mut on_entry: F,
) -> Result<ScanResult>
where
    F: FnMut(&FileEntry),
{
    check_root(root)?;
    let start = std::path::absolute(root).map_err(|e| CleanupError::from_io(root, e))?;

    let mut entries: Vec<FileEntry> = Vec::new();
    let mut total_size: u64 = 0;
    let mut skipped = 0usize;
    let mut limited = false;

    let walker = WalkDir::new(&start)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for item in walker {
        // Past the cap only a real entry proves the walk was cut short; errors
        // from there on belong to the unscanned part of the tree.
        if entries.len() >= max_entries {
            if item.is_ok() {
                limited = true;
                break;
            }
            continue;
        }

        let dir_entry = match item {
            Ok(e) => e,
            Err(err) => {
                debug!(path = ?err.path(), error = %err, "skipping unreadable entry");
                skipped += 1;
                continue;
            }
        };

        let path = dir_entry.path();
        let extracted = dir_entry
            .metadata()
            .map_err(|e| CleanupError::from_metadata(path, io::Error::from(e)))
            .and_then(|meta| FileEntry::from_metadata(path, &meta));

        match extracted {
            Ok(entry) => {
                total_size += entry.size;
                on_entry(&entry);
                entries.push(entry);
            }
            Err(err) => {
                debug!(path = %path.display(), error = %err, "skipping entry");
                skipped += 1;
            }
        }
    }

    if limited {
        warn!(
            root = %root.display(),
            max_entries,
            "entry cap reached, scan is incomplete"
        );
    }
    info!(
        root = %root.display(),
        entries = entries.len(),
        total_size,
        skipped,
        "scan finished"
    );

    Ok(ScanResult {
        scan_path: root.to_string_lossy().into_owned(),
        total_count: entries.len(),
        total_size,
        entries,
        limited,
        max_entries,
        skipped,
    })
}

fn check_root(root: &Path) -> Result<()> {
    let metadata = fs::metadata(root).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => CleanupError::RootNotFound(root.to_path_buf()),
        _ => CleanupError::from_io(root, e),
    })?;

    if !metadata.is_dir() {
        return Err(CleanupError::RootNotADirectory(root.to_path_buf()));
    }

    // An unlistable root would otherwise show up as an empty scan.
    fs::read_dir(root).map_err(|e| CleanupError::from_io(root, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use std::collections::HashSet;

    fn populate(root: &Path, files: usize) {
        for i in 0..files {
            fs::write(root.join(format!("f{i:03}.dat")), b"abc").unwrap();
        }
    }

    #[test]
    fn counts_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), vec![0u8; 100]).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b.log"), vec![0u8; 200]).unwrap();

        let result = walk(dir.path(), 100).unwrap();
        assert_eq!(result.total_count, 3);
        assert_eq!(result.total_size, 300);
        assert!(!result.limited);
        assert_eq!(result.max_entries, 100);
        assert_eq!(result.skipped, 0);
        assert_eq!(result.scan_path, dir.path().to_string_lossy().into_owned());

        let names: Vec<&str> = result.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "sub", "b.log"]);
    }

    #[test]
    fn exactly_at_cap_is_not_limited() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), 5);

        let result = walk(dir.path(), 5).unwrap();
        assert_eq!(result.total_count, 5);
        assert!(!result.limited);
    }

    #[test]
    fn stops_at_cap() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), 4);
        fs::create_dir(dir.path().join("nested")).unwrap();
        populate(&dir.path().join("nested"), 10);

        let result = walk(dir.path(), 7).unwrap();
        assert_eq!(result.entries.len(), 7);
        assert_eq!(result.total_count, 7);
        assert!(result.limited);
        assert_eq!(result.max_entries, 7);
    }

    #[test]
    fn paths_are_unique_and_absolute() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), 3);
        fs::create_dir_all(dir.path().join("x/y")).unwrap();
        populate(&dir.path().join("x/y"), 3);

        let result = walk(dir.path(), MAX_ENTRIES).unwrap();
        let unique: HashSet<&str> = result.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(unique.len(), result.entries.len());
        assert!(result.entries.iter().all(|e| Path::new(&e.path).is_absolute()));
    }

    #[test]
    fn repeated_scans_are_identical() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), 6);
        fs::create_dir(dir.path().join("m")).unwrap();
        populate(&dir.path().join("m"), 6);

        // Directory access times may move between scans, so compare the shape only.
        let shape = |r: &ScanResult| -> Vec<(String, u64, bool)> {
            r.entries
                .iter()
                .map(|e| (e.path.clone(), e.size, e.is_directory))
                .collect()
        };
        let first = walk(dir.path(), 9).unwrap();
        let second = walk(dir.path(), 9).unwrap();
        assert_eq!(shape(&first), shape(&second));
        assert_eq!(first.limited, second.limited);
    }

    #[test]
    fn rejects_bad_roots() {
        let dir = tempfile::tempdir().unwrap();
        let err = walk(&dir.path().join("missing"), 10).unwrap_err();
        assert_eq!(err.kind(), FailureKind::RootNotFound);

        let file = dir.path().join("plain.txt");
        fs::write(&file, b"x").unwrap();
        let err = walk(&file, 10).unwrap_err();
        assert_eq!(err.kind(), FailureKind::RootNotADirectory);
    }

    #[test]
    fn progress_sees_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), 4);

        let mut seen = 0;
        let result = walk_with_progress(dir.path(), 10, |_| seen += 1).unwrap();
        assert_eq!(seen, result.total_count);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_names_are_skipped_not_merged() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"a\xff.txt")), b"1").unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"a\xfe.txt")), b"2").unwrap();
        fs::write(dir.path().join("plain.txt"), b"3").unwrap();

        let result = walk(dir.path(), 100).unwrap();
        assert_eq!(result.total_count, 1);
        assert_eq!(result.skipped, 2);
        assert_eq!(result.entries[0].name, "plain.txt");

        // every recorded path can be handed back to the cleaner
        let cleaner = crate::cleaner::Cleaner::with_trash(crate::cleaner::NoTrash);
        cleaner.delete(Path::new(&result.entries[0].path)).unwrap();
    }

    /// Lock `dir` with mode 000. Returns false when the process can still
    /// list it (privileged user), in which case the caller has nothing to check.
    #[cfg(unix)]
    fn lock_out(dir: &Path) -> bool {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(dir, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(dir).is_ok() {
            unlock(dir);
            return false;
        }
        true
    }

    #[cfg(unix)]
    fn unlock(dir: &Path) {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_is_recorded_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("hidden.txt"), b"h").unwrap();
        fs::write(dir.path().join("z.txt"), b"z").unwrap();
        if !lock_out(&locked) {
            return;
        }

        let result = walk(dir.path(), 100);
        unlock(&locked);
        let result = result.unwrap();

        let names: Vec<&str> = result.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "locked", "z.txt"]);
        assert!(result.skipped >= 1);
        assert!(!result.limited);
    }

    #[cfg(unix)]
    #[test]
    fn errors_past_the_cap_are_not_counted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        if !lock_out(&locked) {
            return;
        }

        // "locked" is the last recorded entry; its listing error comes after the cap
        let result = walk(dir.path(), 2);
        unlock(&locked);
        let result = result.unwrap();

        assert_eq!(result.total_count, 2);
        assert_eq!(result.skipped, 0);
        assert!(!result.limited);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        populate(&dir.path().join("real"), 2);
        std::os::unix::fs::symlink(dir.path(), dir.path().join("real/loop")).unwrap();

        let result = walk(dir.path(), 100).unwrap();
        // real, real/f000.dat, real/f001.dat, real/loop
        assert_eq!(result.total_count, 4);
        let link = result.entries.iter().find(|e| e.name == "loop").unwrap();
        assert!(!link.is_directory);
    }
}
