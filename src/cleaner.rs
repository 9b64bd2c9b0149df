use crate::error::{CleanupError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A platform's recoverable deletion store.
pub trait TrashStore {
    fn is_available(&self) -> bool;

    /// Move `path` into the store. Must never fall back to a permanent delete.
    fn send(&self, path: &Path) -> Result<()>;
}

/// The operating system's trash or recycle bin.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTrash;

#[cfg(any(
    windows,
    target_os = "macos",
    all(unix, not(any(target_os = "ios", target_os = "android")))
))]
impl TrashStore for SystemTrash {
    fn is_available(&self) -> bool {
        true
    }

    fn send(&self, path: &Path) -> Result<()> {
        trash::delete(path).map_err(|e| trash_error(path, e))
    }
}

#[cfg(not(any(
    windows,
    target_os = "macos",
    all(unix, not(any(target_os = "ios", target_os = "android")))
)))]
impl TrashStore for SystemTrash {
    fn is_available(&self) -> bool {
        false
    }

    fn send(&self, _path: &Path) -> Result<()> {
        Err(CleanupError::TrashUnavailable)
    }
}

#[cfg(any(
    windows,
    target_os = "macos",
    all(unix, not(any(target_os = "ios", target_os = "android")))
))]
fn trash_error(path: &Path, err: trash::Error) -> CleanupError {
    match err {
        #[cfg(all(unix, not(any(target_os = "macos", target_os = "ios", target_os = "android"))))]
        trash::Error::FileSystem { source, .. } => CleanupError::from_io(path, source),
        other => CleanupError::Trash {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

/// A store that is never there. Trash requests always fail with
/// `TrashUnavailable`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTrash;

impl TrashStore for NoTrash {
    fn is_available(&self) -> bool {
        false
    }

    fn send(&self, _path: &Path) -> Result<()> {
        Err(CleanupError::TrashUnavailable)
    }
}

/// Result of a bulk operation, in the order the paths were attempted.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, CleanupError)>,
}

impl BatchOutcome {
    fn record(&mut self, path: PathBuf, result: Result<()>) {
        match result {
            Ok(()) => self.succeeded.push(path),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "operation failed");
                self.failed.push((path, err));
            }
        }
    }

    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// Failures other than `NotFound`.
    pub fn hard_failures(&self) -> impl Iterator<Item = &(PathBuf, CleanupError)> {
        self.failed.iter().filter(|(_, e)| !e.is_not_found())
    }

    /// Paths that no longer exist at their old location: everything that
    /// succeeded plus everything that was already gone.
    pub fn gone(&self) -> impl Iterator<Item = &Path> {
        self.succeeded.iter().map(PathBuf::as_path).chain(
            self.failed
                .iter()
                .filter(|(_, e)| e.is_not_found())
                .map(|(p, _)| p.as_path()),
        )
    }
}

/// Performs destructive operations on exactly the paths it is given.
#[derive(Debug, Clone, Default)]
pub struct Cleaner<T = SystemTrash> {
    trash: T,
}

impl Cleaner<SystemTrash> {
    pub fn new() -> Self {
        Self { trash: SystemTrash }
    }
}

impl<T: TrashStore> Cleaner<T> {
    pub fn with_trash(trash: T) -> Self {
        Self { trash }
    }

    pub fn trash_available(&self) -> bool {
        self.trash.is_available()
    }

    /// Permanently remove `path`. Directories go with their contents;
    /// symlinks are removed, never their targets.
    pub fn delete(&self, path: &Path) -> Result<()> {
        let metadata = fs::symlink_metadata(path).map_err(|e| CleanupError::from_io(path, e))?;

        let removed = if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        removed.map_err(|e| CleanupError::from_io(path, e))?;

        info!(path = %path.display(), "deleted");
        Ok(())
    }

    /// Move `path` to the trash store, or fail with `TrashUnavailable`.
    pub fn trash(&self, path: &Path) -> Result<()> {
        if !self.trash.is_available() {
            return Err(CleanupError::TrashUnavailable);
        }
        fs::symlink_metadata(path).map_err(|e| CleanupError::from_io(path, e))?;
        // The freedesktop store writes its placeholder before it tries the
        // rename, so a locked parent would leave an orphan behind.
        if cfg!(unix) && parent_is_read_only(path) {
            return Err(CleanupError::PermissionDenied(path.to_path_buf()));
        }

        self.trash.send(path)?;
        info!(path = %path.display(), "moved to trash");
        Ok(())
    }

    /// Move `path` to exactly `target`, creating missing parent directories.
    /// An existing `target` is never overwritten.
    pub fn move_to(&self, path: &Path, target: &Path) -> Result<()> {
        let metadata = fs::symlink_metadata(path).map_err(|e| CleanupError::from_io(path, e))?;

        if fs::symlink_metadata(target).is_ok() {
            return Err(CleanupError::AlreadyExists(target.to_path_buf()));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| CleanupError::from_io(parent, e))?;
        }

        match fs::rename(path, target) {
            Ok(()) => {}
            // rename cannot cross filesystems; plain files can be copied instead
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices && metadata.is_file() => {
                fs::copy(path, target).map_err(|e| CleanupError::from_io(target, e))?;
                fs::remove_file(path).map_err(|e| CleanupError::from_io(path, e))?;
            }
            Err(e) => return Err(CleanupError::from_io(path, e)),
        }

        info!(from = %path.display(), to = %target.display(), "moved");
        Ok(())
    }

    /// Move `path` into `dest_dir`, keeping its name. Returns the new location.
    pub fn relocate(&self, path: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let name = path
            .file_name()
            .ok_or_else(|| CleanupError::NotFound(path.to_path_buf()))?;
        let target = dest_dir.join(name);
        self.move_to(path, &target)?;
        Ok(target)
    }

    pub fn delete_many<I, P>(&self, paths: I) -> BatchOutcome
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.run_batch(paths, |p| self.delete(p))
    }

    pub fn trash_many<I, P>(&self, paths: I) -> BatchOutcome
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.run_batch(paths, |p| self.trash(p))
    }

    pub fn relocate_many<I, P>(&self, paths: I, dest_dir: &Path) -> BatchOutcome
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.run_batch(paths, |p| self.relocate(p, dest_dir).map(|_| ()))
    }

    fn run_batch<I, P, F>(&self, paths: I, op: F) -> BatchOutcome
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
        F: Fn(&Path) -> Result<()>,
    {
        let mut outcome = BatchOutcome::default();
        for path in paths {
            let path = path.as_ref();
            outcome.record(path.to_path_buf(), op(path));
        }
        info!(
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "batch finished"
        );
        outcome
    }
}

fn parent_is_read_only(path: &Path) -> bool {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::metadata(parent)
        .map(|m| m.permissions().readonly())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use std::cell::RefCell;

    /// Always available; remembers what it was asked to take.
    #[derive(Default)]
    struct RecordingTrash {
        sent: RefCell<Vec<PathBuf>>,
    }

    impl TrashStore for RecordingTrash {
        fn is_available(&self) -> bool {
            true
        }

        fn send(&self, path: &Path) -> Result<()> {
            self.sent.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn deletes_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("old.txt");
        fs::write(&file, b"bye").unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir_all(sub.join("deeper")).unwrap();
        fs::write(sub.join("deeper/x.bin"), b"x").unwrap();

        let cleaner = Cleaner::with_trash(NoTrash);
        cleaner.delete(&file).unwrap();
        cleaner.delete(&sub).unwrap();
        assert!(!file.exists());
        assert!(!sub.exists());
    }

    #[test]
    fn deleting_twice_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("once.txt");
        fs::write(&file, b"1").unwrap();

        let cleaner = Cleaner::with_trash(NoTrash);
        cleaner.delete(&file).unwrap();
        let err = cleaner.delete(&file).unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotFound);
    }

    #[test]
    fn batch_keeps_going_after_failures() {
        let dir = tempfile::tempdir().unwrap();
        let p1 = dir.path().join("p1");
        let p2 = dir.path().join("p2");
        let p3 = dir.path().join("p3");
        fs::write(&p1, b"1").unwrap();
        fs::write(&p3, b"3").unwrap();

        let outcome = Cleaner::with_trash(NoTrash).delete_many([&p1, &p2, &p3]);
        assert_eq!(outcome.succeeded, vec![p1.clone(), p3.clone()]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, p2);
        assert_eq!(outcome.failed[0].1.kind(), FailureKind::NotFound);
        assert_eq!(outcome.attempted(), 3);
        assert_eq!(outcome.hard_failures().count(), 0);
        assert_eq!(outcome.gone().count(), 3);
    }

    #[test]
    fn trash_without_store_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("keep.txt");
        fs::write(&file, b"precious").unwrap();

        let cleaner = Cleaner::with_trash(NoTrash);
        assert!(!cleaner.trash_available());
        let err = cleaner.trash(&file).unwrap_err();
        assert_eq!(err.kind(), FailureKind::TrashUnavailable);
        assert_eq!(fs::read(&file).unwrap(), b"precious");

        let outcome = cleaner.trash_many([&file]);
        assert!(outcome.succeeded.is_empty());
        assert_eq!(outcome.failed[0].1.kind(), FailureKind::TrashUnavailable);
        assert_eq!(outcome.hard_failures().count(), 1);
    }

    #[test]
    fn relocates_into_destination() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.pdf");
        fs::write(&file, b"pdf").unwrap();
        let archive = dir.path().join("archive/2019");

        let cleaner = Cleaner::with_trash(NoTrash);
        let moved = cleaner.relocate(&file, &archive).unwrap();
        assert_eq!(moved, archive.join("report.pdf"));
        assert!(!file.exists());
        assert_eq!(fs::read(&moved).unwrap(), b"pdf");
    }

    #[test]
    fn relocate_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"new").unwrap();
        let dest = dir.path().join("dest");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("a.txt"), b"old").unwrap();

        let outcome = Cleaner::with_trash(NoTrash).relocate_many([&file], &dest);
        assert_eq!(outcome.failed[0].1.kind(), FailureKind::AlreadyExists);
        assert_eq!(fs::read(dest.join("a.txt")).unwrap(), b"old");
        assert!(file.exists());
    }

    #[test]
    fn trash_hands_existing_paths_to_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("old.txt");
        fs::write(&file, b"x").unwrap();
        let missing = dir.path().join("missing.txt");

        let cleaner = Cleaner::with_trash(RecordingTrash::default());
        let outcome = cleaner.trash_many([&file, &missing]);
        assert_eq!(outcome.succeeded, vec![file.clone()]);
        assert!(outcome.failed[0].1.is_not_found());
        assert_eq!(*cleaner.trash.sent.borrow(), vec![file]);
    }

    #[cfg(unix)]
    #[test]
    fn trash_refuses_read_only_parent_before_the_store() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        let file = locked.join("keep.txt");
        fs::write(&file, b"precious").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        let cleaner = Cleaner::with_trash(RecordingTrash::default());
        let result = cleaner.trash(&file);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(result.unwrap_err().kind(), FailureKind::PermissionDenied);
        assert!(cleaner.trash.sent.borrow().is_empty());
        assert_eq!(fs::read(&file).unwrap(), b"precious");
    }

    #[cfg(unix)]
    #[test]
    fn deleting_a_symlink_keeps_its_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("real");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("inner.txt"), b"x").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        Cleaner::with_trash(NoTrash).delete(&link).unwrap();
        assert!(fs::symlink_metadata(&link).is_err());
        assert!(target.join("inner.txt").exists());
    }
}
