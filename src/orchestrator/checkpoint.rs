use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::errors::CheckpointError;

/// Persists the path of the last package whose pipeline fully succeeded.
///
/// The file holds a single line. Reads never fail: a missing, unreadable or
/// blank file means "no checkpoint".
pub struct CheckpointStore {
    checkpoint_file: PathBuf,
}

impl CheckpointStore {
    pub fn new(checkpoint_file: PathBuf) -> Self {
        Self { checkpoint_file }
    }

    pub fn path(&self) -> &Path {
        &self.checkpoint_file
    }

    pub fn load(&self) -> Option<PathBuf> {
        match self.try_load() {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable checkpoint");
                None
            }
        }
    }

    /// Like [`Self::load`] but reports read errors instead of swallowing them.
    pub fn try_load(&self) -> Result<Option<PathBuf>, CheckpointError> {
        if !self.checkpoint_file.exists() {
            return Ok(None);
        }
        let content = std::fs::read(&self.checkpoint_file).map_err(|source| {
            CheckpointError::ReadFailed {
                path: self.checkpoint_file.clone(),
                source,
            }
        })?;
        let line = content
            .split(|b| *b == b'\n')
            .next()
            .unwrap_or_default()
            .trim_ascii();
        if line.is_empty() {
            Ok(None)
        } else {
            Ok(Some(path_from_bytes(line)))
        }
    }

    /// Replace the stored checkpoint atomically.
    pub fn save(&self, checkpoint: &Path) -> Result<(), CheckpointError> {
        let write_err = |source| CheckpointError::WriteFailed {
            path: self.checkpoint_file.clone(),
            source,
        };

        let dir = match self.checkpoint_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(write_err)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&path_to_bytes(checkpoint))
            .and_then(|_| tmp.write_all(b"\n"))
            .map_err(write_err)?;
        tmp.persist(&self.checkpoint_file)
            .map_err(|e| write_err(e.error))?;

        tracing::debug!(file = %self.checkpoint_file.display(), checkpoint = %checkpoint.display(), "checkpoint saved");
        Ok(())
    }

    /// Write the checkpoint if there is one; `None` leaves the file untouched.
    pub fn persist(&self, checkpoint: Option<&Path>) -> Result<bool, CheckpointError> {
        match checkpoint {
            Some(path) => self.save(path).map(|_| true),
            None => Ok(false),
        }
    }

    /// Remove the checkpoint file. Returns whether a file was removed.
    pub fn clear(&self) -> Result<bool, CheckpointError> {
        if !self.checkpoint_file.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.checkpoint_file).map_err(|source| {
            CheckpointError::RemoveFailed {
                path: self.checkpoint_file.clone(),
                source,
            }
        })?;
        Ok(true)
    }
}

// The file stores the raw path bytes so non-UTF-8 package directories
// round-trip exactly.
#[cfg(unix)]
fn path_to_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_to_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_store() -> (CheckpointStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.txt");
        (CheckpointStore::new(path), dir)
    }

    #[test]
    fn test_missing_file_is_no_checkpoint() {
        let (store, _dir) = make_store();
        assert!(store.load().is_none());
        assert!(store.try_load().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let (store, _dir) = make_store();
        let pkg = Path::new("/repo/sdk/compute/Azure.ResourceManager.Compute");
        store.save(pkg).unwrap();
        assert_eq!(store.load().as_deref(), Some(pkg));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw.lines().count(), 1);
    }

    #[test]
    fn test_save_overwrites_previous_value() {
        let (store, _dir) = make_store();
        store.save(Path::new("/repo/sdk/a/Foo")).unwrap();
        store.save(Path::new("/repo/sdk/b/Bar")).unwrap();
        assert_eq!(store.load().as_deref(), Some(Path::new("/repo/sdk/b/Bar")));
    }

    #[test]
    fn test_load_trims_whitespace() {
        let (store, _dir) = make_store();
        std::fs::write(store.path(), "  /repo/sdk/a/Foo \r\n").unwrap();
        assert_eq!(store.load().as_deref(), Some(Path::new("/repo/sdk/a/Foo")));
    }

    #[test]
    fn test_blank_file_is_no_checkpoint() {
        let (store, _dir) = make_store();
        std::fs::write(store.path(), "\n\n").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_unreadable_file_is_no_checkpoint() {
        let dir = tempdir().unwrap();
        // A directory cannot be read as a file.
        let store = CheckpointStore::new(dir.path().to_path_buf());
        assert!(store.try_load().is_err());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("state/regen/progress.txt"));
        store.save(Path::new("/repo/sdk/a/Foo")).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_save_failure_is_reported() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let store = CheckpointStore::new(blocker.join("progress.txt"));
        let err = store.save(Path::new("/repo/sdk/a/Foo")).unwrap_err();
        assert!(matches!(err, CheckpointError::WriteFailed { .. }));
    }

    #[test]
    fn test_persist_none_leaves_file_untouched() {
        let (store, _dir) = make_store();
        store.save(Path::new("/repo/sdk/a/Foo")).unwrap();
        assert!(!store.persist(None).unwrap());
        assert_eq!(store.load().as_deref(), Some(Path::new("/repo/sdk/a/Foo")));
    }

    #[test]
    fn test_clear_removes_file() {
        let (store, _dir) = make_store();
        assert!(!store.clear().unwrap());
        store.save(Path::new("/repo/sdk/a/Foo")).unwrap();
        assert!(store.clear().unwrap());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_recovery_after_restart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.txt");
        {
            let store = CheckpointStore::new(path.clone());
            store.save(Path::new("/repo/sdk/a/Foo")).unwrap();
        }
        {
            let store = CheckpointStore::new(path);
            assert_eq!(store.load().as_deref(), Some(Path::new("/repo/sdk/a/Foo")));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_round_trips() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (store, _dir) = make_store();
        let pkg = Path::new(OsStr::from_bytes(b"/repo/sdk/a/Azure.ResourceManager.\xffFoo"));
        store.save(pkg).unwrap();
        assert_eq!(store.try_load().unwrap().as_deref(), Some(pkg));
    }
}
