//! Read-before-write bookkeeping.
//!
//! Every successful read records the file's modification time. Writes and
//! edits are refused for files that were never read, or whose modification
//! time moved past the recorded one (someone else changed the file).

use std::collections::HashMap;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::UNIX_EPOCH;

use tracing::debug;

use super::resolver::ValidatedPath;
use crate::error::{FsError, Result};

/// Modification time in whole seconds since the epoch.
pub fn modified_secs(metadata: &Metadata) -> io::Result<i64> {
    let modified = metadata.modified()?;
    Ok(match modified.duration_since(UNIX_EPOCH) {
        Ok(since) => since.as_secs() as i64,
        Err(before) => -(before.duration().as_secs() as i64),
    })
}

pub fn modification_time(path: &Path) -> Result<i64> {
    let metadata = fs::metadata(path).map_err(|e| FsError::io(path, e))?;
    modified_secs(&metadata).map_err(|e| FsError::io(path, e))
}

/// Per-instance table of read timestamps. Entries never expire.
#[derive(Debug, Default)]
pub struct ReadTracker {
    timestamps: Mutex<HashMap<PathBuf, i64>>,
}

impl ReadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, path: &ValidatedPath, modified: i64) {
        self.timestamps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.as_path().to_path_buf(), modified);
    }

    pub fn last_read(&self, path: &ValidatedPath) -> Option<i64> {
        self.timestamps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path.as_path())
            .copied()
    }

    /// Staleness gate. With `allow_missing`, a target that does not exist yet
    /// passes regardless of tracking.
    pub fn check(&self, path: &ValidatedPath, allow_missing: bool) -> Result<()> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound && allow_missing => return Ok(()),
            Err(e) => return Err(FsError::io(path.as_path(), e)),
        };

        let Some(last_read) = self.last_read(path) else {
            return Err(FsError::NotTracked(path.as_path().to_path_buf()));
        };

        let current = modified_secs(&metadata).map_err(|e| FsError::io(path.as_path(), e))?;
        if current > last_read {
            debug!(%path, current, last_read, "File changed since last read");
            return Err(FsError::Stale(path.as_path().to_path_buf()));
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.timestamps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::resolver::Resolver;
    use std::time::{Duration, SystemTime};

    fn bump_mtime(path: &Path, secs: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn test_untracked_existing_file_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        let resolver = Resolver::new(temp.path()).unwrap();
        let tracker = ReadTracker::new();
        let path = resolver.resolve_path("a.txt").unwrap();

        let err = tracker.check(&path, true).unwrap_err();
        assert!(matches!(err, FsError::NotTracked(_)));
    }

    #[test]
    fn test_missing_file_only_passes_when_allowed() {
        let temp = tempfile::tempdir().unwrap();
        let resolver = Resolver::new(temp.path()).unwrap();
        let tracker = ReadTracker::new();
        let path = resolver.resolve_path("new.txt").unwrap();

        tracker.check(&path, true).unwrap();
        let err = tracker.check(&path, false).unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
    }

    #[test]
    fn test_fresh_then_stale() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "a").unwrap();
        let resolver = Resolver::new(temp.path()).unwrap();
        let tracker = ReadTracker::new();
        let path = resolver.resolve_path("a.txt").unwrap();

        tracker.record(&path, modification_time(&file).unwrap());
        tracker.check(&path, false).unwrap();

        bump_mtime(&file, 10);
        let err = tracker.check(&path, false).unwrap_err();
        assert!(matches!(err, FsError::Stale(_)));

        tracker.record(&path, modification_time(&file).unwrap());
        tracker.check(&path, false).unwrap();
        assert_eq!(tracker.len(), 1);
    }
}
