use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use crate::error::{FsError, Result};
use crate::file::ignore::{IgnoreCache, IgnorePatternSet};
use crate::file::modify::replace_in_file::replace_unique;
use crate::file::resolver::{Resolver, ValidatedPath};
use crate::file::search::list_files::{list_files, FileGlob};
use crate::file::search::search_files::{search_files, GrepLimits, GrepQuery, GrepResult};
use crate::file::tracker::{modification_time, modified_secs, ReadTracker};
use crate::settings::Filesystem;

/// The sandboxed file layer for a single project root.
///
/// Every operation resolves its path through the [`Resolver`] first. Reads
/// feed the [`ReadTracker`]; writes and edits are gated by it and refresh it
/// afterwards. The type is `Sync`, so one instance can serve concurrent
/// callers.
#[derive(Debug)]
pub struct ProjectFilesystem {
    resolver: Resolver,
    settings: Filesystem,
    tracker: ReadTracker,
    ignore_cache: Arc<IgnoreCache>,
    // Held across gate, mutation and refresh for writes and edits.
    mutation: Mutex<()>,
}

impl ProjectFilesystem {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        Self::with_settings(root, Filesystem::default())
    }

    pub fn with_settings(root: impl AsRef<Path>, settings: Filesystem) -> Result<Self> {
        let resolver = Resolver::new(root.as_ref())?;
        debug!(root = %resolver.root().display(), "Opened project root");
        Ok(Self {
            resolver,
            settings,
            tracker: ReadTracker::new(),
            ignore_cache: IgnoreCache::global(),
            mutation: Mutex::new(()),
        })
    }

    /// Use a private ignore cache instead of the process-wide one.
    pub fn with_ignore_cache(mut self, cache: Arc<IgnoreCache>) -> Self {
        self.ignore_cache = cache;
        self
    }

    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    pub fn settings(&self) -> &Filesystem {
        &self.settings
    }

    pub fn validate(&self, path: &str) -> Result<ValidatedPath> {
        self.resolver.resolve_path(path)
    }

    pub fn ignore_set(&self) -> Arc<IgnorePatternSet> {
        self.ignore_cache
            .get_or_load(self.resolver.root(), &self.settings.ignore_file)
    }

    /// Root-relative paths of every file in the project, optionally filtered
    /// by a glob. Ignored files are dropped unless `include_ignored` is set.
    pub fn list_files(&self, glob: Option<&str>, include_ignored: bool) -> Result<Vec<String>> {
        let glob = glob
            .filter(|pattern| !pattern.is_empty())
            .map(FileGlob::new)
            .transpose()?;

        let ignore = (!include_ignored).then(|| self.ignore_set());
        let files = list_files(self.resolver.root(), glob.as_ref(), ignore.as_deref());
        debug!(
            glob = glob.as_ref().map(FileGlob::pattern),
            include_ignored,
            count = files.len(),
            "Listed files"
        );
        Ok(files)
    }

    /// Reads a text file and marks it as seen.
    ///
    /// `line_offset` is zero based. `count` of `None` or zero means "to the
    /// end". An offset past the last line yields an empty string.
    pub fn read_file(&self, path: &str, line_offset: usize, count: Option<usize>) -> Result<String> {
        let path = self.validate(path)?;
        let metadata = fs::metadata(&path).map_err(|e| FsError::io(path.as_path(), e))?;

        if metadata.len() > self.settings.max_file_size {
            return Err(FsError::TooLarge {
                path: path.into_path_buf(),
                size: metadata.len(),
                max: self.settings.max_file_size,
            });
        }
        if !metadata.is_file() {
            return Err(FsError::NotAFile(path.into_path_buf()));
        }

        let bytes = fs::read(&path).map_err(|e| FsError::io(path.as_path(), e))?;
        let Ok(content) = String::from_utf8(bytes) else {
            return Err(FsError::NotText(path.into_path_buf()));
        };

        let modified = modified_secs(&metadata).map_err(|e| FsError::io(path.as_path(), e))?;
        self.tracker.record(&path, modified);

        Ok(slice_lines(content, line_offset, count.unwrap_or(0)))
    }

    /// Replaces the whole file. Existing files must have been read first and
    /// be unchanged since; new files (and missing parent directories) are
    /// created.
    pub fn write_file(&self, path: &str, content: &str) -> Result<ValidatedPath> {
        let path = self.validate(path)?;
        let _guard = self.lock_mutations();

        self.tracker.check(&path, true)?;

        if let Some(parent) = path.as_path().parent() {
            fs::create_dir_all(parent).map_err(|e| FsError::io(parent, e))?;
        }
        fs::write(&path, content).map_err(|e| FsError::io(path.as_path(), e))?;
        self.tracker.record(&path, modification_time(path.as_path())?);

        info!(%path, bytes = content.len(), "Wrote file");
        Ok(path)
    }

    /// Swaps the single occurrence of `old` for `new`. The file must exist,
    /// have been read, and be unchanged since.
    pub fn edit_file(&self, path: &str, old: &str, new: &str) -> Result<ValidatedPath> {
        let path = self.validate(path)?;
        let _guard = self.lock_mutations();

        self.tracker.check(&path, false)?;

        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => FsError::NotText(path.as_path().to_path_buf()),
            _ => FsError::io(path.as_path(), e),
        })?;
        let updated = replace_unique(&content, old, new)?;

        fs::write(&path, updated).map_err(|e| FsError::io(path.as_path(), e))?;
        self.tracker.record(&path, modification_time(path.as_path())?);

        info!(%path, "Edited file");
        Ok(path)
    }

    /// Line search across the project. An explicit glob in the query
    /// replaces ignore filtering.
    pub fn grep(&self, query: &GrepQuery) -> Result<Vec<GrepResult>> {
        let mut query = query.clone();
        if query.glob.as_deref().is_some_and(str::is_empty) {
            query.glob = None;
        }

        let ignore = self.ignore_set();
        let limits = GrepLimits {
            max_line_length: self.settings.max_line_length,
            max_file_size: self.settings.max_search_file_size,
        };
        search_files(self.resolver.root(), &query, &ignore, limits)
    }

    /// Root-relative form of a validated path, for messages.
    pub fn display_path(&self, path: &ValidatedPath) -> String {
        self.resolver
            .relative(path.as_path())
            .unwrap_or_else(|| path.to_string())
    }

    fn lock_mutations(&self) -> std::sync::MutexGuard<'_, ()> {
        self.mutation.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn slice_lines(content: String, line_offset: usize, count: usize) -> String {
    if line_offset == 0 && count == 0 {
        return content;
    }

    let lines: Vec<&str> = content.split('\n').collect();
    if line_offset >= lines.len() {
        return String::new();
    }

    let end = match count {
        0 => lines.len(),
        n => line_offset.saturating_add(n).min(lines.len()),
    };
    lines[line_offset..end].join("\n")
}
