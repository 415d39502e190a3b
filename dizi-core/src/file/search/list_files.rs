use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};

use super::walk_project;
use crate::error::{FsError, Result};
use crate::file::ignore::IgnorePatternSet;

/// Caller supplied listing filter.
///
/// `**/x` patterns also get a secondary matcher with the prefix stripped so
/// root level files match. Patterns with no `/` only match files at the root:
/// `*.go` and `**.go` list `main.go` but not `src/utils.go`, even though the
/// glob's `*` would cross separators. A bare `**` still matches everything.
#[derive(Debug, Clone)]
pub struct FileGlob {
    pattern: String,
    primary: GlobMatcher,
    secondary: Option<GlobMatcher>,
    root_only: bool,
}

impl FileGlob {
    pub fn new(pattern: &str) -> Result<Self> {
        let primary = compile(pattern)?;
        let secondary = pattern
            .strip_prefix("**/")
            .and_then(|rest| compile(rest).ok());
        // A `**` not next to `/` compiles as a plain `*`.
        let root_only = !pattern.contains('/') && pattern != "**";

        Ok(Self {
            pattern: pattern.to_string(),
            primary,
            secondary,
            root_only,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, relative: &str) -> bool {
        let matched = self.primary.is_match(relative)
            || self
                .secondary
                .as_ref()
                .is_some_and(|m| m.is_match(relative));

        matched && !(self.root_only && relative.contains('/'))
    }
}

pub(crate) fn compile(pattern: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(pattern)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| FsError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Lists every file under `root` as a root-relative path, in walk order.
/// `ignore` is `None` when ignored files should be included.
pub fn list_files(
    root: &Path,
    glob: Option<&FileGlob>,
    ignore: Option<&IgnorePatternSet>,
) -> Vec<String> {
    walk_project(root)
        .map(|file| file.relative)
        .filter(|relative| glob.map_or(true, |g| g.is_match(relative)))
        .filter(|relative| ignore.map_or(true, |set| !set.is_ignored(relative)))
        .collect()
}
