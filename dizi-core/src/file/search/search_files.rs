use std::path::Path;

use globset::GlobMatcher;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::list_files::compile;
use super::walk_project;
use crate::error::Result;
use crate::file::ignore::IgnorePatternSet;

/// One matching line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrepResult {
    /// Root-relative path of the file.
    pub path: String,
    /// 1-based line number.
    pub line: usize,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct GrepQuery {
    pub pattern: String,
    pub glob: Option<String>,
    pub case_sensitive: bool,
    pub max_results: usize,
}

impl GrepQuery {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            glob: None,
            case_sensitive: false,
            max_results: 100,
        }
    }

    pub fn with_glob(mut self, glob: impl Into<String>) -> Self {
        self.glob = Some(glob.into());
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

/// Per-search limits taken from settings.
#[derive(Debug, Clone, Copy)]
pub struct GrepLimits {
    pub max_line_length: usize,
    pub max_file_size: u64,
}

enum LineMatcher {
    Regex(Regex),
    // Used when the pattern is not a valid regex.
    Literal { needle: String, fold_case: bool },
}

impl LineMatcher {
    fn new(pattern: &str, case_sensitive: bool) -> Self {
        match RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
        {
            Ok(regex) => Self::Regex(regex),
            Err(e) => {
                debug!(?e, pattern, "Not a valid regex, searching literally");
                let fold_case = !case_sensitive;
                let needle = if fold_case {
                    pattern.to_lowercase()
                } else {
                    pattern.to_string()
                };
                Self::Literal { needle, fold_case }
            }
        }
    }

    fn is_match(&self, line: &str) -> bool {
        match self {
            Self::Regex(regex) => regex.is_match(line),
            Self::Literal {
                needle,
                fold_case: true,
            } => line.to_lowercase().contains(needle.as_str()),
            Self::Literal {
                needle,
                fold_case: false,
            } => line.contains(needle.as_str()),
        }
    }
}

enum FileFilter<'a> {
    // An explicit glob replaces ignore filtering entirely.
    Glob(GlobMatcher),
    Ignore(&'a IgnorePatternSet),
}

impl FileFilter<'_> {
    fn accepts(&self, relative: &str) -> bool {
        match self {
            Self::Glob(glob) => glob.is_match(relative),
            Self::Ignore(set) => !set.is_ignored(relative),
        }
    }
}

/// Scans files under `root` line by line. Stops as soon as
/// `query.max_results` matches are collected.
pub fn search_files(
    root: &Path,
    query: &GrepQuery,
    ignore: &IgnorePatternSet,
    limits: GrepLimits,
) -> Result<Vec<GrepResult>> {
    let filter = match &query.glob {
        Some(glob) => FileFilter::Glob(compile(glob)?),
        None => FileFilter::Ignore(ignore),
    };
    let matcher = LineMatcher::new(&query.pattern, query.case_sensitive);

    let mut results = Vec::new();
    if query.max_results == 0 {
        return Ok(results);
    }

    for file in walk_project(root) {
        if !file.entry.file_type().is_file() || !filter.accepts(&file.relative) {
            continue;
        }

        let too_large = file
            .entry
            .metadata()
            .map_or(true, |m| m.len() > limits.max_file_size);
        if too_large {
            debug!(path = %file.relative, "Skipping file for search");
            continue;
        }

        let Ok(bytes) = std::fs::read(file.entry.path()) else {
            continue;
        };
        let Ok(content) = String::from_utf8(bytes) else {
            continue;
        };

        for (index, line) in content.lines().enumerate() {
            if !matcher.is_match(line) {
                continue;
            }
            results.push(GrepResult {
                path: file.relative.clone(),
                line: index + 1,
                content: truncate_line(line, limits.max_line_length),
            });
            if results.len() >= query.max_results {
                return Ok(results);
            }
        }
    }

    Ok(results)
}

fn truncate_line(line: &str, max_chars: usize) -> String {
    match line.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &line[..cut]),
        None => line.to_string(),
    }
}
