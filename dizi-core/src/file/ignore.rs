//! Ignore-list support.
//!
//! Lines of the project's ignore file are translated into globs that the
//! tree walkers match against root-relative paths. Negation (`!pattern`) is
//! recognised and deliberately produces no rule; it is not supported.
//!
//! Translated sets are cached per ignore file for the life of the process and
//! are not reloaded when the file changes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};

/// One ignore line and the globs it expands to. A path is covered by the
/// rule when any alternative matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreRule {
    pub line: String,
    pub alternatives: Vec<String>,
}

/// Translate a single ignore line. Blank lines, comments and negations
/// produce nothing.
pub fn translate(line: &str) -> Option<IgnoreRule> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
        return None;
    }

    let alternatives = if let Some(anchored) = line.strip_prefix('/') {
        if anchored.is_empty() {
            return None;
        }
        if anchored.ends_with('/') {
            vec![format!("{anchored}**")]
        } else {
            vec![anchored.to_string()]
        }
    } else if line.ends_with('/') {
        vec![format!("{line}**"), format!("**/{line}**")]
    } else if line.contains("**") {
        vec![line.to_string()]
    } else {
        vec![line.to_string(), format!("**/{line}")]
    };

    Some(IgnoreRule {
        line: line.to_string(),
        alternatives,
    })
}

/// Compiled ignore rules for one project root.
#[derive(Debug, Clone)]
pub struct IgnorePatternSet {
    rules: Vec<IgnoreRule>,
    matcher: GlobSet,
}

impl Default for IgnorePatternSet {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            matcher: GlobSet::empty(),
        }
    }
}

impl IgnorePatternSet {
    /// Build from ignore file contents. Lines whose globs fail to compile are
    /// dropped so one bad line does not disable the rest.
    pub fn parse(contents: &str) -> Self {
        let mut builder = GlobSetBuilder::new();
        let mut rules = Vec::new();

        for rule in contents.lines().filter_map(translate) {
            let mut compiled = Vec::with_capacity(rule.alternatives.len());
            for alternative in &rule.alternatives {
                match GlobBuilder::new(alternative).build() {
                    Ok(glob) => compiled.push(glob),
                    Err(e) => debug!(line = %rule.line, ?e, "Skipping ignore pattern"),
                }
            }
            if compiled.is_empty() {
                continue;
            }
            for glob in compiled {
                builder.add(glob);
            }
            rules.push(rule);
        }

        let matcher = match builder.build() {
            Ok(matcher) => matcher,
            Err(e) => {
                warn!(?e, "Failed to build ignore matcher, ignoring nothing");
                return Self::default();
            }
        };

        Self { rules, matcher }
    }

    /// Read `ignore_file` under `root`. A missing or unreadable file yields an
    /// empty set so listing keeps working.
    pub fn load(root: &Path, ignore_file: &str) -> Self {
        let path = root.join(ignore_file);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Self::parse(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!(?e, "Failed to read ignore file {}", path.display());
                Self::default()
            }
        }
    }

    /// `relative` must be root-relative with `/` separators.
    pub fn is_ignored(&self, relative: &str) -> bool {
        self.matcher.is_match(relative)
    }

    pub fn rules(&self) -> &[IgnoreRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Process-wide cache of translated ignore sets, one entry per ignore file.
#[derive(Debug, Default)]
pub struct IgnoreCache {
    sets: RwLock<HashMap<PathBuf, Arc<IgnorePatternSet>>>,
}

impl IgnoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> Arc<IgnoreCache> {
        static GLOBAL: OnceLock<Arc<IgnoreCache>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(IgnoreCache::new())).clone()
    }

    pub fn get_or_load(&self, root: &Path, ignore_file: &str) -> Arc<IgnorePatternSet> {
        let key = root.join(ignore_file);

        if let Some(set) = self
            .sets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return set.clone();
        }

        let loaded = Arc::new(IgnorePatternSet::load(root, ignore_file));
        debug!(
            rules = loaded.rules().len(),
            "Loaded ignore patterns from {}",
            key.display()
        );

        // Another caller may have filled the slot meanwhile; keep the first.
        self.sets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(loaded)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.sets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
