use std::{
    fmt,
    path::{Component, Path, PathBuf},
};

use crate::error::{FsError, Result};

/// A path proven to lie inside the sandbox root (or to be the root itself).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedPath {
    absolute: PathBuf,
}

impl ValidatedPath {
    pub fn as_path(&self) -> &Path {
        &self.absolute
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.absolute
    }
}

impl AsRef<Path> for ValidatedPath {
    fn as_ref(&self) -> &Path {
        &self.absolute
    }
}

impl fmt::Display for ValidatedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.absolute.display())
    }
}

/// Maps caller supplied paths onto the single project root and refuses
/// anything that would land outside of it.
#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
    // Symlink-resolved root; used to catch links that point out of the tree.
    real_root: PathBuf,
}

impl Resolver {
    /// The root must be an existing directory. Relative roots are taken
    /// against the process working directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let absolute = if root.is_absolute() {
            root
        } else {
            let cwd = std::env::current_dir().map_err(|e| FsError::io(&root, e))?;
            cwd.join(root)
        };
        let root = normalize(&absolute);

        let metadata = root.metadata().map_err(|e| FsError::io(&root, e))?;
        if !metadata.is_dir() {
            return Err(FsError::NotAFile(root));
        }

        let real_root = root.canonicalize().map_err(|e| FsError::io(&root, e))?;
        Ok(Self { root, real_root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `path` (relative to the root unless absolute) and checks
    /// containment. Rejected paths are never touched on disk.
    pub fn resolve_path(&self, path: &str) -> Result<ValidatedPath> {
        let requested = Path::new(path);
        let joined = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            self.root.join(requested)
        };
        let candidate = normalize(&joined);

        // Component-wise prefix: "/a/root2" does not start with "/a/root".
        if !candidate.starts_with(&self.root) {
            return Err(self.violation(candidate));
        }

        self.check_symlinks(&candidate)?;

        Ok(ValidatedPath {
            absolute: candidate,
        })
    }

    /// Path of `path` relative to the root, with `/` separators.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        Some(to_slash(rel))
    }

    fn check_symlinks(&self, candidate: &Path) -> Result<()> {
        let mut ancestor = candidate;
        loop {
            match ancestor.canonicalize() {
                Ok(real) => {
                    if real.starts_with(&self.real_root) {
                        return Ok(());
                    }
                    return Err(self.violation(candidate.to_path_buf()));
                }
                Err(_) => {
                    // A link that exists but cannot be followed could be
                    // re-pointed anywhere; refuse it.
                    if ancestor.symlink_metadata().is_ok() {
                        return Err(self.violation(candidate.to_path_buf()));
                    }
                    match ancestor.parent() {
                        Some(parent) => ancestor = parent,
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    fn violation(&self, path: PathBuf) -> FsError {
        FsError::SandboxViolation {
            path,
            root: self.root.clone(),
        }
    }
}

/// Lexically resolves `.` and `..` and drops redundant separators. `..` at the
/// filesystem root stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            Component::Normal(name) => out.push(name),
        }
    }
    out
}

pub(crate) fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
