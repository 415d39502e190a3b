use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Every failure the project file layer reports. All of them are recoverable:
/// the tool surface turns them into error results instead of aborting.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("access denied: path {} is outside project directory {}", .path.display(), .root.display())]
    SandboxViolation { path: PathBuf, root: PathBuf },

    #[error("file does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("cannot read non-regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("file is too large to read ({size} bytes). Maximum size is {max} bytes")]
    TooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("cannot read {}, because it contains invalid UTF-8 characters", .0.display())]
    NotText(PathBuf),

    #[error("file has not been read yet. Use read_project_file first before overwriting it")]
    NotTracked(PathBuf),

    #[error("file has been modified since last read. Use read_project_file first to read it again")]
    Stale(PathBuf),

    #[error("{}", ambiguous_edit_message(.occurrences))]
    AmbiguousEdit { occurrences: usize },

    #[error("old_string must not be empty. No edits were made")]
    EmptyEdit,

    #[error("invalid glob pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Maps an I/O error on `path`, folding `NotFound` into the dedicated variant.
    pub fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

fn ambiguous_edit_message(occurrences: &usize) -> String {
    if *occurrences == 0 {
        "the original substring was not found in the file. No edits were made".to_string()
    } else {
        format!(
            "the substring was found more than once ({occurrences} times) in the file. No edits were made. Ensure uniqueness by providing more context"
        )
    }
}

pub type Result<T, E = FsError> = std::result::Result<T, E>;
