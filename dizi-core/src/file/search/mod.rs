//! Tree walking for listing and searching project files.

pub mod list_files;
pub mod search_files;

use std::path::Path;

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use super::resolver::to_slash;

/// A non-directory entry found under the project root.
pub(crate) struct WalkedFile {
    pub entry: DirEntry,
    /// Root-relative, `/` separated.
    pub relative: String,
}

/// Walks `root` in file-name order, yielding every non-directory entry.
/// Entries that cannot be read are logged and skipped; `.git` is never
/// descended into.
pub(crate) fn walk_project(root: &Path) -> impl Iterator<Item = WalkedFile> + '_ {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !(entry.depth() > 0 && entry.file_type().is_dir() && entry.file_name() == ".git")
        })
        .filter_map(|result| match result {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(?e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| !entry.file_type().is_dir())
        .filter_map(move |entry| {
            let relative = to_slash(entry.path().strip_prefix(root).ok()?);
            Some(WalkedFile { entry, relative })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_walk_is_sorted_and_skips_git() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::write(root.join("b.txt"), "").unwrap();
        fs::write(root.join("a.txt"), "").unwrap();
        fs::write(root.join("src/nested/deep.rs"), "").unwrap();
        fs::write(root.join("src/lib.rs"), "").unwrap();
        fs::write(root.join(".git/HEAD"), "").unwrap();
        fs::write(root.join(".gitignore"), "").unwrap();

        let files: Vec<String> = walk_project(root).map(|f| f.relative).collect();
        assert_eq!(
            files,
            vec![".gitignore", "a.txt", "b.txt", "src/lib.rs", "src/nested/deep.rs"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_tolerates_unreadable_directory() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("locked")).unwrap();
        fs::write(root.join("locked/hidden.txt"), "").unwrap();
        fs::write(root.join("visible.txt"), "").unwrap();
        fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o000)).unwrap();

        let files: Vec<String> = walk_project(root).map(|f| f.relative).collect();
        fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o755)).unwrap();

        assert!(files.contains(&"visible.txt".to_string()));
    }
}
