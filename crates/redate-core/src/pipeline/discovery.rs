//! File discovery for finding candidate media in a source tree.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::SetupError;

/// Make `path` absolute against the current directory.
pub fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn ensure_readable(root: &Path) -> Result<(), SetupError> {
    std::fs::read_dir(root)
        .map(|_| ())
        .map_err(|e| SetupError::SourceUnreadable {
            path: root.to_path_buf(),
            message: e.to_string(),
        })
}

/// Fast count of regular files for progress reporting.
///
/// Counts hidden files too, so it can exceed what [`discover`] returns.
pub fn quick_count(root: &Path) -> Result<usize, SetupError> {
    ensure_readable(root).map_err(|e| match e {
        SetupError::SourceUnreadable { path, message } => SetupError::CountFailed { path, message },
        other => other,
    })?;

    Ok(WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count())
}

/// All regular files under `root` whose name does not start with `.`.
///
/// Paths are absolute and sorted. Hidden directories are still walked;
/// unreadable subtrees are skipped with a warning.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>, SetupError> {
    let root = absolutize(root);
    ensure_readable(&root)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(&root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(SetupError::SourceUnreadable {
                    path: root.clone(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        files.push(entry.into_path());
    }

    // Sort by path for deterministic ordering
    files.sort();
    Ok(files)
}
