// File tree enumeration
// Expands files and directories into a flat, deduplicated list of regular files

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;

use super::error::{ChecksumError, Result};
use super::path_utils;

/// Expand inputs into regular files, depth-first in name order
///
/// Files are yielded as-is, directories are walked recursively. Links are
/// followed for their content but keep the name they have in the tree, so a
/// link to a file is listed under its own path. Every directory above a
/// result is resolved, so a file reachable twice under the same name (listed
/// directly and through its directory) appears once, at its first position
/// Missing inputs fail with `NotFound`
pub fn enumerate<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut seen = HashSet::new();

    for input in inputs {
        let input = input.as_ref();
        let metadata = fs::metadata(input).map_err(|e| {
            ChecksumError::from_io_error(e, "reading metadata of", Some(input.to_path_buf()))
        })?;

        if metadata.is_dir() {
            for file in walk_directory(input)? {
                push_unique(&mut files, &mut seen, file);
            }
        } else if metadata.is_file() {
            push_unique(&mut files, &mut seen, path_utils::resolve_parent(input));
        } else {
            tracing::debug!("Skipping special file {}", input.display());
        }
    }

    Ok(files)
}

fn push_unique(files: &mut Vec<PathBuf>, seen: &mut HashSet<PathBuf>, path: PathBuf) {
    if seen.insert(path.clone()) {
        files.push(path);
    } else {
        tracing::debug!("Skipping already listed file {}", path.display());
    }
}

/// Walk one directory with jwalk; sorted traversal keeps the order reproducible
///
/// The walk runs over the resolved directory and results are re-rooted under
/// the input's own name, which differs when the input is itself a link
fn walk_directory(input: &Path) -> Result<Vec<PathBuf>> {
    let root = input
        .canonicalize()
        .map_err(|e| ChecksumError::from_io_error(e, "resolving", Some(input.to_path_buf())))?;
    let named_root = path_utils::resolve_parent(input);
    let mut files = Vec::new();

    for entry_result in WalkDir::new(&root)
        .sort(true)
        .skip_hidden(false)
        .follow_links(true)
    {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                if let Some(ancestor) = e.loop_ancestor() {
                    tracing::warn!(
                        "Skipping link loop {} back to {}",
                        path.display(),
                        ancestor.display()
                    );
                    continue;
                }
                if is_dangling_link(&path) {
                    tracing::warn!("Skipping dangling link {}", path.display());
                    continue;
                }
                let message = e.to_string();
                let source = e.into_io_error().unwrap_or_else(|| io::Error::other(message));
                return Err(ChecksumError::from_io_error(source, "walking directory", Some(path)));
            }
        };

        let path = entry.path();

        // Resolves link targets; dangling links are skipped
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!("Skipping dangling link {}", path.display());
                continue;
            }
            Err(e) => {
                return Err(ChecksumError::from_io_error(e, "reading metadata of", Some(path)));
            }
        };

        if metadata.is_file() {
            let relative = path.strip_prefix(&root).unwrap_or(&path);
            files.push(named_root.join(relative));
        }
    }

    Ok(files)
}

fn is_dangling_link(path: &Path) -> bool {
    let is_link = fs::symlink_metadata(path)
        .map(|metadata| metadata.file_type().is_symlink())
        .unwrap_or(false);
    is_link && fs::metadata(path).is_err()
}
