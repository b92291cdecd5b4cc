// Path normalization utilities
// Common-ancestor search and relative paths for portable manifest keys
// Manifest keys always use forward slashes, whatever the host separator

use std::path::{Component, Path, PathBuf};

/// Normalize a path: resolve symlinks, `.` and `..` when the path exists,
/// otherwise clean it lexically
pub fn normalize(path: &Path) -> PathBuf {
    match path.canonicalize() {
        Ok(canonical) => canonical,
        Err(_) => clean_path(path),
    }
}

/// Clean a path by removing redundant components like "." and ".."
/// This provides a normalized form without requiring the path to exist
pub fn clean_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => continue,
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                // ".." at the root stays at the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            _ => components.push(component),
        }
    }

    let result: PathBuf = components.iter().collect();

    if result.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        result
    }
}

/// Longest component prefix shared by every path, after normalization
///
/// Returns `None` for an empty list, and when the paths share no component
/// at all (e.g. different drive prefixes). Paths that only share the root
/// yield the root. A lone path, or a list of identical paths, yields its
/// parent directory
pub fn closest_common_path<P: AsRef<Path>>(paths: &[P]) -> Option<PathBuf> {
    let (common, identical) = shared_prefix(paths)?;
    let common = match common.parent() {
        Some(parent) if identical => parent.to_path_buf(),
        _ => common,
    };
    non_empty(common)
}

/// Deepest directory containing every given directory; one directory is its own
pub fn common_directory<P: AsRef<Path>>(directories: &[P]) -> Option<PathBuf> {
    let (common, _) = shared_prefix(directories)?;
    non_empty(common)
}

fn shared_prefix<P: AsRef<Path>>(paths: &[P]) -> Option<(PathBuf, bool)> {
    let mut iter = paths.iter().map(|p| normalize(p.as_ref()));
    let mut common = iter.next()?;
    let mut identical = true;

    for path in iter {
        let shared = common
            .components()
            .zip(path.components())
            .take_while(|(a, b)| a == b)
            .count();
        identical &= shared == path.components().count() && shared == common.components().count();
        common = common.components().take(shared).collect();
    }

    Some((common, identical))
}

fn non_empty(path: PathBuf) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path)
    }
}

/// Path of `to` as seen from directory `from`, with `/` separators
///
/// Both paths are normalized first, so links anywhere in `to` resolve to
/// their targets. Walks up with one `..` per component of `from` beyond the
/// shared prefix. Identical paths give `"."`
pub fn relative_path(from: &Path, to: &Path) -> String {
    lexical_relative_path(&normalize(from), &normalize(to))
}

/// Like `relative_path` but compares the cleaned paths as written
///
/// Manifest keys use this so a link inside the tree keeps its own name
pub fn lexical_relative_path(from: &Path, to: &Path) -> String {
    let from = clean_path(from);
    let to = clean_path(to);

    let from_components: Vec<Component> = from.components().collect();
    let to_components: Vec<Component> = to.components().collect();

    let shared = from_components
        .iter()
        .zip(&to_components)
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    segments.extend((shared..from_components.len()).map(|_| "..".to_string()));
    segments.extend(
        to_components[shared..]
            .iter()
            .map(|component| component.as_os_str().to_string_lossy().into_owned()),
    );

    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}

/// Resolve every component but the last, so a link keeps its own name
pub fn resolve_parent(path: &Path) -> PathBuf {
    let cleaned = clean_path(path);
    match cleaned.file_name() {
        Some(name) => {
            let parent = match cleaned.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            normalize(parent).join(name)
        }
        None => normalize(&cleaned),
    }
}

/// Directory holding `path`; a link's own directory, not its target's
/// The root holds itself
pub fn containing_directory(path: &Path) -> PathBuf {
    let resolved = resolve_parent(path);
    match resolved.parent() {
        Some(parent) => parent.to_path_buf(),
        None => resolved,
    }
}

// Tests live in tests/hash/utility_tests.rs
