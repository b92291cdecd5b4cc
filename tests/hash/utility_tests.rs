// Tests for path_utils and enumerate modules

use std::fs;
use std::path::{Path, PathBuf};

use treesum::hash::enumerate::enumerate;
use treesum::hash::path_utils::{
    clean_path, closest_common_path, common_directory, containing_directory, relative_path,
};
use treesum::hash::ChecksumError;

#[test]
fn test_clean_path() {
    assert_eq!(clean_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
    assert_eq!(clean_path(Path::new("/../a")), PathBuf::from("/a"));
    assert_eq!(clean_path(Path::new("a/..")), PathBuf::from("."));
    assert_eq!(clean_path(Path::new("../x")), PathBuf::from("../x"));
}

#[test]
fn test_common_path_of_siblings() {
    let paths = ["/nonexistent/root/a/file1", "/nonexistent/root/b/file2"];
    assert_eq!(closest_common_path(&paths), Some(PathBuf::from("/nonexistent/root")));
}

#[test]
fn test_common_path_of_single_path_is_its_parent() {
    assert_eq!(
        closest_common_path(&["/foo/bar/baz/1.txt"]),
        Some(PathBuf::from("/foo/bar/baz"))
    );
    assert_eq!(
        closest_common_path(&["/foo/bar/baz/1.txt", "/foo/bar/baz/1.txt"]),
        Some(PathBuf::from("/foo/bar/baz"))
    );
    assert_eq!(closest_common_path(&["/"]), Some(PathBuf::from("/")));
}

#[test]
fn test_common_path_of_mixed_depths() {
    let paths = ["/foo/bar/baz/1.txt", "/foo/bar/baz/2.txt", "/foo/4.ff"];
    assert_eq!(closest_common_path(&paths), Some(PathBuf::from("/foo")));

    let paths = ["/foo/bar/baz/1.txt", "/foo/bar/baz/2.txt", "/guz/4.ff"];
    assert_eq!(closest_common_path(&paths), Some(PathBuf::from("/")));
}

#[test]
fn test_common_directory_of_one_directory_is_itself() {
    assert_eq!(
        common_directory(&["/nonexistent/root/a"]),
        Some(PathBuf::from("/nonexistent/root/a"))
    );
    assert_eq!(
        common_directory(&["/nonexistent/root/a", "/nonexistent/root/a"]),
        Some(PathBuf::from("/nonexistent/root/a"))
    );
}

#[test]
fn test_common_path_respects_component_boundaries() {
    let paths = ["/nonexistent/abc", "/nonexistent/abd"];
    assert_eq!(closest_common_path(&paths), Some(PathBuf::from("/nonexistent")));
}

#[test]
fn test_common_path_only_root() {
    let paths = ["/nonexistent-one/a", "/nonexistent-two/b"];
    assert_eq!(closest_common_path(&paths), Some(PathBuf::from("/")));
}

#[test]
fn test_common_path_none() {
    let empty: [&str; 0] = [];
    assert_eq!(closest_common_path(&empty), None);
    assert_eq!(closest_common_path(&["left/a", "right/b"]), None);
}

#[test]
fn test_common_path_is_order_independent() {
    let forward = ["/nonexistent/x/y/z", "/nonexistent/x/q", "/nonexistent/x/y"];
    let backward = ["/nonexistent/x/y", "/nonexistent/x/q", "/nonexistent/x/y/z"];
    assert_eq!(closest_common_path(&forward), closest_common_path(&backward));
}

#[test]
fn test_relative_path() {
    assert_eq!(
        relative_path(Path::new("/nonexistent/root"), Path::new("/nonexistent/root/dir1/file1.txt")),
        "dir1/file1.txt"
    );
    assert_eq!(
        relative_path(Path::new("/nonexistent/root/a"), Path::new("/nonexistent/root/b/c")),
        "../b/c"
    );
    assert_eq!(relative_path(Path::new("/nonexistent"), Path::new("/nonexistent")), ".");
}

#[test]
fn test_relative_path_walks_up_to_shared_ancestor() {
    assert_eq!(relative_path(Path::new("/foo"), Path::new("/foo/bar/baz/1.txt")), "bar/baz/1.txt");
    assert_eq!(relative_path(Path::new("/foo/bar/baz"), Path::new("/foo/1.txt")), "../../1.txt");
}

#[test]
fn test_relative_path_keeps_spaces() {
    assert_eq!(
        relative_path(Path::new("/nonexistent"), Path::new("/nonexistent/my dir/a  b.txt")),
        "my dir/a  b.txt"
    );
}

#[test]
fn test_containing_directory() {
    assert_eq!(
        containing_directory(Path::new("/nonexistent/dir/file.txt")),
        PathBuf::from("/nonexistent/dir")
    );
    assert_eq!(containing_directory(Path::new("/")), PathBuf::from("/"));
}

#[test]
fn test_enumerate_is_sorted_and_recursive() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir_all(root.join("b/nested")).unwrap();
    fs::write(root.join("b/nested/deep.txt"), b"deep").unwrap();
    fs::write(root.join("b/z.txt"), b"z").unwrap();
    fs::write(root.join("a.txt"), b"a").unwrap();
    fs::write(root.join(".hidden"), b"h").unwrap();

    let files = enumerate(&[&root]).unwrap();
    let names: Vec<String> = files.iter().map(|f| relative_path(&root, f)).collect();

    assert_eq!(names, vec![".hidden", "a.txt", "b/nested/deep.txt", "b/z.txt"]);

    // Same filesystem state, same order
    assert_eq!(enumerate(&[&root]).unwrap(), files);
}

#[test]
fn test_enumerate_skips_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("one.txt"), b"1").unwrap();
    fs::write(root.join("two.txt"), b"2").unwrap();

    let files = enumerate(&[root.join("one.txt"), root.clone(), root.join("one.txt")]).unwrap();

    assert_eq!(files, vec![root.join("one.txt"), root.join("two.txt")]);
}

#[test]
fn test_enumerate_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    assert!(enumerate(&[dir.path()]).unwrap().is_empty());
}

#[test]
fn test_enumerate_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");

    match enumerate(&[&missing]) {
        Err(ChecksumError::NotFound { path }) => assert_eq!(path, missing),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[cfg(unix)]
#[test]
fn test_enumerate_follows_directory_links() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir_all(root.join("real")).unwrap();
    fs::write(root.join("real/file.txt"), b"data").unwrap();
    fs::create_dir_all(root.join("walk")).unwrap();
    std::os::unix::fs::symlink(root.join("real"), root.join("walk/link")).unwrap();
    std::os::unix::fs::symlink(root.join("absent"), root.join("walk/dangling")).unwrap();

    let files = enumerate(&[root.join("walk")]).unwrap();

    assert_eq!(files, vec![root.join("walk/link/file.txt")]);
}

#[cfg(unix)]
#[test]
fn test_enumerate_keeps_link_names() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir_all(root.join("d")).unwrap();
    fs::create_dir_all(root.join("outside")).unwrap();
    fs::write(root.join("d/a.txt"), b"a").unwrap();
    fs::write(root.join("outside/o.txt"), b"o").unwrap();
    std::os::unix::fs::symlink(root.join("d/a.txt"), root.join("d/link.txt")).unwrap();
    std::os::unix::fs::symlink(root.join("outside/o.txt"), root.join("d/ext.txt")).unwrap();

    let files = enumerate(&[root.join("d")]).unwrap();

    assert_eq!(
        files,
        vec![root.join("d/a.txt"), root.join("d/ext.txt"), root.join("d/link.txt")]
    );

    // A file given directly through a link keeps the link's name too
    assert_eq!(enumerate(&[root.join("d/ext.txt")]).unwrap(), vec![root.join("d/ext.txt")]);
}

#[cfg(unix)]
#[test]
fn test_enumerate_skips_link_loops() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir_all(root.join("d")).unwrap();
    fs::write(root.join("d/a.txt"), b"a").unwrap();
    std::os::unix::fs::symlink(root.join("d"), root.join("d/loop")).unwrap();

    let files = enumerate(&[root.join("d")]).unwrap();

    assert_eq!(files, vec![root.join("d/a.txt")]);
}
