// Tests for the command line front end

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn treesum(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_treesum"))
        .args(args)
        .current_dir(cwd)
        .env("TREESUM_LOG", "error")
        .env("NO_COLOR", "1")
        // Keep the user's config out of the way
        .env("XDG_CONFIG_HOME", cwd.join("config-home"))
        .env("HOME", cwd)
        .output()
        .unwrap()
}

#[test]
fn test_cli_generate_view_validate() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir_all(root.join("dir1")).unwrap();
    fs::create_dir_all(root.join("dir2")).unwrap();
    fs::write(root.join("dir1/file1.txt"), b"Hello!").unwrap();
    fs::write(root.join("dir2/file2.txt"), b"foo").unwrap();

    let output = treesum(
        &["generate", "dir1", "dir1/file1.txt", "dir2/file2.txt", "-a", "md5", "-o", "out"],
        &root,
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        root.join("out/checksum.md5").display().to_string()
    );

    let view = treesum(&["view", "out/checksum.md5"], &root);
    assert!(view.status.success());
    let listing = String::from_utf8_lossy(&view.stdout);
    assert!(listing.contains("952d2c56d0485958336747bcdd98590d  dir1/file1.txt"));
    assert!(listing.contains("2 entries"));

    let ok = treesum(&["validate", "out/checksum.md5", "dir1", "dir2"], &root);
    assert_eq!(ok.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&ok.stdout).contains("2 files match"));

    fs::write(root.join("dir1/file1.txt"), b"Goodbye!").unwrap();
    let bad = treesum(&["validate", "out/checksum.md5", "dir1", "dir2"], &root);
    assert_eq!(bad.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&bad.stdout).contains("Checksum for dir1/file1.txt does not match"));
}

#[test]
fn test_cli_rejects_unknown_manifest_type() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::write(root.join("file.txt"), b"x").unwrap();
    fs::write(root.join("checksum.crc"), b"").unwrap();

    let output = treesum(&["validate", "checksum.crc", "file.txt"], &root);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unsupported checksum type for .crc"));
}
