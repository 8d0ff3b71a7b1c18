//! End-to-end extraction tests against archives written to a temp directory.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zipguard::test_utils::{TestEntry, ZipBuilder};
use zipguard::{Diagnostics, ErrorKind, ExtractOptions, Unzipper};

fn options_into(target: &Path) -> ExtractOptions {
    ExtractOptions::default().with_target_dir(target)
}

/// Relative path -> contents for every file under `root`.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_path_buf();
                out.insert(rel, fs::read(&path).unwrap());
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

#[test]
fn test_preserved_paths_match_archive_layout() {
    let temp = TempDir::new().unwrap();
    let archive = ZipBuilder::new()
        .stored("readme.txt", b"top level")
        .deflated("src/main.rs", b"fn main() {}\nfn main() {}\n")
        .deflated("src/deep/er/mod.rs", b"pub mod er;")
        .write_to(temp.path(), "project.zip");
    let out = temp.path().join("out");
    fs::create_dir(&out).unwrap();

    let result = Unzipper::new(options_into(&out))
        .extract(&archive, &mut Diagnostics::new())
        .unwrap();

    let root = fs::canonicalize(&out).unwrap();
    assert_eq!(
        result.files,
        vec![
            root.join("readme.txt"),
            root.join("src/main.rs"),
            root.join("src/deep/er/mod.rs"),
        ]
    );
    assert!(root.join("src/deep/er").is_dir());
    assert_eq!(
        fs::read(root.join("src/main.rs")).unwrap(),
        b"fn main() {}\nfn main() {}\n"
    );
}

#[test]
fn test_flattened_paths_use_basename_only() {
    let temp = TempDir::new().unwrap();
    let archive = ZipBuilder::new()
        .directory("a/")
        .stored("a/one.txt", b"1")
        .deflated("a/b/c/two.txt", b"2")
        .write_to(temp.path(), "nested.zip");
    let out = temp.path().join("flat");
    fs::create_dir(&out).unwrap();

    let result = Unzipper::new(options_into(&out).with_preserve_filepath(false))
        .extract(&archive, &mut Diagnostics::new())
        .unwrap();

    let root = fs::canonicalize(&out).unwrap();
    assert_eq!(result.files, vec![root.join("one.txt"), root.join("two.txt")]);
    for file in &result.files {
        assert_eq!(file.parent().unwrap(), root);
    }
    assert!(!root.join("a").exists());
}

#[test]
fn test_traversal_entry_aborts_without_writing() {
    for position in 0..3 {
        let temp = TempDir::new().unwrap();
        let mut builder = ZipBuilder::new();
        for i in 0..3 {
            builder = if i == position {
                builder.stored("../evil.txt", b"pwned")
            } else {
                builder.stored(&format!("ok{i}.txt"), b"fine")
            };
        }
        let archive = builder.write_to(temp.path(), "slip.zip");
        let out = temp.path().join("out");
        fs::create_dir(&out).unwrap();

        let mut diagnostics = Diagnostics::new();
        let err = Unzipper::new(options_into(&out))
            .extract(&archive, &mut diagnostics)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PathEscape, "position {position}");
        assert!(err.is_security_violation());
        assert!(snapshot(&out).is_empty(), "position {position}");
        assert!(!temp.path().join("evil.txt").exists());
        assert_eq!(diagnostics.error_messages().len(), 1);
        assert!(diagnostics.error_messages()[0].contains("zip-slip"));
    }
}

#[test]
fn test_absolute_and_nested_traversal_are_rejected() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    fs::create_dir(&out).unwrap();

    for name in ["/tmp/abs.txt", "a/b/../../../evil.txt", "a/../../evil.txt"] {
        let archive = ZipBuilder::new()
            .stored(name, b"x")
            .write_to(temp.path(), "bad.zip");
        let err = Unzipper::new(options_into(&out))
            .extract(&archive, &mut Diagnostics::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathEscape, "{name}");
    }
    assert!(snapshot(&out).is_empty());
}

#[cfg(unix)]
#[test]
fn test_symlinked_directory_escape_rolls_back() {
    let temp = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    let out = temp.path().join("out");
    fs::create_dir(&out).unwrap();
    std::os::unix::fs::symlink(outside.path(), out.join("link")).unwrap();

    let archive = ZipBuilder::new()
        .stored("first.txt", b"written before the escape")
        .stored("link/evil.txt", b"pwned")
        .write_to(temp.path(), "symlink.zip");

    let err = Unzipper::new(options_into(&out))
        .extract(&archive, &mut Diagnostics::new())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PathEscape);
    assert!(fs::read_dir(outside.path()).unwrap().next().is_none());
    assert!(!out.join("first.txt").exists());
}

#[cfg(unix)]
#[test]
fn test_rollback_keeps_files_that_existed_before() {
    let temp = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    let out = temp.path().join("out");
    fs::create_dir(&out).unwrap();
    fs::write(out.join("keep.txt"), b"user data").unwrap();
    std::os::unix::fs::symlink(outside.path(), out.join("link")).unwrap();

    let archive = ZipBuilder::new()
        .stored("keep.txt", b"from the archive")
        .stored("new.txt", b"fresh")
        .stored("link/evil.txt", b"pwned")
        .write_to(temp.path(), "overwrite.zip");

    let err = Unzipper::new(options_into(&out))
        .extract(&archive, &mut Diagnostics::new())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PathEscape);
    assert!(out.join("keep.txt").is_file());
    assert!(!out.join("new.txt").exists());
    assert!(fs::read_dir(outside.path()).unwrap().next().is_none());
}

#[test]
fn test_filtered_hostile_names_are_ignored() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");

    let archive = ZipBuilder::new()
        .stored("a.txt", b"a")
        .stored("../evil.png", b"png")
        .write_to(temp.path(), "allow.zip");
    let result = Unzipper::new(options_into(&out).with_allowed_extensions(["txt"]))
        .extract(&archive, &mut Diagnostics::new())
        .unwrap();
    assert_eq!(result.files.len(), 1);
    assert_eq!(result.skipped, 1);
    assert!(!temp.path().join("evil.png").exists());

    let archive = ZipBuilder::new()
        .stored("a.txt", b"a")
        .stored("__MACOSX/../../evil", b"x")
        .write_to(temp.path(), "mac.zip");
    let result = Unzipper::new(options_into(&out))
        .extract(&archive, &mut Diagnostics::new())
        .unwrap();
    assert_eq!(result.files.len(), 1);
    assert_eq!(result.skipped, 1);
    assert!(!temp.path().join("evil").exists());
    assert_eq!(fs::read(out.join("a.txt")).unwrap(), b"a");
}

#[test]
fn test_stored_and_deflate_contents_round_trip() {
    let temp = TempDir::new().unwrap();
    let binary: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();
    let text = "line of text that compresses well\n".repeat(500);
    let archive = ZipBuilder::new()
        .stored("binary.bin", &binary)
        .deflated("text.txt", text.as_bytes())
        .deflated("empty.txt", b"")
        .write_to(temp.path(), "mixed.zip");
    let out = temp.path().join("out");

    Unzipper::new(options_into(&out))
        .extract(&archive, &mut Diagnostics::new())
        .unwrap();

    assert_eq!(fs::read(out.join("binary.bin")).unwrap(), binary);
    assert_eq!(fs::read_to_string(out.join("text.txt")).unwrap(), text);
    assert_eq!(fs::read(out.join("empty.txt")).unwrap(), b"");
}

#[test]
fn test_empty_archive_fails() {
    let temp = TempDir::new().unwrap();
    let archive = ZipBuilder::new()
        .comment(b"nothing in here")
        .write_to(temp.path(), "empty.zip");

    let err = Unzipper::new(options_into(temp.path()))
        .extract(&archive, &mut Diagnostics::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyArchive);
}

#[test]
fn test_extension_allow_list() {
    let temp = TempDir::new().unwrap();
    let archive = ZipBuilder::new()
        .stored("a.txt", b"a")
        .stored("b.png", b"\x89PNG")
        .directory("c/")
        .write_to(temp.path(), "filter.zip");
    let out = temp.path().join("out");

    let result = Unzipper::new(options_into(&out).with_allowed_extensions(["txt"]))
        .extract(&archive, &mut Diagnostics::new())
        .unwrap();

    let root = fs::canonicalize(&out).unwrap();
    assert_eq!(result.files, vec![root.join("a.txt")]);
    assert_eq!(result.skipped, 1);
    assert!(!root.join("b.png").exists());
    // The directory entry is materialized as a directory, never as a file
    assert!(root.join("c").is_dir());
}

#[test]
fn test_skip_listed_directory_is_never_extracted() {
    let temp = TempDir::new().unwrap();
    let archive = ZipBuilder::new()
        .stored("photo.jpg", b"jpeg")
        .directory("__MACOSX/")
        .stored("__MACOSX/._photo.jpg", b"resource fork")
        .write_to(temp.path(), "mac.zip");
    let out = temp.path().join("out");

    let mut diagnostics = Diagnostics::new();
    let result = Unzipper::new(options_into(&out))
        .extract(&archive, &mut diagnostics)
        .unwrap();

    assert_eq!(result.files.len(), 1);
    assert!(result.files[0].ends_with("photo.jpg"));
    assert_eq!(result.skipped, 2);
    assert!(!out.join("__MACOSX").exists());
    assert!(
        diagnostics
            .debug_messages()
            .iter()
            .any(|m| m.contains("__MACOSX/._photo.jpg"))
    );
}

#[test]
fn test_extraction_is_deterministic() {
    let temp = TempDir::new().unwrap();
    let archive = ZipBuilder::new()
        .stored("x/1.txt", b"one")
        .deflated("x/y/2.txt", b"two two two two")
        .stored("3.bin", &[0u8, 1, 2, 3])
        .write_to(temp.path(), "det.zip");
    let first = temp.path().join("first");
    let second = temp.path().join("second");
    fs::create_dir(&first).unwrap();
    fs::create_dir(&second).unwrap();

    let r1 = Unzipper::new(options_into(&first))
        .extract(&archive, &mut Diagnostics::new())
        .unwrap();
    let r2 = Unzipper::new(options_into(&second))
        .extract(&archive, &mut Diagnostics::new())
        .unwrap();

    let rel = |files: &[PathBuf], root: &Path| -> Vec<PathBuf> {
        let root = fs::canonicalize(root).unwrap();
        files
            .iter()
            .map(|f| f.strip_prefix(&root).unwrap().to_path_buf())
            .collect()
    };
    assert_eq!(rel(&r1.files, &first), rel(&r2.files, &second));
    assert_eq!(snapshot(&first), snapshot(&second));
}

#[test]
fn test_default_target_is_archive_directory() {
    let temp = TempDir::new().unwrap();
    let archive = ZipBuilder::new()
        .stored("beside.txt", b"next to the archive")
        .write_to(temp.path(), "here.zip");

    Unzipper::default()
        .extract(&archive, &mut Diagnostics::new())
        .unwrap();
    assert!(temp.path().join("beside.txt").is_file());
}

#[test]
fn test_duplicate_names_later_entry_wins() {
    let temp = TempDir::new().unwrap();
    let archive = ZipBuilder::new()
        .stored("dup.txt", b"first")
        .stored("dup.txt", b"second")
        .write_to(temp.path(), "dup.zip");
    let out = temp.path().join("out");

    let result = Unzipper::new(options_into(&out))
        .extract(&archive, &mut Diagnostics::new())
        .unwrap();
    assert_eq!(result.files.len(), 2);
    assert_eq!(fs::read(out.join("dup.txt")).unwrap(), b"second");
}

#[test]
fn test_unsupported_method_aborts() {
    let temp = TempDir::new().unwrap();
    let archive = ZipBuilder::new()
        .entry(TestEntry::stored("data.bz2", b"BZh91AY&SY").with_method(12))
        .write_to(temp.path(), "bzip.zip");

    let mut diagnostics = Diagnostics::new();
    let err = Unzipper::new(options_into(&temp.path().join("out")))
        .extract(&archive, &mut diagnostics)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedMethod);
    assert_eq!(diagnostics.error_messages().len(), 1);
}

#[test]
fn test_corrupt_crc_aborts_unless_disabled() {
    let temp = TempDir::new().unwrap();
    let archive = ZipBuilder::new()
        .entry(TestEntry::deflated("a.txt", b"some content").with_crc(1))
        .write_to(temp.path(), "crc.zip");

    let err = Unzipper::new(options_into(&temp.path().join("strict")))
        .extract(&archive, &mut Diagnostics::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptData);

    let lenient = temp.path().join("lenient");
    Unzipper::new(options_into(&lenient).with_crc_check(false))
        .extract(&archive, &mut Diagnostics::new())
        .unwrap();
    assert_eq!(fs::read(lenient.join("a.txt")).unwrap(), b"some content");
}

#[test]
fn test_not_a_zip_is_format_error() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("fake.zip");
    fs::write(&archive, "just some text that happens to be named .zip").unwrap();

    let err = Unzipper::new(options_into(temp.path()))
        .extract(&archive, &mut Diagnostics::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_unix_directory_attributes() {
    let temp = TempDir::new().unwrap();
    let archive = ZipBuilder::new()
        .entry(
            TestEntry::stored("bin", b"")
                .with_version_made_by((3 << 8) | 30)
                .with_external_attrs(0o040755 << 16),
        )
        .stored("bin/tool.sh", b"#!/bin/sh\n")
        .write_to(temp.path(), "unix.zip");
    let out = temp.path().join("out");

    let result = Unzipper::new(options_into(&out))
        .extract(&archive, &mut Diagnostics::new())
        .unwrap();
    assert_eq!(result.files.len(), 1);
    assert!(out.join("bin").is_dir());
    assert!(out.join("bin/tool.sh").is_file());
}

#[test]
fn test_list_does_not_extract() {
    let temp = TempDir::new().unwrap();
    let archive = ZipBuilder::new()
        .stored("a.txt", b"a")
        .directory("d/")
        .zip64()
        .write_to(temp.path(), "list.zip");

    let entries = Unzipper::default().list(&archive).unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.name()).collect();
    assert_eq!(names, ["a.txt", "d/"]);
    assert!(!temp.path().join("a.txt").exists());
}
