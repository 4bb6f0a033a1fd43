//! Symlink escape attack integration tests.
//!
//! Link members are never materialized; extraction records them as skipped
//! and carries on with the regular files.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use intake_core::test_utils::{TarTestBuilder, ZipTestBuilder};
use intake_core::{ArchiveExtractor, PipelineConfig};
use tempfile::TempDir;

fn extractor() -> ArchiveExtractor {
    ArchiveExtractor::new(Arc::new(PipelineConfig::default()))
}

#[test]
fn test_tar_symlink_absolute_target_skipped() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("links.tar");
    let data = TarTestBuilder::new()
        .symlink("malicious_link", "/etc/passwd")
        .file("data.txt", b"payload")
        .build();
    std::fs::write(&path, data).unwrap();

    let extraction = extractor().extract(&path, false).unwrap();

    assert_eq!(extraction.extracted_files.len(), 1);
    assert!(extraction.extracted_files[0].ends_with("data.txt"));
    assert_eq!(extraction.skipped_members.len(), 1);
    assert_eq!(extraction.skipped_members[0].name, "malicious_link");
}

#[test]
fn test_tar_symlink_parent_traversal_skipped() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("traverse.tar");
    let data = TarTestBuilder::new()
        .directory("safe")
        .symlink("safe/link", "../../etc/passwd")
        .build();
    std::fs::write(&path, data).unwrap();

    let extraction = extractor().extract(&path, false).unwrap();

    assert!(extraction.extracted_files.is_empty());
    assert_eq!(extraction.skipped_members.len(), 1);
    assert!(!temp.path().join("safe/link").exists());
}

#[test]
fn test_zip_symlink_skipped() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("links.zip");
    ZipTestBuilder::new()
        .symlink("escape", "/etc/shadow")
        .file("real.txt", b"content")
        .write_to(&path);

    let extraction = extractor().extract(&path, false).unwrap();

    assert_eq!(extraction.extracted_files.len(), 1);
    assert_eq!(extraction.skipped_members.len(), 1);
    assert!(extraction.skipped_members[0].reason.contains("link"));
}

#[test]
fn test_symlink_target_never_written_through() {
    // A symlink followed by a file at the link's path must not write
    // through to the target.
    let temp = TempDir::new().unwrap();
    let victim = temp.path().join("victim.txt");
    std::fs::write(&victim, b"original").unwrap();

    let path = temp.path().join("writethrough.tar");
    let data = TarTestBuilder::new()
        .symlink("link", victim.to_str().unwrap())
        .file("link", b"overwritten")
        .build();
    std::fs::write(&path, data).unwrap();

    let _ = extractor().extract(&path, false).unwrap();
    assert_eq!(std::fs::read(&victim).unwrap(), b"original");
}
