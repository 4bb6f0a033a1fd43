//! Hardlink attack integration tests.
//!
//! Hard links can alias files outside the scratch tree, so tar link members
//! are skipped wholesale rather than resolved.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use intake_core::test_utils::TarTestBuilder;
use intake_core::{ArchiveExtractor, PipelineConfig};
use tempfile::TempDir;

fn extractor() -> ArchiveExtractor {
    ArchiveExtractor::new(Arc::new(PipelineConfig::default()))
}

#[test]
fn test_hardlink_absolute_target_skipped() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("hard.tar");
    let data = TarTestBuilder::new()
        .hardlink("malicious_hardlink", "/etc/passwd")
        .build();
    std::fs::write(&path, data).unwrap();

    let extraction = extractor().extract(&path, false).unwrap();

    assert!(extraction.extracted_files.is_empty());
    assert_eq!(extraction.skipped_members.len(), 1);
    assert!(extraction.skipped_members[0].reason.contains("link"));
}

#[test]
fn test_hardlink_parent_traversal_skipped() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("traverse.tar");
    let data = TarTestBuilder::new()
        .hardlink("link", "../../etc/passwd")
        .file("normal.txt", b"data")
        .build();
    std::fs::write(&path, data).unwrap();

    let extraction = extractor().extract(&path, false).unwrap();

    assert_eq!(extraction.extracted_files.len(), 1);
    assert!(extraction.extracted_files[0].ends_with("normal.txt"));
    assert_eq!(extraction.skipped_members.len(), 1);
}

#[test]
fn test_hardlink_to_sibling_still_skipped() {
    // Even an in-tree link target is not materialized; the policy is to
    // skip link members unconditionally.
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("sibling.tar");
    let data = TarTestBuilder::new()
        .file("original.txt", b"content")
        .hardlink("alias.txt", "original.txt")
        .build();
    std::fs::write(&path, data).unwrap();

    let extraction = extractor().extract(&path, false).unwrap();

    assert_eq!(extraction.extracted_files.len(), 1);
    assert_eq!(extraction.skipped_members.len(), 1);
    assert_eq!(extraction.skipped_members[0].name, "alias.txt");
}
