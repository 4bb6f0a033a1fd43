//! Path traversal attack integration tests.
//!
//! Tests real-world CVE scenarios for path traversal vulnerabilities.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use intake_core::test_utils::{TarTestBuilder, ZipTestBuilder};
use intake_core::{ArchiveExtractor, PipelineConfig};
use tempfile::TempDir;

fn extractor() -> ArchiveExtractor {
    ArchiveExtractor::new(Arc::new(PipelineConfig::default()))
}

#[test]
fn test_cve_2025_4517_python_tarfile_traversal() {
    // CVE-2025-4517: Python tarfile path traversal
    let malicious_paths = [
        "../etc/passwd",
        "../../etc/passwd",
        "foo/../../etc/passwd",
        "foo/../../../etc/passwd",
    ];

    for member in malicious_paths {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hostile.tar");
        let data = TarTestBuilder::new().file(member, b"pwned").build();
        std::fs::write(&path, data).unwrap();

        let extraction = extractor().extract(&path, false).unwrap();
        assert!(
            extraction.extracted_files.is_empty(),
            "member should be skipped: {member}"
        );
        assert_eq!(extraction.skipped_members.len(), 1);
    }
}

#[test]
fn test_zip_slip_traversal() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("slip.zip");
    ZipTestBuilder::new()
        .file("good.txt", b"ok")
        .raw_name_file("../../../../tmp/evil.txt", b"escape")
        .write_to(&path);

    let extraction = extractor().extract(&path, false).unwrap();

    assert_eq!(extraction.extracted_files.len(), 1);
    assert!(extraction.extracted_files[0].ends_with("good.txt"));
    assert_eq!(extraction.skipped_members.len(), 1);
    assert!(extraction.skipped_members[0].name.contains("evil.txt"));
}

#[test]
fn test_absolute_path_attack() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("absolute.zip");
    ZipTestBuilder::new()
        .raw_name_file("/etc/cron.d/backdoor", b"* * * * * root sh")
        .write_to(&path);

    let extraction = extractor().extract(&path, false).unwrap();
    assert!(extraction.extracted_files.is_empty());
    assert_eq!(extraction.skipped_members.len(), 1);
}

#[test]
fn test_traversal_inside_nested_archive() {
    let inner = ZipTestBuilder::new()
        .file("safe.txt", b"fine")
        .raw_name_file("../breakout.txt", b"escape")
        .build();

    let temp = TempDir::new().unwrap();
    let path = temp.path().join("outer.zip");
    ZipTestBuilder::new().file("inner.zip", &inner).write_to(&path);

    let extraction = extractor().extract(&path, true).unwrap();

    // The nested expansion keeps its own containment.
    assert!(extraction.extracted_files.iter().any(|f| f.ends_with("safe.txt")));
    assert!(!extraction.extracted_files.iter().any(|f| f.ends_with("breakout.txt")));
    let root = extraction.scratch_path().to_path_buf();
    for file in &extraction.extracted_files {
        assert!(file.starts_with(&root));
    }
}

#[test]
fn test_clean_paths_extract_normally() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("clean.zip");
    ZipTestBuilder::new()
        .file("docs/readme.txt", b"hello")
        .file("docs/nested/deep.txt", b"world")
        .write_to(&path);

    let extraction = extractor().extract(&path, false).unwrap();
    assert_eq!(extraction.extracted_files.len(), 2);
    assert!(extraction.skipped_members.is_empty());
}
