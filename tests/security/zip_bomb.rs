//! Zip bomb detection integration tests.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use intake_core::test_utils::ZipTestBuilder;
use intake_core::{ArchiveExtractor, IntakeError, PipelineConfig, RiskLevel, SecurityValidator};
use tempfile::TempDir;

fn config_with(mutate: impl FnOnce(&mut PipelineConfig)) -> Arc<PipelineConfig> {
    let mut config = PipelineConfig::default();
    mutate(&mut config);
    Arc::new(config)
}

#[test]
fn test_byte_budget_stops_expansion() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("big.zip");
    ZipTestBuilder::new()
        .file("big.bin", &vec![b'a'; 64 * 1024])
        .write_to(&path);

    let extractor = ArchiveExtractor::new(config_with(|c| c.max_size_mb = 0));
    let err = extractor.extract(&path, false).unwrap_err();
    assert!(matches!(err, IntakeError::SizeExceeded { .. }));
}

#[test]
fn test_file_count_budget_stops_expansion() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("many.zip");
    let mut builder = ZipTestBuilder::new();
    for index in 0..10 {
        builder = builder.file(&format!("file{index}.txt"), b"x");
    }
    builder.write_to(&path);

    let extractor = ArchiveExtractor::new(config_with(|c| c.max_batch_size = 3));
    let err = extractor.extract(&path, false).unwrap_err();
    assert!(matches!(err, IntakeError::SizeExceeded { .. }));
}

#[test]
fn test_high_expansion_ratio_flagged_before_extraction() {
    // 2 MiB of zeros deflates to a few KiB, far past the default 100x ratio.
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bomb.zip");
    ZipTestBuilder::new()
        .deflated_file("zeros.bin", &vec![0_u8; 2 * 1024 * 1024])
        .write_to(&path);

    let validator = SecurityValidator::new(Arc::new(PipelineConfig::default()));
    let result = validator.validate(&path, None);

    assert!(!result.is_safe);
    assert_eq!(result.risk_level, RiskLevel::High);
    assert!(result.issues.iter().any(|issue| issue.contains("ratio")));
}

#[test]
fn test_normal_compression_allowed() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("normal.zip");
    ZipTestBuilder::new()
        .file("notes.txt", b"ordinary text content that stores as-is")
        .write_to(&path);

    let validator = SecurityValidator::new(Arc::new(PipelineConfig::default()));
    let result = validator.validate(&path, None);
    assert!(result.is_safe, "issues: {:?}", result.issues);

    let extractor = ArchiveExtractor::new(Arc::new(PipelineConfig::default()));
    let extraction = extractor.extract(&path, false).unwrap();
    assert_eq!(extraction.extracted_files.len(), 1);
}
