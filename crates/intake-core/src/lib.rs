//! Pre-extraction safety gate for untrusted file ingestion.
//!
//! `intake-core` validates files before any content extraction touches them:
//! archives are expanded into disposable scratch space with containment
//! limits, every file passes format-aware security checks, admission is
//! gated on host resource headroom, and extracted text is scrubbed by a
//! rule-based sanitizer. The [`FileValidationPipeline`] ties the stages
//! together per file and per batch.
//!
//! # Examples
//!
//! ```no_run
//! use intake_core::{FileTask, FileValidationPipeline, PipelineConfig};
//!
//! let pipeline = FileValidationPipeline::new(PipelineConfig::default());
//! let verdict = pipeline.process_file(&FileTask::from_path("upload.zip"));
//! if verdict.accepted {
//!     println!("{} extracted files", verdict.children.len());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod archive;
pub mod config;
pub mod content;
mod copy;
pub mod error;
pub mod format;
pub mod monitor;
pub mod pipeline;
pub mod sanitize;
pub mod security;
pub mod validation;

#[doc(hidden)]
pub mod test_utils;

// Re-export main API types
pub use archive::ArchiveExtraction;
pub use archive::ArchiveExtractor;
pub use archive::ArchiveType;
pub use config::PipelineConfig;
pub use config::SecurityRules;
pub use config::SizeLimits;
pub use content::Content;
pub use error::IntakeError;
pub use error::Result;
pub use format::FileFormat;
pub use format::FormatCategory;
pub use monitor::Admission;
pub use monitor::ResourceMonitor;
pub use monitor::ResourceSnapshot;
pub use pipeline::ContentExtractor;
pub use pipeline::FileTask;
pub use pipeline::FileValidationPipeline;
pub use pipeline::FileVerdict;
pub use pipeline::TaskSource;
pub use sanitize::ContentSanitizer;
pub use sanitize::RuleSet;
pub use sanitize::SanitizeRule;
pub use sanitize::SanitizedContent;
pub use security::RiskLevel;
pub use security::SecurityResult;
pub use security::SecurityValidator;
pub use validation::FileValidator;
pub use validation::ValidationResult;
