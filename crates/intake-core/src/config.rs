//! Pipeline configuration for file intake.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::format::FileFormat;
use crate::format::FormatCategory;

const MB: u64 = 1024 * 1024;

/// Security rule toggles consulted by the validator and the sanitizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRules {
    /// Reject files with executable extensions or execute permission bits.
    pub reject_executable: bool,

    /// Master switch for content sanitization. When disabled no sanitize
    /// rule runs and the sanitizer reports `["none"]`.
    pub sanitize_content: bool,

    /// Strip sensitive metadata keys from extracted content.
    pub remove_metadata: bool,
}

impl Default for SecurityRules {
    fn default() -> Self {
        Self {
            reject_executable: true,
            sanitize_content: true,
            remove_metadata: true,
        }
    }
}

/// Per-category file size limits in bytes, with a default fallback.
///
/// A category without an explicit limit falls back to `default`. The limit
/// is an inclusive upper bound: a file at exactly the limit passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeLimits {
    /// Limit for text formats.
    pub text: Option<u64>,
    /// Limit for image formats.
    pub image: Option<u64>,
    /// Limit for audio formats.
    pub audio: Option<u64>,
    /// Limit for video formats.
    pub video: Option<u64>,
    /// Limit for application formats (documents, archives).
    pub application: Option<u64>,
    /// Fallback limit for categories without an explicit entry.
    pub default: u64,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            text: Some(50 * MB),
            image: Some(200 * MB),
            audio: Some(500 * MB),
            video: Some(1024 * MB),
            application: Some(100 * MB),
            default: 100 * MB,
        }
    }
}

impl SizeLimits {
    /// Returns the effective limit in bytes for a format category.
    #[must_use]
    pub fn limit_for(&self, category: FormatCategory) -> u64 {
        let explicit = match category {
            FormatCategory::Text => self.text,
            FormatCategory::Image => self.image,
            FormatCategory::Audio => self.audio,
            FormatCategory::Video => self.video,
            FormatCategory::Application => self.application,
        };
        explicit.unwrap_or(self.default)
    }
}

/// Configuration for the file validation pipeline.
///
/// # Performance Note
///
/// This struct contains heap-allocated collections. For shared ownership
/// across workers, wrap it in `Arc<PipelineConfig>` rather than cloning
/// per task.
///
/// # Examples
///
/// ```
/// use intake_core::PipelineConfig;
///
/// // Use the defaults
/// let config = PipelineConfig::default();
///
/// // Customize for specific needs
/// let custom = PipelineConfig {
///     max_depth: 1,
///     max_file_size_mb: 10,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum automatic nested-archive expansion depth.
    pub max_depth: usize,

    /// Maximum total extracted size per archive, in megabytes.
    pub max_size_mb: u64,

    /// Maximum size for a single submitted or extracted file, in megabytes.
    pub max_file_size_mb: u64,

    /// Maximum number of files one extraction may produce.
    pub max_batch_size: usize,

    /// Maximum declared expansion ratio (uncompressed / compressed) before
    /// an archive is flagged as a decompression bomb.
    pub max_expansion_ratio: f64,

    /// CPU usage ceiling for the admission check, in percent.
    pub cpu_limit_percent: f32,

    /// Process memory ceiling for the admission check, in megabytes.
    pub memory_limit_mb: u64,

    /// Interval between background resource samples.
    pub monitoring_interval: Duration,

    /// Worker pool size for batch processing.
    pub max_threads: usize,

    /// Wall-clock deadline for processing one file end-to-end.
    pub conversion_timeout: Duration,

    /// Whether a failing file in a batch is recorded as a partial failure
    /// (`true`) or stops the batch (`false`).
    pub continue_on_error: bool,

    /// Explicit allow-list of formats (empty = allow all).
    pub allowed_formats: Vec<FileFormat>,

    /// Per-category size limits applied by the security validator.
    pub file_size_limits: SizeLimits,

    /// Extensions treated as executable, without the leading dot.
    pub executable_extensions: Vec<String>,

    /// Security rule toggles.
    pub security_rules: SecurityRules,

    /// Metadata keys stripped by the sanitizer. Matching is a
    /// case-insensitive substring test against present keys.
    pub sensitive_metadata_keys: Vec<String>,
}

impl Default for PipelineConfig {
    /// Creates a `PipelineConfig` with conservative defaults.
    ///
    /// Default values:
    /// - `max_depth`: 3
    /// - `max_size_mb`: 1024 (1 GiB total per extraction)
    /// - `max_file_size_mb`: 100
    /// - `max_batch_size`: 1,000
    /// - `max_expansion_ratio`: 100.0
    /// - `cpu_limit_percent`: 80.0
    /// - `memory_limit_mb`: 1024
    /// - `monitoring_interval`: 30 s
    /// - `max_threads`: 4
    /// - `conversion_timeout`: 300 s
    /// - `continue_on_error`: true
    /// - `allowed_formats`: empty (allow all)
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_size_mb: 1024,
            max_file_size_mb: 100,
            max_batch_size: 1_000,
            max_expansion_ratio: 100.0,
            cpu_limit_percent: 80.0,
            memory_limit_mb: 1024,
            monitoring_interval: Duration::from_secs(30),
            max_threads: 4,
            conversion_timeout: Duration::from_secs(300),
            continue_on_error: true,
            allowed_formats: Vec::new(),
            file_size_limits: SizeLimits::default(),
            executable_extensions: vec![
                "exe".to_string(),
                "dll".to_string(),
                "sys".to_string(),
                "com".to_string(),
                "bat".to_string(),
                "cmd".to_string(),
                "scr".to_string(),
                "pif".to_string(),
                "msi".to_string(),
                "vbs".to_string(),
                "ps1".to_string(),
                "sh".to_string(),
                "bash".to_string(),
                "run".to_string(),
                "app".to_string(),
                "deb".to_string(),
                "rpm".to_string(),
                "so".to_string(),
                "dylib".to_string(),
            ],
            security_rules: SecurityRules::default(),
            sensitive_metadata_keys: vec![
                "author".to_string(),
                "creator".to_string(),
                "producer".to_string(),
                "owner".to_string(),
                "user".to_string(),
                "email".to_string(),
                "phone".to_string(),
                "gps".to_string(),
                "location".to_string(),
                "company".to_string(),
            ],
        }
    }
}

impl PipelineConfig {
    /// Maximum total extracted size in bytes.
    #[must_use]
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(MB)
    }

    /// Maximum single file size in bytes.
    #[must_use]
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(MB)
    }

    /// Validates whether a format passes the allow-list.
    ///
    /// An empty allow-list admits every recognized format.
    #[must_use]
    pub fn is_format_allowed(&self, format: FileFormat) -> bool {
        self.allowed_formats.is_empty() || self.allowed_formats.contains(&format)
    }

    /// Validates whether an extension is treated as executable.
    ///
    /// Comparison is case-insensitive to prevent bypass on case-insensitive
    /// filesystems.
    #[must_use]
    pub fn is_executable_extension(&self, extension: &str) -> bool {
        self.executable_extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}
