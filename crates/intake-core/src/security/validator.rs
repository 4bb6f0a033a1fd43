//! Security validation orchestrator.
//!
//! `SecurityValidator` runs a fixed sequence of checks against a single file
//! and accumulates findings into a [`SecurityResult`]. Problems are values,
//! not errors: the surface is infallible so batch processing can always
//! record a verdict, and a crash inside a check is itself a finding.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::format::{FileFormat, FormatCategory};
use crate::security::deep;

/// Coarse severity classification derived from validator findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// No findings.
    Low,
    /// One or two findings.
    Medium,
    /// Three to five findings, a failed check, or an archive deep finding.
    High,
    /// More than five findings.
    Critical,
}

impl RiskLevel {
    /// Derives a risk level from the number of accumulated issues.
    #[must_use]
    pub const fn from_issue_count(count: usize) -> Self {
        match count {
            0 => Self::Low,
            1..=2 => Self::Medium,
            3..=5 => Self::High,
            _ => Self::Critical,
        }
    }

    /// Returns the lowercase level name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a security validation.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityResult {
    /// Whether the file may be handed to a downstream extractor.
    pub is_safe: bool,
    /// Findings, in the order the checks ran.
    pub issues: Vec<String>,
    /// Severity classification.
    pub risk_level: RiskLevel,
    /// Check context for logging and telemetry.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl SecurityResult {
    fn new() -> Self {
        Self {
            is_safe: true,
            issues: Vec::new(),
            risk_level: RiskLevel::Low,
            metadata: BTreeMap::new(),
        }
    }

    fn flag(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
        self.is_safe = false;
    }

    fn set_meta(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.metadata.insert(key.to_owned(), value.into());
    }

    /// Serializes the result for logging and telemetry.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Deep-check category with its fixed priority order and severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeepCheck {
    Archive,
    Document,
    Image,
    Video,
    Audio,
}

impl DeepCheck {
    /// The fixed run order; the first check that fires short-circuits the
    /// rest and sets its severity.
    const PRIORITY: [Self; 5] = [Self::Archive, Self::Document, Self::Image, Self::Video, Self::Audio];

    const fn severity(self) -> RiskLevel {
        match self {
            Self::Archive => RiskLevel::High,
            Self::Document | Self::Image | Self::Video | Self::Audio => RiskLevel::Medium,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Document => "document",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }

    fn applies_to(self, format: FileFormat) -> bool {
        match self {
            Self::Archive => format.is_container(),
            Self::Document => format.is_document(),
            Self::Image => format.category() == FormatCategory::Image,
            Self::Video => format.category() == FormatCategory::Video,
            Self::Audio => format.category() == FormatCategory::Audio,
        }
    }

    fn run(self, path: &Path, format: FileFormat, config: &PipelineConfig) -> crate::error::Result<Vec<String>> {
        match self {
            Self::Archive => deep::check_archive(path, format, config),
            Self::Document => deep::check_document(path, format),
            Self::Image => deep::check_image(path, format),
            Self::Video => deep::check_video(path, format),
            Self::Audio => deep::check_audio(path, format),
        }
    }
}

/// Format-aware risk assessment of a single file.
#[derive(Debug, Clone)]
pub struct SecurityValidator {
    config: Arc<PipelineConfig>,
}

impl SecurityValidator {
    /// Creates a validator bound to a configuration.
    #[must_use]
    pub const fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }

    /// Assesses one file against the configured security policy.
    ///
    /// Checks run in a fixed order: existence, format category resolution
    /// (failing closed on unrecognized formats), per-category size limit
    /// with an inclusive upper bound, the format allow-list, executable
    /// detection, and finally the per-category deep checks. Every finding
    /// clears `is_safe`; internal check failures are recorded as findings
    /// and force a high risk level.
    #[must_use]
    pub fn validate(&self, path: &Path, declared: Option<FileFormat>) -> SecurityResult {
        let mut result = SecurityResult::new();

        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(_) => {
                result.flag(format!("file does not exist: {}", path.display()));
                result.risk_level = RiskLevel::from_issue_count(result.issues.len());
                return result;
            }
        };

        let Some(format) = declared.or_else(|| FileFormat::from_path(path)) else {
            result.flag(format!("unrecognized file format: {}", path.display()));
            result.risk_level = RiskLevel::from_issue_count(result.issues.len());
            return result;
        };
        let category = format.category();
        result.set_meta("format", format.name());
        result.set_meta("category", category.name());
        result.set_meta("size_bytes", metadata.len());

        let limit = self.config.file_size_limits.limit_for(category);
        if metadata.len() > limit {
            result.flag(format!(
                "file size {} bytes exceeds limit of {limit} bytes for {category} files",
                metadata.len()
            ));
        }

        if !self.config.is_format_allowed(format) {
            result.flag(format!("format {format} is not on the configured allow-list"));
        }

        if self.config.security_rules.reject_executable {
            self.check_executable(path, &metadata, &mut result);
        }

        let deep_fired = self.run_deep_checks(path, format, &mut result);
        if let Some(severity) = deep_fired {
            result.risk_level = severity;
        } else {
            result.risk_level = RiskLevel::from_issue_count(result.issues.len());
        }

        if !result.is_safe {
            tracing::warn!(
                path = %path.display(),
                risk = %result.risk_level,
                issues = result.issues.len(),
                "security validation rejected file"
            );
        }
        result
    }

    fn check_executable(&self, path: &Path, metadata: &std::fs::Metadata, result: &mut SecurityResult) {
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            if self.config.is_executable_extension(extension) {
                result.flag(format!("executable file extension: .{extension}"));
            }
        }
        // The execute bit only means something on unix; on Windows its
        // absence is not a signal either way.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if metadata.permissions().mode() & 0o111 != 0 {
                result.flag("execute permission bits are set".to_owned());
            }
        }
        #[cfg(not(unix))]
        let _ = metadata;
    }

    /// Runs the deep checks in priority order. Returns the severity of the
    /// first category that fired, or `None` when all applicable checks came
    /// back clean. A check error counts as fired at high severity.
    fn run_deep_checks(&self, path: &Path, format: FileFormat, result: &mut SecurityResult) -> Option<RiskLevel> {
        for check in DeepCheck::PRIORITY {
            if !check.applies_to(format) {
                continue;
            }
            match check.run(path, format, &self.config) {
                Ok(issues) if issues.is_empty() => {}
                Ok(issues) => {
                    tracing::warn!(
                        path = %path.display(),
                        check = check.name(),
                        findings = issues.len(),
                        "deep check reported issues"
                    );
                    for issue in issues {
                        result.flag(issue);
                    }
                    result.set_meta("deep_check", check.name());
                    return Some(check.severity());
                }
                Err(err) => {
                    result.flag(format!("{} check failed: {err}", check.name()));
                    result.set_meta("deep_check", check.name());
                    return Some(RiskLevel::High);
                }
            }
        }
        None
    }
}
