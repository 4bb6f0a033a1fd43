//! Basic file admission checks that run before any security analysis.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::format::FileFormat;

/// Outcome of basic file validation.
///
/// Errors and warnings accumulate in check order; the result is append-only
/// until it is returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    /// Whether the file passed every check.
    pub is_valid: bool,
    /// Failed checks, in the order they ran.
    pub errors: Vec<String>,
    /// Non-fatal observations.
    pub warnings: Vec<String>,
    /// Check context for logging and telemetry.
    pub context: BTreeMap<String, serde_json::Value>,
}

impl ValidationResult {
    fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            context: BTreeMap::new(),
        }
    }

    fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.is_valid = false;
    }

    fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    fn set_context(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.context.insert(key.to_owned(), value.into());
    }

    /// Serializes the result for logging and telemetry.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Checks existence, readability, size, and format before anything
/// expensive runs.
#[derive(Debug, Clone)]
pub struct FileValidator {
    config: Arc<PipelineConfig>,
}

impl FileValidator {
    /// Creates a validator bound to a configuration.
    #[must_use]
    pub const fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }

    /// Runs the basic checks against one file.
    ///
    /// A declared format that disagrees with the extension is recorded as a
    /// warning, not an error; the declared format wins, matching how
    /// callers hand over files whose names came from untrusted archives.
    #[must_use]
    pub fn validate(&self, path: &Path, declared: Option<FileFormat>) -> ValidationResult {
        let mut result = ValidationResult::new();

        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(_) => {
                result.add_error(format!("file does not exist: {}", path.display()));
                return result;
            }
        };
        if !metadata.is_file() {
            result.add_error(format!("not a regular file: {}", path.display()));
            return result;
        }
        if let Err(err) = File::open(path) {
            result.add_error(format!("file is not readable: {err}"));
            return result;
        }

        result.set_context("size_bytes", metadata.len());
        if metadata.len() == 0 {
            result.add_error("file is empty");
        }
        let max_bytes = self.config.max_file_size_bytes();
        if metadata.len() > max_bytes {
            result.add_error(format!(
                "file size {} bytes exceeds the {} MB limit",
                metadata.len(),
                self.config.max_file_size_mb
            ));
        }

        let detected = FileFormat::from_path(path);
        let format = match (declared, detected) {
            (Some(declared), Some(detected)) if declared != detected => {
                result.add_warning(format!(
                    "declared format {declared} does not match the {detected} extension"
                ));
                Some(declared)
            }
            (declared, detected) => declared.or(detected),
        };
        match format {
            Some(format) => {
                result.set_context("format", format.name());
                result.set_context("category", format.category().name());
                if !self.config.is_format_allowed(format) {
                    result.add_error(format!("format {format} is not on the configured allow-list"));
                }
            }
            None => result.add_error(format!("unrecognized file format: {}", path.display())),
        }

        if !result.is_valid {
            tracing::debug!(
                path = %path.display(),
                errors = result.errors.len(),
                "file validation rejected file"
            );
        }
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn validator() -> FileValidator {
        FileValidator::new(Arc::new(PipelineConfig::default()))
    }

    fn validator_with(mutate: impl FnOnce(&mut PipelineConfig)) -> FileValidator {
        let mut config = PipelineConfig::default();
        mutate(&mut config);
        FileValidator::new(Arc::new(config))
    }

    #[test]
    fn test_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let result = validator().validate(&path, None);
        assert!(result.is_valid, "errors: {:?}", result.errors);
        assert!(result.errors.is_empty());
        assert_eq!(result.context.get("format").unwrap(), "text");
        assert_eq!(result.context.get("size_bytes").unwrap(), 5);
    }

    #[test]
    fn test_missing_file() {
        let result = validator().validate(Path::new("/nonexistent/file.txt"), None);
        assert!(!result.is_valid);
        assert!(result.errors[0].contains("does not exist"));
    }

    #[test]
    fn test_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = validator().validate(dir.path(), None);
        assert!(!result.is_valid);
        assert!(result.errors[0].contains("not a regular file"));
    }

    #[test]
    fn test_empty_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, b"").unwrap();

        let result = validator().validate(&path, None);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|error| error.contains("empty")));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        std::fs::write(&path, vec![b'a'; 2048]).unwrap();

        let validator = validator_with(|config| config.max_file_size_mb = 0);
        let result = validator.validate(&path, None);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|error| error.contains("0 MB limit")));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.xyz");
        std::fs::write(&path, b"data").unwrap();

        let result = validator().validate(&path, None);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|error| error.contains("unrecognized")));
    }

    #[test]
    fn test_declared_format_fills_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.xyz");
        std::fs::write(&path, b"data").unwrap();

        let result = validator().validate(&path, Some(FileFormat::PlainText));
        assert!(result.is_valid, "errors: {:?}", result.errors);
    }

    #[test]
    fn test_declared_format_mismatch_warns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, b"data").unwrap();

        let result = validator().validate(&path, Some(FileFormat::Jpeg));
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("does not match"));
        assert_eq!(result.context.get("format").unwrap(), "jpeg");
    }

    #[test]
    fn test_allow_list_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, b"data").unwrap();

        let validator = validator_with(|config| {
            config.allowed_formats = vec![FileFormat::PlainText];
        });
        let result = validator.validate(&path, None);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|error| error.contains("allow-list")));
    }

    #[test]
    fn test_result_serializes() {
        let result = validator().validate(Path::new("/nonexistent"), None);
        let json = result.to_json();
        assert_eq!(json["is_valid"], false);
        assert!(json["errors"].as_array().unwrap().len() == 1);
    }
}
