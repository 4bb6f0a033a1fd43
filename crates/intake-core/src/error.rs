//! Error types for file intake operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `IntakeError`.
pub type Result<T> = std::result::Result<T, IntakeError>;

/// Represents a specific size bound that was exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeBound {
    /// Extracted file count bound exceeded.
    FileCount {
        /// Current file count.
        current: usize,
        /// Maximum allowed file count.
        max: usize,
    },
    /// Total extracted size bound exceeded.
    TotalSize {
        /// Current total size in bytes.
        current: u64,
        /// Maximum allowed total size in bytes.
        max: u64,
    },
    /// Single file size bound exceeded.
    FileSize {
        /// File size in bytes.
        size: u64,
        /// Maximum allowed file size in bytes.
        max: u64,
    },
    /// Integer overflow detected while accounting extracted bytes.
    IntegerOverflow,
}

impl std::fmt::Display for SizeBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileCount { current, max } => {
                write!(f, "extracted file count ({current} > {max})")
            }
            Self::TotalSize { current, max } => {
                write!(f, "total extracted size ({current} > {max} bytes)")
            }
            Self::FileSize { size, max } => {
                write!(f, "single file size ({size} > {max} bytes)")
            }
            Self::IntegerOverflow => {
                write!(f, "integer overflow in size accounting")
            }
        }
    }
}

/// Errors that can occur while admitting a file into the pipeline.
#[derive(Error, Debug)]
pub enum IntakeError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Source file does not exist.
    #[error("file not found: {path}")]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// Container format is unsupported or unrecognized.
    #[error("unsupported format: {path}")]
    UnsupportedFormat {
        /// The path whose format could not be determined.
        path: PathBuf,
    },

    /// Underlying codec failed while expanding an archive.
    #[error("{format} extraction failed: {reason}")]
    ExtractionFailed {
        /// Short name of the archive format being extracted.
        format: &'static str,
        /// Codec error description.
        reason: String,
    },

    /// A configured size bound was exceeded.
    #[error("size limit exceeded: {bound}")]
    SizeExceeded {
        /// The bound that was exceeded.
        bound: SizeBound,
    },

    /// Archive member path escapes the destination directory.
    #[error("path traversal detected: {name}")]
    PathTraversal {
        /// The member name that attempted traversal.
        name: PathBuf,
    },

    /// Admission check failed; the caller should retry later.
    #[error("resources exhausted: {reason}")]
    ResourceExhausted {
        /// Human-readable description of the exhausted resource.
        reason: String,
    },

    /// Operation denied by security policy.
    #[error("security violation: {reason}")]
    SecurityViolation {
        /// Reason for the violation.
        reason: String,
    },

    /// A sanitization step failed on a single field.
    #[error("sanitization failed for field: {field}")]
    SanitizationFailure {
        /// Name of the field that could not be processed.
        field: String,
    },

    /// Per-file processing deadline elapsed.
    #[error("processing timed out after {seconds}s")]
    Timeout {
        /// Configured deadline in seconds.
        seconds: u64,
    },
}

impl IntakeError {
    /// Builds an `ExtractionFailed` from a codec error.
    pub(crate) fn extraction(format: &'static str, err: impl std::fmt::Display) -> Self {
        Self::ExtractionFailed {
            format,
            reason: err.to_string(),
        }
    }

    /// Returns `true` if this error represents a security violation.
    ///
    /// Security violations include path traversal attempts, exceeded size
    /// bounds, and policy denials. They indicate hostile or malformed input
    /// rather than an environmental failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use intake_core::IntakeError;
    /// use std::path::PathBuf;
    ///
    /// let err = IntakeError::PathTraversal {
    ///     name: PathBuf::from("../etc/passwd"),
    /// };
    /// assert!(err.is_security_violation());
    ///
    /// let err = IntakeError::Timeout { seconds: 30 };
    /// assert!(!err.is_security_violation());
    /// ```
    #[must_use]
    pub const fn is_security_violation(&self) -> bool {
        matches!(
            self,
            Self::PathTraversal { .. } | Self::SizeExceeded { .. } | Self::SecurityViolation { .. }
        )
    }

    /// Returns `true` if a batch may continue after this error.
    ///
    /// Recoverable errors condemn the file that produced them but carry no
    /// implication for sibling files. Non-recoverable errors point at the
    /// environment (I/O failures, codec internals) and are surfaced as
    /// failed-item records by the pipeline.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat { .. }
                | Self::SizeExceeded { .. }
                | Self::PathTraversal { .. }
                | Self::ResourceExhausted { .. }
                | Self::SecurityViolation { .. }
                | Self::SanitizationFailure { .. }
                | Self::Timeout { .. }
        )
    }

    /// Returns the exceeded size bound, if applicable.
    #[must_use]
    pub const fn size_bound(&self) -> Option<&SizeBound> {
        match self {
            Self::SizeExceeded { bound } => Some(bound),
            _ => None,
        }
    }
}
