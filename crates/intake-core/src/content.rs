//! Extracted content model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::format::FileFormat;

/// Text and metadata produced by a content extractor.
///
/// This is the unit the sanitizer operates on: `text` receives the rule-based
/// pattern scrubbing and `metadata` the sensitive-key stripping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Extracted text body.
    pub text: String,
    /// Extractor-provided metadata, keyed by field name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Source format, when the extractor knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FileFormat>,
}

impl Content {
    /// Creates content holding only a text body.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: BTreeMap::new(),
            format: None,
        }
    }

    /// Attaches a metadata field.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attaches the source format.
    #[must_use]
    pub const fn with_format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }
}
