//! Pre-compiled sanitizer patterns.
//!
//! Compiled once behind `LazyLock`; the pattern strings are constants, so
//! the `expect` calls can only fire on a typo caught by the tests below.

#![allow(clippy::expect_used)]

use std::sync::LazyLock;

use regex::Regex;

/// `<script>` blocks, including attributes, across newlines.
pub(super) static RE_SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid script block pattern")
});

/// Orphaned `<script>` open tags left without a closing tag.
pub(super) static RE_SCRIPT_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>").expect("valid script open pattern"));

/// `javascript:` URI scheme prefixes.
pub(super) static RE_JAVASCRIPT_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript\s*:").expect("valid javascript uri pattern"));

/// Paired active-content elements. The regex crate has no backreferences,
/// so each element gets its own alternative.
pub(super) static RE_ACTIVE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<iframe\b[^>]*>.*?</iframe\s*>|<object\b[^>]*>.*?</object\s*>|<form\b[^>]*>.*?</form\s*>",
    )
    .expect("valid active block pattern")
});

/// Void or unclosed active-content tags: `<embed>` plus stray open/close
/// tags the block pattern did not consume.
pub(super) static RE_ACTIVE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<embed\b[^>]*>|</?(?:iframe|object|form)\b[^>]*>").expect("valid active tag pattern")
});

/// Email addresses.
pub(super) static RE_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email pattern")
});

/// Phone numbers: optional country code, separators, 10 digits.
pub(super) static RE_PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b").expect("valid phone pattern")
});

/// SSN-shaped digit groups (###-##-####).
pub(super) static RE_SSN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("valid ssn pattern"));

/// Credit-card-shaped digit groups (four groups of four).
pub(super) static RE_CREDIT_CARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b").expect("valid credit card pattern")
});
