//! Rule-based rewriting of extracted text and metadata.
//!
//! The sanitizer is a pure function over [`Content`]: it never fails and
//! never touches the filesystem. Rules run in a fixed order and every
//! applied rule is reported in the result, so a second pass over already
//! sanitized content applies nothing.

mod patterns;
mod rules;

pub use rules::{RuleSet, SanitizeRule};

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use regex::Regex;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::content::Content;

/// Replacement for redacted personal data. Contains no digits or `@`, so
/// redaction output can never match a redaction pattern again.
const REDACTED: &str = "[REDACTED]";

/// Round cap for the deletion-rule fixpoint loop. Every productive round
/// shortens the text, so real input converges long before this.
const MAX_STRIP_ROUNDS: usize = 64;

/// Content after sanitization, with an audit trail of what was applied.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedContent {
    /// The rewritten content.
    pub content: Content,
    /// Names of the rules that made a change, in application order, or
    /// `["none"]` when the master switch is off.
    pub sanitization_applied: Vec<String>,
    /// Per-rule removal counts, keyed by the rule's counter name.
    pub removed_content: BTreeMap<String, u64>,
}

impl SanitizedContent {
    /// Serializes the result for logging and telemetry.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Applies the configured sanitization rules to extracted content.
///
/// The active [`RuleSet`] can be swapped wholesale at runtime; a sanitize
/// call in flight keeps the set it started with.
#[derive(Debug)]
pub struct ContentSanitizer {
    rules: RwLock<Arc<RuleSet>>,
    sensitive_keys: Vec<String>,
}

impl ContentSanitizer {
    /// Creates a sanitizer from the pipeline configuration.
    #[must_use]
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            rules: RwLock::new(Arc::new(RuleSet::from_security_rules(&config.security_rules))),
            sensitive_keys: config
                .sensitive_metadata_keys
                .iter()
                .map(|key| key.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Replaces the active rule set.
    pub fn set_sanitization_rules(&self, rules: RuleSet) {
        let mut guard = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(rules);
    }

    /// Returns a copy of the active rule set.
    #[must_use]
    pub fn sanitization_rules(&self) -> RuleSet {
        let guard = self.rules.read().unwrap_or_else(PoisonError::into_inner);
        RuleSet::clone(&guard)
    }

    /// Sanitizes one piece of content.
    ///
    /// Rules run in [`SanitizeRule::APPLY_ORDER`]; each rule that changes
    /// something appends its name to `sanitization_applied` and counts its
    /// removals. With the master switch off the content passes through
    /// untouched and `sanitization_applied` is `["none"]`.
    #[must_use]
    pub fn sanitize(&self, content: &Content) -> SanitizedContent {
        let rules = {
            let guard = self.rules.read().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(&guard)
        };

        if !rules.sanitize_content {
            return SanitizedContent {
                content: content.clone(),
                sanitization_applied: vec!["none".to_owned()],
                removed_content: BTreeMap::new(),
            };
        }

        let mut output = content.clone();
        let mut applied = Vec::new();
        let mut removed = BTreeMap::new();

        // Deleting a match splices its surroundings together, which can
        // form a brand-new match for the same rule or an earlier one
        // ("javascrijavascript:pt:" loses its inner URI and becomes one).
        // The deletion rules therefore loop until a full round removes
        // nothing. Each round shrinks the text, so the round cap is only a
        // guard against a pattern that stops converging.
        let mut scripts_removed = 0u64;
        let mut active_removed = 0u64;
        for _ in 0..MAX_STRIP_ROUNDS {
            let mut round = 0;
            if rules.is_enabled(SanitizeRule::RemoveScripts) {
                let count = Self::remove_scripts(&mut output.text);
                scripts_removed += count;
                round += count;
            }
            if rules.is_enabled(SanitizeRule::RemoveActiveContent) {
                let count = Self::remove_active_content(&mut output.text);
                active_removed += count;
                round += count;
            }
            if round == 0 {
                break;
            }
        }

        // The redaction and metadata rules self-stabilize in one pass:
        // `[REDACTED]` never matches a redaction pattern and deleted keys
        // stay deleted.
        for rule in SanitizeRule::APPLY_ORDER {
            if !rules.is_enabled(rule) {
                continue;
            }
            let count = match rule {
                SanitizeRule::RemoveScripts => scripts_removed,
                SanitizeRule::RemoveActiveContent => active_removed,
                SanitizeRule::RemovePersonalData => Self::remove_personal_data(&mut output.text),
                SanitizeRule::RemoveMetadata => self.remove_metadata(&mut output.metadata),
            };
            if count > 0 {
                tracing::debug!(rule = rule.name(), removed = count, "sanitization rule applied");
                applied.push(rule.name().to_owned());
                removed.insert(rule.counter_key().to_owned(), count);
            }
        }

        SanitizedContent {
            content: output,
            sanitization_applied: applied,
            removed_content: removed,
        }
    }

    /// Replaces `pattern` matches in `text`, returning the match count.
    fn strip_all(text: &mut String, pattern: &Regex, replacement: &str) -> u64 {
        let count = pattern.find_iter(text).count() as u64;
        if count > 0 {
            *text = pattern.replace_all(text, replacement).into_owned();
        }
        count
    }

    fn remove_scripts(text: &mut String) -> u64 {
        let mut count = Self::strip_all(text, &patterns::RE_SCRIPT_BLOCK, "");
        count += Self::strip_all(text, &patterns::RE_SCRIPT_OPEN, "");
        count += Self::strip_all(text, &patterns::RE_JAVASCRIPT_URI, "");
        count
    }

    fn remove_active_content(text: &mut String) -> u64 {
        let mut count = Self::strip_all(text, &patterns::RE_ACTIVE_BLOCK, "");
        count += Self::strip_all(text, &patterns::RE_ACTIVE_TAG, "");
        count
    }

    fn remove_personal_data(text: &mut String) -> u64 {
        let mut count = Self::strip_all(text, &patterns::RE_EMAIL, REDACTED);
        count += Self::strip_all(text, &patterns::RE_SSN, REDACTED);
        count += Self::strip_all(text, &patterns::RE_CREDIT_CARD, REDACTED);
        count += Self::strip_all(text, &patterns::RE_PHONE, REDACTED);
        count
    }

    /// Deletes metadata keys containing a configured sensitive substring.
    ///
    /// Matching is deliberately conservative: a configured key `author`
    /// also removes `document_author`. Over-removal is preferred over
    /// leaking an identifying field.
    fn remove_metadata(&self, metadata: &mut BTreeMap<String, serde_json::Value>) -> u64 {
        let before = metadata.len();
        metadata.retain(|key, _| {
            let lowered = key.to_ascii_lowercase();
            !self
                .sensitive_keys
                .iter()
                .any(|sensitive| lowered.contains(sensitive.as_str()))
        });
        (before - metadata.len()) as u64
    }
}
