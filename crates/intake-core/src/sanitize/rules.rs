//! The closed set of sanitization rules and their toggles.

use serde::{Deserialize, Serialize};

use crate::config::SecurityRules;

/// A named sanitization rule.
///
/// The set is closed; rules run and report in the declaration order of
/// [`SanitizeRule::APPLY_ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanitizeRule {
    /// Strip `<script>` blocks and `javascript:` URI prefixes.
    RemoveScripts,
    /// Strip `<iframe>`, `<object>`, `<embed>`, and `<form>` elements.
    RemoveActiveContent,
    /// Redact emails, phone numbers, SSN- and credit-card-shaped digits.
    RemovePersonalData,
    /// Delete metadata keys matching the configured sensitive-key list.
    RemoveMetadata,
}

impl SanitizeRule {
    /// Rules in their fixed application order.
    pub const APPLY_ORDER: [Self; 4] = [
        Self::RemoveScripts,
        Self::RemoveActiveContent,
        Self::RemovePersonalData,
        Self::RemoveMetadata,
    ];

    /// Rule name as reported in `sanitization_applied`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RemoveScripts => "remove_scripts",
            Self::RemoveActiveContent => "remove_active_content",
            Self::RemovePersonalData => "remove_personal_data",
            Self::RemoveMetadata => "remove_metadata",
        }
    }

    /// Counter key used in `removed_content`.
    #[must_use]
    pub const fn counter_key(self) -> &'static str {
        match self {
            Self::RemoveScripts => "scripts",
            Self::RemoveActiveContent => "active_content",
            Self::RemovePersonalData => "personal_data",
            Self::RemoveMetadata => "metadata",
        }
    }
}

impl std::fmt::Display for SanitizeRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which rules are active, behind the master switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Master switch; when off no rule runs.
    pub sanitize_content: bool,
    /// Toggle for [`SanitizeRule::RemoveScripts`].
    pub remove_scripts: bool,
    /// Toggle for [`SanitizeRule::RemoveActiveContent`].
    pub remove_active_content: bool,
    /// Toggle for [`SanitizeRule::RemovePersonalData`].
    pub remove_personal_data: bool,
    /// Toggle for [`SanitizeRule::RemoveMetadata`].
    pub remove_metadata: bool,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            sanitize_content: true,
            remove_scripts: true,
            remove_active_content: true,
            remove_personal_data: true,
            remove_metadata: true,
        }
    }
}

impl RuleSet {
    /// Derives the rule set from the coarse config toggles. The per-rule
    /// script/active/personal switches default to on; callers wanting finer
    /// control swap in a custom set.
    #[must_use]
    pub fn from_security_rules(rules: &SecurityRules) -> Self {
        Self {
            sanitize_content: rules.sanitize_content,
            remove_metadata: rules.remove_metadata,
            ..Self::default()
        }
    }

    /// Whether a rule is active under this set.
    #[must_use]
    pub const fn is_enabled(&self, rule: SanitizeRule) -> bool {
        if !self.sanitize_content {
            return false;
        }
        match rule {
            SanitizeRule::RemoveScripts => self.remove_scripts,
            SanitizeRule::RemoveActiveContent => self.remove_active_content,
            SanitizeRule::RemovePersonalData => self.remove_personal_data,
            SanitizeRule::RemoveMetadata => self.remove_metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_order_is_stable() {
        assert_eq!(SanitizeRule::APPLY_ORDER[0], SanitizeRule::RemoveScripts);
        assert_eq!(SanitizeRule::APPLY_ORDER[3], SanitizeRule::RemoveMetadata);
    }

    #[test]
    fn test_master_switch_gates_everything() {
        let rules = RuleSet {
            sanitize_content: false,
            ..RuleSet::default()
        };
        for rule in SanitizeRule::APPLY_ORDER {
            assert!(!rules.is_enabled(rule));
        }
    }

    #[test]
    fn test_from_security_rules() {
        let rules = RuleSet::from_security_rules(&SecurityRules {
            reject_executable: true,
            sanitize_content: true,
            remove_metadata: false,
        });
        assert!(rules.is_enabled(SanitizeRule::RemoveScripts));
        assert!(!rules.is_enabled(SanitizeRule::RemoveMetadata));
    }

    #[test]
    fn test_rule_names() {
        assert_eq!(SanitizeRule::RemoveScripts.name(), "remove_scripts");
        assert_eq!(SanitizeRule::RemovePersonalData.counter_key(), "personal_data");
    }
}
