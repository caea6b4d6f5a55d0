//! Per-execution (or per-agent) configuration for the Safety Pipeline.
//!
//! Passed explicitly through execution options rather than held as
//! process-wide state, so tests exercise different configurations
//! side-by-side without any teardown.

use serde::{Deserialize, Serialize};

/// What to do when the prompt-injection score exceeds nothing, a warning
/// threshold, or a blocking threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptInjectionAction {
    /// Detect and score, but never act on the result.
    Allow,
    /// Emit an event and pass the content through unchanged.
    Warn,
    /// Fail the node with `safety_block` once the score exceeds the
    /// threshold.
    Block,
}

/// The full Safety Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Whether to scan for PII at all.
    #[serde(default)]
    pub enable_pii_detection: bool,
    /// Whether detected PII spans are replaced in-place rather than
    /// merely reported.
    #[serde(default)]
    pub pii_redaction_enabled: bool,
    /// The replacement text for a redacted span.
    #[serde(default = "default_redaction_placeholder")]
    pub pii_redaction_placeholder: String,

    /// Whether to run the prompt-injection heuristic at all.
    #[serde(default)]
    pub enable_prompt_injection_detection: bool,
    /// What to do once the injection score is computed.
    #[serde(default = "default_injection_action")]
    pub prompt_injection_action: PromptInjectionAction,
    /// Score (in `[0.0, 1.0]`) above which injection is considered
    /// detected, for `warn`/`block` purposes.
    #[serde(default = "default_injection_threshold")]
    pub prompt_injection_threshold: f64,

    /// Whether to run content moderation at all.
    #[serde(default)]
    pub enable_content_moderation: bool,
    /// Score above which any moderation category blocks the content.
    #[serde(default = "default_moderation_threshold")]
    pub content_moderation_threshold: f64,
}

fn default_redaction_placeholder() -> String {
    "[REDACTED]".to_string()
}

fn default_injection_action() -> PromptInjectionAction {
    PromptInjectionAction::Warn
}

fn default_injection_threshold() -> f64 {
    0.5
}

fn default_moderation_threshold() -> f64 {
    0.7
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            enable_pii_detection: false,
            pii_redaction_enabled: false,
            pii_redaction_placeholder: default_redaction_placeholder(),
            enable_prompt_injection_detection: false,
            prompt_injection_action: default_injection_action(),
            prompt_injection_threshold: default_injection_threshold(),
            enable_content_moderation: false,
            content_moderation_threshold: default_moderation_threshold(),
        }
    }
}

impl SafetyConfig {
    /// A config with every check disabled — the pipeline becomes a no-op.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether any check is enabled at all; lets a caller skip
    /// constructing a pipeline invocation entirely when nothing is on.
    #[must_use]
    pub fn any_enabled(&self) -> bool {
        self.enable_pii_detection || self.enable_prompt_injection_detection || self.enable_content_moderation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_everything_disabled() {
        let config = SafetyConfig::default();
        assert!(!config.any_enabled());
    }

    #[test]
    fn default_threshold_matches_spec() {
        assert!((SafetyConfig::default().content_moderation_threshold - 0.7).abs() < f64::EPSILON);
    }
}
