//! The Safety Pipeline: PII detection/redaction, then prompt-injection
//! scoring, then content moderation, applied in that fixed order to any
//! piece of text flowing in or out of a node or agent turn.

use loomwork_action::NodeError;
use tracing::{info, warn};

use crate::config::{PromptInjectionAction, SafetyConfig};
use crate::injection::{self, InjectionScore};
use crate::moderation::{self, ModerationResult, Moderator};
use crate::pii::{self, CreditCardDetector, EmailDetector, PhoneDetector, PiiDetector, PiiMatch, SsnDetector};

/// The direction text is flowing, for event/log attribution only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// The outcome of running one piece of text through the pipeline.
#[derive(Debug, Clone)]
pub struct SafetyOutcome {
    /// The text to continue with — redacted in place of the original if
    /// PII redaction applied, otherwise identical to the input.
    pub text: String,
    /// Every PII span found, whether or not redaction was enabled.
    pub pii_matches: Vec<PiiMatch>,
    /// The prompt-injection score, if that check ran.
    pub injection_score: Option<InjectionScore>,
    /// The content-moderation scores, if that check ran.
    pub moderation: Option<ModerationResult>,
}

impl SafetyOutcome {
    fn passthrough(text: &str) -> Self {
        Self {
            text: text.to_string(),
            pii_matches: Vec::new(),
            injection_score: None,
            moderation: None,
        }
    }
}

/// Orchestrates PII, prompt-injection, and content-moderation checks
/// according to one [`SafetyConfig`].
///
/// Holds the built-in PII detectors plus whatever the caller registered
/// via [`SafetyPipeline::with_custom_detector`], and a pluggable
/// [`Moderator`] (defaulting to the built-in lexical one).
pub struct SafetyPipeline {
    config: SafetyConfig,
    custom_detectors: Vec<Box<dyn PiiDetector>>,
    moderator: Box<dyn Moderator>,
}

impl SafetyPipeline {
    #[must_use]
    pub fn new(config: SafetyConfig) -> Self {
        Self {
            config,
            custom_detectors: Vec::new(),
            moderator: Box::new(moderation::LexicalModerator),
        }
    }

    /// Register an additional PII detector (e.g. an internal id format)
    /// alongside the four built-ins.
    #[must_use]
    pub fn with_custom_detector(mut self, detector: Box<dyn PiiDetector>) -> Self {
        self.custom_detectors.push(detector);
        self
    }

    /// Swap in a non-lexical moderator (e.g. a model-backed one).
    #[must_use]
    pub fn with_moderator(mut self, moderator: Box<dyn Moderator>) -> Self {
        self.moderator = moderator;
        self
    }

    /// Run every enabled check over `text`, in PII → injection →
    /// moderation order.
    ///
    /// # Errors
    /// Returns [`NodeError::safety_block`] if prompt-injection detection
    /// is enabled with [`PromptInjectionAction::Block`] and the score
    /// exceeds the configured threshold, or if content moderation is
    /// enabled and any category exceeds its threshold.
    #[tracing::instrument(skip(self, text), fields(direction = direction.as_str(), len = text.len()))]
    pub fn check(&self, text: &str, direction: Direction) -> Result<SafetyOutcome, NodeError> {
        if !self.config.any_enabled() {
            return Ok(SafetyOutcome::passthrough(text));
        }

        let mut outcome = SafetyOutcome::passthrough(text);

        if self.config.enable_pii_detection {
            let detectors = self.pii_detectors();
            let matches = pii::scan(text, &detectors);
            if !matches.is_empty() {
                info!(count = matches.len(), "pii detected");
            }
            if self.config.pii_redaction_enabled && !matches.is_empty() {
                outcome.text = pii::redact(text, &matches, &self.config.pii_redaction_placeholder);
            }
            outcome.pii_matches = matches;
        }

        if self.config.enable_prompt_injection_detection {
            let score = injection::score(&outcome.text);
            let exceeded = score.exceeds(self.config.prompt_injection_threshold);
            if exceeded {
                match self.config.prompt_injection_action {
                    PromptInjectionAction::Allow => {}
                    PromptInjectionAction::Warn => {
                        warn!(score = score.score, phrases = ?score.matched_phrases, "prompt injection suspected");
                    }
                    PromptInjectionAction::Block => {
                        return Err(NodeError::safety_block(format!(
                            "prompt injection suspected (score {:.2} over threshold {:.2})",
                            score.score, self.config.prompt_injection_threshold
                        )));
                    }
                }
            }
            outcome.injection_score = Some(score);
        }

        if self.config.enable_content_moderation {
            let result = self.moderator.moderate(&outcome.text);
            if result.exceeds(self.config.content_moderation_threshold) {
                let (category, value) = result.worst();
                return Err(NodeError::safety_block(format!(
                    "content moderation blocked category {category:?} (score {value:.2} over threshold {:.2})",
                    self.config.content_moderation_threshold
                )));
            }
            outcome.moderation = Some(result);
        }

        Ok(outcome)
    }

    fn pii_detectors(&self) -> Vec<&dyn PiiDetector> {
        let mut detectors: Vec<&dyn PiiDetector> = vec![&SsnDetector, &CreditCardDetector, &PhoneDetector, &EmailDetector];
        detectors.extend(self.custom_detectors.iter().map(|d| d.as_ref()));
        detectors
    }
}
