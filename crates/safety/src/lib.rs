//! The Safety Pipeline (`SPEC_FULL.md` §4.G): PII detection and
//! redaction, prompt-injection heuristics, and content moderation,
//! applied uniformly to inbound and outbound text at node and agent
//! boundaries.

mod config;
mod injection;
mod moderation;
mod pii;
mod pipeline;

pub use config::{PromptInjectionAction, SafetyConfig};
pub use injection::{score as score_injection, InjectionScore};
pub use moderation::{score as score_moderation, LexicalModerator, ModerationCategory, ModerationResult, Moderator};
pub use pii::{
    redact, scan, CreditCardDetector, CustomDetector, EmailDetector, PhoneDetector, PiiDetector, PiiKind, PiiMatch,
    SsnDetector,
};
pub use pipeline::{Direction, SafetyOutcome, SafetyPipeline};
