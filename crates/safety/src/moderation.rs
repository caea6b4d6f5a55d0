//! Lexical content-moderation scoring.
//!
//! Real moderation is ordinarily a model call; this crate has no model
//! adapter of its own; it exposes a deterministic, testable stand-in —
//! per-category keyword/pattern weights summed and clamped to
//! `[0.0, 1.0]` — that a caller can replace with a real classifier by
//! implementing [`Moderator`].

use std::sync::LazyLock;

use regex::RegexSet;
use serde::{Deserialize, Serialize};

/// One of the moderation categories this pipeline scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationCategory {
    Hate,
    Violence,
    SelfHarm,
    Sexual,
}

impl ModerationCategory {
    const ALL: [ModerationCategory; 4] = [
        ModerationCategory::Hate,
        ModerationCategory::Violence,
        ModerationCategory::SelfHarm,
        ModerationCategory::Sexual,
    ];
}

/// Per-category scores for one piece of text, each in `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationResult {
    pub hate: f64,
    pub violence: f64,
    pub self_harm: f64,
    pub sexual: f64,
}

impl ModerationResult {
    #[must_use]
    pub fn clean() -> Self {
        Self {
            hate: 0.0,
            violence: 0.0,
            self_harm: 0.0,
            sexual: 0.0,
        }
    }

    #[must_use]
    pub fn score_for(&self, category: ModerationCategory) -> f64 {
        match category {
            ModerationCategory::Hate => self.hate,
            ModerationCategory::Violence => self.violence,
            ModerationCategory::SelfHarm => self.self_harm,
            ModerationCategory::Sexual => self.sexual,
        }
    }

    /// The highest-scoring category, with its score.
    #[must_use]
    pub fn worst(&self) -> (ModerationCategory, f64) {
        ModerationCategory::ALL
            .into_iter()
            .map(|c| (c, self.score_for(c)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .expect("ALL is non-empty")
    }

    /// Whether any category exceeds `threshold`.
    #[must_use]
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.worst().1 > threshold
    }
}

/// A pluggable moderation backend. The built-in [`score`] function is the
/// default lexical implementation; a real deployment can swap in a model-
/// backed implementation behind the same trait.
pub trait Moderator: Send + Sync {
    fn moderate(&self, text: &str) -> ModerationResult;
}

/// The built-in lexical moderator, using [`score`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalModerator;

impl Moderator for LexicalModerator {
    fn moderate(&self, text: &str) -> ModerationResult {
        score(text)
    }
}

struct CategoryPatterns {
    category: ModerationCategory,
    patterns: &'static [&'static str],
}

const CATEGORY_PATTERNS: &[CategoryPatterns] = &[
    CategoryPatterns {
        category: ModerationCategory::Hate,
        patterns: &[
            r"(?i)\b(subhuman|racial slur|ethnic cleansing)\b",
            r"(?i)\ball [a-z]+ (people|folks) (are|should be) (killed|exterminated|eliminated)\b",
        ],
    },
    CategoryPatterns {
        category: ModerationCategory::Violence,
        patterns: &[
            r"(?i)\bhow to (make|build) a (bomb|pipe bomb|explosive)\b",
            r"(?i)\b(kill|murder|slaughter) (him|her|them|everyone) (now|tonight)\b",
            r"(?i)\bmass shooting\b",
        ],
    },
    CategoryPatterns {
        category: ModerationCategory::SelfHarm,
        patterns: &[
            r"(?i)\b(i want to|going to) (kill myself|end it all|commit suicide)\b",
            r"(?i)\bhow to (commit suicide|self[- ]harm)\b",
        ],
    },
    CategoryPatterns {
        category: ModerationCategory::Sexual,
        patterns: &[
            r"(?i)\bsexual(ly)? explicit\b",
            r"(?i)\b(explicit|graphic) sexual (content|acts?) involving (a )?minors?\b",
        ],
    },
];

static COMPILED: LazyLock<Vec<(ModerationCategory, RegexSet)>> = LazyLock::new(|| {
    CATEGORY_PATTERNS
        .iter()
        .map(|cp| {
            (
                cp.category,
                RegexSet::new(cp.patterns).expect("all moderation patterns compile"),
            )
        })
        .collect()
});

const WEIGHT_PER_MATCH: f64 = 0.8;

/// Score `text` across all four categories using the built-in pattern
/// sets. Each matching pattern within a category contributes
/// [`WEIGHT_PER_MATCH`], clamped to `1.0` per category.
#[must_use]
pub fn score(text: &str) -> ModerationResult {
    let mut result = ModerationResult::clean();
    for (category, set) in COMPILED.iter() {
        let hits = set.matches(text).iter().count();
        if hits == 0 {
            continue;
        }
        let value = (hits as f64 * WEIGHT_PER_MATCH).min(1.0);
        match category {
            ModerationCategory::Hate => result.hate = value,
            ModerationCategory::Violence => result.violence = value,
            ModerationCategory::SelfHarm => result.self_harm = value,
            ModerationCategory::Sexual => result.sexual = value,
        }
    }
    result
}
