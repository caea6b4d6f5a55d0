//! PII detection and in-place redaction.
//!
//! Detectors are regex-based and report byte spans within the scanned
//! text; redaction replaces each matched span with a configurable
//! placeholder, working back-to-front so earlier spans' offsets stay
//! valid while later ones are rewritten.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Which built-in (or custom) detector found a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiKind {
    Ssn,
    CreditCard,
    Phone,
    Email,
    /// A caller-registered detector, named by its label.
    Custom(String),
}

/// One matched span of PII inside a scanned string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiMatch {
    pub kind: PiiKind,
    pub start: usize,
    pub end: usize,
    pub matched_text: String,
}

/// A pluggable PII detector. The built-in SSN/credit-card/phone/email
/// detectors all implement this; a caller can register further detectors
/// (e.g. an internal employee-id format) without touching the pipeline.
pub trait PiiDetector: Send + Sync {
    /// This detector's label, used as [`PiiKind::Custom`] for detectors
    /// that aren't one of the four built-ins.
    fn name(&self) -> &str;

    /// Find every match of this detector's pattern in `text`.
    fn detect(&self, text: &str) -> Vec<PiiMatch>;
}

static SSN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("valid regex"));
static CREDIT_CARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\d[ -]?){13,19}\b").expect("valid regex"));
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b").expect("valid regex")
});
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid regex")
});

/// `###-##-####`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SsnDetector;

impl PiiDetector for SsnDetector {
    fn name(&self) -> &str {
        "ssn"
    }

    fn detect(&self, text: &str) -> Vec<PiiMatch> {
        SSN_RE
            .find_iter(text)
            .map(|m| PiiMatch {
                kind: PiiKind::Ssn,
                start: m.start(),
                end: m.end(),
                matched_text: m.as_str().to_string(),
            })
            .collect()
    }
}

/// 13-19 digit runs (optionally space/dash separated) that pass the Luhn
/// checksum.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreditCardDetector;

impl PiiDetector for CreditCardDetector {
    fn name(&self) -> &str {
        "credit_card"
    }

    fn detect(&self, text: &str) -> Vec<PiiMatch> {
        CREDIT_CARD_RE
            .find_iter(text)
            .filter(|m| passes_luhn(m.as_str()))
            .map(|m| PiiMatch {
                kind: PiiKind::CreditCard,
                start: m.start(),
                end: m.end(),
                matched_text: m.as_str().to_string(),
            })
            .collect()
    }
}

/// North-American-style phone numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhoneDetector;

impl PiiDetector for PhoneDetector {
    fn name(&self) -> &str {
        "phone"
    }

    fn detect(&self, text: &str) -> Vec<PiiMatch> {
        PHONE_RE
            .find_iter(text)
            .map(|m| PiiMatch {
                kind: PiiKind::Phone,
                start: m.start(),
                end: m.end(),
                matched_text: m.as_str().to_string(),
            })
            .collect()
    }
}

/// `local@domain.tld`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailDetector;

impl PiiDetector for EmailDetector {
    fn name(&self) -> &str {
        "email"
    }

    fn detect(&self, text: &str) -> Vec<PiiMatch> {
        EMAIL_RE
            .find_iter(text)
            .map(|m| PiiMatch {
                kind: PiiKind::Email,
                start: m.start(),
                end: m.end(),
                matched_text: m.as_str().to_string(),
            })
            .collect()
    }
}

/// A caller-supplied regex pattern, reported as [`PiiKind::Custom`].
pub struct CustomDetector {
    label: String,
    pattern: Regex,
}

impl CustomDetector {
    /// # Errors
    /// Propagates `regex`'s parse error if `pattern` is invalid.
    pub fn new(label: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            label: label.into(),
            pattern: Regex::new(pattern)?,
        })
    }
}

impl PiiDetector for CustomDetector {
    fn name(&self) -> &str {
        &self.label
    }

    fn detect(&self, text: &str) -> Vec<PiiMatch> {
        self.pattern
            .find_iter(text)
            .map(|m| PiiMatch {
                kind: PiiKind::Custom(self.label.clone()),
                start: m.start(),
                end: m.end(),
                matched_text: m.as_str().to_string(),
            })
            .collect()
    }
}

/// Standard mod-10 checksum over the digits of `candidate`, ignoring any
/// spaces or dashes.
fn passes_luhn(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate
        .chars()
        .filter(|c| c.is_ascii_digit())
        .filter_map(|c| c.to_digit(10))
        .collect();
    if digits.len() < 13 {
        return false;
    }
    let mut sum = 0u32;
    let mut double = false;
    for &digit in digits.iter().rev() {
        let mut d = digit;
        if double {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
        double = !double;
    }
    sum % 10 == 0
}

/// Run every detector in `detectors` over `text`, returning all matches
/// in source order (detector order, then position within each).
#[must_use]
pub fn scan(text: &str, detectors: &[&dyn PiiDetector]) -> Vec<PiiMatch> {
    let mut matches: Vec<PiiMatch> = detectors.iter().flat_map(|d| d.detect(text)).collect();
    matches.sort_by_key(|m| m.start);
    matches
}

/// Replace every matched span in `text` with `placeholder`, working from
/// the end of the string backward so earlier offsets stay valid.
///
/// Overlapping matches (a later detector's span starting inside an
/// earlier one) are skipped once their region has already been
/// consumed by an earlier, lower-offset replacement.
#[must_use]
pub fn redact(text: &str, matches: &[PiiMatch], placeholder: &str) -> String {
    let mut sorted: Vec<&PiiMatch> = matches.iter().collect();
    sorted.sort_by_key(|m| m.start);

    let mut result = String::new();
    let mut cursor = 0usize;
    for m in sorted {
        if m.start < cursor {
            continue;
        }
        result.push_str(&text[cursor..m.start]);
        result.push_str(placeholder);
        cursor = m.end;
    }
    result.push_str(&text[cursor..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn detects_ssn() {
        let matches = SsnDetector.detect("my ssn is 123-45-6789 ok");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].kind, PiiKind::Ssn);
    }

    #[test]
    fn detects_email() {
        let matches = EmailDetector.detect("contact ada@example.com please");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].matched_text, "ada@example.com");
    }

    #[test]
    fn detects_valid_credit_card_number() {
        // Well-known Luhn-valid Visa test number.
        let matches = CreditCardDetector.detect("card: 4111111111111111 thanks");
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn rejects_digit_run_failing_luhn() {
        let matches = CreditCardDetector.detect("not a card: 1234567890123456");
        assert!(matches.is_empty());
    }

    #[test]
    fn detects_phone_number() {
        let matches = PhoneDetector.detect("call me at (415) 555-0199 soon");
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn redact_replaces_matched_span_only() {
        let text = "email me at ada@example.com now";
        let matches = EmailDetector.detect(text);
        let redacted = redact(text, &matches, "[REDACTED]");
        assert_eq!(redacted, "email me at [REDACTED] now");
    }

    #[test]
    fn redact_handles_multiple_non_overlapping_matches() {
        let text = "ada@example.com and bob@example.com";
        let matches = EmailDetector.detect(text);
        let redacted = redact(text, &matches, "[X]");
        assert_eq!(redacted, "[X] and [X]");
    }

    #[test]
    fn scan_runs_every_detector_and_sorts_by_position() {
        let detectors: Vec<&dyn PiiDetector> = vec![&EmailDetector, &SsnDetector];
        let text = "ssn 123-45-6789 then email ada@example.com";
        let matches = scan(text, &detectors);
        assert_eq!(matches.len(), 2);
        assert!(matches[0].start < matches[1].start);
    }

    #[test]
    fn custom_detector_reports_its_label() {
        let detector = CustomDetector::new("employee_id", r"EMP-\d{6}").unwrap();
        let matches = detector.detect("badge EMP-004821 expires");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].kind, PiiKind::Custom("employee_id".to_string()));
    }
}
