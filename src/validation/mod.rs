//! Prompt screening before any costed call is made.
//!
//! Validation is pure: a verdict is a value, not an error. Rejections are an
//! expected, frequent outcome and are never logged as faults.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Why a prompt was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Trimmed text has zero length.
    Empty,
    /// Character count exceeds the configured ceiling.
    TooLong,
    /// Too few distinct words for the input's length (spam heuristic).
    RepetitivePattern,
    /// Text contains a denylisted phrase.
    BlockedKeyword,
}

/// Outcome of validating a single prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationVerdict {
    Accepted,
    Rejected(RejectReason),
}

impl ValidationVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Self::Accepted => None,
            Self::Rejected(reason) => Some(*reason),
        }
    }
}

/// Distinct-to-total word ratio below which an input is considered spam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpamRatio {
    pub numerator: u32,
    pub denominator: u32,
}

impl Default for SpamRatio {
    fn default() -> Self {
        Self {
            numerator: 1,
            denominator: 3,
        }
    }
}

/// Static screening policy for incoming prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    /// Maximum prompt length in characters.
    pub prompt_char_ceiling: usize,
    /// Spam check only applies above this word count.
    pub spam_min_words: usize,
    /// Reject when `distinct / total` falls below this ratio.
    pub spam_ratio: SpamRatio,
    /// Phrases rejected by case-insensitive substring match.
    pub blocked_keywords: Vec<String>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            prompt_char_ceiling: 500,
            spam_min_words: 5,
            spam_ratio: SpamRatio::default(),
            blocked_keywords: default_blocked_keywords(),
        }
    }
}

fn default_blocked_keywords() -> Vec<String> {
    [
        "write a book",
        "write a novel",
        "write an entire",
        "generate a complete",
        "translate the entire",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Screens prompts against a [`ValidationPolicy`].
///
/// Checks run in a fixed order (empty, length, repetition, denylist) and the
/// first failure determines the reported reason.
#[derive(Debug, Clone)]
pub struct InputValidator {
    policy: ValidationPolicy,
    // Denylist pre-lowercased so matching is a plain substring scan.
    lowered_keywords: Vec<String>,
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new(ValidationPolicy::default())
    }
}

impl InputValidator {
    pub fn new(policy: ValidationPolicy) -> Self {
        let lowered_keywords = policy
            .blocked_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .collect();
        Self {
            policy,
            lowered_keywords,
        }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn validate(&self, text: &str) -> ValidationVerdict {
        if text.trim().is_empty() {
            return ValidationVerdict::Rejected(RejectReason::Empty);
        }

        if text.chars().count() > self.policy.prompt_char_ceiling {
            return ValidationVerdict::Rejected(RejectReason::TooLong);
        }

        let lowered = text.to_lowercase();

        if self.looks_repetitive(&lowered) {
            return ValidationVerdict::Rejected(RejectReason::RepetitivePattern);
        }

        if self.lowered_keywords.iter().any(|k| lowered.contains(k)) {
            return ValidationVerdict::Rejected(RejectReason::BlockedKeyword);
        }

        ValidationVerdict::Accepted
    }

    // Integer cross-multiplication, no floats: reject when
    // distinct / total < numerator / denominator.
    fn looks_repetitive(&self, lowered: &str) -> bool {
        let mut total: usize = 0;
        let mut distinct = HashSet::new();
        for word in lowered.split_whitespace() {
            total += 1;
            distinct.insert(word);
        }
        if total <= self.policy.spam_min_words {
            return false;
        }
        let ratio = self.policy.spam_ratio;
        distinct.len() as u64 * (ratio.denominator as u64) < total as u64 * ratio.numerator as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_blank_rejected() {
        let validator = InputValidator::default();
        assert_eq!(
            validator.validate(""),
            ValidationVerdict::Rejected(RejectReason::Empty)
        );
        assert_eq!(
            validator.validate("   "),
            ValidationVerdict::Rejected(RejectReason::Empty)
        );
    }

    #[test]
    fn test_length_boundary() {
        let validator = InputValidator::default();

        let at_ceiling = "a".repeat(500);
        assert!(validator.validate(&at_ceiling).is_accepted());

        let over_ceiling = "a".repeat(501);
        assert_eq!(
            validator.validate(&over_ceiling),
            ValidationVerdict::Rejected(RejectReason::TooLong)
        );
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let validator = InputValidator::default();
        // 500 multibyte characters is still at the ceiling.
        let text = "é".repeat(500);
        assert!(validator.validate(&text).is_accepted());
    }

    #[test]
    fn test_repetitive_pattern() {
        let validator = InputValidator::default();

        // 6 words, 1 distinct: 1*3 < 6.
        assert_eq!(
            validator.validate("spam spam spam spam spam spam"),
            ValidationVerdict::Rejected(RejectReason::RepetitivePattern)
        );

        // 6 words, 2 distinct: 2*3 == 6, not strictly below the ratio.
        assert!(validator.validate("go stop go stop go stop").is_accepted());

        // At most 5 words is never checked.
        assert!(validator.validate("spam spam spam spam spam").is_accepted());
    }

    #[test]
    fn test_blocked_keyword_case_insensitive() {
        let validator = InputValidator::default();
        assert_eq!(
            validator.validate("write a book about dogs"),
            ValidationVerdict::Rejected(RejectReason::BlockedKeyword)
        );
        assert_eq!(
            validator.validate("Please Write A Book about dogs"),
            ValidationVerdict::Rejected(RejectReason::BlockedKeyword)
        );
    }

    #[test]
    fn test_first_failing_check_wins() {
        let validator = InputValidator::default();
        // Oversized AND repetitive: length check runs first.
        let text = "spam ".repeat(200);
        assert_eq!(
            validator.validate(&text),
            ValidationVerdict::Rejected(RejectReason::TooLong)
        );
    }

    #[test]
    fn test_custom_policy() {
        let validator = InputValidator::new(ValidationPolicy {
            prompt_char_ceiling: 10,
            blocked_keywords: vec!["Forbidden".into()],
            ..ValidationPolicy::default()
        });

        assert!(validator.validate("short").is_accepted());
        assert_eq!(
            validator.validate("forbidden"),
            ValidationVerdict::Rejected(RejectReason::BlockedKeyword)
        );
    }
}
