//! Per-case responses and their scores.

use serde::{Deserialize, Serialize};

use super::error::GenerationError;
use super::task::TaskCase;

/// What one model said for one case. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    pub case: TaskCase,
    /// Generated text; empty when `error` is set.
    pub text: String,
    pub latency_ms: u64,
    pub error: Option<GenerationError>,
}

impl RawResponse {
    pub fn from_outcome(
        case: TaskCase,
        outcome: Result<String, GenerationError>,
        latency_ms: u64,
    ) -> Self {
        match outcome {
            Ok(text) => Self {
                case,
                text,
                latency_ms,
                error: None,
            },
            Err(error) => Self {
                case,
                text: String::new(),
                latency_ms,
                error: Some(error),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Degenerate scoring situations resolved by fixed policy rather than raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringAmbiguity {
    /// No (name, role) pair could be extracted from the expected answer; the
    /// logic scorer returns `true` for the empty requirement set.
    NoExpectedPairs,
    /// No sentence was classified as memory- or reasoning-leaning; the style
    /// classifier returns the neutral ratio 0.5.
    NoClassifiableSentences,
}

/// Output of the memory/reasoning style classifier for one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleClassification {
    /// Fraction of classified sentences that lean on recalled facts, in [0, 1].
    pub memory_ratio: f64,
    pub expected_ratio: f64,
    /// `1 - |expected_ratio - memory_ratio|`, in [0, 1].
    pub alignment: f64,
    pub memory_sentences: usize,
    pub reasoning_sentences: usize,
}

/// Family-specific score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Score {
    Correctness { correct: bool },
    Style(StyleClassification),
}

/// A response together with its score. Owned by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub response: RawResponse,
    pub score: Score,
    pub ambiguity: Option<ScoringAmbiguity>,
}

impl ScoredResult {
    pub fn case(&self) -> &TaskCase {
        &self.response.case
    }

    /// `true` only for correctness-scored results that were judged correct.
    pub fn is_correct(&self) -> bool {
        matches!(self.score, Score::Correctness { correct: true })
    }

    pub fn style(&self) -> Option<&StyleClassification> {
        match &self.score {
            Score::Style(style) => Some(style),
            Score::Correctness { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{Expected, Perturbation, TaskFamily};

    fn case() -> TaskCase {
        TaskCase::new(
            TaskFamily::Arithmetic,
            Perturbation::Clean,
            0,
            "What is 7 + 8?".to_string(),
            Expected::Text {
                answer: "15".to_string(),
            },
        )
    }

    #[test]
    fn test_from_outcome_error_leaves_text_empty() {
        let raw = RawResponse::from_outcome(case(), Err(GenerationError::EmptyResponse), 12);
        assert!(raw.is_error());
        assert!(raw.text.is_empty());
        assert_eq!(raw.latency_ms, 12);
    }

    #[test]
    fn test_is_correct_only_for_correct_correctness_scores() {
        let raw = RawResponse::from_outcome(case(), Ok("15".to_string()), 1);
        let scored = ScoredResult {
            response: raw.clone(),
            score: Score::Correctness { correct: true },
            ambiguity: None,
        };
        assert!(scored.is_correct());
        assert!(scored.style().is_none());

        let styled = ScoredResult {
            response: raw,
            score: Score::Style(StyleClassification {
                memory_ratio: 1.0,
                expected_ratio: 1.0,
                alignment: 1.0,
                memory_sentences: 1,
                reasoning_sentences: 0,
            }),
            ambiguity: None,
        };
        assert!(!styled.is_correct());
        assert!(styled.style().is_some());
    }
}
