//! Memory-vs-reasoning style classifier.
//!
//! A response is split into sentence units; each unit is labelled by which
//! cue list it hits more often. The memory ratio is the share of labelled
//! units that lean on recall.

use crate::domain::{ScoringAmbiguity, StyleClassification};

/// Ratio reported when no unit leans either way.
pub const NEUTRAL_RATIO: f64 = 0.5;

/// Units this short or shorter are skipped.
const MIN_UNIT_LEN: usize = 10;

pub const MEMORY_CUES: &[&str] = &[
    "know",
    "fact",
    "established",
    "according to",
    "defined as",
    "historically",
    "traditionally",
    "documented",
    "recorded",
    "well-known",
    "commonly known",
    "recognized as",
];

pub const REASONING_CUES: &[&str] = &[
    "therefore",
    "thus",
    "because",
    "since",
    "consequently",
    "analyzing",
    "considering",
    "calculating",
    "reasoning",
    "implies",
    "suggests",
    "demonstrates",
    "proves",
    "step by step",
    "given that",
    "if we",
    "we can conclude",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lean {
    Memory,
    Reasoning,
}

/// Sentence units longer than the minimum length, trimmed.
pub fn sentence_units(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|unit| unit.chars().count() > MIN_UNIT_LEN)
        .collect()
}

fn distinct_hits(unit: &str, cues: &[&str]) -> usize {
    cues.iter().filter(|cue| unit.contains(*cue)).count()
}

/// Label one unit; ties (including zero hits) are unlabelled.
pub fn classify_unit(unit: &str) -> Option<Lean> {
    let lower = unit.to_lowercase();
    let memory = distinct_hits(&lower, MEMORY_CUES);
    let reasoning = distinct_hits(&lower, REASONING_CUES);
    match memory.cmp(&reasoning) {
        std::cmp::Ordering::Greater => Some(Lean::Memory),
        std::cmp::Ordering::Less => Some(Lean::Reasoning),
        std::cmp::Ordering::Equal => None,
    }
}

/// Classify `text` against the expected memory ratio.
pub fn classify(text: &str, expected_ratio: f64) -> (StyleClassification, Option<ScoringAmbiguity>) {
    let mut memory_sentences = 0;
    let mut reasoning_sentences = 0;
    for unit in sentence_units(text) {
        match classify_unit(unit) {
            Some(Lean::Memory) => memory_sentences += 1,
            Some(Lean::Reasoning) => reasoning_sentences += 1,
            None => {}
        }
    }

    let labelled = memory_sentences + reasoning_sentences;
    let (memory_ratio, ambiguity) = if labelled == 0 {
        (NEUTRAL_RATIO, Some(ScoringAmbiguity::NoClassifiableSentences))
    } else {
        (memory_sentences as f64 / labelled as f64, None)
    };

    let classification = StyleClassification {
        memory_ratio,
        expected_ratio,
        alignment: alignment(expected_ratio, memory_ratio),
        memory_sentences,
        reasoning_sentences,
    };
    (classification, ambiguity)
}

/// `1 - |expected - observed|`, clamped to [0, 1].
pub fn alignment(expected: f64, observed: f64) -> f64 {
    (1.0 - (expected - observed).abs()).clamp(0.0, 1.0)
}
