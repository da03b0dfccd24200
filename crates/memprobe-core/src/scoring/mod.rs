//! Family-specific scoring of raw responses.
//!
//! [`score`] dispatches on the case's family. Generation errors never raise:
//! accuracy-scored families mark them incorrect, the style classifier sees an
//! empty text and reports the neutral ratio.

pub mod arithmetic;
pub mod logic;
pub mod style;

use crate::domain::{
    Expected, RawResponse, Score, ScoredResult, ScoringAmbiguity, TaskFamily,
};

/// Score one response. Pure.
pub fn score(response: RawResponse) -> ScoredResult {
    let (score, ambiguity) = match response.case.family {
        TaskFamily::Arithmetic => score_arithmetic(&response),
        TaskFamily::LogicPuzzle => score_logic(&response),
        TaskFamily::MemoryReasoning => score_style(&response),
    };

    ScoredResult {
        response,
        score,
        ambiguity,
    }
}

/// Score a batch, preserving order.
pub fn score_all(responses: Vec<RawResponse>) -> Vec<ScoredResult> {
    responses.into_iter().map(score).collect()
}

fn score_arithmetic(response: &RawResponse) -> (Score, Option<ScoringAmbiguity>) {
    let correct = !response.is_error()
        && arithmetic::check_answer(&response.case.expected.display_text(), &response.text);
    (Score::Correctness { correct }, None)
}

fn score_logic(response: &RawResponse) -> (Score, Option<ScoringAmbiguity>) {
    let (text, participants) = match &response.case.expected {
        Expected::Assignment { text, participants } => (text.as_str(), participants.as_slice()),
        other => {
            // Not produced by the suite; fall back to plain matching.
            let correct = !response.is_error()
                && arithmetic::check_answer(&other.display_text(), &response.text);
            return (Score::Correctness { correct }, None);
        }
    };

    let check = logic::check_answer(text, participants, &response.text);
    let ambiguity = check
        .pairs
        .is_empty()
        .then_some(ScoringAmbiguity::NoExpectedPairs);
    let correct = !response.is_error() && check.correct;
    (Score::Correctness { correct }, ambiguity)
}

fn score_style(response: &RawResponse) -> (Score, Option<ScoringAmbiguity>) {
    let expected_ratio = match response.case.expected {
        Expected::MemoryRatio { ratio } => ratio,
        _ => style::NEUTRAL_RATIO,
    };
    let (classification, ambiguity) = style::classify(&response.text, expected_ratio);
    (Score::Style(classification), ambiguity)
}
