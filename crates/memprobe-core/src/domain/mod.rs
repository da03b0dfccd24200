//! Domain models for the harness.
//!
//! - `TaskCase`: one immutable prompt with its expected answer
//! - `RawResponse`: what a model returned for a case
//! - `ScoredResult`: a response with its family-specific score

pub mod error;
pub mod result;
pub mod task;

pub use error::{GenerationError, ProbeError, Result};
pub use result::{RawResponse, Score, ScoredResult, ScoringAmbiguity, StyleClassification};
pub use task::{Expected, Perturbation, TaskCase, TaskFamily};
