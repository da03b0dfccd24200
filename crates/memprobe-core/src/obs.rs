//! Lifecycle events of a probe run.
//!
//! Every event carries a stable `event = "..."` field so log pipelines can
//! filter on it. All of them are `info!` except failures, which are `warn!`.

use tracing::{info, warn};

use crate::domain::{Perturbation, TaskFamily};

/// Span tagging everything inside a run with its `run_id`.
///
/// The harness attaches it with `Instrument` so it survives `.await` points.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("memprobe.run", run_id = %run_id)
}

pub fn emit_run_started(run_id: &str, models: usize, cases: usize, suite_digest: &str) {
    info!(
        event = "run.started",
        run_id = %run_id,
        models = models,
        cases = cases,
        suite_digest = %suite_digest,
    );
}

pub fn emit_model_unavailable(model: &str, reason: &str) {
    warn!(event = "model.unavailable", model = %model, reason = %reason);
}

pub fn emit_model_finished(model: &str, status: &str, completed_cases: usize, elapsed_ms: u64) {
    info!(
        event = "model.finished",
        model = %model,
        status = %status,
        completed_cases = completed_cases,
        elapsed_ms = elapsed_ms,
    );
}

/// A single case failed to generate; the run continues.
pub fn emit_case_failed(model: &str, case_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "case.failed", model = %model, case_id = %case_id, error = %error);
}

pub fn emit_family_aggregated(model: &str, family: TaskFamily, headline: f64) {
    info!(
        event = "family.aggregated",
        model = %model,
        family = %family,
        headline = headline,
    );
}

/// A perturbation drop crossed the significance threshold.
pub fn emit_regression_flagged(model: &str, family: TaskFamily, perturbation: Perturbation, drop: f64) {
    warn!(
        event = "regression.flagged",
        model = %model,
        family = %family,
        perturbation = %perturbation,
        drop = drop,
    );
}

pub fn emit_run_cancelled(run_id: &str, completed_models: usize) {
    warn!(event = "run.cancelled", run_id = %run_id, completed_models = completed_models);
}

pub fn emit_run_finished(run_id: &str, elapsed_ms: u64, models: usize, cancelled: bool) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        elapsed_ms = elapsed_ms,
        models = models,
        cancelled = cancelled,
    );
}

/// Report sink failure; the run result is still returned.
pub fn emit_sink_error(run_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "sink.error", run_id = %run_id, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        let _entered = run_span("test-run-id").entered();
        emit_family_aggregated("sim", TaskFamily::Arithmetic, 0.5);
    }
}
