//! Process-wide query counters.
//!
//! Incremented silently by the harness; [`Metrics::flush`] emits them as one
//! `info!` event at the end of a run.

use std::sync::atomic::{AtomicU64, Ordering};

pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    queries_issued: AtomicU64,
    generation_errors: AtomicU64,
    cases_scored: AtomicU64,
    models_unavailable: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            queries_issued: AtomicU64::new(0),
            generation_errors: AtomicU64::new(0),
            cases_scored: AtomicU64::new(0),
            models_unavailable: AtomicU64::new(0),
        }
    }

    pub fn inc_queries(&self) {
        self.queries_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_generation_errors(&self) {
        self.generation_errors.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "generation_errors", "counter incremented");
    }

    pub fn add_cases_scored(&self, n: u64) {
        self.cases_scored.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_models_unavailable(&self) {
        self.models_unavailable.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "models_unavailable", "counter incremented");
    }

    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            queries_issued = self.queries_issued(),
            generation_errors = self.generation_errors(),
            cases_scored = self.cases_scored(),
            models_unavailable = self.models_unavailable(),
        );
    }

    pub fn queries_issued(&self) -> u64 {
        self.queries_issued.load(Ordering::Relaxed)
    }

    pub fn generation_errors(&self) -> u64 {
        self.generation_errors.load(Ordering::Relaxed)
    }

    pub fn cases_scored(&self) -> u64 {
        self.cases_scored.load(Ordering::Relaxed)
    }

    pub fn models_unavailable(&self) -> u64 {
        self.models_unavailable.load(Ordering::Relaxed)
    }

    /// Zero every counter (tests only need this).
    pub fn reset(&self) {
        self.queries_issued.store(0, Ordering::Relaxed);
        self.generation_errors.store(0, Ordering::Relaxed);
        self.cases_scored.store(0, Ordering::Relaxed);
        self.models_unavailable.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_queries();
        m.inc_queries();
        m.inc_generation_errors();
        m.add_cases_scored(5);
        m.inc_models_unavailable();
        assert_eq!(m.queries_issued(), 2);
        assert_eq!(m.generation_errors(), 1);
        assert_eq!(m.cases_scored(), 5);
        assert_eq!(m.models_unavailable(), 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_queries();
        m.add_cases_scored(3);
        m.reset();
        assert_eq!(m.queries_issued(), 0);
        assert_eq!(m.cases_scored(), 0);
    }
}
