//! memprobe core library
//!
//! Probes whether a model's correct answers come from recall or from
//! reasoning: the same task is asked under controlled perturbations and the
//! accuracy drop is measured, and open answers are classified as
//! memory- or reasoning-leaning.

pub mod aggregate;
pub mod domain;
pub mod gate;
pub mod harness;
pub mod metrics;
pub mod model;
pub mod obs;
pub mod report;
pub mod reporting;
pub mod scoring;
pub mod simulated;
pub mod suite;
pub mod telemetry;

pub use aggregate::{
    AccuracySummary, AggregateConfig, AggregateMetric, AlignmentVerdict, CounterfactualVerdict,
    FamilyMetrics, FamilySummary, MemorySummary, PerturbationReport, VariantDrop,
};

pub use domain::{
    Expected, GenerationError, Perturbation, ProbeError, RawResponse, Result, Score, ScoredResult,
    ScoringAmbiguity, StyleClassification, TaskCase, TaskFamily,
};

pub use gate::{evaluate_gate, GateRule, GateRuleSet, GateVerdict, Violation};

pub use harness::{run_suite, CancelHandle, Harness, HarnessConfig, NullSink, ReportSink};

pub use model::{check_availability, ModelClient, QueryOptions, AVAILABILITY_PROMPT};

pub use report::{
    result_tree, FlatRecord, ModelReport, ModelStatus, ResultTree, RunReport,
};

pub use reporting::FileSink;

pub use simulated::{Profile, SimulatedModel};

pub use suite::{SuiteConfig, TaskSuite};

pub use telemetry::{init_tracing, LogFormat};

/// Crate version, recorded in CLI output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
