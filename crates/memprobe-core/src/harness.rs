//! Runs a task suite against a list of models.
//!
//! Models run one after another. Within a model, cases are queried by a
//! bounded pool of tokio tasks; their responses come back over an mpsc
//! channel and are re-ordered by case index before scoring, so reports never
//! depend on scheduling. A failing model or case never aborts the run.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{debug, info, Instrument};
use uuid::Uuid;

use crate::aggregate::{self, AggregateConfig, FamilySummary};
use crate::domain::{GenerationError, RawResponse, Result, TaskCase};
use crate::metrics::METRICS;
use crate::model::{check_availability, ModelClient, QueryOptions};
use crate::obs;
use crate::report::{result_tree, ModelReport, ModelStatus, RunReport};
use crate::scoring;
use crate::suite::TaskSuite;

/// Receives results as the run progresses.
pub trait ReportSink: Send + Sync {
    /// Called once per model, including unavailable and cancelled ones.
    fn model_finished(&self, report: &ModelReport) -> anyhow::Result<()>;

    /// Called once with the full tree, also after cancellation.
    fn run_finished(&self, report: &RunReport) -> anyhow::Result<()>;
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn model_finished(&self, _report: &ModelReport) -> anyhow::Result<()> {
        Ok(())
    }

    fn run_finished(&self, _report: &RunReport) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    /// Maximum in-flight queries per model.
    pub concurrency: usize,
    /// Upper bound on a single query.
    pub query_timeout: Duration,
    /// Skip the availability probe when `None`.
    pub availability_timeout: Option<Duration>,
    pub aggregate: AggregateConfig,
    /// Recorded in the report; the suite is built by the caller.
    pub seed: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            query_timeout: Duration::from_secs(30),
            availability_timeout: Some(Duration::from_secs(30)),
            aggregate: AggregateConfig::default(),
            seed: 42,
        }
    }
}

/// Handle used to stop a run from outside.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }
}

/// Resolves once the flag is set; never resolves if the sender is gone
/// without setting it.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

pub struct Harness {
    suite: Arc<TaskSuite>,
    config: HarnessConfig,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

impl Harness {
    pub fn new(suite: TaskSuite, config: HarnessConfig) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            suite: Arc::new(suite),
            config,
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
        }
    }

    pub fn suite(&self) -> &TaskSuite {
        &self.suite
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancel_tx))
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    /// Run every model over the suite and hand the tree to `sink`.
    pub async fn run(&self, models: &[Arc<dyn ModelClient>], sink: &dyn ReportSink) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = obs::run_span(&run_id.to_string());
        self.run_inner(run_id, models, sink).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        models: &[Arc<dyn ModelClient>],
        sink: &dyn ReportSink,
    ) -> Result<RunReport> {
        let started = Instant::now();
        let generated_at = Utc::now();
        let suite_digest = self.suite.digest()?;
        let run_id_str = run_id.to_string();

        obs::emit_run_started(&run_id_str, models.len(), self.suite.len(), &suite_digest);

        let mut reports = Vec::with_capacity(models.len());
        for model in models {
            let report = self.run_model(Arc::clone(model)).await;
            if let Err(e) = sink.model_finished(&report) {
                obs::emit_sink_error(&run_id_str, &e);
            }
            reports.push(report);
        }

        let cancelled = self.is_cancelled();
        if cancelled {
            let completed = reports
                .iter()
                .filter(|r| r.status == ModelStatus::Completed)
                .count();
            obs::emit_run_cancelled(&run_id_str, completed);
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let report = RunReport {
            run_id,
            generated_at,
            suite_digest,
            seed: self.config.seed,
            families: self.suite.families(),
            results: result_tree(&reports),
            models: reports,
            cancelled,
            elapsed_ms,
        };

        if let Err(e) = sink.run_finished(&report) {
            obs::emit_sink_error(&run_id_str, &e);
        }
        METRICS.flush();
        obs::emit_run_finished(&run_id_str, elapsed_ms, report.models.len(), cancelled);
        Ok(report)
    }

    async fn run_model(&self, client: Arc<dyn ModelClient>) -> ModelReport {
        let name = client.model_name();
        let started = Instant::now();
        let total_cases = self.suite.len();

        if !self.is_cancelled() {
            if let Some(timeout) = self.config.availability_timeout {
                if let Err(e) = check_availability(client.as_ref(), timeout).await {
                    let reason = e.to_string();
                    obs::emit_model_unavailable(&name, &reason);
                    METRICS.inc_models_unavailable();
                    return ModelReport::unavailable(name, reason, total_cases);
                }
            }
        }

        let responses = self.query_cases(&name, client).await;
        let status = if responses.len() < total_cases && self.is_cancelled() {
            ModelStatus::Cancelled
        } else {
            ModelStatus::Completed
        };

        let results = scoring::score_all(responses);
        METRICS.add_cases_scored(results.len() as u64);

        let families = aggregate::aggregate(&self.suite.families(), &results, &self.config.aggregate);
        for family in &families {
            match &family.summary {
                FamilySummary::Accuracy(summary) => {
                    let baseline = summary
                        .perturbation
                        .as_ref()
                        .map(|p| p.baseline_accuracy)
                        .unwrap_or(0.0);
                    obs::emit_family_aggregated(&name, family.family, baseline);
                    if let Some(report) = &summary.perturbation {
                        for variant in report.significant() {
                            obs::emit_regression_flagged(
                                &name,
                                family.family,
                                variant.perturbation,
                                variant.drop,
                            );
                        }
                    }
                }
                FamilySummary::Style(summary) => {
                    obs::emit_family_aggregated(&name, family.family, summary.mean_alignment);
                }
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        obs::emit_model_finished(&name, status.as_str(), results.len(), elapsed_ms);

        ModelReport {
            model: name,
            status,
            error: None,
            families,
            results,
            total_cases,
            elapsed_ms,
        }
    }

    /// Query every case with at most `concurrency` in flight. Cases that had
    /// not started (or not finished) when cancellation hit are left out.
    async fn query_cases(&self, name: &str, client: Arc<dyn ModelClient>) -> Vec<RawResponse> {
        let sem = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let (tx, mut rx) = mpsc::channel::<(usize, RawResponse)>(self.suite.len().max(1));
        let mut tasks = Vec::with_capacity(self.suite.len());

        for (index, case) in self.suite.cases().iter().enumerate() {
            let sem = Arc::clone(&sem);
            let tx = tx.clone();
            let client = Arc::clone(&client);
            let mut cancel_rx = self.cancel_rx.clone();
            let case = case.clone();
            let timeout = self.config.query_timeout;
            let name = name.to_string();

            tasks.push(tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.ok();
                if *cancel_rx.borrow() {
                    return;
                }

                let response = tokio::select! {
                    biased;
                    _ = cancelled(&mut cancel_rx) => return,
                    response = query_case(client.as_ref(), case, timeout) => response,
                };
                if let Some(error) = &response.error {
                    obs::emit_case_failed(&name, &response.case.id, error);
                    METRICS.inc_generation_errors();
                }
                let _ = tx.send((index, response)).await;
            }));
        }
        drop(tx);

        let mut collected = Vec::with_capacity(self.suite.len());
        while let Some(item) = rx.recv().await {
            collected.push(item);
        }
        futures::future::join_all(tasks).await;

        collected.sort_by_key(|(index, _)| *index);
        debug!(model = %name, completed = collected.len(), "cases collected");
        collected.into_iter().map(|(_, response)| response).collect()
    }
}

async fn query_case(client: &dyn ModelClient, case: TaskCase, timeout: Duration) -> RawResponse {
    let options = QueryOptions::default()
        .with_max_tokens(case.family.max_tokens())
        .with_timeout(timeout);

    METRICS.inc_queries();
    let started = Instant::now();
    let query = AssertUnwindSafe(client.query(&case.prompt, &options)).catch_unwind();
    let outcome = match tokio::time::timeout(timeout, query).await {
        Ok(Ok(Ok(text))) if text.trim().is_empty() => Err(GenerationError::EmptyResponse),
        Ok(Ok(outcome)) => outcome,
        Ok(Err(payload)) => Err(GenerationError::Panicked {
            detail: panic_message(payload.as_ref()),
        }),
        Err(_) => Err(GenerationError::Timeout {
            after_ms: timeout.as_millis() as u64,
        }),
    };
    let latency_ms = started.elapsed().as_millis() as u64;

    RawResponse::from_outcome(case, outcome, latency_ms)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Convenience wrapper: build a harness, run it, return the report.
pub async fn run_suite(
    suite: TaskSuite,
    config: HarnessConfig,
    models: &[Arc<dyn ModelClient>],
    sink: &dyn ReportSink,
) -> Result<RunReport> {
    let harness = Harness::new(suite, config);
    info!(models = models.len(), cases = harness.suite().len(), "starting probe run");
    harness.run(models, sink).await
}
