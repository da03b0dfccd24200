//! Result tree of a run: one [`ModelReport`] per model inside a [`RunReport`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{FamilyMetrics, FamilySummary};
use crate::domain::{Perturbation, ScoredResult, TaskFamily};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Completed,
    /// Failed the availability probe; no cases were run.
    Unavailable,
    /// Stopped early; metrics cover completed cases only.
    Cancelled,
}

impl ModelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStatus::Completed => "completed",
            ModelStatus::Unavailable => "unavailable",
            ModelStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelReport {
    pub model: String,
    pub status: ModelStatus,
    /// Why the model was unavailable.
    pub error: Option<String>,
    pub families: Vec<FamilyMetrics>,
    /// Scored cases in suite order.
    pub results: Vec<ScoredResult>,
    pub total_cases: usize,
    pub elapsed_ms: u64,
}

impl ModelReport {
    pub fn unavailable(model: impl Into<String>, reason: impl Into<String>, total_cases: usize) -> Self {
        Self {
            model: model.into(),
            status: ModelStatus::Unavailable,
            error: Some(reason.into()),
            families: Vec::new(),
            results: Vec::new(),
            total_cases,
            elapsed_ms: 0,
        }
    }

    pub fn completed_cases(&self) -> usize {
        self.results.len()
    }

    pub fn family(&self, family: TaskFamily) -> Option<&FamilyMetrics> {
        self.families.iter().find(|f| f.family == family)
    }
}

/// One `(model, family, perturbation, metric) = value` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRecord {
    pub model: String,
    pub family: TaskFamily,
    pub perturbation: Perturbation,
    pub metric: String,
    pub value: f64,
}

/// `model -> family -> metrics`, keyed the way result files are read.
pub type ResultTree = BTreeMap<String, BTreeMap<TaskFamily, FamilyMetrics>>;

/// Build the [`ResultTree`] view of `models`; unavailable models map to an
/// empty family table.
pub fn result_tree(models: &[ModelReport]) -> ResultTree {
    models
        .iter()
        .map(|model| {
            let families = model
                .families
                .iter()
                .map(|f| (f.family, f.clone()))
                .collect();
            (model.model.clone(), families)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub suite_digest: String,
    pub seed: u64,
    pub families: Vec<TaskFamily>,
    /// Per-model detail: status, errors and scored cases.
    pub models: Vec<ModelReport>,
    /// Aggregates of `models` as a `model -> family -> metrics` mapping.
    pub results: ResultTree,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl RunReport {
    pub fn model(&self, name: &str) -> Option<&ModelReport> {
        self.models.iter().find(|m| m.model == name)
    }

    /// Flatten the tree; unavailable models contribute nothing.
    pub fn flat_records(&self) -> Vec<FlatRecord> {
        let mut records = Vec::new();

        for model in &self.models {
            for family in &model.families {
                let mut push = |perturbation: Perturbation, metric: &str, value: f64| {
                    records.push(FlatRecord {
                        model: model.model.clone(),
                        family: family.family,
                        perturbation,
                        metric: metric.to_string(),
                        value,
                    });
                };

                match &family.summary {
                    FamilySummary::Accuracy(summary) => {
                        for metric in &summary.metrics {
                            push(metric.perturbation, "accuracy", metric.accuracy);
                        }
                        if let Some(report) = &summary.perturbation {
                            for variant in &report.per_variant {
                                push(variant.perturbation, "drop", variant.drop);
                            }
                        }
                    }
                    FamilySummary::Style(summary) => {
                        push(Perturbation::Clean, "memory_ratio", summary.mean_memory_ratio);
                        push(Perturbation::Clean, "alignment", summary.mean_alignment);
                    }
                }
            }
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{self, AggregateConfig};
    use crate::domain::{Expected, RawResponse, TaskCase};
    use crate::scoring;

    fn completed(model: &str) -> ModelReport {
        let results: Vec<ScoredResult> = (0..4)
            .map(|i| {
                let case = TaskCase::new(
                    TaskFamily::Arithmetic,
                    if i < 2 { Perturbation::Clean } else { Perturbation::Base(11) },
                    i,
                    "What is 7 + 8?".to_string(),
                    Expected::Text {
                        answer: "15".to_string(),
                    },
                );
                scoring::score(RawResponse::from_outcome(case, Ok("15".to_string()), 1))
            })
            .collect();
        let families = aggregate::aggregate(
            &[TaskFamily::Arithmetic],
            &results,
            &AggregateConfig::default(),
        );
        ModelReport {
            model: model.to_string(),
            status: ModelStatus::Completed,
            error: None,
            families,
            total_cases: results.len(),
            results,
            elapsed_ms: 3,
        }
    }

    fn report() -> RunReport {
        let models = vec![
            completed("sim-qwen"),
            ModelReport::unavailable("ollama-down", "connection refused", 4),
        ];
        RunReport {
            run_id: Uuid::nil(),
            generated_at: Utc::now(),
            suite_digest: "abc".to_string(),
            seed: 42,
            families: vec![TaskFamily::Arithmetic],
            results: result_tree(&models),
            models,
            cancelled: false,
            elapsed_ms: 5,
        }
    }

    #[test]
    fn test_results_serialize_as_model_family_mapping() {
        let json = serde_json::to_value(report()).expect("serialize");
        let results = json["results"].as_object().expect("results is an object");
        assert_eq!(results.len(), 2);

        let families = results["sim-qwen"].as_object().expect("families is an object");
        let arithmetic = &families["arithmetic"];
        assert_eq!(arithmetic["family"], "arithmetic");
        assert_eq!(arithmetic["summary"]["kind"], "accuracy");

        assert!(results["ollama-down"].as_object().expect("object").is_empty());
    }

    #[test]
    fn test_results_roundtrip() {
        let report = report();
        let json = serde_json::to_string(&report).expect("serialize");
        let back: RunReport = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, report);
        assert_eq!(
            back.results["sim-qwen"][&TaskFamily::Arithmetic],
            report.models[0].families[0]
        );
    }
}
