//! Reduction of scored results into comparable metrics.
//!
//! Everything here is a pure function of its inputs: re-running over the same
//! results yields identical values.

use serde::{Deserialize, Serialize};

use crate::domain::{Perturbation, ScoredResult, TaskFamily};

/// Default significance threshold for a perturbation drop.
pub const DEFAULT_DROP_THRESHOLD: f64 = 0.2;

/// Largest counterfactual drop still considered stable.
pub const COUNTERFACTUAL_THRESHOLD: f64 = 0.3;

/// Accuracy of one (family, perturbation) group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetric {
    pub family: TaskFamily,
    pub perturbation: Perturbation,
    pub correct_count: usize,
    pub total_count: usize,
    /// Cases whose generation failed; included in `total_count`.
    pub error_count: usize,
    /// `correct_count / total_count`, or 0 for an empty group.
    pub accuracy: f64,
}

/// Accuracy change of one variant relative to the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDrop {
    pub perturbation: Perturbation,
    pub accuracy: f64,
    /// Relative drop; negative when the variant beats the baseline.
    pub drop: f64,
    pub significant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbationReport {
    pub baseline: Perturbation,
    pub baseline_accuracy: f64,
    pub threshold: f64,
    pub per_variant: Vec<VariantDrop>,
}

impl PerturbationReport {
    pub fn variant(&self, perturbation: Perturbation) -> Option<&VariantDrop> {
        self.per_variant
            .iter()
            .find(|v| v.perturbation == perturbation)
    }

    pub fn max_drop(&self) -> Option<f64> {
        self.per_variant.iter().map(|v| v.drop).reduce(f64::max)
    }

    pub fn significant(&self) -> impl Iterator<Item = &VariantDrop> {
        self.per_variant.iter().filter(|v| v.significant)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterfactualVerdict {
    /// Some counterfactual variant dropped more than [`COUNTERFACTUAL_THRESHOLD`].
    MemorizationDependent,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentVerdict {
    Strong,
    Partial,
    Weak,
}

impl AlignmentVerdict {
    pub fn from_alignment(mean_alignment: f64) -> Self {
        if mean_alignment > 0.8 {
            AlignmentVerdict::Strong
        } else if mean_alignment > 0.6 {
            AlignmentVerdict::Partial
        } else {
            AlignmentVerdict::Weak
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlignmentVerdict::Strong => "strong",
            AlignmentVerdict::Partial => "partial",
            AlignmentVerdict::Weak => "weak",
        }
    }
}

/// Means over the memory-vs-reasoning family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySummary {
    pub case_count: usize,
    pub error_count: usize,
    /// Cases whose text had no classifiable sentence.
    pub neutral_count: usize,
    pub mean_memory_ratio: f64,
    pub mean_alignment: f64,
    pub verdict: AlignmentVerdict,
}

/// Accuracy-scored family: per-perturbation metrics plus drops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracySummary {
    pub metrics: Vec<AggregateMetric>,
    /// Absent when the baseline perturbation has no cases.
    pub perturbation: Option<PerturbationReport>,
    /// Only for families with non-decimal counterfactual variants.
    pub counterfactual: Option<CounterfactualVerdict>,
}

impl AccuracySummary {
    pub fn metric(&self, perturbation: Perturbation) -> Option<&AggregateMetric> {
        self.metrics.iter().find(|m| m.perturbation == perturbation)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FamilySummary {
    Accuracy(AccuracySummary),
    Style(MemorySummary),
}

/// Aggregated results of one family for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyMetrics {
    pub family: TaskFamily,
    pub summary: FamilySummary,
}

impl FamilyMetrics {
    pub fn accuracy(&self) -> Option<&AccuracySummary> {
        match &self.summary {
            FamilySummary::Accuracy(summary) => Some(summary),
            FamilySummary::Style(_) => None,
        }
    }

    pub fn memory(&self) -> Option<&MemorySummary> {
        match &self.summary {
            FamilySummary::Style(summary) => Some(summary),
            FamilySummary::Accuracy(_) => None,
        }
    }
}

/// Parameters of the reduction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateConfig {
    pub baseline: Perturbation,
    pub threshold: f64,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            baseline: Perturbation::BASELINE,
            threshold: DEFAULT_DROP_THRESHOLD,
        }
    }
}

/// `correct / total`, or 0 when `total` is 0.
pub fn accuracy(correct: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    }
}

/// Relative drop of `variant` against `baseline`; 0 when the baseline is 0.
///
/// Computed as `1 - variant / baseline`, which equals
/// `(baseline - variant) / baseline` and is not clamped.
pub fn drop_rate(baseline: f64, variant: f64) -> f64 {
    if baseline == 0.0 {
        0.0
    } else {
        1.0 - variant / baseline
    }
}

/// Group correctness-scored results by (family, perturbation), in first-seen
/// order.
pub fn accuracy_metrics(results: &[ScoredResult]) -> Vec<AggregateMetric> {
    let mut metrics: Vec<AggregateMetric> = Vec::new();

    for result in results.iter().filter(|r| r.style().is_none()) {
        let case = result.case();
        let idx = match metrics
            .iter()
            .position(|m| m.family == case.family && m.perturbation == case.perturbation)
        {
            Some(idx) => idx,
            None => {
                metrics.push(AggregateMetric {
                    family: case.family,
                    perturbation: case.perturbation,
                    correct_count: 0,
                    total_count: 0,
                    error_count: 0,
                    accuracy: 0.0,
                });
                metrics.len() - 1
            }
        };
        let metric = &mut metrics[idx];
        metric.total_count += 1;
        if result.is_correct() {
            metric.correct_count += 1;
        }
        if result.response.is_error() {
            metric.error_count += 1;
        }
    }

    for metric in &mut metrics {
        metric.accuracy = accuracy(metric.correct_count, metric.total_count);
    }
    metrics
}

/// Drops of every non-baseline group relative to the baseline group.
pub fn perturbation_report(
    metrics: &[AggregateMetric],
    baseline: Perturbation,
    threshold: f64,
) -> Option<PerturbationReport> {
    let baseline_accuracy = metrics
        .iter()
        .find(|m| m.perturbation == baseline)?
        .accuracy;

    let per_variant = metrics
        .iter()
        .filter(|m| m.perturbation != baseline)
        .map(|m| {
            let drop = drop_rate(baseline_accuracy, m.accuracy);
            VariantDrop {
                perturbation: m.perturbation,
                accuracy: m.accuracy,
                drop,
                significant: drop > threshold,
            }
        })
        .collect();

    Some(PerturbationReport {
        baseline,
        baseline_accuracy,
        threshold,
        per_variant,
    })
}

/// Verdict over the non-decimal variants of a report; `None` when there are
/// none.
pub fn counterfactual_verdict(report: &PerturbationReport) -> Option<CounterfactualVerdict> {
    let largest = report
        .per_variant
        .iter()
        .filter(|v| matches!(v.perturbation, Perturbation::Base(_)))
        .map(|v| v.drop)
        .reduce(f64::max)?;

    Some(if largest > COUNTERFACTUAL_THRESHOLD {
        CounterfactualVerdict::MemorizationDependent
    } else {
        CounterfactualVerdict::Stable
    })
}

/// Means over style-scored results. Empty input gives zero means.
pub fn memory_summary(results: &[ScoredResult]) -> MemorySummary {
    let styled: Vec<&ScoredResult> = results.iter().filter(|r| r.style().is_some()).collect();
    let count = styled.len();

    let (ratio_sum, alignment_sum) = styled
        .iter()
        .filter_map(|r| r.style())
        .fold((0.0, 0.0), |(r, a), s| (r + s.memory_ratio, a + s.alignment));

    let (mean_memory_ratio, mean_alignment) = if count == 0 {
        (0.0, 0.0)
    } else {
        (ratio_sum / count as f64, alignment_sum / count as f64)
    };

    MemorySummary {
        case_count: count,
        error_count: styled.iter().filter(|r| r.response.is_error()).count(),
        neutral_count: styled.iter().filter(|r| r.ambiguity.is_some()).count(),
        mean_memory_ratio,
        mean_alignment,
        verdict: AlignmentVerdict::from_alignment(mean_alignment),
    }
}

/// Reduce the results of one family.
pub fn aggregate_family(
    family: TaskFamily,
    results: &[ScoredResult],
    config: &AggregateConfig,
) -> FamilyMetrics {
    let own: Vec<ScoredResult> = results
        .iter()
        .filter(|r| r.case().family == family)
        .cloned()
        .collect();

    let summary = if family.is_accuracy_scored() {
        let metrics = accuracy_metrics(&own);
        let perturbation = perturbation_report(&metrics, config.baseline, config.threshold);
        let counterfactual = perturbation.as_ref().and_then(counterfactual_verdict);
        FamilySummary::Accuracy(AccuracySummary {
            metrics,
            perturbation,
            counterfactual,
        })
    } else {
        FamilySummary::Style(memory_summary(&own))
    };

    FamilyMetrics { family, summary }
}

/// Reduce results for each of `families`, in the given order.
pub fn aggregate(
    families: &[TaskFamily],
    results: &[ScoredResult],
    config: &AggregateConfig,
) -> Vec<FamilyMetrics> {
    families
        .iter()
        .map(|family| aggregate_family(*family, results, config))
        .collect()
}
