//! Regression gate over a finished run.
//!
//! Evaluates a [`RunReport`] against a [`GateRuleSet`] and produces a
//! [`GateVerdict`]. The CLI turns a failing verdict into a non-zero exit when
//! asked to.

use serde::{Deserialize, Serialize};

use crate::aggregate::DEFAULT_DROP_THRESHOLD;
use crate::domain::{Perturbation, TaskFamily};
use crate::report::{ModelReport, ModelStatus, RunReport};

/// A single rule a run must satisfy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateRule {
    /// No perturbation drop (optionally within one family) may exceed
    /// `max_drop`.
    MaxDrop {
        family: Option<TaskFamily>,
        max_drop: f64,
    },
    /// Accuracy of one (family, perturbation) group must reach `min`.
    MinAccuracy {
        family: TaskFamily,
        perturbation: Perturbation,
        min: f64,
    },
    /// Mean memory/reasoning alignment must reach `min`.
    MinAlignment { min: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateRuleSet {
    pub rules: Vec<GateRule>,
    /// Stop at the first violation.
    pub fail_fast: bool,
}

impl GateRuleSet {
    /// `MaxDrop` across all families at the default significance threshold.
    pub fn standard() -> Self {
        Self {
            rules: vec![GateRule::MaxDrop {
                family: None,
                max_drop: DEFAULT_DROP_THRESHOLD,
            }],
            fail_fast: false,
        }
    }

    pub fn with_rule(mut self, rule: GateRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Violation {
    pub rule: GateRule,
    pub model: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateVerdict {
    pub violations: Vec<Violation>,
}

impl GateVerdict {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Evaluate every rule against every model that produced metrics.
///
/// Unavailable models are skipped: they have nothing to regress.
pub fn evaluate_gate(rule_set: &GateRuleSet, report: &RunReport) -> GateVerdict {
    let mut violations = Vec::new();

    for model in report
        .models
        .iter()
        .filter(|m| m.status != ModelStatus::Unavailable)
    {
        for rule in &rule_set.rules {
            for reason in check_rule(rule, model) {
                violations.push(Violation {
                    rule: rule.clone(),
                    model: model.model.clone(),
                    reason,
                });
                if rule_set.fail_fast {
                    return GateVerdict { violations };
                }
            }
        }
    }

    GateVerdict { violations }
}

fn check_rule(rule: &GateRule, model: &ModelReport) -> Vec<String> {
    match rule {
        GateRule::MaxDrop { family, max_drop } => model
            .families
            .iter()
            .filter(|f| family.map_or(true, |wanted| f.family == wanted))
            .filter_map(|f| f.accuracy().and_then(|a| a.perturbation.as_ref()).map(|p| (f.family, p)))
            .flat_map(|(fam, report)| {
                report
                    .per_variant
                    .iter()
                    .filter(|v| v.drop > *max_drop)
                    .map(move |v| {
                        format!(
                            "{} {} drop {:.1}% > allowed {:.1}% (baseline {:.1}% → {:.1}%)",
                            fam,
                            v.perturbation,
                            v.drop * 100.0,
                            max_drop * 100.0,
                            report.baseline_accuracy * 100.0,
                            v.accuracy * 100.0,
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .collect(),
        GateRule::MinAccuracy {
            family,
            perturbation,
            min,
        } => {
            let metric = model
                .family(*family)
                .and_then(|f| f.accuracy())
                .and_then(|a| a.metric(*perturbation));
            match metric {
                Some(m) if m.accuracy < *min => vec![format!(
                    "{} {} accuracy {:.1}% < required {:.1}%",
                    family,
                    perturbation,
                    m.accuracy * 100.0,
                    min * 100.0
                )],
                Some(_) => Vec::new(),
                None => vec![format!("{} {} has no results", family, perturbation)],
            }
        }
        GateRule::MinAlignment { min } => match model
            .family(TaskFamily::MemoryReasoning)
            .and_then(|f| f.memory())
        {
            Some(summary) if summary.case_count > 0 && summary.mean_alignment < *min => {
                vec![format!(
                    "mean alignment {:.3} < required {:.3}",
                    summary.mean_alignment, min
                )]
            }
            _ => Vec::new(),
        },
    }
}
