//! Perturbation-aware task suite.
//!
//! A [`TaskSuite`] is built once per run from a [`SuiteConfig`] and is the
//! same for every model: it holds no per-model state and every case is a
//! pure function of the config (seed included).

pub mod arithmetic;
pub mod logic;
pub mod probe;

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{Perturbation, Result, TaskCase, TaskFamily};

const ARITHMETIC_SALT: u64 = 0xA21_7B3E;
const LOGIC_SALT: u64 = 0x10_61C5;

/// Parameters for suite generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteConfig {
    pub seed: u64,
    pub families: Vec<TaskFamily>,
    /// Radixes for the arithmetic counterfactual (each becomes `base<N>`).
    pub counterfactual_radixes: Vec<u32>,
    /// Extra arithmetic problems drawn on top of the five seed problems.
    pub generated_problems: usize,
    /// Extra logic puzzles drawn on top of the two built-in puzzles.
    pub generated_puzzles: usize,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            families: TaskFamily::all(),
            counterfactual_radixes: vec![11],
            generated_problems: 0,
            generated_puzzles: 0,
        }
    }
}

/// Ordered, immutable set of cases: family by family, perturbation by
/// perturbation, baseline first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSuite {
    cases: Vec<TaskCase>,
}

impl TaskSuite {
    pub fn build(config: &SuiteConfig) -> Self {
        let mut cases = Vec::new();

        for family in &config.families {
            match family {
                TaskFamily::Arithmetic => {
                    let mut rng = StdRng::seed_from_u64(config.seed ^ ARITHMETIC_SALT);
                    let mut problems = arithmetic::SEED_PROBLEMS.to_vec();
                    problems.extend(arithmetic::generate_problems(
                        &mut rng,
                        config.generated_problems,
                    ));
                    cases.extend(arithmetic::build_cases(
                        &problems,
                        &config.counterfactual_radixes,
                    ));
                }
                TaskFamily::LogicPuzzle => {
                    let mut rng = StdRng::seed_from_u64(config.seed ^ LOGIC_SALT);
                    let mut puzzles = logic::builtin_puzzles();
                    puzzles.extend(logic::generate_puzzles(&mut rng, config.generated_puzzles));
                    cases.extend(logic::build_cases(&puzzles, &mut rng));
                }
                TaskFamily::MemoryReasoning => {
                    cases.extend(probe::build_cases(probe::PROBE_QUESTIONS));
                }
            }
        }

        Self { cases }
    }

    pub fn from_cases(cases: Vec<TaskCase>) -> Self {
        Self { cases }
    }

    pub fn cases(&self) -> &[TaskCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn families(&self) -> Vec<TaskFamily> {
        let mut families: Vec<TaskFamily> = Vec::new();
        for case in &self.cases {
            if !families.contains(&case.family) {
                families.push(case.family);
            }
        }
        families
    }

    pub fn for_family(&self, family: TaskFamily) -> impl Iterator<Item = &TaskCase> {
        self.cases.iter().filter(move |c| c.family == family)
    }

    /// Perturbation tags of `family` in suite order.
    pub fn perturbations(&self, family: TaskFamily) -> Vec<Perturbation> {
        let mut tags: Vec<Perturbation> = Vec::new();
        for case in self.for_family(family) {
            if !tags.contains(&case.perturbation) {
                tags.push(case.perturbation);
            }
        }
        tags
    }

    /// SHA-256 hex over the canonical JSON of every case.
    pub fn digest(&self) -> Result<String> {
        let canonical = serde_json::to_vec(&self.cases)?;
        Ok(hex::encode(Sha256::digest(&canonical)))
    }

    /// Prompt → expected answer text, for models that simulate recall.
    pub fn answer_key(&self) -> HashMap<String, String> {
        self.cases
            .iter()
            .map(|c| (c.prompt.clone(), c.expected.display_text()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_suite_layout() {
        let suite = TaskSuite::build(&SuiteConfig::default());
        assert_eq!(
            suite.families(),
            vec![
                TaskFamily::Arithmetic,
                TaskFamily::LogicPuzzle,
                TaskFamily::MemoryReasoning
            ]
        );
        assert_eq!(
            suite.perturbations(TaskFamily::Arithmetic),
            vec![Perturbation::Clean, Perturbation::Base(11)]
        );
        assert_eq!(suite.for_family(TaskFamily::Arithmetic).count(), 10);
        assert_eq!(
            suite.perturbations(TaskFamily::LogicPuzzle)[..3],
            [
                Perturbation::Clean,
                Perturbation::FlipRole,
                Perturbation::UncommonName
            ]
        );
        assert_eq!(
            suite.for_family(TaskFamily::MemoryReasoning).count(),
            probe::PROBE_QUESTIONS.len()
        );
    }

    #[test]
    fn test_suite_is_deterministic_for_a_seed() {
        let config = SuiteConfig {
            generated_problems: 10,
            generated_puzzles: 4,
            ..SuiteConfig::default()
        };
        let a = TaskSuite::build(&config);
        let b = TaskSuite::build(&config);
        assert_eq!(a, b);
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());
    }

    #[test]
    fn test_seed_changes_generated_cases() {
        let a = TaskSuite::build(&SuiteConfig {
            generated_problems: 10,
            ..SuiteConfig::default()
        });
        let b = TaskSuite::build(&SuiteConfig {
            seed: 7,
            generated_problems: 10,
            ..SuiteConfig::default()
        });
        assert_ne!(a.digest().unwrap(), b.digest().unwrap());
    }

    #[test]
    fn test_family_generation_is_independent_of_selection() {
        let config = SuiteConfig {
            generated_puzzles: 3,
            ..SuiteConfig::default()
        };
        let all = TaskSuite::build(&config);
        let logic_only = TaskSuite::build(&SuiteConfig {
            families: vec![TaskFamily::LogicPuzzle],
            ..config
        });
        let from_all: Vec<_> = all.for_family(TaskFamily::LogicPuzzle).cloned().collect();
        assert_eq!(from_all, logic_only.cases().to_vec());
    }

    #[test]
    fn test_answer_key_maps_prompt_to_expected_text() {
        let suite = TaskSuite::build(&SuiteConfig {
            families: vec![TaskFamily::Arithmetic],
            ..SuiteConfig::default()
        });
        let key = suite.answer_key();
        let first = &suite.cases()[0];
        assert_eq!(key.get(&first.prompt).map(String::as_str), Some("15"));
    }
}
