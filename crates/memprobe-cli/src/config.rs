//! Run configuration for the `memprobe` binary.
//!
//! Layering, lowest to highest: built-in defaults, the `--config` TOML file,
//! `MEMPROBE_*` environment variables, explicit flags. clap resolves the last
//! two into the same `Option` fields, so [`ProbeConfig::apply`] only has to
//! merge file values with whatever clap produced.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use memprobe_core::{
    AggregateConfig, GateRuleSet, HarnessConfig, Perturbation, SuiteConfig, TaskFamily,
};
use serde::{Deserialize, Serialize};

/// Everything a `run` needs, after layering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    /// Model specs (`ollama:llama3.2`, `qwen-0.5b`, `sim:mock-large`)
    pub models: Vec<String>,
    pub families: Vec<TaskFamily>,
    pub output_dir: PathBuf,
    pub seed: u64,
    pub concurrency: usize,
    pub timeout_secs: u64,
    /// Relative drop above which a variant is flagged
    pub threshold: f64,
    pub baseline: Perturbation,
    pub counterfactual_radixes: Vec<u32>,
    /// Extra arithmetic problems on top of the seed problems
    pub generated: usize,
    /// Extra logic puzzles on top of the built-in ones
    pub generated_puzzles: usize,
    pub skip_availability_check: bool,
    pub fail_on_regression: bool,
    /// Gate rules; the standard max-drop rule when absent
    pub gate: Option<GateRuleSet>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        let suite = SuiteConfig::default();
        let aggregate = AggregateConfig::default();
        Self {
            models: Vec::new(),
            families: suite.families,
            output_dir: PathBuf::from("results"),
            seed: suite.seed,
            concurrency: 1,
            timeout_secs: 30,
            threshold: aggregate.threshold,
            baseline: aggregate.baseline,
            counterfactual_radixes: suite.counterfactual_radixes,
            generated: suite.generated_problems,
            generated_puzzles: suite.generated_puzzles,
            skip_availability_check: false,
            fail_on_regression: false,
            gate: None,
        }
    }
}

/// Values that came from flags or `MEMPROBE_*` variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub models: Vec<String>,
    pub families: Vec<TaskFamily>,
    pub output_dir: Option<PathBuf>,
    pub seed: Option<u64>,
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub threshold: Option<f64>,
    pub generated: Option<usize>,
    pub generated_puzzles: Option<usize>,
    pub skip_availability_check: bool,
    pub fail_on_regression: bool,
}

impl ProbeConfig {
    /// Read a TOML file; a missing `path` yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: ProbeConfig =
            toml::from_str(&raw).with_context(|| format!("Invalid config file {:?}", path))?;
        Ok(config)
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        if !overrides.models.is_empty() {
            self.models = overrides.models;
        }
        if !overrides.families.is_empty() {
            self.families = overrides.families;
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = dir;
        }
        if let Some(seed) = overrides.seed {
            self.seed = seed;
        }
        if let Some(concurrency) = overrides.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.timeout_secs = timeout;
        }
        if let Some(threshold) = overrides.threshold {
            self.threshold = threshold;
        }
        if let Some(generated) = overrides.generated {
            self.generated = generated;
        }
        if let Some(puzzles) = overrides.generated_puzzles {
            self.generated_puzzles = puzzles;
        }
        self.skip_availability_check |= overrides.skip_availability_check;
        self.fail_on_regression |= overrides.fail_on_regression;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            anyhow::bail!("No models given; pass --models or set `models` in the config file");
        }
        if self.families.is_empty() {
            anyhow::bail!("At least one task family is required");
        }
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            anyhow::bail!("threshold must be within [0, 1], got {}", self.threshold);
        }
        if let Some(radix) = self
            .counterfactual_radixes
            .iter()
            .find(|r| !(2..=36).contains(*r) || **r == 10)
        {
            anyhow::bail!("counterfactual radix {} must be in 2..=36 and not 10", radix);
        }
        Ok(())
    }

    pub fn suite_config(&self) -> SuiteConfig {
        SuiteConfig {
            seed: self.seed,
            families: self.families.clone(),
            counterfactual_radixes: self.counterfactual_radixes.clone(),
            generated_problems: self.generated,
            generated_puzzles: self.generated_puzzles,
        }
    }

    pub fn harness_config(&self) -> HarnessConfig {
        let timeout = Duration::from_secs(self.timeout_secs);
        HarnessConfig {
            concurrency: self.concurrency,
            query_timeout: timeout,
            availability_timeout: (!self.skip_availability_check).then_some(timeout),
            aggregate: AggregateConfig {
                baseline: self.baseline,
                threshold: self.threshold,
            },
            seed: self.seed,
        }
    }

    /// Gate rules from the file, or the standard rule at `threshold`.
    pub fn gate_rules(&self) -> GateRuleSet {
        match &self.gate {
            Some(rules) => rules.clone(),
            None => GateRuleSet {
                rules: vec![memprobe_core::GateRule::MaxDrop {
                    family: None,
                    max_drop: self.threshold,
                }],
                fail_fast: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memprobe_core::GateRule;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(body.as_bytes()).expect("write");
        file
    }

    #[test]
    fn test_missing_file_means_defaults() {
        let config = ProbeConfig::load(None).expect("defaults");
        assert_eq!(config, ProbeConfig::default());
        assert_eq!(config.families, TaskFamily::all());
        assert_eq!(config.threshold, 0.2);
    }

    #[test]
    fn test_file_values_are_loaded() {
        let file = write_config(
            r#"
models = ["ollama:llama3.2", "sim:mock-large"]
families = ["arithmetic", "logic_puzzle"]
seed = 7
concurrency = 4
counterfactual_radixes = [9, 11]

[gate]
fail_fast = true

[[gate.rules]]
type = "min_accuracy"
family = "arithmetic"
perturbation = "clean"
min = 0.5
"#,
        );
        let config = ProbeConfig::load(Some(file.path())).expect("load");
        assert_eq!(config.models.len(), 2);
        assert_eq!(config.families, vec![TaskFamily::Arithmetic, TaskFamily::LogicPuzzle]);
        assert_eq!(config.seed, 7);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.timeout_secs, 30);
        let gate = config.gate_rules();
        assert!(gate.fail_fast);
        assert_eq!(
            gate.rules,
            vec![GateRule::MinAccuracy {
                family: TaskFamily::Arithmetic,
                perturbation: Perturbation::Clean,
                min: 0.5
            }]
        );
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let file = write_config("sed = 7\n");
        let err = ProbeConfig::load(Some(file.path())).expect_err("typo");
        assert!(format!("{:#}", err).contains("sed"));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let file = write_config("seed = 7\nconcurrency = 4\nmodels = [\"sim:a\"]\n");
        let config = ProbeConfig::load(Some(file.path()))
            .expect("load")
            .apply(Overrides {
                seed: Some(99),
                models: vec!["sim:b".to_string()],
                fail_on_regression: true,
                ..Overrides::default()
            });
        assert_eq!(config.seed, 99);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.models, vec!["sim:b".to_string()]);
        assert!(config.fail_on_regression);
    }

    #[test]
    fn test_validate() {
        assert!(ProbeConfig::default().validate().is_err());

        let ok = ProbeConfig {
            models: vec!["sim:a".to_string()],
            ..ProbeConfig::default()
        };
        assert!(ok.validate().is_ok());

        let bad_radix = ProbeConfig {
            counterfactual_radixes: vec![10],
            ..ok.clone()
        };
        assert!(bad_radix.validate().is_err());

        let bad_threshold = ProbeConfig {
            threshold: 1.5,
            ..ok
        };
        assert!(bad_threshold.validate().is_err());
    }

    #[test]
    fn test_harness_config_follows_flags() {
        let config = ProbeConfig {
            timeout_secs: 5,
            skip_availability_check: true,
            seed: 3,
            ..ProbeConfig::default()
        };
        let harness = config.harness_config();
        assert_eq!(harness.query_timeout, Duration::from_secs(5));
        assert_eq!(harness.availability_timeout, None);
        assert_eq!(harness.seed, 3);
        assert_eq!(config.suite_config().seed, 3);
    }
}
