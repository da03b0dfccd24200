//! Task cases and the tags that group them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ProbeError;

/// The three task families the harness knows how to score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFamily {
    /// Base-10 arithmetic and its non-decimal counterfactual.
    #[serde(alias = "counterfactual")]
    Arithmetic,

    /// Knights-and-knaves puzzles with two participants.
    #[serde(alias = "knights_knaves")]
    LogicPuzzle,

    /// Open questions tagged with an expected memory ratio.
    MemoryReasoning,
}

impl TaskFamily {
    /// All families in run order.
    pub fn all() -> Vec<TaskFamily> {
        vec![
            TaskFamily::Arithmetic,
            TaskFamily::LogicPuzzle,
            TaskFamily::MemoryReasoning,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskFamily::Arithmetic => "arithmetic",
            TaskFamily::LogicPuzzle => "logic_puzzle",
            TaskFamily::MemoryReasoning => "memory_reasoning",
        }
    }

    /// Generation budget used when querying cases of this family.
    pub fn max_tokens(&self) -> u32 {
        match self {
            TaskFamily::Arithmetic => 200,
            TaskFamily::LogicPuzzle => 300,
            TaskFamily::MemoryReasoning => 400,
        }
    }

    /// Whether cases of this family are scored as correct/incorrect (as
    /// opposed to style-classified).
    pub fn is_accuracy_scored(&self) -> bool {
        !matches!(self, TaskFamily::MemoryReasoning)
    }
}

impl fmt::Display for TaskFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskFamily {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "arithmetic" | "counterfactual" => Ok(TaskFamily::Arithmetic),
            "logic_puzzle" | "logic" | "knights_knaves" => Ok(TaskFamily::LogicPuzzle),
            "memory_reasoning" | "memory" => Ok(TaskFamily::MemoryReasoning),
            _ => Err(ProbeError::UnknownFamily(s.to_string())),
        }
    }
}

/// Surface transformation applied to a task.
///
/// Serialised as its tag string (`clean`, `base11`, `flip_role`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Perturbation {
    /// Unperturbed baseline.
    Clean,
    /// Answer expressed in a non-decimal radix.
    Base(u32),
    /// Truth-teller and liar labels swapped.
    FlipRole,
    /// Participants renamed with uncommon names.
    UncommonName,
    /// One statement leaf negated; ground truth re-solved.
    PerturbedLeaf,
}

impl Perturbation {
    /// Conventional baseline tag.
    pub const BASELINE: Perturbation = Perturbation::Clean;

    pub fn tag(&self) -> String {
        match self {
            Perturbation::Clean => "clean".to_string(),
            Perturbation::Base(radix) => format!("base{}", radix),
            Perturbation::FlipRole => "flip_role".to_string(),
            Perturbation::UncommonName => "uncommon_name".to_string(),
            Perturbation::PerturbedLeaf => "perturbed_leaf".to_string(),
        }
    }
}

impl fmt::Display for Perturbation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

impl FromStr for Perturbation {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        match tag.as_str() {
            "clean" => return Ok(Perturbation::Clean),
            "flip_role" => return Ok(Perturbation::FlipRole),
            "uncommon_name" => return Ok(Perturbation::UncommonName),
            "perturbed_leaf" => return Ok(Perturbation::PerturbedLeaf),
            _ => {}
        }
        tag.strip_prefix("base")
            .and_then(|digits| digits.parse::<u32>().ok())
            .filter(|radix| (2..=36).contains(radix) && *radix != 10)
            .map(Perturbation::Base)
            .ok_or_else(|| ProbeError::UnknownPerturbation(s.to_string()))
    }
}

impl From<Perturbation> for String {
    fn from(p: Perturbation) -> Self {
        p.tag()
    }
}

impl TryFrom<String> for Perturbation {
    type Error = ProbeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Expected answer for a case, one variant per family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expected {
    /// Answer string matched as a substring (arithmetic).
    Text { answer: String },

    /// Role assignment, e.g. `"Zoey is a knave, Oliver is a knight"`.
    Assignment {
        text: String,
        participants: Vec<String>,
    },

    /// Expected fraction of memory-leaning sentences, in [0, 1].
    MemoryRatio { ratio: f64 },
}

impl Expected {
    /// Text form used by answer keys and reports.
    pub fn display_text(&self) -> String {
        match self {
            Expected::Text { answer } => answer.clone(),
            Expected::Assignment { text, .. } => text.clone(),
            Expected::MemoryRatio { ratio } => format!("{:.2}", ratio),
        }
    }
}

/// A single generated test case. Immutable once built by the suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCase {
    /// Stable identifier, e.g. `logic_puzzle/flip_role/0`.
    pub id: String,
    pub family: TaskFamily,
    pub perturbation: Perturbation,
    pub prompt: String,
    pub expected: Expected,
}

impl TaskCase {
    pub fn new(
        family: TaskFamily,
        perturbation: Perturbation,
        index: usize,
        prompt: String,
        expected: Expected,
    ) -> Self {
        Self {
            id: format!("{}/{}/{}", family, perturbation, index),
            family,
            perturbation,
            prompt,
            expected,
        }
    }
}
