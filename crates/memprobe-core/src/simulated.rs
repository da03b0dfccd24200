//! Seeded in-process model for offline runs and tests.
//!
//! Responses are drawn from a per-prompt RNG seeded with
//! `seed ^ fnv1a(model name ++ prompt)`, so the same model answers the same
//! prompt identically no matter how queries are scheduled.

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;

use crate::domain::GenerationError;
use crate::model::{ModelClient, QueryOptions};
use crate::suite::arithmetic::{to_radix, Operator};
use crate::suite::logic::UNCOMMON_NAMES;

/// Answer given whenever an arithmetic attempt "fails".
pub const WRONG_ARITHMETIC_ANSWER: &str = "I think the answer is 42";

/// Answer given whenever a logic attempt "fails"; it names no participant.
pub const WRONG_LOGIC_ANSWER: &str = "This is a complex logic puzzle. Based on my analysis, I believe the first person is a knave and the second is a knight.";

const FLIPPED_ROLE_CUE: &str = "knaves always tell the truth";
const FLIPPED_ROLE_SCALE: f64 = 0.7;
const UNCOMMON_NAME_SCALE: f64 = 0.88;

const MEMORY_PROMPT_CUES: &[&str] = &["capital", "who wrote", "when was", "chemical formula"];
const REASONING_PROMPT_CUES: &[&str] = &["if", "why", "how", "analyze", "solve"];

const RECALL_SENTENCES: &[&str] = &[
    "According to my knowledge, this is a well-established fact",
    "It is historically documented that this has long been the case",
    "This is commonly known and recorded in standard references",
    "Traditionally this is recognized as part of general knowledge",
];

const INFERENCE_SENTENCES: &[&str] = &[
    "Therefore, we can conclude that the result follows",
    "Thus, considering each step in turn, the outcome is implied",
    "Because the quantities change, the total must be recalculated",
    "Given that the premise holds, this suggests a clear answer",
];

/// Behavioural knobs of a simulated model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile {
    /// Weight of inference sentences in open answers.
    pub reasoning: f64,
    /// Weight of recall sentences in open answers.
    pub memory: f64,
    /// Probability of a correct base-10 arithmetic answer.
    pub arithmetic: f64,
    /// Multiplier applied to `arithmetic` for non-decimal answers.
    pub counterfactual_scale: f64,
    /// Probability of a correct answer to an unperturbed logic puzzle.
    pub logic: f64,
}

impl Profile {
    /// Profile chosen from the model name.
    pub fn for_name(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("mock-large") {
            Profile {
                reasoning: 0.85,
                memory: 0.75,
                arithmetic: 0.95,
                counterfactual_scale: 0.65 / 0.95,
                logic: 0.85,
            }
        } else if name.contains("qwen") {
            Profile::basic(0.7, 0.8, 0.75)
        } else if name.contains("llama") {
            Profile::basic(0.8, 0.7, 0.8)
        } else {
            Profile::basic(0.6, 0.9, 0.7)
        }
    }

    fn basic(reasoning: f64, memory: f64, arithmetic: f64) -> Self {
        Profile {
            reasoning,
            memory,
            arithmetic,
            counterfactual_scale: 0.4,
            logic: reasoning * 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ParsedArithmetic {
    lhs: u64,
    op: Operator,
    rhs: u64,
    radix: u32,
}

fn arithmetic_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"(?i)what is (\d+)\s*([+\-*x×])\s*(\d+)(?:\s+in base (\d+))?\s*\?").ok()
        })
        .as_ref()
}

fn parse_arithmetic(prompt: &str) -> Option<ParsedArithmetic> {
    let caps = arithmetic_pattern()?.captures(prompt)?;
    let lhs = caps.get(1)?.as_str().parse().ok()?;
    let op = Operator::from_symbol(caps.get(2)?.as_str().chars().next()?)?;
    let rhs = caps.get(3)?.as_str().parse().ok()?;
    let radix = match caps.get(4) {
        Some(m) => m.as_str().parse().ok()?,
        None => 10,
    };
    Some(ParsedArithmetic { lhs, op, rhs, radix })
}

/// 64-bit FNV-1a over the concatenation of `parts`.
fn fnv1a(parts: &[&str]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    parts
        .iter()
        .flat_map(|p| p.bytes())
        .fold(OFFSET, |hash, byte| (hash ^ byte as u64).wrapping_mul(PRIME))
}

/// A [`ModelClient`] that fabricates plausible answers with fixed odds.
#[derive(Debug, Clone)]
pub struct SimulatedModel {
    name: String,
    seed: u64,
    profile: Profile,
    answer_key: HashMap<String, String>,
    latency: Option<Duration>,
}

impl SimulatedModel {
    pub fn new(name: impl Into<String>, seed: u64) -> Self {
        let name = name.into();
        let profile = Profile::for_name(&name);
        Self {
            name,
            seed,
            profile,
            answer_key: HashMap::new(),
            latency: None,
        }
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// Prompt → expected answer; lets the model "recall" logic solutions.
    pub fn with_answer_key(mut self, answer_key: HashMap<String, String>) -> Self {
        self.answer_key = answer_key;
        self
    }

    /// Sleep this long before answering each query.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    fn rng_for(&self, prompt: &str) -> StdRng {
        StdRng::seed_from_u64(self.seed ^ fnv1a(&[self.name.as_str(), prompt]))
    }

    /// Deterministic response text for `prompt`.
    pub fn respond(&self, prompt: &str) -> String {
        let mut rng = self.rng_for(prompt);
        let lower = prompt.to_lowercase();

        if lower.contains("knight") && lower.contains("knave") {
            self.logic_response(prompt, &lower, &mut rng)
        } else if let Some(problem) = parse_arithmetic(prompt) {
            self.arithmetic_response(problem, &mut rng)
        } else {
            self.open_response(&lower, &mut rng)
        }
    }

    fn arithmetic_response(&self, problem: ParsedArithmetic, rng: &mut StdRng) -> String {
        let mut p = self.profile.arithmetic;
        if problem.radix != 10 {
            p *= self.profile.counterfactual_scale;
        }
        if !rng.gen_bool(p.clamp(0.0, 1.0)) {
            return WRONG_ARITHMETIC_ANSWER.to_string();
        }
        let Some(value) = problem.op.apply(problem.lhs, problem.rhs) else {
            return WRONG_ARITHMETIC_ANSWER.to_string();
        };

        let symbol = problem.op.symbol();
        if problem.radix == 10 {
            format!(
                "Calculating step by step: {} {} {} = {}",
                problem.lhs, symbol, problem.rhs, value
            )
        } else {
            format!(
                "In base 10, {} {} {} = {}. Converting to base {} gives {}",
                problem.lhs,
                symbol,
                problem.rhs,
                value,
                problem.radix,
                to_radix(value, problem.radix)
            )
        }
    }

    fn logic_response(&self, prompt: &str, lower: &str, rng: &mut StdRng) -> String {
        let Some(answer) = self.answer_key.get(prompt) else {
            return "This is a complex logic puzzle that requires careful analysis of the statements."
                .to_string();
        };

        let mut p = self.profile.logic;
        if lower.contains(FLIPPED_ROLE_CUE) {
            p *= FLIPPED_ROLE_SCALE;
        }
        if UNCOMMON_NAMES
            .iter()
            .any(|name| lower.contains(&name.to_lowercase()))
        {
            p *= UNCOMMON_NAME_SCALE;
        }

        if !rng.gen_bool(p.clamp(0.0, 1.0)) {
            return WRONG_LOGIC_ANSWER.to_string();
        }
        let lines: Vec<String> = answer
            .split(", ")
            .enumerate()
            .map(|(i, part)| format!("({}) {}", i + 1, part))
            .collect();
        format!(
            "Let me analyze this step by step. After checking each statement for consistency, I conclude:\n{}",
            lines.join("\n")
        )
    }

    /// `base` plus one sentence per successful draw at `weight`.
    fn sentence_count(base: usize, draws: usize, weight: f64, rng: &mut StdRng) -> usize {
        let weight = weight.clamp(0.0, 1.0);
        base + (0..draws).filter(|_| rng.gen_bool(weight)).count()
    }

    fn open_response(&self, lower: &str, rng: &mut StdRng) -> String {
        let (memory, reasoning) = (self.profile.memory, self.profile.reasoning);
        let (recall, inference) = if MEMORY_PROMPT_CUES.iter().any(|c| lower.contains(c)) {
            (
                Self::sentence_count(3, 3, memory, rng),
                Self::sentence_count(1, 2, reasoning, rng),
            )
        } else if REASONING_PROMPT_CUES.iter().any(|c| lower.contains(c)) {
            (
                Self::sentence_count(1, 1, memory, rng),
                Self::sentence_count(4, 3, reasoning, rng),
            )
        } else {
            return "This is an interesting question that requires both knowledge and reasoning."
                .to_string();
        };

        let mut sentences = Vec::with_capacity(recall + inference);
        for _ in 0..recall {
            sentences.push(RECALL_SENTENCES[rng.gen_range(0..RECALL_SENTENCES.len())]);
        }
        for _ in 0..inference {
            sentences.push(INFERENCE_SENTENCES[rng.gen_range(0..INFERENCE_SENTENCES.len())]);
        }
        format!("{}.", sentences.join(". "))
    }
}

#[async_trait]
impl ModelClient for SimulatedModel {
    async fn query(
        &self,
        prompt: &str,
        _options: &QueryOptions,
    ) -> std::result::Result<String, GenerationError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.respond(prompt))
    }

    fn model_name(&self) -> String {
        self.name.clone()
    }
}
