//! Open questions tagged with how much of a good answer should be recall.

use serde::{Deserialize, Serialize};

use crate::domain::{Expected, Perturbation, TaskCase, TaskFamily};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    MemoryIntensive,
    ReasoningIntensive,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProbeQuestion {
    pub question: &'static str,
    pub kind: ProbeKind,
    pub expected_memory_ratio: f64,
}

pub const PROBE_QUESTIONS: &[ProbeQuestion] = &[
    ProbeQuestion {
        question: "What is the capital of France and when was it established as the capital?",
        kind: ProbeKind::MemoryIntensive,
        expected_memory_ratio: 0.8,
    },
    ProbeQuestion {
        question: "If a farmer has 15 chickens and each chicken lays 2 eggs per day, but 3 chickens stop laying eggs, how many eggs will he collect in a week?",
        kind: ProbeKind::ReasoningIntensive,
        expected_memory_ratio: 0.2,
    },
    ProbeQuestion {
        question: "Explain the water cycle and analyze how climate change might affect it.",
        kind: ProbeKind::Mixed,
        expected_memory_ratio: 0.5,
    },
    ProbeQuestion {
        question: "If all birds can fly and penguins are birds, why can't penguins fly?",
        kind: ProbeKind::ReasoningIntensive,
        expected_memory_ratio: 0.2,
    },
    ProbeQuestion {
        question: "Explain the process of photosynthesis and its ecological significance.",
        kind: ProbeKind::Mixed,
        expected_memory_ratio: 0.5,
    },
];

pub fn prompt_for(question: &str) -> String {
    format!(
        "Please answer the following question step by step, providing detailed reasoning:\n\nQuestion: {}\n\nAnswer:",
        question
    )
}

pub fn build_cases(questions: &[ProbeQuestion]) -> Vec<TaskCase> {
    questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            TaskCase::new(
                TaskFamily::MemoryReasoning,
                Perturbation::Clean,
                i,
                prompt_for(q.question),
                Expected::MemoryRatio {
                    ratio: q.expected_memory_ratio,
                },
            )
        })
        .collect()
}
