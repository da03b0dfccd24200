//! Base-10 arithmetic and its non-decimal counterfactual.
//!
//! Operands are always written in decimal. The clean variant expects the
//! decimal result; a `base<N>` variant asks for the result in radix `N`, which
//! keeps the surface operators but shifts the answer alphabet.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::{Expected, Perturbation, TaskCase, TaskFamily};

const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Sub,
    Mul,
}

impl Operator {
    pub fn symbol(&self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Sub),
            '*' | 'x' | '×' => Some(Operator::Mul),
            _ => None,
        }
    }

    pub fn apply(&self, lhs: u64, rhs: u64) -> Option<u64> {
        match self {
            Operator::Add => lhs.checked_add(rhs),
            Operator::Sub => lhs.checked_sub(rhs),
            Operator::Mul => lhs.checked_mul(rhs),
        }
    }
}

/// `lhs op rhs` with a non-negative result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArithmeticProblem {
    pub lhs: u64,
    pub op: Operator,
    pub rhs: u64,
}

/// The five problems every arithmetic run starts with.
pub const SEED_PROBLEMS: [ArithmeticProblem; 5] = [
    ArithmeticProblem { lhs: 7, op: Operator::Add, rhs: 8 },
    ArithmeticProblem { lhs: 12, op: Operator::Sub, rhs: 5 },
    ArithmeticProblem { lhs: 6, op: Operator::Mul, rhs: 9 },
    ArithmeticProblem { lhs: 25, op: Operator::Add, rhs: 17 },
    ArithmeticProblem { lhs: 30, op: Operator::Sub, rhs: 13 },
];

impl ArithmeticProblem {
    pub fn value(&self) -> u64 {
        // Subtraction operands are ordered at construction.
        self.op.apply(self.lhs, self.rhs).unwrap_or(0)
    }

    /// `What is 7 + 8?` or `What is 7 + 8 in base 11?`
    pub fn question(&self, radix: u32) -> String {
        if radix == 10 {
            format!("What is {} {} {}?", self.lhs, self.op.symbol(), self.rhs)
        } else {
            format!(
                "What is {} {} {} in base {}?",
                self.lhs,
                self.op.symbol(),
                self.rhs,
                radix
            )
        }
    }

    pub fn answer(&self, radix: u32) -> String {
        to_radix(self.value(), radix)
    }
}

/// Positional notation of `n` in `radix` (2..=36), upper-case digits.
///
/// Radixes outside that range fall back to decimal.
pub fn to_radix(mut n: u64, radix: u32) -> String {
    if !(2..=36).contains(&radix) {
        return n.to_string();
    }
    if n == 0 {
        return "0".to_string();
    }
    let radix = radix as u64;
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % radix) as usize]);
        n /= radix;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Draw `count` problems with operands in 1..=50; subtraction never goes
/// negative.
pub fn generate_problems(rng: &mut StdRng, count: usize) -> Vec<ArithmeticProblem> {
    (0..count)
        .map(|_| {
            let op = match rng.gen_range(0..3) {
                0 => Operator::Add,
                1 => Operator::Sub,
                _ => Operator::Mul,
            };
            let a = rng.gen_range(1..=50u64);
            let b = rng.gen_range(1..=50u64);
            let (lhs, rhs) = if op == Operator::Sub && a < b { (b, a) } else { (a, b) };
            ArithmeticProblem { lhs, op, rhs }
        })
        .collect()
}

pub fn prompt_for(question: &str) -> String {
    format!(
        "Solve this arithmetic problem step by step:\n\n{}\n\nShow your work and provide the final answer:",
        question
    )
}

/// Cases for the clean variant followed by one block per counterfactual radix.
pub fn build_cases(problems: &[ArithmeticProblem], radixes: &[u32]) -> Vec<TaskCase> {
    let mut cases = Vec::new();

    for (i, problem) in problems.iter().enumerate() {
        cases.push(TaskCase::new(
            TaskFamily::Arithmetic,
            Perturbation::Clean,
            i,
            prompt_for(&problem.question(10)),
            Expected::Text {
                answer: problem.answer(10),
            },
        ));
    }

    for &radix in radixes.iter().filter(|r| **r != 10) {
        for (i, problem) in problems.iter().enumerate() {
            cases.push(TaskCase::new(
                TaskFamily::Arithmetic,
                Perturbation::Base(radix),
                i,
                prompt_for(&problem.question(radix)),
                Expected::Text {
                    answer: problem.answer(radix),
                },
            ));
        }
    }

    cases
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_to_radix_base11() {
        assert_eq!(to_radix(15, 11), "14");
        assert_eq!(to_radix(7, 11), "7");
        assert_eq!(to_radix(54, 11), "4A");
        assert_eq!(to_radix(42, 11), "39");
        assert_eq!(to_radix(17, 11), "16");
    }

    #[test]
    fn test_to_radix_edges() {
        assert_eq!(to_radix(0, 11), "0");
        assert_eq!(to_radix(255, 16), "FF");
        assert_eq!(to_radix(5, 2), "101");
        assert_eq!(to_radix(42, 1), "42");
    }

    #[test]
    fn test_seed_problem_questions() {
        assert_eq!(SEED_PROBLEMS[0].question(10), "What is 7 + 8?");
        assert_eq!(SEED_PROBLEMS[2].question(11), "What is 6 * 9 in base 11?");
        assert_eq!(SEED_PROBLEMS[2].answer(11), "4A");
    }

    #[test]
    fn test_generated_subtraction_is_never_negative() {
        let mut rng = StdRng::seed_from_u64(7);
        for problem in generate_problems(&mut rng, 200) {
            assert!(problem.op.apply(problem.lhs, problem.rhs).is_some());
            assert!((1..=50).contains(&problem.lhs));
            assert!((1..=50).contains(&problem.rhs));
        }
    }

    #[test]
    fn test_build_cases_orders_clean_first() {
        let cases = build_cases(&SEED_PROBLEMS, &[11]);
        assert_eq!(cases.len(), 10);
        assert!(cases[..5].iter().all(|c| c.perturbation == Perturbation::Clean));
        assert!(cases[5..].iter().all(|c| c.perturbation == Perturbation::Base(11)));
        assert!(cases[0].prompt.contains("What is 7 + 8?"));
        assert_eq!(
            cases[7].expected,
            Expected::Text {
                answer: "4A".to_string()
            }
        );
    }

    #[test]
    fn test_build_cases_skips_decimal_radix() {
        let cases = build_cases(&SEED_PROBLEMS[..1], &[10, 9]);
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[1].perturbation, Perturbation::Base(9));
    }
}
