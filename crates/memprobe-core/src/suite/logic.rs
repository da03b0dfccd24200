//! Knights-and-knaves puzzles with two participants.
//!
//! Puzzles are kept as structure (participants, statements over a small
//! proposition tree) and only rendered to English at case-building time, so
//! every perturbation re-expresses the same ground truth: roles are semantic
//! ([`Role::Truthful`] / [`Role::Liar`]) and a [`Vocabulary`] decides which
//! word names which role.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::{Expected, Perturbation, TaskCase, TaskFamily};

/// Participant names found in ordinary puzzle corpora.
pub const COMMON_NAMES: &[&str] = &[
    "Zoey", "Oliver", "William", "Evelyn", "Alice", "Bob", "Liam", "Sofia", "Mason", "Harper",
];

/// Rare names used by the `uncommon_name` variant.
pub const UNCOMMON_NAMES: &[&str] = &[
    "Xiomara", "Zephyrus", "Quillon", "Ysolde", "Thaddeus", "Oriel", "Leontyne", "Caspian",
];

const FLIPPED_PREAMBLE: &str = "A very special island is inhabited only by knaves and knights. \
Knaves always tell the truth, and knights always lie.";

const SPEECH_VERBS: &[&str] = &["remarked", "stated", "was heard saying", "claimed"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Truthful,
    Liar,
}

/// Which word names which role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vocabulary {
    pub truthful: &'static str,
    pub liar: &'static str,
}

impl Vocabulary {
    pub const STANDARD: Vocabulary = Vocabulary {
        truthful: "knight",
        liar: "knave",
    };

    /// Knaves tell the truth, knights lie.
    pub const FLIPPED: Vocabulary = Vocabulary {
        truthful: "knave",
        liar: "knight",
    };

    pub fn word(&self, role: Role) -> &'static str {
        match role {
            Role::Truthful => self.truthful,
            Role::Liar => self.liar,
        }
    }
}

/// A claim one participant makes. Binary connectives only join atoms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prop {
    Is { who: usize, role: Role },
    IsNot { who: usize, role: Role },
    And(Box<Prop>, Box<Prop>),
    Or(Box<Prop>, Box<Prop>),
    Implies(Box<Prop>, Box<Prop>),
    Iff(Box<Prop>, Box<Prop>),
}

impl Prop {
    pub fn eval(&self, assignment: &[Role; 2]) -> bool {
        match self {
            Prop::Is { who, role } => assignment[*who] == *role,
            Prop::IsNot { who, role } => assignment[*who] != *role,
            Prop::And(a, b) => a.eval(assignment) && b.eval(assignment),
            Prop::Or(a, b) => a.eval(assignment) || b.eval(assignment),
            Prop::Implies(a, b) => !a.eval(assignment) || b.eval(assignment),
            Prop::Iff(a, b) => a.eval(assignment) == b.eval(assignment),
        }
    }

    pub fn render(&self, names: &[String; 2], vocab: &Vocabulary) -> String {
        match self {
            Prop::Is { who, role } => format!("{} is a {}", names[*who], vocab.word(*role)),
            Prop::IsNot { who, role } => {
                format!("{} is not a {}", names[*who], vocab.word(*role))
            }
            Prop::And(a, b) => format!("{} and {}", a.render(names, vocab), b.render(names, vocab)),
            Prop::Or(a, b) => format!("{} or {}", a.render(names, vocab), b.render(names, vocab)),
            Prop::Implies(a, b) => format!(
                "If {} then {}",
                a.render(names, vocab),
                b.render(names, vocab)
            ),
            Prop::Iff(a, b) => format!(
                "{} if and only if {}",
                a.render(names, vocab),
                b.render(names, vocab)
            ),
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Prop::Is { .. } | Prop::IsNot { .. } => 1,
            Prop::And(a, b) | Prop::Or(a, b) | Prop::Implies(a, b) | Prop::Iff(a, b) => {
                a.leaf_count() + b.leaf_count()
            }
        }
    }

    /// Copy of this proposition with the `index`-th leaf (depth-first)
    /// negated.
    pub fn with_negated_leaf(&self, index: usize) -> Prop {
        let mut copy = self.clone();
        let mut remaining = index;
        copy.negate_leaf(&mut remaining);
        copy
    }

    fn negate_leaf(&mut self, remaining: &mut usize) -> bool {
        let flipped = match self {
            Prop::Is { who, role } => Prop::IsNot {
                who: *who,
                role: *role,
            },
            Prop::IsNot { who, role } => Prop::Is {
                who: *who,
                role: *role,
            },
            Prop::And(a, b) | Prop::Or(a, b) | Prop::Implies(a, b) | Prop::Iff(a, b) => {
                return a.negate_leaf(remaining) || b.negate_leaf(remaining);
            }
        };
        if *remaining == 0 {
            *self = flipped;
            return true;
        }
        *remaining -= 1;
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub speaker: usize,
    pub verb: String,
    pub claim: Prop,
}

/// Two participants, their statements, nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
    pub names: [String; 2],
    pub statements: Vec<Statement>,
}

const ASSIGNMENTS: [[Role; 2]; 4] = [
    [Role::Truthful, Role::Truthful],
    [Role::Truthful, Role::Liar],
    [Role::Liar, Role::Truthful],
    [Role::Liar, Role::Liar],
];

impl Puzzle {
    /// Every role assignment under which truth-tellers only say true things
    /// and liars only say false things.
    pub fn solutions(&self) -> Vec<[Role; 2]> {
        ASSIGNMENTS
            .iter()
            .filter(|assignment| {
                self.statements.iter().all(|s| {
                    s.claim.eval(assignment) == (assignment[s.speaker] == Role::Truthful)
                })
            })
            .copied()
            .collect()
    }

    pub fn unique_solution(&self) -> Option<[Role; 2]> {
        match self.solutions().as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    pub fn renamed(&self, names: [String; 2]) -> Puzzle {
        Puzzle {
            names,
            statements: self.statements.clone(),
        }
    }

    pub fn quiz(&self, vocab: &Vocabulary) -> String {
        let mut parts = Vec::new();
        if *vocab == Vocabulary::FLIPPED {
            parts.push(FLIPPED_PREAMBLE.to_string());
        }
        for statement in &self.statements {
            parts.push(format!(
                "{} {}, '{}'.",
                self.names[statement.speaker],
                statement.verb,
                statement.claim.render(&self.names, vocab)
            ));
        }
        parts.push(format!(
            "Who is a {} and who is a {}?",
            vocab.truthful, vocab.liar
        ));
        parts.join(" ")
    }

    /// `"Zoey is a knave, Oliver is a knight"`
    pub fn answer_text(&self, solution: &[Role; 2], vocab: &Vocabulary) -> String {
        format!(
            "{} is a {}, {} is a {}",
            self.names[0],
            vocab.word(solution[0]),
            self.names[1],
            vocab.word(solution[1])
        )
    }

    /// Variant with one leaf negated that still has exactly one solution.
    pub fn perturb_leaf(&self, rng: &mut StdRng) -> Option<Puzzle> {
        let mut candidates: Vec<(usize, usize)> = self
            .statements
            .iter()
            .enumerate()
            .flat_map(|(si, s)| (0..s.claim.leaf_count()).map(move |li| (si, li)))
            .collect();
        candidates.shuffle(rng);

        candidates.into_iter().find_map(|(si, li)| {
            let mut perturbed = self.clone();
            perturbed.statements[si].claim = self.statements[si].claim.with_negated_leaf(li);
            perturbed.unique_solution().map(|_| perturbed)
        })
    }
}

fn is(who: usize, role: Role) -> Prop {
    Prop::Is { who, role }
}

/// The two hand-written puzzles every run starts with.
pub fn builtin_puzzles() -> Vec<Puzzle> {
    vec![
        Puzzle {
            names: ["Zoey".to_string(), "Oliver".to_string()],
            statements: vec![
                Statement {
                    speaker: 0,
                    verb: "remarked".to_string(),
                    claim: Prop::IsNot {
                        who: 1,
                        role: Role::Truthful,
                    },
                },
                Statement {
                    speaker: 1,
                    verb: "stated".to_string(),
                    claim: Prop::Iff(
                        Box::new(is(1, Role::Truthful)),
                        Box::new(is(0, Role::Liar)),
                    ),
                },
            ],
        },
        Puzzle {
            names: ["William".to_string(), "Evelyn".to_string()],
            statements: vec![
                Statement {
                    speaker: 0,
                    verb: "stated".to_string(),
                    claim: Prop::Implies(
                        Box::new(is(1, Role::Truthful)),
                        Box::new(is(1, Role::Liar)),
                    ),
                },
                Statement {
                    speaker: 1,
                    verb: "was heard saying".to_string(),
                    claim: Prop::And(
                        Box::new(is(0, Role::Truthful)),
                        Box::new(is(1, Role::Truthful)),
                    ),
                },
            ],
        },
    ]
}

fn random_atom(rng: &mut StdRng) -> Prop {
    let who = rng.gen_range(0..2);
    let role = if rng.gen_bool(0.5) { Role::Truthful } else { Role::Liar };
    if rng.gen_bool(0.3) {
        Prop::IsNot { who, role }
    } else {
        Prop::Is { who, role }
    }
}

fn random_claim(rng: &mut StdRng) -> Prop {
    let a = Box::new(random_atom(rng));
    match rng.gen_range(0..5) {
        0 => *a,
        1 => Prop::And(a, Box::new(random_atom(rng))),
        2 => Prop::Or(a, Box::new(random_atom(rng))),
        3 => Prop::Implies(a, Box::new(random_atom(rng))),
        _ => Prop::Iff(a, Box::new(random_atom(rng))),
    }
}

/// Draw `count` uniquely solvable puzzles over common names.
pub fn generate_puzzles(rng: &mut StdRng, count: usize) -> Vec<Puzzle> {
    const MAX_ATTEMPTS: usize = 1_000;
    let mut puzzles = Vec::with_capacity(count);

    for _ in 0..count {
        for _ in 0..MAX_ATTEMPTS {
            let mut pair: Vec<&str> = COMMON_NAMES.choose_multiple(rng, 2).copied().collect();
            pair.shuffle(rng);
            let statements = (0..2)
                .map(|speaker| Statement {
                    speaker,
                    verb: SPEECH_VERBS[rng.gen_range(0..SPEECH_VERBS.len())].to_string(),
                    claim: random_claim(rng),
                })
                .collect();
            let puzzle = Puzzle {
                names: [pair[0].to_string(), pair[1].to_string()],
                statements,
            };
            if puzzle.unique_solution().is_some() {
                puzzles.push(puzzle);
                break;
            }
        }
    }

    puzzles
}

pub fn prompt_for(quiz: &str) -> String {
    format!(
        "Solve this logic puzzle step by step:\n\n{}\n\nProvide your reasoning and final answer:",
        quiz
    )
}

fn case_for(puzzle: &Puzzle, perturbation: Perturbation, index: usize, vocab: &Vocabulary) -> Option<TaskCase> {
    let solution = puzzle.unique_solution()?;
    Some(TaskCase::new(
        TaskFamily::LogicPuzzle,
        perturbation,
        index,
        prompt_for(&puzzle.quiz(vocab)),
        Expected::Assignment {
            text: puzzle.answer_text(&solution, vocab),
            participants: puzzle.names.to_vec(),
        },
    ))
}

/// Cases for `clean`, `flip_role`, `uncommon_name` and `perturbed_leaf`, in
/// that order. Puzzles without a unique solution are skipped.
pub fn build_cases(puzzles: &[Puzzle], rng: &mut StdRng) -> Vec<TaskCase> {
    let mut cases = Vec::new();

    cases.extend(
        puzzles
            .iter()
            .enumerate()
            .filter_map(|(i, p)| case_for(p, Perturbation::Clean, i, &Vocabulary::STANDARD)),
    );

    cases.extend(
        puzzles
            .iter()
            .enumerate()
            .filter_map(|(i, p)| case_for(p, Perturbation::FlipRole, i, &Vocabulary::FLIPPED)),
    );

    cases.extend(puzzles.iter().enumerate().filter_map(|(i, p)| {
        let n = UNCOMMON_NAMES.len();
        let renamed = p.renamed([
            UNCOMMON_NAMES[(2 * i) % n].to_string(),
            UNCOMMON_NAMES[(2 * i + 1) % n].to_string(),
        ]);
        case_for(&renamed, Perturbation::UncommonName, i, &Vocabulary::STANDARD)
    }));

    let perturbed: Vec<Puzzle> = puzzles.iter().filter_map(|p| p.perturb_leaf(rng)).collect();
    cases.extend(
        perturbed
            .iter()
            .enumerate()
            .filter_map(|(i, p)| case_for(p, Perturbation::PerturbedLeaf, i, &Vocabulary::STANDARD)),
    );

    cases
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_builtin_puzzles_render_and_solve() {
        let puzzles = builtin_puzzles();
        let zoey = &puzzles[0];
        assert_eq!(
            zoey.quiz(&Vocabulary::STANDARD),
            "Zoey remarked, 'Oliver is not a knight'. Oliver stated, 'Oliver is a knight if and only if Zoey is a knave'. Who is a knight and who is a knave?"
        );
        let solution = zoey.unique_solution().expect("unique");
        assert_eq!(
            zoey.answer_text(&solution, &Vocabulary::STANDARD),
            "Zoey is a knave, Oliver is a knight"
        );

        let william = &puzzles[1];
        let solution = william.unique_solution().expect("unique");
        assert_eq!(
            william.answer_text(&solution, &Vocabulary::STANDARD),
            "William is a knight, Evelyn is a knave"
        );
    }

    #[test]
    fn test_flipped_vocabulary_reexpresses_ground_truth() {
        let zoey = &builtin_puzzles()[0];
        let quiz = zoey.quiz(&Vocabulary::FLIPPED);
        assert!(quiz.starts_with("A very special island"));
        assert!(quiz.contains("Zoey remarked, 'Oliver is not a knave'"));
        assert!(quiz.ends_with("Who is a knave and who is a knight?"));

        let solution = zoey.unique_solution().expect("unique");
        assert_eq!(
            zoey.answer_text(&solution, &Vocabulary::FLIPPED),
            "Zoey is a knight, Oliver is a knave"
        );
    }

    #[test]
    fn test_negated_leaf_is_depth_first() {
        let claim = Prop::Iff(Box::new(is(1, Role::Truthful)), Box::new(is(0, Role::Liar)));
        let negated = claim.with_negated_leaf(1);
        assert_eq!(
            negated,
            Prop::Iff(
                Box::new(is(1, Role::Truthful)),
                Box::new(Prop::IsNot {
                    who: 0,
                    role: Role::Liar
                })
            )
        );
        assert_eq!(claim.leaf_count(), 2);
    }

    #[test]
    fn test_perturbed_leaf_stays_uniquely_solvable() {
        let mut rng = StdRng::seed_from_u64(11);
        for puzzle in builtin_puzzles() {
            if let Some(perturbed) = puzzle.perturb_leaf(&mut rng) {
                assert!(perturbed.unique_solution().is_some());
                assert_ne!(perturbed.statements, puzzle.statements);
            }
        }
    }

    #[test]
    fn test_generated_puzzles_have_exactly_one_solution() {
        let mut rng = StdRng::seed_from_u64(42);
        let puzzles = generate_puzzles(&mut rng, 20);
        assert_eq!(puzzles.len(), 20);
        for puzzle in &puzzles {
            assert_eq!(puzzle.solutions().len(), 1);
            assert_ne!(puzzle.names[0], puzzle.names[1]);
        }
    }

    #[test]
    fn test_uncommon_names_preserve_roles() {
        let mut rng = StdRng::seed_from_u64(1);
        let cases = build_cases(&builtin_puzzles(), &mut rng);
        let uncommon: Vec<_> = cases
            .iter()
            .filter(|c| c.perturbation == Perturbation::UncommonName)
            .collect();
        assert_eq!(uncommon.len(), 2);
        assert!(uncommon[0].prompt.contains("Xiomara remarked, 'Zephyrus is not a knight'"));
        assert_eq!(
            uncommon[0].expected,
            Expected::Assignment {
                text: "Xiomara is a knave, Zephyrus is a knight".to_string(),
                participants: vec!["Xiomara".to_string(), "Zephyrus".to_string()],
            }
        );
    }
}
