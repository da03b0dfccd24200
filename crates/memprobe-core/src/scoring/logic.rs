//! Role-assignment scorer for knights-and-knaves answers.

/// Role keywords recognised in expected answers and responses.
pub const ROLE_KEYWORDS: [&str; 2] = ["knight", "knave"];

/// Characters of the expected answer inspected after each participant name.
pub const ROLE_WINDOW: usize = 50;

/// Fraction of expected pairs a response must reproduce.
pub const COVERAGE_THRESHOLD: f64 = 0.8;

/// One `(participant, role keyword)` requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePair {
    pub name: String,
    pub role: &'static str,
}

/// Outcome of scoring one logic response.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicCheck {
    pub pairs: Vec<RolePair>,
    pub satisfied: usize,
    pub correct: bool,
}

impl LogicCheck {
    pub fn coverage(&self) -> f64 {
        if self.pairs.is_empty() {
            1.0
        } else {
            self.satisfied as f64 / self.pairs.len() as f64
        }
    }
}

/// Pull `(name, role)` pairs out of an expected answer.
///
/// For each participant present in `expected`, the role is the first entry of
/// [`ROLE_KEYWORDS`] found in the [`ROLE_WINDOW`]-character window starting at
/// the name's first occurrence. `knight` wins whenever the window holds both,
/// even if `knave` comes earlier.
pub fn extract_pairs(expected: &str, participants: &[String]) -> Vec<RolePair> {
    let expected = expected.to_lowercase();
    let mut pairs = Vec::new();

    for name in participants {
        let name = name.to_lowercase();
        if name.is_empty() {
            continue;
        }
        let Some(start) = expected.find(&name) else {
            continue;
        };
        let window: String = expected[start..].chars().take(ROLE_WINDOW).collect();
        if let Some(role) = ROLE_KEYWORDS.iter().find(|kw| window.contains(**kw)) {
            pairs.push(RolePair { name, role: *role });
        }
    }

    pairs
}

/// Score `response` against `expected`.
///
/// A pair is satisfied when both its name and its role keyword appear
/// anywhere in the response. With no extractable pairs the check is
/// vacuously correct.
pub fn check_answer(expected: &str, participants: &[String], response: &str) -> LogicCheck {
    let pairs = extract_pairs(expected, participants);
    let response = response.to_lowercase();
    let satisfied = pairs
        .iter()
        .filter(|p| response.contains(&p.name) && response.contains(p.role))
        .count();
    let correct = satisfied as f64 >= pairs.len() as f64 * COVERAGE_THRESHOLD;

    LogicCheck {
        pairs,
        satisfied,
        correct,
    }
}
