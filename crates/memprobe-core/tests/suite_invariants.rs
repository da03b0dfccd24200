use memprobe_core::suite::arithmetic::to_radix;
use memprobe_core::suite::logic::{builtin_puzzles, generate_puzzles, Vocabulary};
use memprobe_core::{Expected, Perturbation, SuiteConfig, TaskFamily, TaskSuite};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn radix_reference_values() {
    assert_eq!(to_radix(54, 11), "4A");
    assert_eq!(to_radix(42, 11), "39");
}

#[test]
fn digest_is_stable_for_a_seed() {
    let config = SuiteConfig {
        generated_problems: 20,
        generated_puzzles: 5,
        ..SuiteConfig::default()
    };
    let a = TaskSuite::build(&config).digest().expect("digest");
    let b = TaskSuite::build(&config).digest().expect("digest");
    assert_eq!(a, b);
    assert_eq!(a.len(), 64);
}

#[test]
fn every_generated_puzzle_has_one_solution() {
    let mut rng = StdRng::seed_from_u64(2024);
    for puzzle in generate_puzzles(&mut rng, 50) {
        assert_eq!(puzzle.solutions().len(), 1, "{:?}", puzzle);
    }
}

#[test]
fn flip_role_expectation_is_reexpressed_solution() {
    let suite = TaskSuite::build(&SuiteConfig {
        families: vec![TaskFamily::LogicPuzzle],
        ..SuiteConfig::default()
    });
    let flipped: Vec<_> = suite
        .for_family(TaskFamily::LogicPuzzle)
        .filter(|c| c.perturbation == Perturbation::FlipRole)
        .collect();

    for (case, puzzle) in flipped.iter().zip(builtin_puzzles()) {
        let solution = puzzle.unique_solution().expect("unique");
        let expected = puzzle.answer_text(&solution, &Vocabulary::FLIPPED);
        match &case.expected {
            Expected::Assignment { text, .. } => assert_eq!(text, &expected),
            other => panic!("unexpected expectation {:?}", other),
        }
        assert!(case.prompt.contains("Knaves always tell the truth"));
    }
}

#[test]
fn perturbed_leaf_cases_match_their_prompts() {
    let suite = TaskSuite::build(&SuiteConfig {
        families: vec![TaskFamily::LogicPuzzle],
        generated_puzzles: 6,
        ..SuiteConfig::default()
    });
    let perturbed = suite
        .for_family(TaskFamily::LogicPuzzle)
        .filter(|c| c.perturbation == Perturbation::PerturbedLeaf)
        .count();
    assert!(perturbed > 0);
    for case in suite.for_family(TaskFamily::LogicPuzzle) {
        match &case.expected {
            Expected::Assignment { participants, text } => {
                assert_eq!(participants.len(), 2);
                for name in participants {
                    assert!(case.prompt.contains(name.as_str()), "{} not in {}", name, case.id);
                    assert!(text.contains(name.as_str()));
                }
            }
            other => panic!("unexpected expectation {:?}", other),
        }
    }
}

#[test]
fn case_ids_are_unique() {
    let suite = TaskSuite::build(&SuiteConfig {
        generated_problems: 10,
        generated_puzzles: 4,
        counterfactual_radixes: vec![9, 11, 16],
        ..SuiteConfig::default()
    });
    let mut ids: Vec<&str> = suite.cases().iter().map(|c| c.id.as_str()).collect();
    let before = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), before);
}
