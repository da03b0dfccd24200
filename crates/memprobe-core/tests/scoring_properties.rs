use memprobe_core::aggregate::{self, accuracy_metrics, drop_rate, perturbation_report};
use memprobe_core::scoring::{self, style};
use memprobe_core::{
    AggregateConfig, Expected, GenerationError, Perturbation, RawResponse, ScoredResult, TaskCase,
    TaskFamily,
};

fn arithmetic_case(perturbation: Perturbation, index: usize, answer: &str) -> TaskCase {
    TaskCase::new(
        TaskFamily::Arithmetic,
        perturbation,
        index,
        "What is 7 + 8?".to_string(),
        Expected::Text {
            answer: answer.to_string(),
        },
    )
}

fn scored(case: TaskCase, text: &str) -> ScoredResult {
    scoring::score(RawResponse::from_outcome(case, Ok(text.to_string()), 1))
}

fn logic_case() -> TaskCase {
    TaskCase::new(
        TaskFamily::LogicPuzzle,
        Perturbation::Clean,
        0,
        "Zoey remarked, 'Oliver is not a knight'.".to_string(),
        Expected::Assignment {
            text: "Zoey is a knave, Oliver is a knight".to_string(),
            participants: vec!["Zoey".to_string(), "Oliver".to_string()],
        },
    )
}

// ---- arithmetic scorer ----

#[test]
fn arithmetic_worked_answer_scores_correct() {
    let r = scored(arithmetic_case(Perturbation::Clean, 0, "15"), "Step by step: 7 + 8 = 15");
    assert!(r.is_correct());
}

#[test]
fn arithmetic_wrong_answer_scores_incorrect() {
    let r = scored(arithmetic_case(Perturbation::Clean, 0, "15"), "The answer is 42");
    assert!(!r.is_correct());
}

// ---- logic scorer ----

#[test]
fn logic_full_enumeration_scores_correct() {
    let r = scored(logic_case(), "(1) Zoey is a knave\n(2) Oliver is a knight");
    assert!(r.is_correct());
}

#[test]
fn logic_half_coverage_scores_incorrect() {
    let r = scored(logic_case(), "Zoey is a knave");
    assert!(!r.is_correct());
}

// ---- style classifier ----

#[test]
fn style_is_exactly_neutral_without_classifiable_units() {
    for text in ["", "Ok.", "The sky is blue today. Paris has many bridges."] {
        let (s, _) = style::classify(text, 0.8);
        assert_eq!(s.memory_ratio, 0.5, "{:?}", text);
    }
}

// ---- aggregator ----

#[test]
fn accuracy_is_bounded_and_exact() {
    let mut results = Vec::new();
    for i in 0..7 {
        let text = if i % 3 == 0 { "15" } else { "nope" };
        results.push(scored(arithmetic_case(Perturbation::Clean, i, "15"), text));
    }
    let metrics = accuracy_metrics(&results);
    for m in &metrics {
        assert!((0.0..=1.0).contains(&m.accuracy));
        assert_eq!(m.accuracy, m.correct_count as f64 / m.total_count as f64);
    }
    assert_eq!(metrics[0].correct_count, 3);
}

#[test]
fn reference_drop_is_exact_and_significant() {
    // baseline 4/5 = 0.80, variant 1/2 = 0.50
    let mut results = Vec::new();
    for i in 0..5 {
        let text = if i < 4 { "15" } else { "nope" };
        results.push(scored(arithmetic_case(Perturbation::Clean, i, "15"), text));
    }
    for i in 0..2 {
        let text = if i == 0 { "14" } else { "nope" };
        results.push(scored(arithmetic_case(Perturbation::Base(11), i, "14"), text));
    }

    let metrics = accuracy_metrics(&results);
    let report = perturbation_report(&metrics, Perturbation::Clean, 0.2).expect("baseline");
    assert_eq!(report.baseline_accuracy, 0.8);
    let variant = report.variant(Perturbation::Base(11)).expect("variant");
    assert_eq!(variant.accuracy, 0.5);
    assert_eq!(variant.drop, 0.375);
    assert!(variant.significant);
}

#[test]
fn drop_is_zero_for_zero_baseline_and_unclamped_otherwise() {
    assert_eq!(drop_rate(0.0, 0.7), 0.0);
    assert!(drop_rate(0.4, 0.8) < 0.0);
}

#[test]
fn errors_count_in_total_as_incorrect() {
    let results = vec![
        scored(arithmetic_case(Perturbation::Clean, 0, "15"), "15"),
        scoring::score(RawResponse::from_outcome(
            arithmetic_case(Perturbation::Clean, 1, "15"),
            Err(GenerationError::transport("reset by peer")),
            5,
        )),
    ];
    let metrics = accuracy_metrics(&results);
    assert_eq!(metrics[0].total_count, 2);
    assert_eq!(metrics[0].error_count, 1);
    assert_eq!(metrics[0].accuracy, 0.5);
}

#[test]
fn aggregation_is_idempotent() {
    let results: Vec<ScoredResult> = (0..6)
        .map(|i| {
            let p = if i < 3 { Perturbation::Clean } else { Perturbation::Base(11) };
            scored(arithmetic_case(p, i, "15"), if i % 2 == 0 { "15" } else { "x" })
        })
        .collect();
    let config = AggregateConfig::default();
    let families = [TaskFamily::Arithmetic];
    assert_eq!(
        aggregate::aggregate(&families, &results, &config),
        aggregate::aggregate(&families, &results, &config)
    );
}
