//! End-to-end engine scenarios: batch preparation, pair comparison,
//! decision fusion, and cohort analysis.

use std::collections::HashMap;
use std::sync::Arc;

use approx::assert_relative_eq;

use parallax_rs::core::errors::ParallaxError;
use parallax_rs::detectors::ensemble::CloneSubtype;
use parallax_rs::lang::{LearnedScorer, LexicalTokenizer, TokenProvider};
use parallax_rs::{
    CloneType, CodeUnit, Confidence, Engine, EngineConfig, Language, RiskLevel,
};

/// A small solution with a three-step data-dependence chain. Long enough
/// that the tokenizer normalizes identifiers, so consistent renames keep the
/// token stream identical.
const CHAIN_SOLUTION: &str = r#"int compute(int seed) {
    int alpha = seed + 3;
    int beta = alpha * 2;
    int gamma = beta - alpha;
    int delta = gamma + beta;
    int total = 0;
    for (int index = 0; index < delta; index++) {
        total += index;
    }
    if (total > gamma) {
        total -= gamma;
    }
    int outcome = total + delta;
    int polish = outcome + 1;
    return polish;
}
"#;

const RECURSIVE_UNIT: &str = r#"int fib(int n) {
    if (n <= 1) {
        return n;
    }
    return fib(n - 1) + fib(n - 2);
}
"#;

const ITERATIVE_UNIT: &str = r#"int grid_total(int rows, int cols) {
    int total = 0;
    int row = 0;
    while (row < rows) {
        int col = 0;
        while (col < cols) {
            total += lookup(row, col);
            col += 1;
        }
        row += 1;
    }
    int bonus = 0;
    for (int step = 0; step < cols; step++) {
        bonus += scale(step);
    }
    if (bonus > total) {
        total = clamp(bonus);
    }
    int shifted = total * 4;
    return shifted;
}
"#;

fn engine() -> Engine {
    Engine::new(EngineConfig::default()).unwrap()
}

fn renamed_chain_solution(tag: &str) -> String {
    let names = [
        "compute", "seed", "alpha", "beta", "gamma", "delta", "total", "index", "outcome",
        "polish",
    ];
    let mut source = CHAIN_SOLUTION.to_string();
    for name in names {
        source = source.replace(name, &format!("{name}_{tag}"));
    }
    source
}

#[test]
fn renamed_copy_is_flagged_on_both_signals() {
    let engine = engine();
    let units = vec![
        CodeUnit::new("original.cpp", Language::Cpp, CHAIN_SOLUTION),
        CodeUnit::new("renamed.cpp", Language::Cpp, renamed_chain_solution("x")),
    ];

    let batch = engine.prepare_batch(&units).unwrap();
    let pair = engine.compare(&batch, "original.cpp", "renamed.cpp").unwrap();

    // Identical token streams: the structural signal saturates
    assert!(pair.structural.hybrid_score >= 0.6);
    assert_relative_eq!(pair.structural.signals.fingerprint, 1.0);
    assert_relative_eq!(pair.structural.signals.skeleton, 1.0);

    // Same dependence shape: the data-flow category is exact
    assert_relative_eq!(pair.semantic.categories.data_flow, 1.0, epsilon = 1e-9);
    assert_relative_eq!(pair.semantic.score, 1.0, epsilon = 1e-9);
    assert_eq!(pair.semantic.subtype, Some(CloneSubtype::Type1));

    assert_eq!(pair.verdict.clone_type, CloneType::Type3AndType4);
    assert_eq!(pair.verdict.risk, RiskLevel::Critical);
    assert!(pair.verdict.needs_review);

    // Renames do not move the behavioral hash
    assert_eq!(pair.semantic.behavioral_hash_a, pair.semantic.behavioral_hash_b);
    assert_eq!(pair.semantic.behavioral_hash_a.split('|').count(), 6);
}

#[test]
fn unrelated_recursive_and_iterative_units_score_unlikely() {
    let engine = engine();
    let units = vec![
        CodeUnit::new("recursive.cpp", Language::Cpp, RECURSIVE_UNIT),
        CodeUnit::new("iterative.cpp", Language::Cpp, ITERATIVE_UNIT),
    ];

    let batch = engine.prepare_batch(&units).unwrap();
    let pair = engine
        .compare(&batch, "recursive.cpp", "iterative.cpp")
        .unwrap();

    assert!(
        pair.semantic.score < 0.40,
        "semantic score {} should be below the UNLIKELY band",
        pair.semantic.score
    );
    assert_eq!(pair.semantic.confidence, Confidence::Unlikely);
    assert!(!pair.semantic.is_clone);
    assert!(!pair.structural.is_clone);
    assert_eq!(pair.verdict.clone_type, CloneType::None);
    assert_eq!(pair.verdict.risk, RiskLevel::None);
}

#[test]
fn uniform_cohort_reads_as_simple_assignment() {
    let engine = engine();
    let units: Vec<CodeUnit> = (0..10)
        .map(|i| {
            CodeUnit::new(
                format!("student_{i}.cpp"),
                Language::Cpp,
                renamed_chain_solution(&format!("v{i}")),
            )
        })
        .collect();

    let report = engine.analyze_batch(&units).unwrap();
    assert_eq!(report.total_units, 10);
    assert_eq!(report.total_comparisons, 45);

    let cohort = &report.cohort;
    assert!(cohort.high_similarity_ratio >= 0.70);
    assert!(cohort.is_simple_assignment);

    // Only pairs above cohort_average + margin may surface as outliers; in
    // a uniform cohort there are none, and review noise is suppressed
    for outlier in &cohort.outliers {
        assert!(
            outlier.structural_score >= cohort.average_structural + 0.15
                || outlier.semantic_score >= cohort.average_semantic + 0.15
        );
    }
    assert!(cohort.outliers.is_empty());
    assert!(report.review_pairs.is_empty());
}

#[test]
fn preparing_the_same_batch_twice_is_idempotent() {
    let engine = engine();
    let units = vec![
        CodeUnit::new("a.cpp", Language::Cpp, CHAIN_SOLUTION),
        CodeUnit::new("b.cpp", Language::Cpp, renamed_chain_solution("b")),
        CodeUnit::new("c.cpp", Language::Cpp, ITERATIVE_UNIT),
    ];

    let first = engine.prepare_batch(&units).unwrap();
    let second = engine.prepare_batch(&units).unwrap();

    assert_eq!(first.common_hash_count(), second.common_hash_count());
    assert_eq!(first.len(), second.len());

    let pair_first = engine.compare(&first, "a.cpp", "c.cpp").unwrap();
    let pair_second = engine.compare(&second, "a.cpp", "c.cpp").unwrap();
    assert_relative_eq!(
        pair_first.verdict.combined_score,
        pair_second.verdict.combined_score
    );
}

#[test]
fn comparison_is_symmetric() {
    let engine = engine();
    let units = vec![
        CodeUnit::new("a.cpp", Language::Cpp, RECURSIVE_UNIT),
        CodeUnit::new("b.cpp", Language::Cpp, ITERATIVE_UNIT),
    ];
    let batch = engine.prepare_batch(&units).unwrap();

    let ab = engine.compare(&batch, "a.cpp", "b.cpp").unwrap();
    let ba = engine.compare(&batch, "b.cpp", "a.cpp").unwrap();

    assert_relative_eq!(ab.structural.score, ba.structural.score, epsilon = 1e-12);
    assert_relative_eq!(ab.semantic.score, ba.semantic.score, epsilon = 1e-12);
    assert_relative_eq!(
        ab.verdict.combined_score,
        ba.verdict.combined_score,
        epsilon = 1e-12
    );
}

#[test]
fn self_comparison_is_maximal() {
    let engine = engine();
    let units = vec![
        CodeUnit::new("a.cpp", Language::Cpp, ITERATIVE_UNIT),
        CodeUnit::new("b.cpp", Language::Cpp, RECURSIVE_UNIT),
    ];
    let batch = engine.prepare_batch(&units).unwrap();

    let pair = engine.compare(&batch, "a.cpp", "a.cpp").unwrap();
    assert_relative_eq!(pair.semantic.score, 1.0, epsilon = 1e-9);
    assert_relative_eq!(pair.structural.signals.metrics, 1.0);
}

#[test]
fn unknown_unit_is_reported() {
    let engine = engine();
    let units = vec![
        CodeUnit::new("a.cpp", Language::Cpp, RECURSIVE_UNIT),
        CodeUnit::new("b.cpp", Language::Cpp, ITERATIVE_UNIT),
    ];
    let batch = engine.prepare_batch(&units).unwrap();

    let err = engine.compare(&batch, "a.cpp", "ghost.cpp").unwrap_err();
    assert!(matches!(err, ParallaxError::UnknownUnit { .. }));
}

#[test]
fn batches_below_two_units_cannot_be_analyzed() {
    let engine = engine();
    let units = vec![CodeUnit::new("only.cpp", Language::Cpp, RECURSIVE_UNIT)];
    let err = engine.analyze_batch(&units).unwrap_err();
    assert!(matches!(err, ParallaxError::InsufficientUnits { count: 1 }));
}

#[test]
fn empty_units_compare_without_errors() {
    let engine = engine();
    let units = vec![
        CodeUnit::new("empty_a.cpp", Language::Cpp, ""),
        CodeUnit::new("empty_b.cpp", Language::Cpp, ""),
        CodeUnit::new("real.cpp", Language::Cpp, RECURSIVE_UNIT),
    ];
    let batch = engine.prepare_batch(&units).unwrap();

    // Two empty units: fingerprints are both empty, so they match exactly
    let empty_pair = engine.compare(&batch, "empty_a.cpp", "empty_b.cpp").unwrap();
    assert_relative_eq!(empty_pair.structural.signals.fingerprint, 1.0);

    // Empty against real: exactly one side is empty
    let mixed = engine.compare(&batch, "empty_a.cpp", "real.cpp").unwrap();
    assert_relative_eq!(mixed.structural.signals.fingerprint, 0.0);
    assert_relative_eq!(mixed.structural.signals.skeleton, 0.0);
}

#[test]
fn batch_report_ranks_by_risk_then_score() {
    let engine = engine();
    let units = vec![
        CodeUnit::new("a.cpp", Language::Cpp, CHAIN_SOLUTION),
        CodeUnit::new("b.cpp", Language::Cpp, renamed_chain_solution("b")),
        CodeUnit::new("c.cpp", Language::Cpp, ITERATIVE_UNIT),
        CodeUnit::new("d.cpp", Language::Cpp, RECURSIVE_UNIT),
    ];

    let report = engine.analyze_batch(&units).unwrap();
    assert_eq!(report.total_comparisons, 6);

    for window in report.pairs.windows(2) {
        let (first, second) = (&window[0], &window[1]);
        assert!(
            first.verdict.risk > second.verdict.risk
                || (first.verdict.risk == second.verdict.risk
                    && first.verdict.combined_score >= second.verdict.combined_score)
        );
    }

    let risk_total: usize = report.cohort.risk_counts.values().sum();
    assert_eq!(risk_total, report.total_comparisons);
    let clone_total: usize = report.cohort.clone_type_counts.values().sum();
    assert_eq!(clone_total, report.total_comparisons);
}

/// Tokenizer that refuses marked units, for exercising exclusion.
struct PoisonAware {
    inner: LexicalTokenizer,
}

impl TokenProvider for PoisonAware {
    fn tokenize(&self, source: &str, language: Language) -> parallax_rs::Result<Vec<String>> {
        if source.contains("@@poison@@") {
            return Err(ParallaxError::tokenize(
                language.as_str(),
                "lexer rejected source",
            ));
        }
        self.inner.tokenize(source, language)
    }

    fn skeleton(&self, source: &str, language: Language) -> parallax_rs::Result<Vec<String>> {
        self.inner.skeleton(source, language)
    }
}

#[test]
fn failing_units_are_excluded_and_the_batch_continues() {
    let engine = Engine::new(EngineConfig::default())
        .unwrap()
        .with_token_provider(Arc::new(PoisonAware {
            inner: LexicalTokenizer::new(),
        }));

    let units = vec![
        CodeUnit::new("good_a.cpp", Language::Cpp, CHAIN_SOLUTION),
        CodeUnit::new("broken.cpp", Language::Cpp, "// @@poison@@\n"),
        CodeUnit::new("good_b.cpp", Language::Cpp, ITERATIVE_UNIT),
    ];

    let report = engine.analyze_batch(&units).unwrap();
    assert_eq!(report.total_units, 2);
    assert_eq!(report.total_comparisons, 1);
    assert_eq!(report.excluded.len(), 1);
    assert_eq!(report.excluded[0].id, "broken.cpp");
    assert!(report.excluded[0].reason.contains("lexer rejected"));
}

/// Learned scorer stub returning a fixed probability.
struct FixedScorer(f64);

impl LearnedScorer for FixedScorer {
    fn score(&self, _features: &HashMap<String, f64>) -> parallax_rs::Result<f64> {
        Ok(self.0)
    }
}

/// Learned scorer stub that always fails.
struct BrokenScorer;

impl LearnedScorer for BrokenScorer {
    fn score(&self, _features: &HashMap<String, f64>) -> parallax_rs::Result<f64> {
        Err(ParallaxError::internal("model not loaded"))
    }
}

#[test]
fn learned_scorer_blends_and_gates_the_structural_verdict() {
    let units = vec![
        CodeUnit::new("a.cpp", Language::Cpp, CHAIN_SOLUTION),
        CodeUnit::new("b.cpp", Language::Cpp, renamed_chain_solution("z")),
    ];

    // An agreeing learned signal keeps the clone verdict
    let engine = Engine::new(EngineConfig::default())
        .unwrap()
        .with_learned_scorer(Arc::new(FixedScorer(0.9)));
    let batch = engine.prepare_batch(&units).unwrap();
    let pair = engine.compare(&batch, "a.cpp", "b.cpp").unwrap();
    assert_eq!(pair.structural.learned_score, Some(0.9));
    assert_relative_eq!(
        pair.structural.score,
        pair.structural.hybrid_score * 0.5 + 0.45,
        epsilon = 1e-12
    );
    assert!(pair.structural.is_clone);

    // A dissenting learned signal vetoes it (AND logic)
    let engine = Engine::new(EngineConfig::default())
        .unwrap()
        .with_learned_scorer(Arc::new(FixedScorer(0.2)));
    let batch = engine.prepare_batch(&units).unwrap();
    let pair = engine.compare(&batch, "a.cpp", "b.cpp").unwrap();
    assert!(!pair.structural.is_clone);

    // A failing scorer silently falls back to heuristics
    let engine = Engine::new(EngineConfig::default())
        .unwrap()
        .with_learned_scorer(Arc::new(BrokenScorer));
    let batch = engine.prepare_batch(&units).unwrap();
    let pair = engine.compare(&batch, "a.cpp", "b.cpp").unwrap();
    assert_eq!(pair.structural.learned_score, None);
    assert_relative_eq!(pair.structural.score, pair.structural.hybrid_score);
    assert!(pair.structural.is_clone);
}

#[test]
fn invalid_weight_configuration_fails_at_construction() {
    let mut config = EngineConfig::default();
    config.semantic.weights.control_flow = 0.60;
    assert!(Engine::new(config).is_err());

    let mut config = EngineConfig::default();
    config.structural.fingerprint_weight = 0.45;
    assert!(Engine::new(config).is_err());
}

#[test]
fn batch_report_serializes_to_json() {
    let engine = engine();
    let units = vec![
        CodeUnit::new("a.cpp", Language::Cpp, CHAIN_SOLUTION),
        CodeUnit::new("b.cpp", Language::Cpp, ITERATIVE_UNIT),
    ];
    let report = engine.analyze_batch(&units).unwrap();

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"clone_type\""));
    assert!(json.contains("\"risk\""));
    assert!(json.contains("\"behavioral_hash_a\""));
}
