//! Structural (copy/paste style) similarity scoring.
//!
//! Fuses three heuristic signals into a hybrid score: winnowing fingerprint
//! similarity after boilerplate removal, skeleton-sequence similarity, and a
//! complexity-metric distance. An optional learned probability combines with
//! the hybrid 50/50; when the learned collaborator is absent the hybrid
//! stands alone.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::behavioral::lcs_ratio;
use super::dependence::DependenceGraph;
use crate::core::config::StructuralConfig;
use crate::core::errors::Result;
use crate::lang::patterns::LanguageSpec;
use crate::lang::Language;

/// File-level complexity metric vector: lines of code, cyclomatic-complexity
/// sum, and function count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexityMetrics {
    /// Non-blank, non-comment line count.
    pub lines_of_code: usize,
    /// Sum of per-function cyclomatic complexity, approximated as one per
    /// function plus one per decision point.
    pub complexity_sum: usize,
    /// Number of function definitions.
    pub function_count: usize,
}

impl ComplexityMetrics {
    /// Compute the metric vector for a source text and its dependence graph.
    pub fn compute(source: &str, language: Language, graph: &DependenceGraph) -> Self {
        let spec = LanguageSpec::for_language(language);

        let lines_of_code = source
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !spec.is_comment(l))
            .count();

        let function_count = spec.defined_functions(source).len();
        let decisions = graph.loop_count + graph.condition_count;

        // Script-style files with no functions still carry one unit of
        // complexity
        let complexity_sum = if function_count == 0 && lines_of_code > 0 {
            decisions.max(1)
        } else {
            function_count + decisions
        };

        Self {
            lines_of_code,
            complexity_sum,
            function_count,
        }
    }

    fn as_vector(&self) -> [f64; 3] {
        [
            self.lines_of_code as f64,
            self.complexity_sum as f64,
            self.function_count as f64,
        ]
    }

    /// Metric similarity: `1 / (1 + euclidean_distance)`, so identical
    /// vectors score 1.0 and the score decays with distance.
    pub fn similarity(a: &Self, b: &Self) -> f64 {
        let va = a.as_vector();
        let vb = b.as_vector();
        let dist = va
            .iter()
            .zip(vb.iter())
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f64>()
            .sqrt();
        1.0 / (1.0 + dist)
    }
}

/// The three heuristic component similarities feeding the hybrid score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StructuralSignals {
    /// Fingerprint Jaccard after common-hash subtraction.
    pub fingerprint: f64,
    /// Skeleton-label sequence similarity.
    pub skeleton: f64,
    /// Complexity-metric similarity.
    pub metrics: f64,
}

/// Structural scoring outcome for one pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralOutcome {
    /// Weighted heuristic score.
    pub hybrid_score: f64,
    /// Learned probability, when the collaborator is installed.
    pub learned_score: Option<f64>,
    /// Final structural score: hybrid and learned combined 50/50, or the
    /// hybrid alone.
    pub score: f64,
    /// Clone decision: hybrid threshold AND (learned threshold, if present).
    pub is_clone: bool,
    /// Component similarities for reporting.
    pub signals: StructuralSignals,
}

/// Structural similarity scorer.
#[derive(Debug, Clone)]
pub struct StructuralDetector {
    config: StructuralConfig,
}

impl StructuralDetector {
    /// Create a detector, rejecting weight sets that do not sum to 1.0.
    pub fn new(config: StructuralConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Skeleton-sequence similarity between two ordered label sequences.
    pub fn skeleton_similarity(a: &[String], b: &[String]) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        lcs_ratio(a, b)
    }

    /// Weighted hybrid score over the three component similarities.
    pub fn hybrid_score(&self, signals: &StructuralSignals) -> f64 {
        signals.fingerprint * self.config.fingerprint_weight
            + signals.skeleton * self.config.skeleton_weight
            + signals.metrics * self.config.metrics_weight
    }

    /// Evaluate one pair from its component signals and optional learned
    /// probability.
    pub fn evaluate(
        &self,
        signals: StructuralSignals,
        learned_score: Option<f64>,
    ) -> StructuralOutcome {
        let hybrid_score = self.hybrid_score(&signals);

        let score = match learned_score {
            Some(ml) => hybrid_score * 0.5 + ml * 0.5,
            None => hybrid_score,
        };

        let learned_agrees = learned_score
            .map(|ml| ml >= self.config.ml_threshold)
            .unwrap_or(true);
        let is_clone = hybrid_score >= self.config.hybrid_threshold && learned_agrees;

        trace!(hybrid_score, ?learned_score, score, is_clone, "structural evaluation");

        StructuralOutcome {
            hybrid_score,
            learned_score,
            score,
            is_clone,
            signals,
        }
    }

    /// Named feature map handed to the learned-classifier collaborator.
    pub fn learned_features(
        signals: &StructuralSignals,
        token_count_a: usize,
        token_count_b: usize,
    ) -> HashMap<String, f64> {
        let a = token_count_a as f64;
        let b = token_count_b as f64;
        HashMap::from([
            ("fingerprint_similarity".to_string(), signals.fingerprint),
            ("skeleton_similarity".to_string(), signals.skeleton),
            ("metrics_similarity".to_string(), signals.metrics),
            ("token_count_a".to_string(), a),
            ("token_count_b".to_string(), b),
            ("abs_token_count_diff".to_string(), (a - b).abs()),
            ("avg_token_count".to_string(), (a + b) / 2.0),
        ])
    }
}
