//! Semantic (behavioral) similarity scoring.
//!
//! Fuses five category scores derived from two units' behavioral features:
//! control flow, data flow, call patterns, structural shape, and the
//! behavioral hash. The fused score is judged by the ensemble classifier
//! with a per-language adaptive threshold.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::behavioral::{BehavioralFeatureExtractor, BehavioralFeatures};
use super::ensemble::{EnsembleClassifier, EnsembleDecision};
use crate::core::config::SemanticConfig;
use crate::core::errors::Result;
use crate::lang::Language;

/// The five semantic category scores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CategoryScores {
    /// Loop/condition/nesting/recursion/signature agreement.
    pub control_flow: f64,
    /// Variable, dependency, and def-use agreement.
    pub data_flow: f64,
    /// Call count and sequence agreement.
    pub call_pattern: f64,
    /// Graph-shape agreement.
    pub structural: f64,
    /// Behavioral-hash and bucket agreement.
    pub behavioral: f64,
}

impl CategoryScores {
    /// The scores as a named map, in canonical order.
    pub fn as_named(&self) -> IndexMap<String, f64> {
        IndexMap::from([
            ("control_flow".to_string(), self.control_flow),
            ("data_flow".to_string(), self.data_flow),
            ("call_pattern".to_string(), self.call_pattern),
            ("structural".to_string(), self.structural),
            ("behavioral".to_string(), self.behavioral),
        ])
    }
}

/// Semantic scoring outcome for one pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticOutcome {
    /// Weighted overall semantic score.
    pub overall: f64,
    /// Per-category breakdown.
    pub categories: CategoryScores,
    /// Ensemble verdict: clone decision, confidence, threshold, subtype.
    pub decision: EnsembleDecision,
}

/// Semantic similarity scorer.
#[derive(Debug, Clone)]
pub struct SemanticDetector {
    config: SemanticConfig,
    extractor: BehavioralFeatureExtractor,
    ensemble: EnsembleClassifier,
}

impl SemanticDetector {
    /// Create a detector, rejecting weight sets that do not sum to 1.0.
    pub fn new(config: SemanticConfig) -> Result<Self> {
        config.validate()?;
        let ensemble = EnsembleClassifier::new(config.base_threshold);
        Ok(Self {
            config,
            extractor: BehavioralFeatureExtractor::new(),
            ensemble,
        })
    }

    /// Evaluate one pair of behavioral feature vectors.
    pub fn evaluate(
        &self,
        a: &BehavioralFeatures,
        b: &BehavioralFeatures,
        language: Language,
    ) -> SemanticOutcome {
        let pair = self.extractor.pair_features(a, b);
        let categories = self.category_scores(&pair);

        let weights = &self.config.weights;
        let overall = categories.control_flow * weights.control_flow
            + categories.data_flow * weights.data_flow
            + categories.call_pattern * weights.call_pattern
            + categories.structural * weights.structural
            + categories.behavioral * weights.behavioral;

        let decision = self
            .ensemble
            .classify(&categories.as_named(), overall, language);

        trace!(
            overall,
            control_flow = categories.control_flow,
            data_flow = categories.data_flow,
            "semantic evaluation"
        );

        SemanticOutcome {
            overall,
            categories,
            decision,
        }
    }

    /// Fold the named pairwise sub-features into the five category scores.
    pub fn category_scores(&self, pair: &IndexMap<String, f64>) -> CategoryScores {
        let get = |name: &str| pair.get(name).copied().unwrap_or(0.0);

        let control_flow = get("loop_similarity") * 0.20
            + get("condition_similarity") * 0.20
            + get("nesting_similarity") * 0.15
            + get("recursion_match") * 0.20
            + get("control_signature_similarity") * 0.15
            + get("control_pattern_similarity") * 0.10;

        let data_flow = get("variable_similarity") * 0.35
            + get("dependency_similarity") * 0.35
            + get("def_use_similarity") * 0.15
            + get("data_pattern_similarity") * 0.15;

        let call_pattern = get("call_count_similarity") * 0.30
            + get("unique_call_similarity") * 0.30
            + get("call_sequence_similarity") * 0.40;

        let structural = get("node_similarity") * 0.40
            + get("edge_similarity") * 0.40
            + get("return_similarity") * 0.20;

        let bucket_agreement = get("iteration_bucket_match") * 0.30
            + get("complexity_bucket_match") * 0.20
            + get("nesting_bucket_match") * 0.15
            + get("data_bucket_match") * 0.15
            + get("call_bucket_match") * 0.10
            + get("return_bucket_match") * 0.10;
        let behavioral = get("behavioral_hash_similarity") * 0.60 + bucket_agreement * 0.40;

        CategoryScores {
            control_flow,
            data_flow,
            call_pattern,
            structural,
            behavioral,
        }
    }
}
