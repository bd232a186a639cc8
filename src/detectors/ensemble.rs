//! Ensemble confidence estimation and adaptive thresholding.
//!
//! Signal agreement drives confidence: when the per-category scores agree
//! (low variance) the classifier trusts the fused score; when they disagree
//! it raises the bar before calling a pair a clone.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::trace;

use crate::lang::Language;

/// Lower clamp for the adaptive threshold.
const THRESHOLD_FLOOR: f64 = 0.50;
/// Upper clamp for the adaptive threshold.
const THRESHOLD_CEILING: f64 = 0.85;

/// Clone subtype bands for a fused score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloneSubtype {
    /// Essentially identical code (score >= 0.95).
    Type1,
    /// Renamed-only duplication (score >= 0.85).
    Type2,
    /// Near-miss edited duplication (score >= 0.70).
    Type3,
    /// Behaviorally equivalent, differently written.
    Type4,
}

/// The ensemble's verdict over a set of named metric scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleDecision {
    /// Whether the fused score clears the adaptive threshold.
    pub is_clone: bool,
    /// The fused score that was judged.
    pub final_score: f64,
    /// Agreement-based confidence in `[0, 1]`.
    pub confidence: f64,
    /// The threshold actually applied after adaptation and clamping.
    pub threshold: f64,
    /// Clone subtype, present only when `is_clone` holds.
    pub subtype: Option<CloneSubtype>,
}

/// Confidence estimation and per-language adaptive thresholding.
#[derive(Debug, Clone)]
pub struct EnsembleClassifier {
    base_threshold: f64,
}

impl EnsembleClassifier {
    /// Create a classifier around a base detection threshold.
    pub fn new(base_threshold: f64) -> Self {
        Self { base_threshold }
    }

    /// Agreement-based confidence: `1 - min(1, 5 * variance)` over the
    /// metric values (population variance). Tight agreement scores near 1,
    /// strong disagreement near 0. An empty metric set has no signal at all.
    pub fn confidence(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let variance = values.iter().population_variance();
        (1.0 - (variance * 5.0).min(1.0)).max(0.0)
    }

    /// Adapt the base threshold for a confidence level and language.
    ///
    /// Low confidence raises the threshold by up to 0.10; high confidence
    /// lowers it by up to 0.05; the per-language offset shifts it; the
    /// result is clamped to `[0.50, 0.85]`.
    pub fn adaptive_threshold(&self, confidence: f64, language: Language) -> f64 {
        let mut threshold = self.base_threshold;

        if confidence < 0.5 {
            threshold += 0.10 * (0.5 - confidence) * 2.0;
        } else if confidence > 0.8 {
            threshold -= 0.05 * (confidence - 0.8) * 5.0;
        }

        threshold += language.threshold_offset();
        threshold.clamp(THRESHOLD_FLOOR, THRESHOLD_CEILING)
    }

    /// Judge a fused score against the named metric scores that produced it.
    pub fn classify(
        &self,
        metric_scores: &IndexMap<String, f64>,
        final_score: f64,
        language: Language,
    ) -> EnsembleDecision {
        let values: Vec<f64> = metric_scores.values().copied().collect();
        let confidence = self.confidence(&values);
        let threshold = self.adaptive_threshold(confidence, language);
        let is_clone = final_score >= threshold;

        trace!(
            final_score,
            confidence,
            threshold,
            language = %language,
            "ensemble classification"
        );

        EnsembleDecision {
            is_clone,
            final_score,
            confidence,
            threshold,
            subtype: is_clone.then(|| Self::subtype(final_score)),
        }
    }

    /// Clone subtype band for a fused score.
    pub fn subtype(final_score: f64) -> CloneSubtype {
        if final_score >= 0.95 {
            CloneSubtype::Type1
        } else if final_score >= 0.85 {
            CloneSubtype::Type2
        } else if final_score >= 0.70 {
            CloneSubtype::Type3
        } else {
            CloneSubtype::Type4
        }
    }
}
