//! Result models for pair comparisons and batch reports.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::session::ExcludedUnit;
use crate::detectors::ensemble::CloneSubtype;
use crate::detectors::semantic::CategoryScores;
use crate::detectors::structural::StructuralSignals;

/// Discretized confidence band for a similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    /// Overwhelming evidence.
    Critical,
    /// Strong evidence.
    High,
    /// Worth a look.
    Medium,
    /// Weak signal.
    Low,
    /// Probably unrelated.
    Unlikely,
}

impl Confidence {
    /// Band a structural score: 0.85 / 0.70 / 0.50 / 0.40 cut points.
    pub fn for_structural(score: f64) -> Self {
        if score >= 0.85 {
            Self::Critical
        } else if score >= 0.70 {
            Self::High
        } else if score >= 0.50 {
            Self::Medium
        } else if score >= 0.40 {
            Self::Low
        } else {
            Self::Unlikely
        }
    }

    /// Band a semantic score: 0.90 / 0.80 / 0.60 / 0.40 cut points.
    pub fn for_semantic(score: f64) -> Self {
        if score >= 0.90 {
            Self::Critical
        } else if score >= 0.80 {
            Self::High
        } else if score >= 0.60 {
            Self::Medium
        } else if score >= 0.40 {
            Self::Low
        } else {
            Self::Unlikely
        }
    }

    /// Whether this band counts as strong evidence.
    pub fn is_high(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    /// Label for reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Unlikely => "UNLIKELY",
        }
    }
}

/// The fused clone classification for a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloneType {
    /// No clone evidence.
    None,
    /// Structural (copy/paste style) clone.
    Type3,
    /// Semantic (rewritten-but-equivalent) clone.
    Type4,
    /// Both signals fired: the strongest evidence.
    Type3AndType4,
}

impl CloneType {
    /// Label for reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Type3 => "TYPE3",
            Self::Type4 => "TYPE4",
            Self::Type3AndType4 => "TYPE3_AND_TYPE4",
        }
    }
}

/// Integrity risk level for a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// No concern.
    None,
    /// Minor concern.
    Low,
    /// Needs review.
    Medium,
    /// Strong evidence.
    High,
    /// Immediate action needed.
    Critical,
}

impl RiskLevel {
    /// Label for reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

/// Recommended reviewer action, a fixed mapping from risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewAction {
    /// Pull the pair now.
    ImmediateReview,
    /// Queue the pair for review.
    ScheduledReview,
    /// Spot-check manually.
    ManualCheck,
    /// Note it, no meeting needed.
    NoteOnly,
    /// Nothing to do.
    NoAction,
}

impl ReviewAction {
    /// The action recommended for a risk level.
    pub fn for_risk(risk: RiskLevel) -> Self {
        match risk {
            RiskLevel::Critical => Self::ImmediateReview,
            RiskLevel::High => Self::ScheduledReview,
            RiskLevel::Medium => Self::ManualCheck,
            RiskLevel::Low => Self::NoteOnly,
            RiskLevel::None => Self::NoAction,
        }
    }
}

/// Structural signal summary for one pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralSummary {
    /// Final structural score (hybrid, or hybrid/learned blend).
    pub score: f64,
    /// Heuristic hybrid score.
    pub hybrid_score: f64,
    /// Learned probability, when available.
    pub learned_score: Option<f64>,
    /// Structural clone decision.
    pub is_clone: bool,
    /// Confidence band for the score.
    pub confidence: Confidence,
    /// Component similarities.
    pub signals: StructuralSignals,
}

/// Semantic signal summary for one pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticSummary {
    /// Weighted overall semantic score.
    pub score: f64,
    /// Semantic clone decision (adaptive threshold).
    pub is_clone: bool,
    /// Confidence band for the score.
    pub confidence: Confidence,
    /// Agreement-based ensemble confidence in `[0, 1]`.
    pub ensemble_confidence: f64,
    /// The adaptive threshold that was applied.
    pub threshold: f64,
    /// Clone subtype when the decision is positive.
    pub subtype: Option<CloneSubtype>,
    /// Per-category breakdown.
    pub categories: CategoryScores,
    /// First unit's behavioral hash.
    pub behavioral_hash_a: String,
    /// Second unit's behavioral hash.
    pub behavioral_hash_b: String,
}

/// The fused verdict for one pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedVerdict {
    /// Clone classification.
    pub clone_type: CloneType,
    /// Risk level.
    pub risk: RiskLevel,
    /// Mean of the structural and semantic scores.
    pub combined_score: f64,
    /// Whether the pair crosses the review threshold.
    pub needs_review: bool,
    /// Recommended action.
    pub review_action: ReviewAction,
    /// Human-readable explanation of the verdict.
    pub explanation: String,
}

/// Complete analysis of one pair: both signals plus the fused verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairAnalysis {
    /// First unit's identifier.
    pub unit_a: String,
    /// Second unit's identifier.
    pub unit_b: String,
    /// Structural signal.
    pub structural: StructuralSummary,
    /// Semantic signal.
    pub semantic: SemanticSummary,
    /// Fused verdict.
    pub verdict: UnifiedVerdict,
}

impl PairAnalysis {
    /// The larger of the two signal scores.
    pub fn max_signal(&self) -> f64 {
        self.structural.score.max(self.semantic.score)
    }
}

/// A pair scoring well above the cohort average.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierPair {
    /// First unit's identifier.
    pub unit_a: String,
    /// Second unit's identifier.
    pub unit_b: String,
    /// Structural score.
    pub structural_score: f64,
    /// Semantic score.
    pub semantic_score: f64,
    /// Structural score minus the cohort average.
    pub above_average_structural: f64,
    /// Semantic score minus the cohort average.
    pub above_average_semantic: f64,
}

/// Cohort-wide statistics and outlier flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortStats {
    /// Mean structural score across all pairs.
    pub average_structural: f64,
    /// Mean semantic score across all pairs.
    pub average_semantic: f64,
    /// Fraction of pairs at or above the class-high threshold on either
    /// signal.
    pub high_similarity_ratio: f64,
    /// Whether cohort-wide similarity reads as a simple assignment.
    pub is_simple_assignment: bool,
    /// Pairs well above the cohort average, ranked by their best signal.
    pub outliers: Vec<OutlierPair>,
    /// Pair counts per risk level.
    pub risk_counts: IndexMap<String, usize>,
    /// Pair counts per clone type.
    pub clone_type_counts: IndexMap<String, usize>,
    /// Pairs crossing the review threshold.
    pub needs_review_count: usize,
    /// Cohort-level interpretation for the reviewer.
    pub message: String,
}

/// A pair surfaced for reviewer attention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewPair {
    /// First unit's identifier.
    pub unit_a: String,
    /// Second unit's identifier.
    pub unit_b: String,
    /// Structural score.
    pub structural_score: f64,
    /// Semantic score.
    pub semantic_score: f64,
    /// Combined score.
    pub combined_score: f64,
    /// Risk level.
    pub risk: RiskLevel,
    /// Whether the pair is a cohort outlier.
    pub is_outlier: bool,
}

/// Full batch analysis: every pair, the cohort view, and exclusions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Usable units analyzed.
    pub total_units: usize,
    /// Pairs compared.
    pub total_comparisons: usize,
    /// All pair analyses, ranked by risk then combined score.
    pub pairs: Vec<PairAnalysis>,
    /// Pairs surfaced for review (cohort-aware).
    pub review_pairs: Vec<ReviewPair>,
    /// Cohort statistics.
    pub cohort: CohortStats,
    /// Units excluded during preparation.
    pub excluded: Vec<ExcludedUnit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_bands_per_signal() {
        assert_eq!(Confidence::for_structural(0.86), Confidence::Critical);
        assert_eq!(Confidence::for_structural(0.72), Confidence::High);
        assert_eq!(Confidence::for_structural(0.55), Confidence::Medium);
        assert_eq!(Confidence::for_structural(0.45), Confidence::Low);
        assert_eq!(Confidence::for_structural(0.10), Confidence::Unlikely);

        assert_eq!(Confidence::for_semantic(0.92), Confidence::Critical);
        assert_eq!(Confidence::for_semantic(0.85), Confidence::High);
        assert_eq!(Confidence::for_semantic(0.65), Confidence::Medium);
        assert_eq!(Confidence::for_semantic(0.45), Confidence::Low);
        assert_eq!(Confidence::for_semantic(0.30), Confidence::Unlikely);
    }

    #[test]
    fn review_actions_map_from_risk() {
        assert_eq!(
            ReviewAction::for_risk(RiskLevel::Critical),
            ReviewAction::ImmediateReview
        );
        assert_eq!(
            ReviewAction::for_risk(RiskLevel::High),
            ReviewAction::ScheduledReview
        );
        assert_eq!(
            ReviewAction::for_risk(RiskLevel::Medium),
            ReviewAction::ManualCheck
        );
        assert_eq!(ReviewAction::for_risk(RiskLevel::Low), ReviewAction::NoteOnly);
        assert_eq!(ReviewAction::for_risk(RiskLevel::None), ReviewAction::NoAction);
    }

    #[test]
    fn risk_levels_order_by_severity() {
        assert!(RiskLevel::Critical > RiskLevel::High);
        assert!(RiskLevel::High > RiskLevel::Medium);
        assert!(RiskLevel::Medium > RiskLevel::Low);
        assert!(RiskLevel::Low > RiskLevel::None);
    }

    #[test]
    fn serialized_labels_are_screaming_snake_case() {
        let json = serde_json::to_string(&CloneType::Type3AndType4).unwrap();
        assert_eq!(json, "\"TYPE3_AND_TYPE4\"");
        let json = serde_json::to_string(&RiskLevel::None).unwrap();
        assert_eq!(json, "\"NONE\"");
        let json = serde_json::to_string(&ReviewAction::ImmediateReview).unwrap();
        assert_eq!(json, "\"IMMEDIATE_REVIEW\"");
    }
}
