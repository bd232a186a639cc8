//! The analysis engine: batch preparation, pair comparison, decision
//! fusion, and cohort analysis.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::api::results::{
    BatchReport, CloneType, CohortStats, Confidence, OutlierPair, PairAnalysis, ReviewAction,
    ReviewPair, RiskLevel, SemanticSummary, StructuralSummary, UnifiedVerdict,
};
use crate::core::config::EngineConfig;
use crate::core::errors::{ParallaxError, Result};
use crate::core::session::{CodeUnit, ExcludedUnit, PreparedBatch, PreparedUnit, UnitArtifacts};
use crate::detectors::behavioral::BehavioralFeatureExtractor;
use crate::detectors::dependence::DependenceGraphBuilder;
use crate::detectors::fingerprint::{subtract_common, FrequencyFilter, WinnowingFingerprinter};
use crate::detectors::semantic::{SemanticDetector, SemanticOutcome};
use crate::detectors::structural::{
    ComplexityMetrics, StructuralDetector, StructuralOutcome, StructuralSignals,
};
use crate::lang::{LearnedScorer, LexicalTokenizer, TokenProvider};

/// Clone-detection engine over batches of code units.
///
/// Construction fails fast on invalid configuration. The engine itself is
/// immutable and shareable: all per-batch state lives in [`PreparedBatch`]
/// values, which are independent sessions.
pub struct Engine {
    config: EngineConfig,
    token_provider: Arc<dyn TokenProvider>,
    learned_scorer: Option<Arc<dyn LearnedScorer>>,
    fingerprinter: WinnowingFingerprinter,
    frequency_filter: FrequencyFilter,
    graph_builder: DependenceGraphBuilder,
    extractor: BehavioralFeatureExtractor,
    structural: StructuralDetector,
    semantic: SemanticDetector,
}

impl Engine {
    /// Create an engine with the default tokenizer and no learned scorer.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let fingerprinter = WinnowingFingerprinter::new(
            config.fingerprint.kgram_len,
            config.fingerprint.window_size,
        );
        let frequency_filter = FrequencyFilter::new(
            config.fingerprint.common_threshold,
            config.fingerprint.kgram_len,
        );
        let graph_builder = DependenceGraphBuilder::new()
            .with_control_lookahead(config.dependence.control_lookahead);
        let structural = StructuralDetector::new(config.structural.clone())?;
        let semantic = SemanticDetector::new(config.semantic.clone())?;

        Ok(Self {
            config,
            token_provider: Arc::new(LexicalTokenizer::new()),
            learned_scorer: None,
            fingerprinter,
            frequency_filter,
            graph_builder,
            extractor: BehavioralFeatureExtractor::new(),
            structural,
            semantic,
        })
    }

    /// Replace the tokenizer / skeleton collaborator.
    pub fn with_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = provider;
        self
    }

    /// Install a learned-classifier collaborator.
    pub fn with_learned_scorer(mut self, scorer: Arc<dyn LearnedScorer>) -> Self {
        self.learned_scorer = Some(scorer);
        self
    }

    /// Build every unit's caches and train the cohort frequency filter.
    ///
    /// Units whose tokenizer fails are excluded with a recorded reason; the
    /// batch continues. Preparing the same unit set twice yields the same
    /// common-hash set.
    pub fn prepare_batch(&self, units: &[CodeUnit]) -> Result<PreparedBatch> {
        let built: Vec<(usize, Result<UnitArtifacts>)> = units
            .par_iter()
            .enumerate()
            .map(|(i, unit)| (i, self.build_artifacts(unit)))
            .collect();

        let mut prepared = Vec::with_capacity(units.len());
        let mut excluded = Vec::new();
        for (i, result) in built {
            let unit = &units[i];
            match result {
                Ok(artifacts) => prepared.push(PreparedUnit {
                    id: unit.id.clone(),
                    language: unit.language,
                    artifacts,
                }),
                Err(err) => {
                    warn!(unit = %unit.id, error = %err, "unit excluded from batch");
                    excluded.push(ExcludedUnit {
                        id: unit.id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        // The filter must see the whole surviving cohort before any pair is
        // compared
        let token_streams: Vec<&[String]> = prepared
            .iter()
            .map(|u| u.artifacts.tokens.as_slice())
            .collect();
        let common_hashes = self.frequency_filter.train(&token_streams);

        info!(
            units = prepared.len(),
            excluded = excluded.len(),
            common_hashes = common_hashes.len(),
            "batch prepared"
        );

        Ok(PreparedBatch::from_parts(prepared, common_hashes, excluded))
    }

    /// Compare two units of a prepared batch by id.
    pub fn compare(&self, batch: &PreparedBatch, id_a: &str, id_b: &str) -> Result<PairAnalysis> {
        let unit_a = batch.unit_by_id(id_a)?;
        let unit_b = batch.unit_by_id(id_b)?;
        Ok(self.compare_prepared(batch, unit_a, unit_b))
    }

    /// Prepare a batch and compare all pairs, producing the cohort report.
    pub fn analyze_batch(&self, units: &[CodeUnit]) -> Result<BatchReport> {
        let batch = self.prepare_batch(units)?;
        if batch.len() < 2 {
            return Err(ParallaxError::InsufficientUnits { count: batch.len() });
        }

        let n = batch.len();
        let index_pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();

        let mut pairs: Vec<PairAnalysis> = index_pairs
            .par_iter()
            .map(|&(i, j)| {
                let units = batch.units();
                self.compare_prepared(&batch, &units[i], &units[j])
            })
            .collect();

        let cohort = self.cohort_stats(&pairs);
        let review_pairs = self.review_pairs(&pairs, &cohort);

        // Rank by risk first, then by combined score
        pairs.sort_by(|a, b| {
            b.verdict
                .risk
                .cmp(&a.verdict.risk)
                .then_with(|| {
                    b.verdict
                        .combined_score
                        .partial_cmp(&a.verdict.combined_score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });

        debug!(
            pairs = pairs.len(),
            outliers = cohort.outliers.len(),
            simple = cohort.is_simple_assignment,
            "batch analysis complete"
        );

        Ok(BatchReport {
            total_units: n,
            total_comparisons: pairs.len(),
            pairs,
            review_pairs,
            cohort,
            excluded: batch.excluded().to_vec(),
        })
    }

    fn build_artifacts(&self, unit: &CodeUnit) -> Result<UnitArtifacts> {
        let tokens = self
            .token_provider
            .tokenize(&unit.source, unit.language)
            .map_err(|e| annotate_unit(e, &unit.id))?;
        let skeleton = self
            .token_provider
            .skeleton(&unit.source, unit.language)
            .map_err(|e| annotate_unit(e, &unit.id))?;

        let fingerprint = self.fingerprinter.fingerprint(&tokens);
        let graph = self.graph_builder.build(&unit.source, unit.language);
        let features = self.extractor.extract(&graph);
        let metrics = ComplexityMetrics::compute(&unit.source, unit.language, &graph);

        Ok(UnitArtifacts {
            tokens,
            fingerprint,
            skeleton,
            graph,
            features,
            metrics,
        })
    }

    fn compare_prepared(
        &self,
        batch: &PreparedBatch,
        unit_a: &PreparedUnit,
        unit_b: &PreparedUnit,
    ) -> PairAnalysis {
        let a = &unit_a.artifacts;
        let b = &unit_b.artifacts;

        // Structural signal
        let filtered_a = subtract_common(&a.fingerprint, batch.common_hashes());
        let filtered_b = subtract_common(&b.fingerprint, batch.common_hashes());
        let signals = StructuralSignals {
            fingerprint: self.fingerprinter.similarity(&filtered_a, &filtered_b),
            skeleton: StructuralDetector::skeleton_similarity(&a.skeleton, &b.skeleton),
            metrics: ComplexityMetrics::similarity(&a.metrics, &b.metrics),
        };
        let learned_score = self.learned_score(&signals, a.tokens.len(), b.tokens.len());
        let structural = self.structural.evaluate(signals, learned_score);

        // Semantic signal
        let semantic = self
            .semantic
            .evaluate(&a.features, &b.features, unit_a.language);

        self.fuse(unit_a, unit_b, structural, semantic)
    }

    /// Query the learned collaborator, treating failures as absence.
    fn learned_score(
        &self,
        signals: &StructuralSignals,
        tokens_a: usize,
        tokens_b: usize,
    ) -> Option<f64> {
        let scorer = self.learned_scorer.as_ref()?;
        let features = StructuralDetector::learned_features(signals, tokens_a, tokens_b);
        match scorer.score(&features) {
            Ok(p) => Some(p.clamp(0.0, 1.0)),
            Err(err) => {
                warn!(error = %err, "learned scorer failed; falling back to heuristics");
                None
            }
        }
    }

    fn fuse(
        &self,
        unit_a: &PreparedUnit,
        unit_b: &PreparedUnit,
        structural: StructuralOutcome,
        semantic: SemanticOutcome,
    ) -> PairAnalysis {
        let structural_confidence = Confidence::for_structural(structural.score);
        let semantic_confidence = Confidence::for_semantic(semantic.overall);

        let clone_type = clone_type(
            structural_confidence,
            structural.is_clone,
            semantic_confidence,
            semantic.decision.is_clone,
        );
        let risk = risk_level(structural_confidence, semantic_confidence);
        let combined_score = structural.score * 0.5 + semantic.overall * 0.5;
        let needs_review = combined_score >= self.config.cohort.review_threshold;

        let explanation = explanation(
            clone_type,
            structural_confidence,
            structural.score,
            semantic_confidence,
            semantic.overall,
        );

        PairAnalysis {
            unit_a: unit_a.id.clone(),
            unit_b: unit_b.id.clone(),
            structural: StructuralSummary {
                score: structural.score,
                hybrid_score: structural.hybrid_score,
                learned_score: structural.learned_score,
                is_clone: structural.is_clone,
                confidence: structural_confidence,
                signals: structural.signals,
            },
            semantic: SemanticSummary {
                score: semantic.overall,
                is_clone: semantic.decision.is_clone,
                confidence: semantic_confidence,
                ensemble_confidence: semantic.decision.confidence,
                threshold: semantic.decision.threshold,
                subtype: semantic.decision.subtype,
                categories: semantic.categories,
                behavioral_hash_a: unit_a.artifacts.features.behavioral_hash.clone(),
                behavioral_hash_b: unit_b.artifacts.features.behavioral_hash.clone(),
            },
            verdict: UnifiedVerdict {
                clone_type,
                risk,
                combined_score,
                needs_review,
                review_action: ReviewAction::for_risk(risk),
                explanation,
            },
        }
    }

    fn cohort_stats(&self, pairs: &[PairAnalysis]) -> CohortStats {
        let cohort = &self.config.cohort;

        if pairs.is_empty() {
            return CohortStats {
                average_structural: 0.0,
                average_semantic: 0.0,
                high_similarity_ratio: 0.0,
                is_simple_assignment: false,
                outliers: Vec::new(),
                risk_counts: risk_counts(pairs),
                clone_type_counts: clone_type_counts(pairs),
                needs_review_count: 0,
                message: "No pairs to analyze.".to_string(),
            };
        }

        let total = pairs.len() as f64;
        let average_structural = pairs.iter().map(|p| p.structural.score).sum::<f64>() / total;
        let average_semantic = pairs.iter().map(|p| p.semantic.score).sum::<f64>() / total;

        let high_count = pairs
            .iter()
            .filter(|p| {
                p.structural.score >= cohort.class_high_threshold
                    || p.semantic.score >= cohort.class_high_threshold
            })
            .count();
        let high_similarity_ratio = high_count as f64 / total;
        let is_simple_assignment = high_similarity_ratio >= cohort.simple_assignment_ratio;

        let outlier_threshold_structural = average_structural + cohort.outlier_margin;
        let outlier_threshold_semantic = average_semantic + cohort.outlier_margin;

        let mut outliers: Vec<OutlierPair> = pairs
            .iter()
            .filter(|p| {
                p.structural.score >= outlier_threshold_structural
                    || p.semantic.score >= outlier_threshold_semantic
            })
            .map(|p| OutlierPair {
                unit_a: p.unit_a.clone(),
                unit_b: p.unit_b.clone(),
                structural_score: p.structural.score,
                semantic_score: p.semantic.score,
                above_average_structural: p.structural.score - average_structural,
                above_average_semantic: p.semantic.score - average_semantic,
            })
            .collect();
        outliers.sort_by(|a, b| {
            let ma = a.structural_score.max(a.semantic_score);
            let mb = b.structural_score.max(b.semantic_score);
            mb.partial_cmp(&ma).unwrap_or(std::cmp::Ordering::Equal)
        });
        outliers.truncate(cohort.max_outliers);

        let needs_review_count = pairs.iter().filter(|p| p.verdict.needs_review).count();

        let message = if is_simple_assignment {
            format!(
                "Simple assignment detected: {:.0}% of pairs show high similarity, so alike \
                 solutions are expected. Focus on the {} outlier pair(s) well above the cohort \
                 average (structural {:.0}%, semantic {:.0}%).",
                high_similarity_ratio * 100.0,
                outliers.len(),
                average_structural * 100.0,
                average_semantic * 100.0,
            )
        } else if high_similarity_ratio > 0.3 {
            format!(
                "Elevated similarity: {:.0}% of pairs score high. Review the flagged pairs \
                 carefully.",
                high_similarity_ratio * 100.0,
            )
        } else {
            format!(
                "Normal pattern: {:.0}% of pairs score high, within the expected range.",
                high_similarity_ratio * 100.0,
            )
        };

        CohortStats {
            average_structural,
            average_semantic,
            high_similarity_ratio,
            is_simple_assignment,
            outliers,
            risk_counts: risk_counts(pairs),
            clone_type_counts: clone_type_counts(pairs),
            needs_review_count,
            message,
        }
    }

    /// The review list: every pair over the review threshold, except in
    /// simple-assignment cohorts where only outliers surface.
    fn review_pairs(&self, pairs: &[PairAnalysis], cohort: &CohortStats) -> Vec<ReviewPair> {
        let is_outlier = |p: &PairAnalysis| {
            p.structural.score >= cohort.average_structural + self.config.cohort.outlier_margin
                || p.semantic.score >= cohort.average_semantic + self.config.cohort.outlier_margin
        };

        let mut review: Vec<ReviewPair> = pairs
            .iter()
            .filter(|p| {
                if cohort.is_simple_assignment {
                    is_outlier(p)
                } else {
                    p.verdict.needs_review
                }
            })
            .map(|p| ReviewPair {
                unit_a: p.unit_a.clone(),
                unit_b: p.unit_b.clone(),
                structural_score: p.structural.score,
                semantic_score: p.semantic.score,
                combined_score: p.verdict.combined_score,
                risk: p.verdict.risk,
                is_outlier: is_outlier(p),
            })
            .collect();

        review.sort_by(|a, b| {
            let ma = a.structural_score.max(a.semantic_score);
            let mb = b.structural_score.max(b.semantic_score);
            mb.partial_cmp(&ma).unwrap_or(std::cmp::Ordering::Equal)
        });

        review
    }
}

/// Clone-type ladder: strong agreement first, then single strong signals,
/// then plain clone decisions.
fn clone_type(
    structural_confidence: Confidence,
    structural_clone: bool,
    semantic_confidence: Confidence,
    semantic_clone: bool,
) -> CloneType {
    let s_high = structural_confidence.is_high();
    let m_high = semantic_confidence.is_high();

    if s_high && m_high {
        CloneType::Type3AndType4
    } else if s_high {
        CloneType::Type3
    } else if m_high {
        CloneType::Type4
    } else if structural_clone && semantic_clone {
        CloneType::Type3AndType4
    } else if structural_clone {
        CloneType::Type3
    } else if semantic_clone {
        CloneType::Type4
    } else {
        CloneType::None
    }
}

/// Risk ladder over the two confidence bands.
fn risk_level(structural: Confidence, semantic: Confidence) -> RiskLevel {
    use Confidence::{Critical, High, Medium};

    if structural == Critical || semantic == Critical {
        return RiskLevel::Critical;
    }
    if structural == High && semantic == High {
        return RiskLevel::Critical;
    }
    if structural == High || semantic == High {
        return RiskLevel::High;
    }
    if structural == Medium && semantic == Medium {
        return RiskLevel::Medium;
    }
    if structural == Medium || semantic == Medium {
        return RiskLevel::Low;
    }
    RiskLevel::None
}

fn explanation(
    clone_type: CloneType,
    structural_confidence: Confidence,
    structural_score: f64,
    semantic_confidence: Confidence,
    semantic_score: f64,
) -> String {
    match clone_type {
        CloneType::Type3AndType4 => format!(
            "Strong evidence: code is structurally similar (structural {}, score {:.2}) and \
             behaves the same (semantic {}, score {:.2}). This pattern strongly suggests copied \
             work.",
            structural_confidence.as_str(),
            structural_score,
            semantic_confidence.as_str(),
            semantic_score,
        ),
        CloneType::Type3 => format!(
            "Structural match: the code's shape is similar (structural {}, score {:.2}) but its \
             behavior diverges (semantic {}, score {:.2}). Could be a shared template or partial \
             copying.",
            structural_confidence.as_str(),
            structural_score,
            semantic_confidence.as_str(),
            semantic_score,
        ),
        CloneType::Type4 => format!(
            "Semantic match: the code looks different (structural {}, score {:.2}) but behaves \
             the same (semantic {}, score {:.2}). Either the same algorithm written \
             independently, or a rewrite intended to disguise copying.",
            structural_confidence.as_str(),
            structural_score,
            semantic_confidence.as_str(),
            semantic_score,
        ),
        CloneType::None => format!(
            "No significant similarity: structural {} (score {:.2}), semantic {} (score {:.2}).",
            structural_confidence.as_str(),
            structural_score,
            semantic_confidence.as_str(),
            semantic_score,
        ),
    }
}

fn risk_counts(pairs: &[PairAnalysis]) -> indexmap::IndexMap<String, usize> {
    let mut counts = indexmap::IndexMap::new();
    for risk in [
        RiskLevel::Critical,
        RiskLevel::High,
        RiskLevel::Medium,
        RiskLevel::Low,
        RiskLevel::None,
    ] {
        counts.insert(risk.as_str().to_string(), 0);
    }
    for pair in pairs {
        *counts
            .entry(pair.verdict.risk.as_str().to_string())
            .or_insert(0) += 1;
    }
    counts
}

fn clone_type_counts(pairs: &[PairAnalysis]) -> indexmap::IndexMap<String, usize> {
    let mut counts = indexmap::IndexMap::new();
    for clone_type in [
        CloneType::Type3AndType4,
        CloneType::Type3,
        CloneType::Type4,
        CloneType::None,
    ] {
        counts.insert(clone_type.as_str().to_string(), 0);
    }
    for pair in pairs {
        *counts
            .entry(pair.verdict.clone_type.as_str().to_string())
            .or_insert(0) += 1;
    }
    counts
}

fn annotate_unit(err: ParallaxError, unit_id: &str) -> ParallaxError {
    match err {
        ParallaxError::Tokenize {
            language, message, ..
        } => ParallaxError::Tokenize {
            language,
            message,
            unit_id: Some(unit_id.to_string()),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_type_ladder() {
        use Confidence::*;

        assert_eq!(clone_type(High, true, High, true), CloneType::Type3AndType4);
        assert_eq!(clone_type(Critical, true, Low, false), CloneType::Type3);
        assert_eq!(clone_type(Low, false, High, true), CloneType::Type4);
        assert_eq!(clone_type(Medium, true, Medium, true), CloneType::Type3AndType4);
        assert_eq!(clone_type(Medium, true, Low, false), CloneType::Type3);
        assert_eq!(clone_type(Low, false, Medium, true), CloneType::Type4);
        assert_eq!(clone_type(Low, false, Low, false), CloneType::None);
    }

    #[test]
    fn risk_ladder() {
        use Confidence::*;

        assert_eq!(risk_level(Critical, Unlikely), RiskLevel::Critical);
        assert_eq!(risk_level(High, High), RiskLevel::Critical);
        assert_eq!(risk_level(High, Low), RiskLevel::High);
        assert_eq!(risk_level(Unlikely, High), RiskLevel::High);
        assert_eq!(risk_level(Medium, Medium), RiskLevel::Medium);
        assert_eq!(risk_level(Medium, Unlikely), RiskLevel::Low);
        assert_eq!(risk_level(Unlikely, Unlikely), RiskLevel::None);
    }
}
