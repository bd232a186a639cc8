//! Configuration types for the parallax engine.
//!
//! All thresholds and weight sets are explicit, constructor-injected
//! configuration: there is no ambient global state, and invalid weight sets
//! fail at construction rather than at scoring time.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::errors::{ParallaxError, Result};

/// Tolerance for weight-sum validation.
pub const WEIGHT_EPSILON: f64 = 1e-3;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fingerprinting and boilerplate-filter settings.
    #[serde(default)]
    pub fingerprint: FingerprintConfig,

    /// Dependence-graph construction settings.
    #[serde(default)]
    pub dependence: DependenceConfig,

    /// Structural (copy/paste style) scorer settings.
    #[serde(default)]
    pub structural: StructuralConfig,

    /// Semantic (behavioral) scorer settings.
    #[serde(default)]
    pub semantic: SemanticConfig,

    /// Cohort-level fusion and review settings.
    #[serde(default)]
    pub cohort: CohortConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ParallaxError::io(format!("Failed to read config file: {}", path.display()), e)
        })?;

        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&path, content).map_err(|e| {
            ParallaxError::io(
                format!("Failed to write config file: {}", path.display()),
                e,
            )
        })
    }

    /// Validate every component configuration, failing fast on the first
    /// inconsistency.
    pub fn validate(&self) -> Result<()> {
        self.fingerprint.validate()?;
        self.dependence.validate()?;
        self.structural.validate()?;
        self.semantic.validate()?;
        self.cohort.validate()?;
        Ok(())
    }
}

/// Winnowing and frequency-filter parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintConfig {
    /// Token k-gram length.
    pub kgram_len: usize,
    /// Winnowing window width over the hash sequence.
    pub window_size: usize,
    /// Coverage ratio at which a k-gram hash counts as cohort boilerplate.
    pub common_threshold: f64,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            kgram_len: 5,
            window_size: 4,
            common_threshold: 0.70,
        }
    }
}

impl FingerprintConfig {
    fn validate(&self) -> Result<()> {
        if self.kgram_len == 0 {
            return Err(ParallaxError::config_field(
                "k-gram length must be at least 1",
                "fingerprint.kgram_len",
            ));
        }
        if self.window_size == 0 {
            return Err(ParallaxError::config_field(
                "window size must be at least 1",
                "fingerprint.window_size",
            ));
        }
        check_unit_range(self.common_threshold, "fingerprint.common_threshold")
    }
}

/// Dependence-graph construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependenceConfig {
    /// How many subsequent nodes a loop/condition node is assumed to gate.
    pub control_lookahead: usize,
}

impl Default for DependenceConfig {
    fn default() -> Self {
        Self {
            control_lookahead: 8,
        }
    }
}

impl DependenceConfig {
    fn validate(&self) -> Result<()> {
        if self.control_lookahead == 0 {
            return Err(ParallaxError::config_field(
                "control lookahead must be at least 1",
                "dependence.control_lookahead",
            ));
        }
        Ok(())
    }
}

/// Structural scorer weights and thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralConfig {
    /// Weight of the fingerprint similarity in the hybrid score.
    pub fingerprint_weight: f64,
    /// Weight of the skeleton-sequence similarity in the hybrid score.
    pub skeleton_weight: f64,
    /// Weight of the complexity-metric similarity in the hybrid score.
    pub metrics_weight: f64,
    /// Hybrid score at or above which the heuristic signal votes clone.
    pub hybrid_threshold: f64,
    /// Learned score at or above which the learned signal votes clone.
    pub ml_threshold: f64,
}

impl Default for StructuralConfig {
    fn default() -> Self {
        Self {
            fingerprint_weight: 0.3,
            skeleton_weight: 0.6,
            metrics_weight: 0.1,
            hybrid_threshold: 0.50,
            ml_threshold: 0.60,
        }
    }
}

impl StructuralConfig {
    /// Check weight and threshold consistency.
    pub fn validate(&self) -> Result<()> {
        let total = self.fingerprint_weight + self.skeleton_weight + self.metrics_weight;
        if (total - 1.0).abs() > WEIGHT_EPSILON {
            return Err(ParallaxError::config_field(
                format!("structural weights sum to {total}, expected 1.0"),
                "structural",
            ));
        }
        check_unit_range(self.hybrid_threshold, "structural.hybrid_threshold")?;
        check_unit_range(self.ml_threshold, "structural.ml_threshold")
    }
}

/// Semantic category weights. Must sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticWeights {
    /// Control-flow category weight.
    pub control_flow: f64,
    /// Data-flow category weight.
    pub data_flow: f64,
    /// Call-pattern category weight.
    pub call_pattern: f64,
    /// Structural-shape category weight.
    pub structural: f64,
    /// Behavioral-hash category weight.
    pub behavioral: f64,
}

impl Default for SemanticWeights {
    fn default() -> Self {
        Self {
            control_flow: 0.25,
            data_flow: 0.25,
            call_pattern: 0.20,
            structural: 0.15,
            behavioral: 0.15,
        }
    }
}

impl SemanticWeights {
    /// Sum of the five category weights.
    pub fn total(&self) -> f64 {
        self.control_flow + self.data_flow + self.call_pattern + self.structural + self.behavioral
    }

    /// Check that the weights form a convex combination.
    pub fn validate(&self) -> Result<()> {
        let total = self.total();
        if (total - 1.0).abs() > WEIGHT_EPSILON {
            return Err(ParallaxError::config_field(
                format!("semantic weights sum to {total}, expected 1.0"),
                "semantic.weights",
            ));
        }
        Ok(())
    }
}

/// Semantic scorer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticConfig {
    /// Category weights.
    pub weights: SemanticWeights,
    /// Base clone threshold before per-language and confidence adaptation.
    pub base_threshold: f64,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            weights: SemanticWeights::default(),
            base_threshold: 0.60,
        }
    }
}

impl SemanticConfig {
    /// Check weight and threshold consistency.
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        check_unit_range(self.base_threshold, "semantic.base_threshold")
    }
}

/// Decision-fusion and cohort-analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortConfig {
    /// Combined score at or above which a pair needs review.
    pub review_threshold: f64,
    /// Per-signal score at or above which a pair counts as class-high.
    pub class_high_threshold: f64,
    /// Class-high ratio at or above which the assignment reads as simple.
    pub simple_assignment_ratio: f64,
    /// Margin over the cohort average that marks a pair as an outlier.
    pub outlier_margin: f64,
    /// Maximum outlier pairs surfaced in the cohort report.
    pub max_outliers: usize,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            review_threshold: 0.70,
            class_high_threshold: 0.70,
            simple_assignment_ratio: 0.70,
            outlier_margin: 0.15,
            max_outliers: 10,
        }
    }
}

impl CohortConfig {
    fn validate(&self) -> Result<()> {
        check_unit_range(self.review_threshold, "cohort.review_threshold")?;
        check_unit_range(self.class_high_threshold, "cohort.class_high_threshold")?;
        check_unit_range(self.simple_assignment_ratio, "cohort.simple_assignment_ratio")?;
        check_unit_range(self.outlier_margin, "cohort.outlier_margin")
    }
}

fn check_unit_range(value: f64, field: &str) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ParallaxError::config_field(
            format!("{field} must lie in [0, 1], got {value}"),
            field,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn bad_semantic_weights_fail_fast() {
        let mut config = EngineConfig::default();
        config.semantic.weights.control_flow = 0.50;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("semantic weights"));
    }

    #[test]
    fn bad_structural_weights_fail_fast() {
        let mut config = EngineConfig::default();
        config.structural.skeleton_weight = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn weights_within_epsilon_pass() {
        let mut config = EngineConfig::default();
        config.semantic.weights.behavioral = 0.1505;
        config.semantic.weights.structural = 0.1495;
        config.validate().unwrap();
    }

    #[test]
    fn yaml_round_trip() {
        let config = EngineConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_yaml::from_str(&yaml).unwrap();
        parsed.validate().unwrap();
        assert_eq!(parsed.fingerprint.kgram_len, config.fingerprint.kgram_len);
        assert_eq!(parsed.semantic.base_threshold, config.semantic.base_threshold);
    }

    #[test]
    fn out_of_range_thresholds_are_rejected() {
        let mut config = EngineConfig::default();
        config.cohort.review_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
