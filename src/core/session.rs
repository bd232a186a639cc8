//! Batch-session data model: code units and their prepared artifact caches.
//!
//! A [`PreparedBatch`] is both the per-unit cache arena and the proof that
//! the cohort frequency filter has been trained: the comparison API only
//! accepts a prepared batch, so a comparison against an untrained filter is
//! unrepresentable. Dropping the batch discards every cache, which is the
//! only invalidation a session needs.

use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::errors::{ParallaxError, Result};
use crate::detectors::behavioral::BehavioralFeatures;
use crate::detectors::dependence::DependenceGraph;
use crate::detectors::fingerprint::FingerprintSet;
use crate::detectors::structural::ComplexityMetrics;
use crate::lang::Language;

/// One submission in a batch: identity, language tag, raw text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeUnit {
    /// Stable identifier (file name, student id, ...).
    pub id: String,
    /// Language the unit is written in.
    pub language: Language,
    /// Raw source text.
    pub source: String,
}

impl CodeUnit {
    /// Create a unit from raw text.
    pub fn new(id: impl Into<String>, language: Language, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            language,
            source: source.into(),
        }
    }

    /// Read a unit from disk, detecting the language from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| ParallaxError::io(format!("Failed to read {}", path.display()), e))?;
        let id = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed")
            .to_string();
        Ok(Self {
            id,
            language: Language::from_path(path),
            source,
        })
    }
}

/// Per-unit caches, each built exactly once during batch preparation.
#[derive(Debug, Clone)]
pub struct UnitArtifacts {
    /// Normalized token stream.
    pub tokens: Vec<String>,
    /// Raw winnowing fingerprint set (before common-hash subtraction).
    pub fingerprint: FingerprintSet,
    /// Ordered structural skeleton labels.
    pub skeleton: Vec<String>,
    /// Statement dependence graph.
    pub graph: DependenceGraph,
    /// Behavioral feature vector.
    pub features: BehavioralFeatures,
    /// Complexity metric vector.
    pub metrics: ComplexityMetrics,
}

/// A unit dropped from the batch, with the reason it was excluded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcludedUnit {
    /// The unit's identifier.
    pub id: String,
    /// Why it was excluded.
    pub reason: String,
}

/// A prepared unit inside the batch arena.
#[derive(Debug, Clone)]
pub struct PreparedUnit {
    /// The unit's identifier.
    pub id: String,
    /// The unit's language.
    pub language: Language,
    /// The unit's built caches.
    pub artifacts: UnitArtifacts,
}

/// A fully prepared batch: artifact arena plus the trained common-hash set.
#[derive(Debug)]
pub struct PreparedBatch {
    units: Vec<PreparedUnit>,
    index: AHashMap<String, usize>,
    common_hashes: FingerprintSet,
    excluded: Vec<ExcludedUnit>,
}

impl PreparedBatch {
    pub(crate) fn from_parts(
        units: Vec<PreparedUnit>,
        common_hashes: FingerprintSet,
        excluded: Vec<ExcludedUnit>,
    ) -> Self {
        let index = units
            .iter()
            .enumerate()
            .map(|(i, u)| (u.id.clone(), i))
            .collect();
        Self {
            units,
            index,
            common_hashes,
            excluded,
        }
    }

    /// Number of usable units in the batch.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the batch holds no usable units.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Identifiers of the usable units, in batch order.
    pub fn unit_ids(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|u| u.id.as_str())
    }

    /// Units excluded during preparation.
    pub fn excluded(&self) -> &[ExcludedUnit] {
        &self.excluded
    }

    /// Number of cohort-common hashes learned by the frequency filter.
    pub fn common_hash_count(&self) -> usize {
        self.common_hashes.len()
    }

    pub(crate) fn common_hashes(&self) -> &FingerprintSet {
        &self.common_hashes
    }

    pub(crate) fn units(&self) -> &[PreparedUnit] {
        &self.units
    }

    pub(crate) fn unit_by_id(&self, id: &str) -> Result<&PreparedUnit> {
        self.index
            .get(id)
            .map(|&i| &self.units[i])
            .ok_or_else(|| ParallaxError::UnknownUnit { unit_id: id.into() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn unit_from_path_detects_language() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solution.py");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "print('hello')").unwrap();

        let unit = CodeUnit::from_path(&path).unwrap();
        assert_eq!(unit.id, "solution.py");
        assert_eq!(unit.language, Language::Python);
        assert!(unit.source.contains("hello"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = CodeUnit::from_path("/nonexistent/solution.cpp").unwrap_err();
        assert!(matches!(err, ParallaxError::Io { .. }));
    }
}
