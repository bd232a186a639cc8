//! Cohort-level boilerplate learning.
//!
//! Before any pairwise comparison, the filter scans every unit's k-gram
//! hashes and marks as "common" those covering at least a threshold fraction
//! of the cohort. Shared scaffolding (assignment templates, I/O prologues)
//! then stops inflating pairwise similarity.

use ahash::AHashMap;
use tracing::debug;

use super::{rolling_hashes, FingerprintSet};

/// Learns which k-gram hashes are near-universal across a batch.
#[derive(Debug, Clone)]
pub struct FrequencyFilter {
    threshold: f64,
    kgram_len: usize,
}

impl Default for FrequencyFilter {
    fn default() -> Self {
        Self::new(0.70, 5)
    }
}

impl FrequencyFilter {
    /// Create a filter with a coverage threshold and k-gram length.
    pub fn new(threshold: f64, kgram_len: usize) -> Self {
        Self {
            threshold,
            kgram_len: kgram_len.max(1),
        }
    }

    /// Train on the full cohort's token streams, returning the set of hashes
    /// whose coverage ratio meets the threshold.
    ///
    /// A batch of fewer than two streams carries no boilerplate signal and
    /// yields an empty set. Training is a pure function of the input, so
    /// retraining on the same cohort reproduces the same set.
    pub fn train(&self, token_streams: &[&[String]]) -> FingerprintSet {
        let mut common = FingerprintSet::default();
        if token_streams.len() < 2 {
            return common;
        }

        let mut coverage: AHashMap<u64, usize> = AHashMap::new();
        for tokens in token_streams {
            if tokens.len() < self.kgram_len {
                continue;
            }
            let file_hashes: FingerprintSet =
                rolling_hashes(tokens, self.kgram_len).into_iter().collect();
            for hash in file_hashes {
                *coverage.entry(hash).or_insert(0) += 1;
            }
        }

        let cutoff = token_streams.len() as f64 * self.threshold;
        common.extend(
            coverage
                .iter()
                .filter(|(_, &count)| count as f64 >= cutoff)
                .map(|(&hash, _)| hash),
        );

        debug!(
            streams = token_streams.len(),
            distinct_hashes = coverage.len(),
            common = common.len(),
            "frequency filter trained"
        );

        common
    }
}
