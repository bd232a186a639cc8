//! Winnowing document fingerprints over normalized token streams.
//!
//! Token streams are hashed as rolling k-grams; a sliding window keeps each
//! window's minimum hash, and the resulting set is compared with Jaccard
//! similarity after cohort-common hashes have been subtracted.

pub mod frequency;

pub use frequency::FrequencyFilter;

use std::collections::HashSet;

use xxhash_rust::xxh3::xxh3_64;

/// A set of winnowing fingerprint hashes.
pub type FingerprintSet = HashSet<u64, ahash::RandomState>;

/// Hash one k-gram (or a whole short stream) of tokens.
pub(crate) fn kgram_hash(tokens: &[String]) -> u64 {
    xxh3_64(tokens.join("|").as_bytes())
}

/// Rolling k-gram hashes for a token stream: `L - k + 1` hashes, or a single
/// whole-stream hash when the stream is shorter than `k`.
pub(crate) fn rolling_hashes(tokens: &[String], kgram_len: usize) -> Vec<u64> {
    if tokens.is_empty() {
        return Vec::new();
    }
    if tokens.len() < kgram_len {
        return vec![kgram_hash(tokens)];
    }
    tokens.windows(kgram_len).map(kgram_hash).collect()
}

/// Winnowing fingerprinter with fixed k-gram length and window width.
#[derive(Debug, Clone)]
pub struct WinnowingFingerprinter {
    kgram_len: usize,
    window_size: usize,
}

impl Default for WinnowingFingerprinter {
    fn default() -> Self {
        Self::new(5, 4)
    }
}

impl WinnowingFingerprinter {
    /// Create a fingerprinter with the given k-gram length and window width.
    pub fn new(kgram_len: usize, window_size: usize) -> Self {
        Self {
            kgram_len: kgram_len.max(1),
            window_size: window_size.max(1),
        }
    }

    /// Compute the fingerprint set for a token stream.
    ///
    /// Streams shorter than the k-gram length hash as a single fragment;
    /// hash sequences shorter than the window contribute their minimum.
    pub fn fingerprint(&self, tokens: &[String]) -> FingerprintSet {
        let hashes = rolling_hashes(tokens, self.kgram_len);
        let mut fingerprints = FingerprintSet::default();

        if hashes.is_empty() {
            return fingerprints;
        }
        if hashes.len() <= self.window_size {
            fingerprints.insert(*hashes.iter().min().expect("nonempty hash sequence"));
            return fingerprints;
        }

        for window in hashes.windows(self.window_size) {
            fingerprints.insert(*window.iter().min().expect("nonempty window"));
        }

        fingerprints
    }

    /// Jaccard similarity between two fingerprint sets.
    ///
    /// Defined as 1.0 when both sets are empty and 0.0 when exactly one is,
    /// so empty units compare equal to each other and unequal to everything
    /// else.
    pub fn similarity(&self, a: &FingerprintSet, b: &FingerprintSet) -> f64 {
        jaccard(a, b)
    }
}

/// Jaccard similarity with the empty-set contract from the fingerprinter.
pub fn jaccard(a: &FingerprintSet, b: &FingerprintSet) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Remove cohort-common hashes from a fingerprint set before comparison.
pub fn subtract_common(set: &FingerprintSet, common: &FingerprintSet) -> FingerprintSet {
    set.difference(common).copied().collect()
}
