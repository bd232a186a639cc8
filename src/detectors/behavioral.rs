//! Behavioral features derived from dependence graphs.
//!
//! Reduces a graph to numeric features, fixed categorical buckets, and a
//! six-field behavioral hash, then computes the pairwise sub-features the
//! semantic scorer consumes. Bucket cut points are fixed constants of the
//! format; two hashes are always positionally comparable.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::dependence::{DependenceGraph, EdgeKind, NodeCategory};

/// How the unit iterates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IterationBucket {
    /// Calls itself.
    Rec,
    /// Iterates with loops.
    Loop,
    /// Straight-line computation.
    Direct,
}

/// Overall control complexity: loop + condition count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplexityBucket {
    /// No control structures.
    Simple,
    /// One or two.
    Moderate,
    /// Three to five.
    Complex,
    /// More than five.
    VeryComplex,
}

/// Maximum nesting depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NestingBucket {
    /// Depth of one or less.
    Flat,
    /// Depth two or three.
    Nested,
    /// Deeper.
    Deep,
}

/// Distinct-variable scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataBucket {
    /// Three or fewer variables.
    FewVars,
    /// Four to seven.
    ModVars,
    /// More.
    ManyVars,
}

/// Unique-call scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallBucket {
    /// No calls.
    NoCalls,
    /// One or two unique callees.
    FewCalls,
    /// More.
    ManyCalls,
}

/// Return-statement pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnBucket {
    /// At most one return.
    SingleRet,
    /// Two or three.
    MultiRet,
    /// More.
    ManyRet,
}

impl IterationBucket {
    fn as_str(self) -> &'static str {
        match self {
            Self::Rec => "REC",
            Self::Loop => "LOOP",
            Self::Direct => "DIRECT",
        }
    }
}

impl ComplexityBucket {
    fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "SIMPLE",
            Self::Moderate => "MODERATE",
            Self::Complex => "COMPLEX",
            Self::VeryComplex => "VERY_COMPLEX",
        }
    }
}

impl NestingBucket {
    fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "FLAT",
            Self::Nested => "NESTED",
            Self::Deep => "DEEP",
        }
    }
}

impl DataBucket {
    fn as_str(self) -> &'static str {
        match self {
            Self::FewVars => "FEW_VARS",
            Self::ModVars => "MOD_VARS",
            Self::ManyVars => "MANY_VARS",
        }
    }
}

impl CallBucket {
    fn as_str(self) -> &'static str {
        match self {
            Self::NoCalls => "NO_CALLS",
            Self::FewCalls => "FEW_CALLS",
            Self::ManyCalls => "MANY_CALLS",
        }
    }
}

impl ReturnBucket {
    fn as_str(self) -> &'static str {
        match self {
            Self::SingleRet => "SINGLE_RET",
            Self::MultiRet => "MULTI_RET",
            Self::ManyRet => "MANY_RET",
        }
    }
}

/// Number of calls retained in the ordered call sequence.
const CALL_SEQUENCE_CAP: usize = 20;

/// Behavioral feature vector for one unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehavioralFeatures {
    /// Loop-node count.
    pub loop_count: usize,
    /// Condition-node count.
    pub condition_count: usize,
    /// Deepest control nesting.
    pub max_nesting_depth: usize,
    /// Whether the unit calls itself.
    pub has_recursion: bool,
    /// `L`/`C`/`R` encounter-order signature.
    pub control_signature: String,

    /// Distinct variables defined or used.
    pub variable_count: usize,
    /// Data-edge count.
    pub data_dependencies: usize,
    /// Definitions per use, two-decimal precision.
    pub def_use_ratio: f64,

    /// Total calls made.
    pub call_count: usize,
    /// Distinct callees.
    pub unique_calls: usize,
    /// Ordered call names, capped at the first twenty.
    pub call_sequence: Vec<String>,

    /// Graph node count.
    pub node_count: usize,
    /// Graph edge count.
    pub edge_count: usize,
    /// Return-node count.
    pub return_count: usize,

    /// Iteration style bucket.
    pub iteration_bucket: IterationBucket,
    /// Control complexity bucket.
    pub complexity_bucket: ComplexityBucket,
    /// Nesting bucket.
    pub nesting_bucket: NestingBucket,
    /// Data scale bucket.
    pub data_bucket: DataBucket,
    /// Call scale bucket.
    pub call_bucket: CallBucket,
    /// Return pattern bucket.
    pub return_bucket: ReturnBucket,

    /// The six bucket labels pipe-joined in fixed order.
    pub behavioral_hash: String,

    /// Abstracted control-edge category pairs.
    pub control_patterns: BTreeSet<(NodeCategory, NodeCategory)>,
    /// Abstracted data-edge category pairs.
    pub data_patterns: BTreeSet<(NodeCategory, NodeCategory)>,
}

/// Extracts [`BehavioralFeatures`] from dependence graphs and computes the
/// pairwise sub-features between two units.
#[derive(Debug, Default, Clone)]
pub struct BehavioralFeatureExtractor;

impl BehavioralFeatureExtractor {
    /// Create a new extractor.
    pub fn new() -> Self {
        Self
    }

    /// Reduce a dependence graph to its behavioral features.
    pub fn extract(&self, graph: &DependenceGraph) -> BehavioralFeatures {
        let (total_defs, total_uses) = graph.def_use_totals();
        let def_use_ratio = total_defs as f64 / (total_uses.max(1)) as f64;
        let def_use_ratio = (def_use_ratio * 100.0).round() / 100.0;

        let full_sequence = graph.call_sequence();
        let call_count = full_sequence.len();
        let mut call_sequence = full_sequence;
        call_sequence.truncate(CALL_SEQUENCE_CAP);

        let unique_calls = graph.function_calls.len();

        let iteration_bucket = iteration_bucket(graph.loop_count, graph.has_recursion);
        let complexity_bucket = complexity_bucket(graph.loop_count, graph.condition_count);
        let nesting_bucket = nesting_bucket(graph.max_nesting_depth);
        let data_bucket = data_bucket(graph.total_variables);
        let call_bucket = call_bucket(unique_calls);
        let return_bucket = return_bucket(graph.return_count);

        let behavioral_hash = format!(
            "{}|{}|{}|{}|{}|{}",
            iteration_bucket.as_str(),
            complexity_bucket.as_str(),
            nesting_bucket.as_str(),
            data_bucket.as_str(),
            call_bucket.as_str(),
            return_bucket.as_str(),
        );

        BehavioralFeatures {
            loop_count: graph.loop_count,
            condition_count: graph.condition_count,
            max_nesting_depth: graph.max_nesting_depth,
            has_recursion: graph.has_recursion,
            control_signature: graph.control_flow_signature.clone(),
            variable_count: graph.total_variables,
            data_dependencies: graph.data_edge_count,
            def_use_ratio,
            call_count,
            unique_calls,
            call_sequence,
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            return_count: graph.return_count,
            iteration_bucket,
            complexity_bucket,
            nesting_bucket,
            data_bucket,
            call_bucket,
            return_bucket,
            behavioral_hash,
            control_patterns: graph.edge_category_patterns(EdgeKind::Control),
            data_patterns: graph.edge_category_patterns(EdgeKind::Data),
        }
    }

    /// Compute the named pairwise sub-features between two units.
    ///
    /// Every value lies in `[0, 1]`; every edge case (zero counts, empty
    /// sequences, empty sets) has a defined result.
    pub fn pair_features(
        &self,
        a: &BehavioralFeatures,
        b: &BehavioralFeatures,
    ) -> IndexMap<String, f64> {
        let mut features = IndexMap::new();

        // Control flow
        features.insert(
            "loop_similarity".into(),
            count_similarity(a.loop_count, b.loop_count),
        );
        features.insert(
            "condition_similarity".into(),
            count_similarity(a.condition_count, b.condition_count),
        );
        features.insert(
            "nesting_similarity".into(),
            count_similarity(a.max_nesting_depth, b.max_nesting_depth),
        );
        features.insert(
            "recursion_match".into(),
            if a.has_recursion == b.has_recursion { 1.0 } else { 0.0 },
        );
        features.insert(
            "control_signature_similarity".into(),
            char_multiset_similarity(&a.control_signature, &b.control_signature),
        );
        features.insert(
            "control_pattern_similarity".into(),
            set_jaccard(&a.control_patterns, &b.control_patterns),
        );

        // Data flow
        features.insert(
            "variable_similarity".into(),
            count_similarity(a.variable_count, b.variable_count),
        );
        features.insert(
            "dependency_similarity".into(),
            count_similarity(a.data_dependencies, b.data_dependencies),
        );
        features.insert(
            "def_use_similarity".into(),
            ratio_similarity(a.def_use_ratio, b.def_use_ratio),
        );
        features.insert(
            "data_pattern_similarity".into(),
            set_jaccard(&a.data_patterns, &b.data_patterns),
        );

        // Call patterns
        features.insert(
            "call_count_similarity".into(),
            count_similarity(a.call_count, b.call_count),
        );
        features.insert(
            "unique_call_similarity".into(),
            count_similarity(a.unique_calls, b.unique_calls),
        );
        features.insert(
            "call_sequence_similarity".into(),
            lcs_ratio(&a.call_sequence, &b.call_sequence),
        );

        // Structural shape
        features.insert(
            "node_similarity".into(),
            count_similarity(a.node_count, b.node_count),
        );
        features.insert(
            "edge_similarity".into(),
            count_similarity(a.edge_count, b.edge_count),
        );
        features.insert(
            "return_similarity".into(),
            return_similarity(a.return_count, b.return_count),
        );

        // Behavioral buckets
        features.insert(
            "behavioral_hash_similarity".into(),
            behavioral_hash_similarity(&a.behavioral_hash, &b.behavioral_hash),
        );
        features.insert(
            "iteration_bucket_match".into(),
            if a.iteration_bucket == b.iteration_bucket { 1.0 } else { 0.0 },
        );
        features.insert(
            "complexity_bucket_match".into(),
            bucket_match(a.complexity_bucket == b.complexity_bucket),
        );
        features.insert(
            "nesting_bucket_match".into(),
            bucket_match(a.nesting_bucket == b.nesting_bucket),
        );
        features.insert(
            "data_bucket_match".into(),
            bucket_match(a.data_bucket == b.data_bucket),
        );
        features.insert(
            "call_bucket_match".into(),
            bucket_match(a.call_bucket == b.call_bucket),
        );
        features.insert(
            "return_bucket_match".into(),
            bucket_match(a.return_bucket == b.return_bucket),
        );

        features
    }
}

fn iteration_bucket(loop_count: usize, has_recursion: bool) -> IterationBucket {
    if has_recursion {
        IterationBucket::Rec
    } else if loop_count > 0 {
        IterationBucket::Loop
    } else {
        IterationBucket::Direct
    }
}

fn complexity_bucket(loop_count: usize, condition_count: usize) -> ComplexityBucket {
    match loop_count + condition_count {
        0 => ComplexityBucket::Simple,
        1..=2 => ComplexityBucket::Moderate,
        3..=5 => ComplexityBucket::Complex,
        _ => ComplexityBucket::VeryComplex,
    }
}

fn nesting_bucket(max_nesting: usize) -> NestingBucket {
    match max_nesting {
        0..=1 => NestingBucket::Flat,
        2..=3 => NestingBucket::Nested,
        _ => NestingBucket::Deep,
    }
}

fn data_bucket(variable_count: usize) -> DataBucket {
    match variable_count {
        0..=3 => DataBucket::FewVars,
        4..=7 => DataBucket::ModVars,
        _ => DataBucket::ManyVars,
    }
}

fn call_bucket(unique_calls: usize) -> CallBucket {
    match unique_calls {
        0 => CallBucket::NoCalls,
        1..=2 => CallBucket::FewCalls,
        _ => CallBucket::ManyCalls,
    }
}

fn return_bucket(return_count: usize) -> ReturnBucket {
    match return_count {
        0..=1 => ReturnBucket::SingleRet,
        2..=3 => ReturnBucket::MultiRet,
        _ => ReturnBucket::ManyRet,
    }
}

/// Similarity between two counts: 1.0 when equal (including both zero),
/// otherwise `1 - |a - b| / (a + b)`.
pub fn count_similarity(a: usize, b: usize) -> f64 {
    if a == b {
        return 1.0;
    }
    let total = (a + b) as f64;
    1.0 - (a.abs_diff(b) as f64) / total
}

/// Similarity between two nonnegative ratios, normalized by their sum.
pub fn ratio_similarity(a: f64, b: f64) -> f64 {
    let sim = 1.0 - (a - b).abs() / (a + b).max(0.01);
    sim.clamp(0.0, 1.0)
}

/// Character-multiset overlap between two signature strings:
/// `|intersection| / |union|` of per-character counts.
pub fn char_multiset_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut counts_a: IndexMap<char, usize> = IndexMap::new();
    let mut counts_b: IndexMap<char, usize> = IndexMap::new();
    for c in a.chars() {
        *counts_a.entry(c).or_insert(0) += 1;
    }
    for c in b.chars() {
        *counts_b.entry(c).or_insert(0) += 1;
    }

    let mut intersection = 0usize;
    let mut union = 0usize;
    for (c, &ca) in &counts_a {
        let cb = counts_b.get(c).copied().unwrap_or(0);
        intersection += ca.min(cb);
        union += ca.max(cb);
    }
    for (c, &cb) in &counts_b {
        if !counts_a.contains_key(c) {
            union += cb;
        }
    }

    intersection as f64 / union as f64
}

/// Jaccard similarity over two ordered sets, with the empty-set contract.
pub fn set_jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
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

/// Normalized longest-common-subsequence ratio: `2·lcs / (len_a + len_b)`.
pub fn lcs_ratio<T: PartialEq>(a: &[T], b: &[T]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let lcs = lcs_len(a, b);
    (2 * lcs) as f64 / (a.len() + b.len()) as f64
}

/// Longest-common-subsequence length, single-row dynamic program.
fn lcs_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let mut row = vec![0usize; b.len() + 1];
    for item_a in a {
        let mut prev_diag = 0;
        for (j, item_b) in b.iter().enumerate() {
            let tmp = row[j + 1];
            row[j + 1] = if item_a == item_b {
                prev_diag + 1
            } else {
                row[j + 1].max(row[j])
            };
            prev_diag = tmp;
        }
    }
    row[b.len()]
}

/// Return-count similarity: exact match, off-by-one, or nothing.
pub fn return_similarity(a: usize, b: usize) -> f64 {
    if a == b {
        1.0
    } else if a.abs_diff(b) <= 1 {
        0.5
    } else {
        0.0
    }
}

/// Fraction of behavioral-hash fields matching positionally. Hashes of
/// different field counts (or empty hashes) never match.
pub fn behavioral_hash_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let parts_a: Vec<&str> = a.split('|').collect();
    let parts_b: Vec<&str> = b.split('|').collect();
    if parts_a.len() != parts_b.len() {
        return 0.0;
    }
    let matches = parts_a
        .iter()
        .zip(parts_b.iter())
        .filter(|(x, y)| x == y)
        .count();
    matches as f64 / parts_a.len() as f64
}

fn bucket_match(equal: bool) -> f64 {
    if equal {
        1.0
    } else {
        0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::dependence::DependenceGraphBuilder;
    use crate::lang::Language;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn count_similarity_contract() {
        assert_relative_eq!(count_similarity(0, 0), 1.0);
        assert_relative_eq!(count_similarity(3, 3), 1.0);
        assert_relative_eq!(count_similarity(0, 5), 0.0);
        assert_relative_eq!(count_similarity(2, 4), 1.0 - 2.0 / 6.0);
    }

    #[test]
    fn behavioral_hash_has_six_fields() {
        let graph = DependenceGraphBuilder::new().build(
            "int acc = 0;\nfor (int i = 0; i < n; i++) {\nacc += i;\n}\nreturn acc;\n",
            Language::Cpp,
        );
        let features = BehavioralFeatureExtractor::new().extract(&graph);
        assert_eq!(features.behavioral_hash.split('|').count(), 6);
        assert_relative_eq!(
            behavioral_hash_similarity(&features.behavioral_hash, &features.behavioral_hash),
            1.0
        );
    }

    #[test]
    fn empty_graph_features_are_zero_valued() {
        let graph = DependenceGraphBuilder::new().build("", Language::Python);
        let features = BehavioralFeatureExtractor::new().extract(&graph);

        assert_eq!(features.node_count, 0);
        assert_eq!(features.variable_count, 0);
        assert_eq!(features.iteration_bucket, IterationBucket::Direct);
        assert_eq!(
            features.behavioral_hash,
            "DIRECT|SIMPLE|FLAT|FEW_VARS|NO_CALLS|SINGLE_RET"
        );
    }

    #[test]
    fn signature_similarity_uses_character_multisets() {
        assert_relative_eq!(char_multiset_similarity("LLCR", "LLCR"), 1.0);
        assert_relative_eq!(char_multiset_similarity("", ""), 1.0);
        assert_relative_eq!(char_multiset_similarity("LLC", ""), 0.0);
        // "LC" vs "LLC": intersection {L:1, C:1} = 2, union {L:2, C:1} = 3
        assert_relative_eq!(char_multiset_similarity("LC", "LLC"), 2.0 / 3.0);
    }

    #[test]
    fn lcs_ratio_tracks_shared_order() {
        let a = vec!["read".to_string(), "solve".to_string(), "emit".to_string()];
        let b = vec!["read".to_string(), "emit".to_string()];
        // LCS = 2 -> 2*2 / 5
        assert_relative_eq!(lcs_ratio(&a, &b), 0.8);
        assert_relative_eq!(lcs_ratio::<String>(&[], &[]), 1.0);
        assert_relative_eq!(lcs_ratio(&a, &[]), 0.0);
    }

    #[test]
    fn self_pair_features_are_maximal() {
        let graph = DependenceGraphBuilder::new().build(
            "int acc = 0;\nfor (int i = 0; i < n; i++) {\nacc += i;\n}\nreturn acc;\n",
            Language::Cpp,
        );
        let extractor = BehavioralFeatureExtractor::new();
        let features = extractor.extract(&graph);
        let pair = extractor.pair_features(&features, &features);

        for (name, value) in &pair {
            assert_relative_eq!(*value, 1.0, epsilon = 1e-12);
            assert!(!name.is_empty());
        }
    }

    proptest! {
        #[test]
        fn count_similarity_is_symmetric(a in 0usize..100, b in 0usize..100) {
            prop_assert_eq!(count_similarity(a, b), count_similarity(b, a));
        }

        #[test]
        fn count_similarity_is_bounded(a in 0usize..100, b in 0usize..100) {
            let sim = count_similarity(a, b);
            prop_assert!((0.0..=1.0).contains(&sim));
        }

        #[test]
        fn ratio_similarity_is_symmetric_and_bounded(
            a in 0.0f64..10.0,
            b in 0.0f64..10.0,
        ) {
            let ab = ratio_similarity(a, b);
            let ba = ratio_similarity(b, a);
            prop_assert_eq!(ab, ba);
            prop_assert!((0.0..=1.0).contains(&ab));
        }
    }
}
