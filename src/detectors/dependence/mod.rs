//! Pattern-driven dependence-graph construction.
//!
//! Builds a simplified per-statement graph from raw source text using the
//! per-language line-pattern tables: data edges follow the latest definition
//! of each variable, control edges approximate dominance with a bounded
//! lookahead window. The builder is total over its input: malformed or
//! unrecognizable code produces a graph with zero nodes, never an error.

pub mod graph;

pub use graph::{DependenceGraph, EdgeKind, GraphEdge, GraphNode, NodeCategory};

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::lang::patterns::{LanguageSpec, LineKind};
use crate::lang::Language;

/// How many subsequent nodes a loop/condition node is assumed to gate.
/// An explicit approximation of control dependence, not dominance analysis.
const DEFAULT_CONTROL_LOOKAHEAD: usize = 8;

/// Maximum stored snippet length per node.
const SNIPPET_LEN: usize = 100;

/// Builds [`DependenceGraph`]s from source text.
#[derive(Debug, Clone)]
pub struct DependenceGraphBuilder {
    control_lookahead: usize,
}

impl Default for DependenceGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DependenceGraphBuilder {
    /// Create a builder with the default lookahead window.
    pub fn new() -> Self {
        Self {
            control_lookahead: DEFAULT_CONTROL_LOOKAHEAD,
        }
    }

    /// Override the control-dependence lookahead window.
    pub fn with_control_lookahead(mut self, lookahead: usize) -> Self {
        self.control_lookahead = lookahead.max(1);
        self
    }

    /// Build the dependence graph for a source text.
    pub fn build(&self, source: &str, language: Language) -> DependenceGraph {
        let spec = LanguageSpec::for_language(language);
        let defined_functions = spec.defined_functions(source);

        let mut nodes: Vec<GraphNode> = Vec::new();
        let mut all_calls: Vec<String> = Vec::new();
        let mut current_nesting = 0usize;
        let mut max_nesting = 0usize;

        for (idx, raw_line) in source.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || spec.is_comment(line) {
                continue;
            }

            let kind = spec.classify(line);
            let is_control = matches!(kind, LineKind::Loop | LineKind::Condition);

            if is_control {
                current_nesting += 1;
                max_nesting = max_nesting.max(current_nesting);
            }

            // Block exits: closing braces, or dedent-by-return in Python
            let block_end =
                line == "}" || (language == Language::Python && line.starts_with("return"));
            if block_end && current_nesting > 0 && !is_control {
                current_nesting -= 1;
            }

            let defined = spec.defined_variables(line);
            let used = spec.used_variables(line, &defined);
            let mut calls = spec.call_targets(line);
            if spec.is_function_def(line) {
                // A definition header names the function; that is not a call
                let header_names = spec.defined_functions(line);
                calls.retain(|c| !header_names.contains(c));
            }
            all_calls.extend(calls.iter().cloned());

            let category = match kind {
                LineKind::Skip => continue,
                LineKind::Loop => NodeCategory::Loop,
                LineKind::Condition => NodeCategory::Condition,
                LineKind::Return => NodeCategory::Return,
                LineKind::Assignment => NodeCategory::Assignment,
                LineKind::Call => NodeCategory::Call,
                LineKind::Statement => {
                    // Plain statements only matter when they move data
                    if defined.is_empty() && calls.is_empty() {
                        continue;
                    }
                    NodeCategory::Statement
                }
            };

            nodes.push(GraphNode {
                id: nodes.len(),
                category,
                line: idx + 1,
                snippet: line.chars().take(SNIPPET_LEN).collect(),
                defined,
                used,
                calls,
            });
        }

        let edges = self.build_edges(&nodes);

        let control_flow_signature: String = nodes
            .iter()
            .filter_map(|n| match n.category {
                NodeCategory::Loop => Some('L'),
                NodeCategory::Condition => Some('C'),
                NodeCategory::Return => Some('R'),
                _ => None,
            })
            .collect();

        let has_recursion = all_calls.iter().any(|c| defined_functions.contains(c));

        let mut all_variables: BTreeSet<&String> = BTreeSet::new();
        for node in &nodes {
            all_variables.extend(node.defined.iter());
            all_variables.extend(node.used.iter());
        }

        let graph = DependenceGraph {
            loop_count: nodes.iter().filter(|n| n.category == NodeCategory::Loop).count(),
            condition_count: nodes
                .iter()
                .filter(|n| n.category == NodeCategory::Condition)
                .count(),
            return_count: nodes
                .iter()
                .filter(|n| n.category == NodeCategory::Return)
                .count(),
            max_nesting_depth: max_nesting,
            has_recursion,
            control_flow_signature,
            total_variables: all_variables.len(),
            data_edge_count: edges.iter().filter(|e| e.kind == EdgeKind::Data).count(),
            function_calls: all_calls.into_iter().collect(),
            nodes,
            edges,
        };

        debug!(
            language = %language,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            signature = %graph.control_flow_signature,
            "dependence graph built"
        );

        graph
    }

    /// Data edges from the latest definition of each used variable; control
    /// edges from loop/condition nodes to a bounded window of successors.
    fn build_edges(&self, nodes: &[GraphNode]) -> Vec<GraphEdge> {
        let mut edges = Vec::new();
        let mut latest_def: BTreeMap<&str, usize> = BTreeMap::new();

        for node in nodes {
            for var in &node.defined {
                latest_def.insert(var, node.id);
            }
            for var in &node.used {
                if let Some(&def_id) = latest_def.get(var.as_str()) {
                    if def_id != node.id {
                        edges.push(GraphEdge {
                            source: def_id,
                            target: node.id,
                            kind: EdgeKind::Data,
                            variable: Some(var.clone()),
                        });
                    }
                }
            }
        }

        for (i, node) in nodes.iter().enumerate() {
            if matches!(node.category, NodeCategory::Loop | NodeCategory::Condition) {
                let window_end = (i + self.control_lookahead).min(nodes.len());
                for successor in nodes.iter().take(window_end).skip(i + 1) {
                    edges.push(GraphEdge {
                        source: node.id,
                        target: successor.id,
                        kind: EdgeKind::Control,
                        variable: None,
                    });
                }
            }
        }

        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITERATIVE_SUM: &str = r#"
int sum_to(int n) {
    int total = 0;
    for (int i = 1; i <= n; i++) {
        total += i;
    }
    return total;
}
"#;

    const RECURSIVE_SUM: &str = r#"
int sum_to(int n) {
    if (n <= 0) {
        return 0;
    }
    return n + sum_to(n - 1);
}
"#;

    #[test]
    fn iterative_unit_yields_loop_and_signature() {
        let graph = DependenceGraphBuilder::new().build(ITERATIVE_SUM, Language::Cpp);

        assert_eq!(graph.loop_count, 1);
        assert_eq!(graph.return_count, 1);
        assert!(graph.control_flow_signature.contains('L'));
        assert!(graph.control_flow_signature.ends_with('R'));
        assert!(!graph.has_recursion);
        assert!(graph.data_edge_count > 0);
    }

    #[test]
    fn recursion_is_detected_from_call_targets() {
        let graph = DependenceGraphBuilder::new().build(RECURSIVE_SUM, Language::Cpp);

        assert!(graph.has_recursion);
        assert_eq!(graph.condition_count, 1);
        assert_eq!(graph.loop_count, 0);
    }

    #[test]
    fn data_edges_follow_latest_definition() {
        let source = "int acc = 1;\nint mid = acc + 2;\nint out = mid + acc;\n";
        let graph = DependenceGraphBuilder::new().build(source, Language::Cpp);

        let data_edges: Vec<_> = graph
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Data)
            .collect();
        // mid reads acc; out reads mid and acc
        assert_eq!(data_edges.len(), 3);
        assert!(data_edges
            .iter()
            .any(|e| e.variable.as_deref() == Some("acc") && e.target == 1));
        assert!(data_edges
            .iter()
            .any(|e| e.variable.as_deref() == Some("mid") && e.target == 2));
    }

    #[test]
    fn control_edges_are_window_bounded() {
        let mut source = String::from("while (running) {\n");
        for i in 0..12 {
            source.push_str(&format!("x{i} = {i};\n"));
        }
        source.push_str("}\n");

        let graph = DependenceGraphBuilder::new().build(&source, Language::Cpp);
        let control_edges = graph
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Control)
            .count();
        // Lookahead 8 covers at most the next 7 nodes
        assert_eq!(control_edges, 7);
    }

    #[test]
    fn empty_and_malformed_sources_never_error() {
        let builder = DependenceGraphBuilder::new();
        assert_eq!(builder.build("", Language::Cpp).node_count(), 0);
        assert_eq!(builder.build("\n\n\n", Language::Python).node_count(), 0);

        let garbage = "@@@ ::: ]]] )))\n%%%%\n";
        let graph = builder.build(garbage, Language::Java);
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn nesting_depth_tracks_entries_and_exits() {
        let source = r#"
for (int i = 0; i < n; i++) {
    if (i % 2 == 0) {
        x += i;
    }
}
y = x;
"#;
        let graph = DependenceGraphBuilder::new().build(source, Language::Cpp);
        assert_eq!(graph.max_nesting_depth, 2);
    }
}
