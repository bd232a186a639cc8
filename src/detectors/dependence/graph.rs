//! Statement-level dependence graph data model.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Category of a graph node (one significant source line).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// A loop header.
    Loop,
    /// A branching construct header.
    Condition,
    /// An assignment statement.
    Assignment,
    /// A return statement.
    Return,
    /// A call statement.
    Call,
    /// Any other significant statement.
    Statement,
}

/// Kind of a dependence edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// The source node's definition reaches a use in the target node.
    Data,
    /// The source node gates execution of the target node.
    Control,
}

/// One statement in the dependence graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// Position of this node in the graph's node list.
    pub id: usize,
    /// Statement category.
    pub category: NodeCategory,
    /// 1-based source line number.
    pub line: usize,
    /// Leading fragment of the source line, for explanations.
    pub snippet: String,
    /// Variables defined (declared or assigned) by this statement.
    pub defined: BTreeSet<String>,
    /// Variables read by this statement.
    pub used: BTreeSet<String>,
    /// Call targets extracted from this statement, in order.
    pub calls: Vec<String>,
}

/// A dependence edge between two nodes of the same graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Id of the defining / gating node.
    pub source: usize,
    /// Id of the dependent node.
    pub target: usize,
    /// Data or control dependence.
    pub kind: EdgeKind,
    /// For data edges, the variable carrying the dependence.
    pub variable: Option<String>,
}

/// The complete per-unit dependence graph with derived scalars.
///
/// A deliberately approximate, line-pattern-based abstraction: control edges
/// use a bounded lookahead rather than dominance analysis, and data edges
/// follow latest definitions only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependenceGraph {
    /// Ordered statement nodes.
    pub nodes: Vec<GraphNode>,
    /// Data and control edges; endpoints index into `nodes`.
    pub edges: Vec<GraphEdge>,

    /// Number of loop nodes.
    pub loop_count: usize,
    /// Number of condition nodes.
    pub condition_count: usize,
    /// Deepest loop/condition nesting observed.
    pub max_nesting_depth: usize,
    /// Whether any defined function appears among the call targets.
    pub has_recursion: bool,
    /// One of `L`/`C`/`R` per loop/condition/return node, in encounter order.
    pub control_flow_signature: String,
    /// Number of return nodes.
    pub return_count: usize,
    /// Count of distinct variables defined or used anywhere in the unit.
    pub total_variables: usize,
    /// Number of data edges.
    pub data_edge_count: usize,
    /// Distinct call targets across the unit.
    pub function_calls: BTreeSet<String>,
}

impl DependenceGraph {
    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges (data and control).
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Ordered call sequence across all nodes, duplicates preserved.
    pub fn call_sequence(&self) -> Vec<String> {
        self.nodes
            .iter()
            .flat_map(|n| n.calls.iter().cloned())
            .collect()
    }

    /// Total variable definitions and uses across all nodes.
    pub fn def_use_totals(&self) -> (usize, usize) {
        let defs = self.nodes.iter().map(|n| n.defined.len()).sum();
        let uses = self.nodes.iter().map(|n| n.used.len()).sum();
        (defs, uses)
    }

    /// Abstracted edge-category pattern set for one edge kind: the set of
    /// (source category, target category) pairs present in the graph.
    pub fn edge_category_patterns(&self, kind: EdgeKind) -> BTreeSet<(NodeCategory, NodeCategory)> {
        self.edges
            .iter()
            .filter(|e| e.kind == kind)
            .filter_map(|e| {
                let source = self.nodes.get(e.source)?;
                let target = self.nodes.get(e.target)?;
                Some((source.category, target.category))
            })
            .collect()
    }
}
