use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use strand_core::config::GraphOptions;
use strand_core::traits::{Predicate, Step};

/// A named binding of a step within a graph.
pub struct Node {
    pub(crate) name: String,
    pub(crate) step: Arc<dyn Step>,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node").field("name", &self.name).finish()
    }
}

/// A directed, optionally guarded transition between two nodes.
pub struct Edge {
    pub(crate) from: String,
    pub(crate) to: String,
    pub(crate) to_idx: usize,
    pub(crate) predicate: Option<Arc<dyn Predicate>>,
}

impl Edge {
    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    /// Whether this edge carries a guard.
    pub fn is_conditional(&self) -> bool {
        self.predicate.is_some()
    }

    /// Label for a guarded edge: the guard's own description, or "guarded".
    pub fn guard_label(&self) -> Option<String> {
        self.predicate
            .as_ref()
            .map(|p| p.describe().unwrap_or_else(|| "guarded".to_string()))
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("guard", &self.guard_label())
            .finish()
    }
}

pub(crate) struct GraphInner {
    pub(crate) name: String,
    pub(crate) nodes: Vec<Node>,
    pub(crate) edges: Vec<Edge>,
    /// Edge indices leaving each node, in declaration order.
    pub(crate) outgoing: Vec<Vec<usize>>,
    pub(crate) index: HashMap<String, usize>,
    pub(crate) start: usize,
    pub(crate) options: GraphOptions,
}

/// A validated, immutable execution graph.
///
/// Produced only by `GraphBuilder::build`. Cloning is cheap and every
/// clone shares the same read-only nodes and edges, so one graph can serve
/// many concurrent runs.
#[derive(Clone)]
pub struct Graph {
    pub(crate) inner: Arc<GraphInner>,
}

impl Graph {
    pub(crate) fn from_inner(inner: GraphInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The single node with no incoming edges.
    pub fn start_node(&self) -> &str {
        &self.inner.nodes[self.inner.start].name
    }

    pub fn options(&self) -> GraphOptions {
        self.inner.options
    }

    pub fn nodes(&self) -> &[Node] {
        &self.inner.nodes
    }

    /// Node names in insertion order.
    pub fn node_names(&self) -> Vec<&str> {
        self.inner.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.inner.edges
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.inner.index.contains_key(name)
    }

    /// Outgoing edges of `node`, in declaration order.
    pub fn outgoing(&self, node: &str) -> Vec<&Edge> {
        match self.inner.index.get(node) {
            Some(&idx) => self.inner.outgoing[idx]
                .iter()
                .map(|&e| &self.inner.edges[e])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Pick the successor of `node` for a given output.
    ///
    /// Guarded edges are tried in declaration order and the first match
    /// wins. Failing that, the unconditional edge is taken only when the
    /// node has exactly one. `None` means the run terminates here.
    pub(crate) fn next_node(&self, node: usize, output: &str) -> Option<usize> {
        let mut unconditional = Vec::new();
        for &e in &self.inner.outgoing[node] {
            let edge = &self.inner.edges[e];
            match &edge.predicate {
                Some(p) if p.evaluate(output) => return Some(edge.to_idx),
                Some(_) => {}
                None => unconditional.push(edge.to_idx),
            }
        }
        match unconditional.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.inner.name)
            .field("start", &self.start_node())
            .field("nodes", &self.inner.nodes)
            .field("edges", &self.inner.edges)
            .field("options", &self.inner.options)
            .finish()
    }
}
