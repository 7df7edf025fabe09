use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use strand_core::config::GraphOptions;
use strand_core::error::{Result, StrandError};
use strand_core::traits::{Predicate, Step};

use crate::graph::{Edge, Graph, GraphInner, Node};

struct PendingEdge {
    from: String,
    to: String,
    predicates: Vec<Arc<dyn Predicate>>,
}

/// Accumulates nodes, edges and options, then validates them into a `Graph`.
///
/// Nothing is checked until `build()`, so edges may be declared before the
/// nodes they reference.
pub struct GraphBuilder {
    name: String,
    nodes: Vec<(String, Arc<dyn Step>)>,
    edges: Vec<PendingEdge>,
    options: GraphOptions,
}

impl GraphBuilder {
    /// Start a new graph definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            options: GraphOptions::default(),
        }
    }

    /// Register a node. A repeated name fails the build with `DuplicateNode`.
    pub fn add_node(self, name: impl Into<String>, step: impl Step) -> Self {
        self.add_shared_node(name, Arc::new(step))
    }

    /// Register a node backed by an already shared step.
    pub fn add_shared_node(mut self, name: impl Into<String>, step: Arc<dyn Step>) -> Self {
        self.nodes.push((name.into(), step));
        self
    }

    /// Add an unconditional edge.
    pub fn add_edge(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.add_guarded_edge(from, to, Vec::new())
    }

    /// Add an edge guarded by a single predicate.
    pub fn add_conditional_edge(
        self,
        from: impl Into<String>,
        to: impl Into<String>,
        predicate: impl Predicate,
    ) -> Self {
        let predicate: Arc<dyn Predicate> = Arc::new(predicate);
        self.add_guarded_edge(from, to, vec![predicate])
    }

    /// Add an edge with any number of guards.
    ///
    /// Zero guards is unconditional, one is conditional; more than one
    /// fails the build with `InvalidEdge`.
    pub fn add_guarded_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        predicates: Vec<Arc<dyn Predicate>>,
    ) -> Self {
        self.edges.push(PendingEdge {
            from: from.into(),
            to: to.into(),
            predicates,
        });
        self
    }

    /// Set run options. Replaces any earlier options.
    pub fn options(mut self, options: GraphOptions) -> Self {
        self.options = options;
        self
    }

    /// Shorthand for `options(GraphOptions { max_iterations })`.
    pub fn max_iterations(self, max_iterations: usize) -> Self {
        self.options(GraphOptions::default().with_max_iterations(max_iterations))
    }

    /// Validate and freeze the graph.
    ///
    /// Checks run in a fixed order and the first failure is returned:
    /// options, node names, each edge in declaration order, then the
    /// start node.
    pub fn build(self) -> Result<Graph> {
        self.options.validate()?;

        let mut index = HashMap::with_capacity(self.nodes.len());
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (name, step) in self.nodes {
            if index.contains_key(&name) {
                return Err(StrandError::DuplicateNode(name));
            }
            index.insert(name.clone(), nodes.len());
            nodes.push(Node { name, step });
        }

        let mut edges = Vec::with_capacity(self.edges.len());
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        let mut incoming = vec![0usize; nodes.len()];

        for pending in self.edges {
            let PendingEdge {
                from,
                to,
                mut predicates,
            } = pending;
            let invalid = |reason: &str| StrandError::InvalidEdge {
                from: from.clone(),
                to: to.clone(),
                reason: reason.to_string(),
            };

            if predicates.len() > 1 {
                return Err(invalid("an edge takes at most one predicate"));
            }
            let from_idx = *index.get(&from).ok_or_else(|| invalid("unknown source node"))?;
            let to_idx = *index.get(&to).ok_or_else(|| invalid("unknown target node"))?;

            let predicate = predicates.pop();
            outgoing[from_idx].push(edges.len());
            incoming[to_idx] += 1;
            edges.push(Edge {
                from,
                to,
                to_idx,
                predicate,
            });
        }

        let roots: Vec<usize> = (0..nodes.len()).filter(|&i| incoming[i] == 0).collect();
        let start = match roots.as_slice() {
            [] => return Err(StrandError::NoStartNode),
            [only] => *only,
            many => {
                return Err(StrandError::AmbiguousStartNode(
                    many.iter().map(|&i| nodes[i].name.clone()).collect(),
                ))
            }
        };

        debug!(
            graph = %self.name,
            nodes = nodes.len(),
            edges = edges.len(),
            start = %nodes[start].name,
            "Graph built"
        );

        Ok(Graph::from_inner(GraphInner {
            name: self.name,
            nodes,
            edges,
            outgoing,
            index,
            start,
            options: self.options,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::EchoStep;

    fn chain() -> GraphBuilder {
        GraphBuilder::new("chain")
            .add_node("a", EchoStep)
            .add_node("b", EchoStep)
            .add_edge("a", "b")
    }

    #[test]
    fn test_build_simple_chain() {
        let graph = chain().build().unwrap();
        assert_eq!(graph.name(), "chain");
        assert_eq!(graph.start_node(), "a");
        assert_eq!(graph.node_names(), vec!["a", "b"]);
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.options().max_iterations, 10);
    }

    #[test]
    fn test_edges_may_precede_nodes() {
        let graph = GraphBuilder::new("g")
            .add_edge("a", "b")
            .add_node("a", EchoStep)
            .add_node("b", EchoStep)
            .build()
            .unwrap();
        assert_eq!(graph.start_node(), "a");
    }

    #[test]
    fn test_duplicate_node() {
        let err = chain().add_node("a", EchoStep).build().unwrap_err();
        assert!(matches!(err, StrandError::DuplicateNode(ref n) if n == "a"));
    }

    #[test]
    fn test_unknown_target() {
        let err = chain().add_edge("b", "missing").build().unwrap_err();
        match err {
            StrandError::InvalidEdge { from, to, reason } => {
                assert_eq!(from, "b");
                assert_eq!(to, "missing");
                assert!(reason.contains("target"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_source() {
        let err = chain().add_edge("ghost", "a").build().unwrap_err();
        assert!(matches!(err, StrandError::InvalidEdge { ref reason, .. } if reason.contains("source")));
    }

    #[test]
    fn test_too_many_predicates() {
        let p1: Arc<dyn Predicate> = Arc::new(|s: &str| s.is_empty());
        let p2: Arc<dyn Predicate> = Arc::new(|s: &str| s.len() > 3);
        let err = chain()
            .add_guarded_edge("b", "a", vec![p1, p2])
            .build()
            .unwrap_err();
        assert!(matches!(err, StrandError::InvalidEdge { .. }));
    }

    #[test]
    fn test_single_guard_through_guarded_edge() {
        let p: Arc<dyn Predicate> = Arc::new(|s: &str| s == "again");
        let graph = chain().add_guarded_edge("b", "b", vec![p]).build().unwrap();
        assert!(graph.edges()[1].is_conditional());
    }

    #[test]
    fn test_two_unconditional_edges_build() {
        let graph = chain()
            .add_node("c", EchoStep)
            .add_edge("a", "c")
            .build()
            .unwrap();
        assert_eq!(graph.outgoing("a").len(), 2);
        assert!(graph.outgoing("a").iter().all(|e| !e.is_conditional()));
    }

    #[test]
    fn test_ambiguous_start() {
        let err = chain().add_node("c", EchoStep).build().unwrap_err();
        match err {
            StrandError::AmbiguousStartNode(names) => assert_eq!(names, vec!["a", "c"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_start_when_every_node_has_incoming() {
        let err = chain().add_edge("b", "a").build().unwrap_err();
        assert!(matches!(err, StrandError::NoStartNode));
    }

    #[test]
    fn test_empty_graph_has_no_start() {
        let err = GraphBuilder::new("empty").build().unwrap_err();
        assert!(matches!(err, StrandError::NoStartNode));
    }

    #[test]
    fn test_self_loop_counts_as_incoming() {
        let err = GraphBuilder::new("loop")
            .add_node("solo", EchoStep)
            .add_conditional_edge("solo", "solo", |s: &str| s.is_empty())
            .build()
            .unwrap_err();
        assert!(matches!(err, StrandError::NoStartNode));
    }

    #[test]
    fn test_options_last_write_wins() {
        let graph = chain()
            .max_iterations(3)
            .options(GraphOptions::default().with_max_iterations(7))
            .build()
            .unwrap();
        assert_eq!(graph.options().max_iterations, 7);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let err = chain().max_iterations(0).build().unwrap_err();
        assert!(matches!(err, StrandError::InvalidOptions(_)));
    }

    #[test]
    fn test_first_error_wins() {
        // Duplicate node is checked before edges and start node
        let err = GraphBuilder::new("g")
            .add_node("a", EchoStep)
            .add_node("a", EchoStep)
            .add_edge("a", "missing")
            .build()
            .unwrap_err();
        assert!(matches!(err, StrandError::DuplicateNode(_)));
    }
}
