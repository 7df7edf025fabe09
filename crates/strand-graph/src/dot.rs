//! Graphviz rendering of a built graph.

use std::fmt::Write;

use crate::graph::Graph;

impl Graph {
    /// Render the topology as a Graphviz `digraph`.
    ///
    /// Nodes, then edges, each in insertion order. The start node is drawn
    /// with a double border and guarded edges carry their guard as a label,
    /// so the output is stable for a given graph.
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "digraph {} {{", quote(self.name()));

        for node in self.nodes() {
            if node.name() == self.start_node() {
                let _ = writeln!(out, "  {} [peripheries=2];", quote(node.name()));
            } else {
                let _ = writeln!(out, "  {};", quote(node.name()));
            }
        }

        for edge in self.edges() {
            match edge.guard_label() {
                Some(label) => {
                    let _ = writeln!(
                        out,
                        "  {} -> {} [label={}, style=dashed];",
                        quote(edge.from()),
                        quote(edge.to()),
                        quote(&label)
                    );
                }
                None => {
                    let _ = writeln!(out, "  {} -> {};", quote(edge.from()), quote(edge.to()));
                }
            }
        }

        out.push_str("}\n");
        out
    }
}

/// Quote an identifier as a DOT string literal.
fn quote(id: &str) -> String {
    let mut s = String::with_capacity(id.len() + 2);
    s.push('"');
    for c in id.chars() {
        match c {
            '"' => s.push_str("\\\""),
            '\\' => s.push_str("\\\\"),
            '\n' => s.push_str("\\n"),
            c => s.push(c),
        }
    }
    s.push('"');
    s
}
