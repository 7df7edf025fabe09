//! Graph orchestration — cyclic, conditionally routed step workflows.
//!
//! A workflow is a directed graph of named nodes, each bound to a `Step`,
//! connected by edges that may carry a predicate over the source node's
//! output. `GraphBuilder` validates and freezes the definition into a
//! `Graph`; `Graph::run` walks it from the single start node, one node at
//! a time, until no edge matches (success), a step fails, the run is
//! cancelled, or the iteration cap is hit.

pub mod builder;
pub mod definition;
pub mod dot;
pub mod executor;
pub mod graph;
pub mod predicate;
pub mod result;
pub mod steps;

pub use builder::GraphBuilder;
pub use definition::{EdgeDefinition, GraphDefinition, NodeDefinition, StepDefinition};
pub use executor::RunContext;
pub use graph::{Edge, Graph, Node};
pub use predicate::Condition;
pub use result::{NodeVisit, RunResult};
pub use steps::{EchoStep, ScriptedStep, TemplateStep};
