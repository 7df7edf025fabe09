//! TOML graph definition files.
//!
//! ```toml
//! name = "review"
//!
//! [options]
//! max_iterations = 5
//!
//! [[nodes]]
//! name = "writer"
//! step = { kind = "template", template = "Draft about {input}" }
//!
//! [[edges]]
//! from = "reviewer"
//! to = "reviser"
//! when = 'contains "REVISE"'
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use strand_core::config::{self, GraphOptions};
use strand_core::error::{Result, StrandError};
use strand_core::traits::Step;

use crate::builder::GraphBuilder;
use crate::graph::Graph;
use crate::predicate::Condition;
use crate::steps::{EchoStep, ScriptedStep, TemplateStep};

/// A whole graph as written in a definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDefinition {
    pub name: String,
    /// Falls back to the caller's defaults when absent.
    #[serde(default)]
    pub options: Option<GraphOptions>,
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub edges: Vec<EdgeDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub name: String,
    pub step: StepDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDefinition {
    pub from: String,
    pub to: String,
    /// Guard expression, see `Condition::parse`. None = unconditional.
    #[serde(default)]
    pub when: Option<String>,
}

/// Which built-in step backs a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepDefinition {
    Echo,
    Template {
        template: String,
    },
    Scripted {
        responses: Vec<String>,
        #[serde(default)]
        cost_per_call: f64,
    },
}

impl StepDefinition {
    pub fn into_step(self) -> Arc<dyn Step> {
        match self {
            StepDefinition::Echo => Arc::new(EchoStep),
            StepDefinition::Template { template } => Arc::new(TemplateStep::new(template)),
            StepDefinition::Scripted {
                responses,
                cost_per_call,
            } => Arc::new(ScriptedStep::new(responses).with_cost(cost_per_call)),
        }
    }
}

impl GraphDefinition {
    /// Load a definition file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        config::load_toml(path)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        config::parse_toml(content)
    }

    /// Translate into a builder. Guard expressions are parsed here, so a
    /// malformed `when` surfaces as `InvalidEdge` before `build()` runs.
    pub fn into_builder(self, defaults: GraphOptions) -> Result<GraphBuilder> {
        let mut builder =
            GraphBuilder::new(self.name).options(self.options.unwrap_or(defaults));

        for node in self.nodes {
            builder = builder.add_shared_node(node.name, node.step.into_step());
        }

        for edge in self.edges {
            builder = match edge.when {
                None => builder.add_edge(edge.from, edge.to),
                Some(expr) => {
                    let condition =
                        Condition::parse(&expr).map_err(|reason| StrandError::InvalidEdge {
                            from: edge.from.clone(),
                            to: edge.to.clone(),
                            reason,
                        })?;
                    builder.add_conditional_edge(edge.from, edge.to, condition)
                }
            };
        }

        Ok(builder)
    }

    /// Translate and build in one go.
    pub fn build(self, defaults: GraphOptions) -> Result<Graph> {
        self.into_builder(defaults)?.build()
    }
}
