use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use strand_core::types::{StepOutput, TokenUsage};

/// One execution of a node's step.
#[derive(Debug, Clone, Serialize)]
pub struct NodeVisit {
    /// 1-based visit index, scoped to the node.
    pub iteration: usize,
    pub output: String,
    pub usage: TokenUsage,
    pub cost: f64,
    /// Step execution time in milliseconds.
    pub elapsed_ms: u64,
}

/// Outcome of a successful graph run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub graph: String,
    /// Output of the node the run terminated on.
    pub final_output: String,
    pub total_cost: f64,
    pub total_usage: TokenUsage,
    /// Per-node visit history, each in chronological order.
    pub node_results: BTreeMap<String, Vec<NodeVisit>>,
    /// Every visited node, in execution order.
    pub path: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub total_elapsed_ms: u64,
}

impl RunResult {
    /// Visits of `node`, empty if it never ran.
    pub fn visits(&self, node: &str) -> &[NodeVisit] {
        self.node_results
            .get(node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total step invocations in the run.
    pub fn total_visits(&self) -> usize {
        self.path.len()
    }
}

/// In-flight accumulation of a run.
///
/// Only `finish` turns it into a `RunResult`; a failed run drops it.
pub(crate) struct RunRecorder {
    run_id: Uuid,
    graph: String,
    started_at: DateTime<Utc>,
    total_cost: f64,
    total_usage: TokenUsage,
    node_results: BTreeMap<String, Vec<NodeVisit>>,
    path: Vec<String>,
}

impl RunRecorder {
    pub(crate) fn new(graph: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            graph: graph.to_string(),
            started_at: Utc::now(),
            total_cost: 0.0,
            total_usage: TokenUsage::default(),
            node_results: BTreeMap::new(),
            path: Vec::new(),
        }
    }

    pub(crate) fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Index the next visit of `node` will get.
    pub(crate) fn next_iteration(&self, node: &str) -> usize {
        self.node_results.get(node).map_or(0, Vec::len) + 1
    }

    pub(crate) fn record(&mut self, node: &str, step: &StepOutput, elapsed_ms: u64) {
        self.total_cost += step.cost;
        self.total_usage += step.usage;
        self.path.push(node.to_string());

        let visits = self.node_results.entry(node.to_string()).or_default();
        visits.push(NodeVisit {
            iteration: visits.len() + 1,
            output: step.output.clone(),
            usage: step.usage,
            cost: step.cost,
            elapsed_ms,
        });
    }

    pub(crate) fn finish(self, final_output: String, total_elapsed_ms: u64) -> RunResult {
        RunResult {
            run_id: self.run_id,
            graph: self.graph,
            final_output,
            total_cost: self.total_cost,
            total_usage: self.total_usage,
            node_results: self.node_results,
            path: self.path,
            started_at: self.started_at,
            total_elapsed_ms,
        }
    }
}
