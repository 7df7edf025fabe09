use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use strand_core::error::{Result, StrandError};
use strand_core::types::{StepContext, StepOutput};

use crate::graph::Graph;
use crate::result::{RunRecorder, RunResult};

/// Caller-side controls for one run: cancellation and an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing token, e.g. one wired to Ctrl-C.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Abort the run once `timeout` has elapsed from now.
    ///
    /// A timeout too large to represent as an instant means no deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the token fired or the deadline passed.
    pub fn is_done(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.cancel.cancelled().await,
        }
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Executor state. A run starts `Running` at the start node with zero
/// visits and loops until it reaches one of the two terminal states.
enum RunState {
    Running { node: usize, visits: usize },
    Terminated(String),
    Failed(StrandError),
}

impl Graph {
    /// Run the graph with no cancellation and no deadline.
    pub async fn run(&self, input: impl Into<String>) -> Result<RunResult> {
        self.run_with(&RunContext::new(), input).await
    }

    /// Run the graph from its start node.
    ///
    /// The start node receives `input`; every later node receives the
    /// previous node's output. Any error aborts the run and no partial
    /// result is returned.
    pub async fn run_with(&self, ctx: &RunContext, input: impl Into<String>) -> Result<RunResult> {
        let started = Instant::now();
        let mut recorder = RunRecorder::new(&self.inner.name);
        let mut input = input.into();

        info!(
            graph = %self.inner.name,
            run_id = %recorder.run_id(),
            start = %self.start_node(),
            max_iterations = self.inner.options.max_iterations,
            "Starting graph run"
        );

        let mut state = RunState::Running {
            node: self.inner.start,
            visits: 0,
        };

        loop {
            state = match state {
                RunState::Running { node, visits } => {
                    self.tick(ctx, node, visits, &mut input, &mut recorder).await
                }
                RunState::Terminated(final_output) => {
                    let total_elapsed_ms = elapsed_ms(started);
                    let result = recorder.finish(final_output, total_elapsed_ms);
                    info!(
                        graph = %result.graph,
                        run_id = %result.run_id,
                        visits = result.total_visits(),
                        total_cost = result.total_cost,
                        total_elapsed_ms,
                        "Graph run complete"
                    );
                    return Ok(result);
                }
                RunState::Failed(e) => return Err(e),
            };
        }
    }

    /// Execute the current node once and decide where to go next.
    async fn tick(
        &self,
        ctx: &RunContext,
        node: usize,
        visits: usize,
        input: &mut String,
        recorder: &mut RunRecorder,
    ) -> RunState {
        let max_iterations = self.inner.options.max_iterations;
        let name = self.inner.nodes[node].name.as_str();

        if visits == max_iterations {
            warn!(graph = %self.inner.name, node = %name, max_iterations, "Max iterations reached");
            return RunState::Failed(StrandError::MaxIterationsExceeded(max_iterations));
        }
        if ctx.is_done() {
            warn!(graph = %self.inner.name, node = %name, "Run cancelled before node");
            return RunState::Failed(StrandError::Cancelled { node: name.to_string() });
        }

        let iteration = recorder.next_iteration(name);
        debug!(node = %name, iteration, visits, "Executing graph node");

        let step_ctx = StepContext::new(name, iteration, ctx.cancel_token());
        let node_start = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = ctx.done() => None,
            result = self.inner.nodes[node].step.run(step_ctx, std::mem::take(input)) => Some(result),
        };
        let elapsed_ms = elapsed_ms(node_start);

        let step: StepOutput = match outcome {
            Some(Ok(step)) => step,
            // A step that gave up because the run was cancelled is a
            // cancellation, not a step failure.
            Some(Err(_)) | None if ctx.is_done() => {
                warn!(graph = %self.inner.name, node = %name, "Run cancelled during node");
                return RunState::Failed(StrandError::Cancelled { node: name.to_string() });
            }
            Some(Err(e)) => {
                error!(node = %name, iteration, error = %e, "Graph node failed");
                return RunState::Failed(StrandError::step(name, e));
            }
            None => {
                return RunState::Failed(StrandError::Cancelled { node: name.to_string() });
            }
        };

        recorder.record(name, &step, elapsed_ms);
        debug!(
            node = %name,
            iteration,
            elapsed_ms,
            cost = step.cost,
            tokens = step.usage.total_tokens,
            "Node execution complete"
        );

        match self.next_node(node, &step.output) {
            Some(next) => {
                debug!(from = %name, to = %self.inner.nodes[next].name, "Following edge");
                *input = step.output;
                RunState::Running {
                    node: next,
                    visits: visits + 1,
                }
            }
            None => {
                debug!(node = %name, "No edge matched, graph complete");
                RunState::Terminated(step.output)
            }
        }
    }
}
