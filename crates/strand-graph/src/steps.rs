//! Deterministic built-in steps for demos, graph files and tests.
//!
//! None of these call a model. Usage is estimated as whitespace-separated
//! word counts of input and output.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::BoxFuture;

use strand_core::error::{Result, StrandError};
use strand_core::traits::Step;
use strand_core::types::{StepContext, StepOutput, TokenUsage};

fn estimate_usage(input: &str, output: &str) -> TokenUsage {
    TokenUsage::new(
        input.split_whitespace().count() as u64,
        output.split_whitespace().count() as u64,
    )
}

/// Returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoStep;

impl Step for EchoStep {
    fn run(&self, _ctx: StepContext, input: String) -> BoxFuture<'_, Result<StepOutput>> {
        Box::pin(async move {
            let usage = estimate_usage(&input, &input);
            Ok(StepOutput::text(input).with_usage(usage))
        })
    }
}

/// Substitutes the input into `{input}` placeholders of a template.
#[derive(Debug, Clone)]
pub struct TemplateStep {
    template: String,
}

impl TemplateStep {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl Step for TemplateStep {
    fn run(&self, _ctx: StepContext, input: String) -> BoxFuture<'_, Result<StepOutput>> {
        Box::pin(async move {
            let output = self.template.replace("{input}", &input);
            let usage = estimate_usage(&input, &output);
            Ok(StepOutput::text(output).with_usage(usage))
        })
    }
}

/// Plays back a fixed list of responses, one per call.
///
/// Once the list is exhausted the last response repeats. The cursor lives
/// in the step, so a graph reused across runs keeps advancing it.
#[derive(Debug)]
pub struct ScriptedStep {
    responses: Vec<String>,
    cost_per_call: f64,
    cursor: AtomicUsize,
}

impl ScriptedStep {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            cost_per_call: 0.0,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn with_cost(mut self, cost_per_call: f64) -> Self {
        self.cost_per_call = cost_per_call;
        self
    }

    /// Number of times the step has been called.
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

impl Step for ScriptedStep {
    fn run(&self, ctx: StepContext, input: String) -> BoxFuture<'_, Result<StepOutput>> {
        Box::pin(async move {
            let call = self.cursor.fetch_add(1, Ordering::SeqCst);
            let output = self
                .responses
                .get(call)
                .or_else(|| self.responses.last())
                .cloned()
                .ok_or_else(|| {
                    StrandError::StepFailed(format!("scripted step '{}' has no responses", ctx.node))
                })?;
            let usage = estimate_usage(&input, &output);
            Ok(StepOutput::text(output)
                .with_usage(usage)
                .with_cost(self.cost_per_call))
        })
    }
}
