use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Token accounting reported by a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Build usage from prompt/completion counts; the total is their sum.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens += rhs.prompt_tokens;
        self.completion_tokens += rhs.completion_tokens;
        self.total_tokens += rhs.total_tokens;
    }
}

impl Add for TokenUsage {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

/// What a step hands back after a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOutput {
    pub output: String,
    #[serde(default)]
    pub usage: TokenUsage,
    #[serde(default)]
    pub cost: f64,
}

impl StepOutput {
    /// A text-only output with no usage or cost.
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            usage: TokenUsage::default(),
            cost: 0.0,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }
}

/// Per-invocation context handed to a step.
///
/// `cancel` is the run's token; long-running steps should watch it and
/// bail out early. The executor also races the step against it.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// Name of the node being executed.
    pub node: String,
    /// 1-based visit index of this node within the run.
    pub visit: usize,
    pub cancel: CancellationToken,
}

impl StepContext {
    pub fn new(node: impl Into<String>, visit: usize, cancel: CancellationToken) -> Self {
        Self {
            node: node.into(),
            visit,
            cancel,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_accumulates() {
        let mut total = TokenUsage::default();
        total += TokenUsage::new(10, 5);
        total += TokenUsage::new(3, 2);
        assert_eq!(total.prompt_tokens, 13);
        assert_eq!(total.completion_tokens, 7);
        assert_eq!(total.total_tokens, 20);
        assert!(!total.is_zero());
        assert!(TokenUsage::default().is_zero());
    }

    #[test]
    fn test_step_output_builders() {
        let out = StepOutput::text("hi")
            .with_usage(TokenUsage::new(1, 1))
            .with_cost(0.25);
        assert_eq!(out.output, "hi");
        assert_eq!(out.usage.total_tokens, 2);
        assert_eq!(out.cost, 0.25);
    }

    #[test]
    fn test_step_output_deserializes_with_defaults() {
        let out: StepOutput = serde_json::from_str(r#"{"output": "x"}"#).unwrap();
        assert_eq!(out, StepOutput::text("x"));
    }
}
