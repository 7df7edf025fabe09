//! Shared test utilities: mock steps, predicates and fixtures.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::Notify;

use strand_core::error::{Result, StrandError};
use strand_core::traits::{Predicate, Step};
use strand_core::types::{StepContext, StepOutput, TokenUsage};

/// Usage fixture.
pub fn usage(prompt_tokens: u64, completion_tokens: u64) -> TokenUsage {
    TokenUsage::new(prompt_tokens, completion_tokens)
}

/// Predicate: output contains `needle`.
pub fn contains(needle: &str) -> impl Predicate {
    let needle = needle.to_string();
    move |output: &str| output.contains(needle.as_str())
}

/// Shared record of every call a mock step received.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    inputs: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    fn push(&self, input: &str) {
        self.inputs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(input.to_string());
    }

    pub fn count(&self) -> usize {
        self.inputs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

enum Scripted {
    Output(StepOutput),
    Fail(String),
}

/// Scripted mock step.
///
/// Responses are consumed in order; the last one repeats once the queue
/// runs dry. Every input is recorded in a `CallLog` that stays readable
/// after the step has been moved into a graph.
pub struct MockStep {
    script: Mutex<VecDeque<Scripted>>,
    last: Mutex<Option<StepOutput>>,
    log: CallLog,
    delay: Option<Duration>,
}

impl MockStep {
    /// Text-only responses with no usage or cost.
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_outputs(responses.into_iter().map(|r| StepOutput::text(r)))
    }

    /// Full responses including usage and cost.
    pub fn with_outputs(outputs: impl IntoIterator<Item = StepOutput>) -> Self {
        Self {
            script: Mutex::new(outputs.into_iter().map(Scripted::Output).collect()),
            last: Mutex::new(None),
            log: CallLog::default(),
            delay: None,
        }
    }

    /// Queue a failure after the responses queued so far.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Scripted::Fail(message.into()));
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> CallLog {
        self.log.clone()
    }

    fn next(&self) -> Result<StepOutput> {
        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        match next {
            Some(Scripted::Output(out)) => {
                *last = Some(out.clone());
                Ok(out)
            }
            Some(Scripted::Fail(message)) => Err(StrandError::StepFailed(message)),
            None => last
                .clone()
                .ok_or_else(|| StrandError::StepFailed("mock step has no responses".into())),
        }
    }
}

impl Step for MockStep {
    fn run(&self, _ctx: StepContext, input: String) -> BoxFuture<'_, Result<StepOutput>> {
        Box::pin(async move {
            self.log.push(&input);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.next()
        })
    }
}

/// Always fails with the given message.
pub struct FailingStep {
    message: String,
    calls: Arc<AtomicUsize>,
}

impl FailingStep {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl Step for FailingStep {
    fn run(&self, _ctx: StepContext, _input: String) -> BoxFuture<'_, Result<StepOutput>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StrandError::StepFailed(self.message.clone()))
        })
    }
}

/// Never completes. Signals `started()` once it has been entered.
#[derive(Default)]
pub struct PendingStep {
    started: Arc<Notify>,
}

impl PendingStep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> Arc<Notify> {
        self.started.clone()
    }
}

impl Step for PendingStep {
    fn run(&self, _ctx: StepContext, _input: String) -> BoxFuture<'_, Result<StepOutput>> {
        Box::pin(async move {
            self.started.notify_one();
            futures::future::pending::<()>().await;
            Ok(StepOutput::default())
        })
    }
}

/// Gives up with an error as soon as the run is cancelled.
#[derive(Default)]
pub struct CooperativeStep;

impl Step for CooperativeStep {
    fn run(&self, ctx: StepContext, _input: String) -> BoxFuture<'_, Result<StepOutput>> {
        Box::pin(async move {
            ctx.cancel.cancelled().await;
            Err(StrandError::StepFailed(format!("{} interrupted", ctx.node)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> StepContext {
        StepContext::new("mock", 1, Default::default())
    }

    #[tokio::test]
    async fn test_mock_step_sequence_and_log() {
        let step = MockStep::new(["first", "second"]);
        let log = step.calls();
        assert_eq!(step.run(ctx(), "a".into()).await.unwrap().output, "first");
        assert_eq!(step.run(ctx(), "b".into()).await.unwrap().output, "second");
        assert_eq!(step.run(ctx(), "c".into()).await.unwrap().output, "second");
        assert_eq!(log.count(), 3);
        assert_eq!(log.inputs(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_mock_step_then_fail() {
        let step = MockStep::new(["ok"]).then_fail("broken");
        assert!(step.run(ctx(), "a".into()).await.is_ok());
        let err = step.run(ctx(), "b".into()).await.unwrap_err();
        assert_eq!(err.to_string(), "broken");
    }

    #[tokio::test]
    async fn test_failing_step_counts() {
        let step = FailingStep::new("nope");
        let counter = step.call_counter();
        assert!(step.run(ctx(), "x".into()).await.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_contains_helper() {
        let p = contains("REVISE");
        assert!(p.evaluate("REVISE please"));
        assert!(!p.evaluate("APPROVED"));
    }
}
