use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::{StepContext, StepOutput};

/// Step — one unit of work in a graph (an "agent" call).
///
/// Each invocation is independent: text in, text plus usage/cost out.
pub trait Step: Send + Sync + 'static {
    /// Run the step against `input`.
    fn run(&self, ctx: StepContext, input: String) -> BoxFuture<'_, Result<StepOutput>>;
}

impl<S: Step + ?Sized> Step for Arc<S> {
    fn run(&self, ctx: StepContext, input: String) -> BoxFuture<'_, Result<StepOutput>> {
        (**self).run(ctx, input)
    }
}

/// Predicate — a pure guard over a step's output text.
///
/// Implemented for any `Fn(&str) -> bool`; declarative conditions also
/// implement it and return a `describe()` label for rendering.
pub trait Predicate: Send + Sync + 'static {
    fn evaluate(&self, output: &str) -> bool;

    /// Short human-readable form of the guard, if it has one.
    fn describe(&self) -> Option<String> {
        None
    }
}

impl<F> Predicate for F
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    fn evaluate(&self, output: &str) -> bool {
        self(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl Step for Upper {
        fn run(&self, _ctx: StepContext, input: String) -> BoxFuture<'_, Result<StepOutput>> {
            Box::pin(async move { Ok(StepOutput::text(input.to_uppercase())) })
        }
    }

    #[test]
    fn test_closure_is_predicate() {
        let p = |s: &str| s.contains("REVISE");
        assert!(p.evaluate("please REVISE this"));
        assert!(!p.evaluate("APPROVED"));
        assert!(p.describe().is_none());
    }

    #[test]
    fn test_arc_step_delegates() {
        let step: Arc<dyn Step> = Arc::new(Upper);
        let ctx = StepContext::new("n", 1, Default::default());
        let out = futures::executor::block_on(step.run(ctx, "abc".into())).unwrap();
        assert_eq!(out.output, "ABC");
    }
}
