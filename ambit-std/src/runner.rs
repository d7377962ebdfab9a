//! # The Runner
//!
//! Drives a handler or builder to completion against a fresh context,
//! guaranteeing teardown, and converts the result into a caller-visible
//! [`Outcome`].
//!
//! # State Machine
//!
//! Per request: `Created → Running → {Completed | Failed}` (terminal).
//! The cleanup registry is drained unconditionally on both terminal
//! transitions; this is the central invariant the runtime protects.
//! A handler panic is caught and becomes [`RunError::Panic`]; external
//! cancellation becomes [`RunError::Cancelled`]. Neither bypasses drain.
//!
//! Concurrency across requests comes from instantiating one independent
//! context per request, never from sharing a context between requests.

use crate::builder::{BuilderContext, Fragment, OutputAccumulator};
use crate::context::Context;
use ambit_core::{BoxError, Environment, Handler, Outcome, RunError, panic_message};
use futures::FutureExt;
use futures::future::Either;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Entry point for executing handlers and builders.
#[derive(Debug, Clone, Copy, Default)]
pub struct Runner;

impl Runner {
    /// Run `handler` against a fresh context built from `environment`.
    ///
    /// The cleanup registry is drained before this returns, whether the
    /// handler completed, failed or panicked.
    pub async fn run<E, H>(environment: E, handler: H) -> Outcome<H::Output>
    where
        E: Environment,
        H: Handler<Context<E>>,
    {
        let cx = Context::new(environment);
        let result = execute(handler.run(cx.clone())).await;
        finish(&cx, result)
    }

    /// Run `handler` against an environment produced by `build`.
    ///
    /// If environment construction fails (upstream request parsing), no
    /// context is created and the handler never runs.
    pub async fn run_with<E, B, H>(build: B, handler: H) -> Outcome<H::Output>
    where
        E: Environment,
        B: FnOnce() -> Result<E, BoxError>,
        H: Handler<Context<E>>,
    {
        match build() {
            Ok(environment) => Self::run(environment, handler).await,
            Err(err) => Outcome::failure(RunError::Handler(err)),
        }
    }

    /// Run `builder` against a fresh context, returning its value together
    /// with the finalized [`OutputAccumulator`].
    pub async fn run_builder<E, F, H>(
        environment: E,
        builder: H,
    ) -> Outcome<(H::Output, OutputAccumulator<F>)>
    where
        E: Environment,
        F: Fragment,
        H: Handler<BuilderContext<E, F>>,
    {
        let cx = Context::new(environment);
        let bcx = BuilderContext::new(cx.clone());
        let result = execute(builder.run(bcx.clone())).await;
        let result = result.map(|value| (value, bcx.finish()));
        finish(&cx, result)
    }

    /// Run `handler`, aborting with [`RunError::Cancelled`] when `cancel`
    /// resolves first (client disconnect, deadline).
    ///
    /// Cancellation is a `Failed` transition, not a bypass of teardown:
    /// cleanups registered before the abort still drain.
    pub async fn run_cancellable<E, C, H>(
        environment: E,
        cancel: C,
        handler: H,
    ) -> Outcome<H::Output>
    where
        E: Environment,
        C: Future<Output = ()> + Send,
        H: Handler<Context<E>>,
    {
        let cx = Context::new(environment);
        let work = execute(handler.run(cx.clone()));
        futures::pin_mut!(work, cancel);
        let result = match futures::future::select(work, cancel).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => Err(RunError::Cancelled),
        };
        finish(&cx, result)
    }

    /// Run `handler` under a deadline; expiry maps to the cancelled
    /// failure kind.
    #[cfg(feature = "timeout")]
    pub async fn run_with_timeout<E, H>(
        environment: E,
        deadline: std::time::Duration,
        handler: H,
    ) -> Outcome<H::Output>
    where
        E: Environment,
        H: Handler<Context<E>>,
    {
        Self::run_cancellable(environment, tokio::time::sleep(deadline), handler).await
    }
}

/// Execute a builder against an existing context, without teardown.
///
/// This is the mid-request entry point for templating collaborators: the
/// builder accumulates output and may call into handler-capable
/// collaborators via [`BuilderContext::run_as_handler`], while the context
/// (and its cleanup registry) remains owned by the surrounding runner.
pub async fn build_in<E, F, H>(
    context: &Context<E>,
    builder: H,
) -> Result<(H::Output, OutputAccumulator<F>), BoxError>
where
    E: Environment,
    F: Fragment,
    H: Handler<BuilderContext<E, F>>,
{
    let bcx = BuilderContext::new(context.clone());
    let value = builder.run(bcx.clone()).await?;
    Ok((value, bcx.finish()))
}

/// Await the work future, converting an `Err` return or a panic into the
/// primary failure.
async fn execute<T>(
    work: impl Future<Output = Result<T, BoxError>> + Send,
) -> Result<T, RunError> {
    match AssertUnwindSafe(work).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(RunError::Handler(err)),
        Err(payload) => Err(RunError::Panic(panic_message(payload))),
    }
}

/// The single teardown path: drain the registry, then assemble the outcome.
fn finish<E: Environment, T>(cx: &Context<E>, result: Result<T, RunError>) -> Outcome<T> {
    let cleanup_failures = cx.drain();

    #[cfg(feature = "tracing")]
    {
        if let Err(error) = &result {
            tracing::warn!(%error, "execution failed");
        } else {
            tracing::debug!("execution completed");
        }
        for failure in &cleanup_failures {
            tracing::warn!(%failure, "cleanup action failed");
        }
    }

    let outcome = match result {
        Ok(value) => Outcome::success(value),
        Err(error) => Outcome::failure(error),
    };
    outcome.with_cleanup_failures(cleanup_failures)
}
