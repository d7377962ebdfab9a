//! # Handler Traits
//!
//! A handler is the unit of work a runner drives to completion. It receives
//! a context handle by value (context handles are cheap clones sharing the
//! same underlying cells) and performs async business logic.
//!
//! The trait is generic over the context type, so the same abstraction
//! covers both execution modes: a plain handler is `Handler<Context<E>>`,
//! a builder is `Handler<BuilderContext<E, F>>`. A plain handler is just a
//! degenerate builder with no accumulator.
//!
//! # Static vs Dynamic Dispatch
//!
//! `Handler` uses native `async fn` futures for zero-cost static dispatch.
//! For runtime polymorphism (registries, route tables), use [`DynHandler`].

use crate::error::BoxError;
use std::{future::Future, pin::Pin};

/// A marker trait for the value produced by a handler.
pub trait HandlerOutput: Send + 'static {}
impl<T: Send + 'static> HandlerOutput for T {}

/// A unit of work executed against a context.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot handle a context of type `{C}`",
    label = "missing `Handler<{C}>` implementation",
    note = "Handlers must implement the `run` method for the context type `{C}`."
)]
pub trait Handler<C>: Send + Sync + 'static {
    /// The value produced on success.
    type Output: HandlerOutput;

    /// Execute the handler against the given context handle.
    fn run(&self, cx: C) -> impl Future<Output = Result<Self::Output, BoxError>> + Send;
}

// Blanket impl for closures
impl<F, C, T, Fut> Handler<C> for F
where
    C: Send + 'static,
    T: HandlerOutput,
    F: Fn(C) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, BoxError>> + Send,
{
    type Output = T;

    fn run(&self, cx: C) -> impl Future<Output = Result<Self::Output, BoxError>> + Send {
        (self)(cx)
    }
}

/// Dynamic object-safe version of [`Handler`].
///
/// Use this trait when you need runtime polymorphism (e.g. a route table
/// mapping paths to boxed handlers).
pub trait DynHandler<C>: Send + Sync + 'static {
    /// The value produced on success.
    type Output: HandlerOutput;

    /// Execute the handler (dynamic dispatch version).
    fn run_dyn<'a>(
        &'a self,
        cx: C,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output, BoxError>> + Send + 'a>>
    where
        C: 'a;
}

// Blanket implementation: any Handler implements DynHandler automatically.
impl<C, H> DynHandler<C> for H
where
    C: Send + 'static,
    H: Handler<C>,
{
    type Output = H::Output;

    fn run_dyn<'a>(
        &'a self,
        cx: C,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output, BoxError>> + Send + 'a>>
    where
        C: 'a,
    {
        Box::pin(self.run(cx))
    }
}
