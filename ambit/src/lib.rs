//! # ambit - Request-Scoped Execution Context Runtime
//!
//! `ambit` runs a unit of work (a "handler") with read-only access to an
//! immutable environment, a mutable state cell that survives failure, and a
//! registry of cleanup actions guaranteed to run exactly once on every exit
//! path. An optional builder context accumulates structured output while
//! keeping every capability of the plain context.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ambit::{BoxError, Context, Environment, Runner};
//!
//! struct RequestEnv { request_id: u64 }
//! impl Environment for RequestEnv {}
//!
//! let outcome = Runner::run(RequestEnv { request_id: 7 }, |cx: Context<RequestEnv>| async move {
//!     cx.state().write("seen", true);
//!     cx.cleanup().register(|| Ok(()))?;
//!     Ok::<_, BoxError>(cx.environment().request_id)
//! }).await;
//! ```
//!
//! ## Crates
//!
//! The public surface re-exports the split crates: `ambit-core` (primitive
//! types, traits, errors) and `ambit-std` (context, builder, runner).

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use ambit_core::{
    // Errors / outcome
    BoxError,
    // Capability interface
    Capabilities,
    CleanupAction,
    CleanupFailure,
    // Cleanup registry
    CleanupRegistry,
    CleanupToken,
    DynHandler,
    // Environment
    Environment,
    // Handler
    Handler,
    HandlerOutput,
    Outcome,
    RegistryError,
    RunError,
    // State
    StateCell,
    StateValue,
};

pub use ambit_std::{
    // Builder context
    BuilderContext,
    // Execution context
    Context,
    Fragment,
    MetadataEntry,
    OutputAccumulator,
    // Runner
    Runner,
    build_in,
};

// Test instrumentation (probes, scratch contexts)
pub use ambit_std::testing;
