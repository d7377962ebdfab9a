//! # ambit-core
//!
//! Core types and traits for the Ambit request-scoped execution runtime.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! collaborators (routing, templating, persistence) that don't need the
//! full `ambit-std` runtime.
//!
//! # Component Stack
//!
//! Ambit flattens what would otherwise be independently layered effect
//! abstractions (reader, writer, mutable state, resource tracking) into a
//! small stack of concrete components, leaves first:
//!
//! ## [`Environment`]
//!
//! Immutable, request-scoped configuration and request data. Constructed
//! once per request, shared by reference, never mutated.
//!
//! ## [`StateCell`]
//!
//! A single mutable slot of keyed, opaque values. Writes survive handler
//! failure: the cell is a plain mutable map, not a rollback construct.
//!
//! ## [`CleanupRegistry`]
//!
//! An ordered list of cleanup actions drained exactly once at context
//! teardown, on every exit path. Failures during drain are collected, never
//! dropped, and never stop later actions.
//!
//! ## [`Capabilities`]
//!
//! The shared interface over {environment, state, cleanup} that both the
//! plain context and the output-accumulating builder context satisfy, so
//! collaborator code runs unchanged in either mode.
//!
//! ## [`Handler`]
//!
//! The unit of work a runner drives to completion, generic over the
//! context type it receives. A plain handler is a degenerate builder.
//!
//! # Error Types
//!
//! - [`RunError`] - Primary failure of an execution
//! - [`CleanupFailure`] - A cleanup action's failure during drain
//! - [`RegistryError`] - Cleanup registry misuse
//! - [`Outcome`] - The aggregated terminal result

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod capability;
mod cleanup;
mod environment;
mod error;
mod handler;
mod outcome;
mod state;

// Re-exports
pub use capability::Capabilities;
pub use cleanup::{CleanupAction, CleanupRegistry, CleanupToken};
pub use environment::Environment;
pub use error::{BoxError, CleanupFailure, RegistryError, RunError, panic_message};
pub use handler::{DynHandler, Handler, HandlerOutput};
pub use outcome::Outcome;
pub use state::{StateCell, StateValue};
