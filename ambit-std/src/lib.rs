//! # ambit-std
//!
//! Standard runtime implementations for the Ambit execution framework:
//! the concrete [`Context`], the output-accumulating [`BuilderContext`],
//! and the [`Runner`] that guarantees teardown on every exit path.
//!
//! Core traits and primitive types ([`Capabilities`](ambit_core::Capabilities),
//! [`StateCell`](ambit_core::StateCell),
//! [`CleanupRegistry`](ambit_core::CleanupRegistry), error taxonomy) live in
//! `ambit-core`; collaborators that only consume contexts can depend on
//! that crate alone.
//!
//! # Optional Features
//!
//! - `tracing`: structured log events from the runner's teardown path
//! - `timeout`: `Runner::run_with_timeout` backed by `tokio::time`

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod builder;
mod context;
mod runner;
pub mod testing;

pub use builder::{BuilderContext, Fragment, MetadataEntry, OutputAccumulator};
pub use context::Context;
pub use runner::{Runner, build_in};
