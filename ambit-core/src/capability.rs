//! # The Capability Interface
//!
//! The one interface every collaborator programs against: read-only access
//! to the environment, the mutable state cell, and the cleanup registry.
//!
//! Both the plain execution context and the output-accumulating builder
//! context implement `Capabilities`, so code written against this trait
//! runs unchanged in either mode; no explicit conversion between the two
//! is ever needed.

use crate::cleanup::CleanupRegistry;
use crate::environment::Environment;
use crate::state::StateCell;

/// Access to the capability set of a request-scoped context.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not expose request capabilities",
    label = "missing `Capabilities` implementation",
    note = "Implement `Capabilities` to grant access to environment, state and cleanup."
)]
pub trait Capabilities: Send + Sync {
    /// The immutable per-request environment type.
    type Env: Environment;

    /// The request environment. Total and side-effect-free; returns the
    /// same value for the lifetime of the context.
    fn environment(&self) -> &Self::Env;

    /// The mutable state cell of the request.
    fn state(&self) -> &StateCell;

    /// The cleanup registry of the request.
    fn cleanup(&self) -> &CleanupRegistry;
}

impl<C: Capabilities> Capabilities for &C {
    type Env = C::Env;

    fn environment(&self) -> &Self::Env {
        (**self).environment()
    }

    fn state(&self) -> &StateCell {
        (**self).state()
    }

    fn cleanup(&self) -> &CleanupRegistry {
        (**self).cleanup()
    }
}
