//! # The Execution Context
//!
//! `Context<E>` is the unit of execution for a handler: one concrete struct
//! holding the environment, the state cell and the cleanup registry
//! directly, instead of stacking them as separate wrapper layers. Teardown
//! reasoning stays local to the runner that owns the context.
//!
//! # Sharing
//!
//! A `Context` is an `Arc`-backed handle: cloning is O(1) and every clone
//! addresses the same cells. Handlers receive a cloned handle and may pass
//! further clones into cleanup actions or nested builders; writes made
//! through any handle are visible through all of them.

use ambit_core::{Capabilities, CleanupFailure, CleanupRegistry, Environment, StateCell};
use std::sync::Arc;

struct ContextInner<E> {
    environment: E,
    state: StateCell,
    cleanup: CleanupRegistry,
}

/// The request-scoped execution context.
///
/// Created by a [`Runner`](crate::Runner) at request start and torn down by
/// it exactly once at request end; handler code never constructs or tears
/// down a context itself.
pub struct Context<E: Environment> {
    inner: Arc<ContextInner<E>>,
}

impl<E: Environment> Context<E> {
    pub(crate) fn new(environment: E) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                environment,
                state: StateCell::new(),
                cleanup: CleanupRegistry::new(),
            }),
        }
    }

    /// The immutable request environment.
    pub fn environment(&self) -> &E {
        &self.inner.environment
    }

    /// The mutable state cell of this request.
    pub fn state(&self) -> &StateCell {
        &self.inner.state
    }

    /// The cleanup registry of this request.
    pub fn cleanup(&self) -> &CleanupRegistry {
        &self.inner.cleanup
    }

    pub(crate) fn drain(&self) -> Vec<CleanupFailure> {
        self.inner.cleanup.drain()
    }
}

impl<E: Environment> Clone for Context<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Environment + std::fmt::Debug> std::fmt::Debug for Context<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("environment", &self.inner.environment)
            .field("state", &self.inner.state)
            .field("cleanup", &self.inner.cleanup)
            .finish()
    }
}

impl<E: Environment> Capabilities for Context<E> {
    type Env = E;

    fn environment(&self) -> &E {
        &self.inner.environment
    }

    fn state(&self) -> &StateCell {
        &self.inner.state
    }

    fn cleanup(&self) -> &CleanupRegistry {
        &self.inner.cleanup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_cells() {
        let cx = Context::new("env".to_string());
        let other = cx.clone();

        cx.state().write("seen", true);
        assert_eq!(other.state().get::<bool>("seen").as_deref(), Some(&true));

        other.cleanup().register(|| Ok(())).unwrap();
        assert_eq!(cx.cleanup().pending(), 1);
    }

    #[test]
    fn capability_interface_matches_inherent_accessors() {
        fn takes_caps<C: Capabilities>(caps: &C) -> usize {
            caps.state().write("via-trait", 9_u8);
            caps.state().len()
        }

        let cx = Context::new(());
        assert_eq!(takes_caps(&cx), 1);
        assert_eq!(cx.environment(), &());
    }
}
