//! Testing utilities for Ambit.
//!
//! This module provides utilities to make testing handlers, builders and
//! cleanup behavior easier.
//!
//! # Features
//!
//! - [`CleanupProbe`]: an ordered recorder of cleanup-action invocations
//! - [`scratch_context`] / [`scratch_builder`]: contexts detached from any
//!   runner, for unit-testing collaborators

use crate::builder::{BuilderContext, Fragment};
use crate::context::Context;
use ambit_core::{BoxError, Environment};
use std::sync::{Arc, Mutex, PoisonError};

/// Records cleanup-action invocations in the order they ran.
///
/// # Example
///
/// ```rust,ignore
/// let probe = CleanupProbe::new();
/// cx.cleanup().register_labeled("db", probe.action("db"))?;
/// cx.cleanup().register_labeled("tmp", probe.failing_action("tmp"))?;
/// // after teardown:
/// assert_eq!(probe.invoked(), vec!["tmp", "db"]);
/// ```
#[derive(Clone, Default)]
pub struct CleanupProbe {
    log: Arc<Mutex<Vec<String>>>,
}

impl CleanupProbe {
    /// Create an empty probe.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cleanup action that records `label` and succeeds.
    pub fn action(&self, label: &str) -> impl FnOnce() -> Result<(), BoxError> + Send + 'static {
        let log = Arc::clone(&self.log);
        let label = label.to_owned();
        move || {
            log.lock().unwrap_or_else(PoisonError::into_inner).push(label);
            Ok(())
        }
    }

    /// A cleanup action that records `label`, then fails.
    pub fn failing_action(
        &self,
        label: &str,
    ) -> impl FnOnce() -> Result<(), BoxError> + Send + 'static {
        let log = Arc::clone(&self.log);
        let label = label.to_owned();
        move || {
            log.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(label.clone());
            Err(format!("cleanup `{label}` deliberately failed").into())
        }
    }

    /// The labels recorded so far, in invocation order.
    pub fn invoked(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times `label` was recorded.
    pub fn count(&self, label: &str) -> usize {
        self.invoked().iter().filter(|l| *l == label).count()
    }
}

/// A context detached from any runner, for unit-testing collaborators.
///
/// The caller is responsible for draining the registry if the test
/// registers cleanups.
pub fn scratch_context<E: Environment>(environment: E) -> Context<E> {
    Context::new(environment)
}

/// A builder context over a fresh scratch context.
pub fn scratch_builder<E: Environment, F: Fragment>(environment: E) -> BuilderContext<E, F> {
    BuilderContext::new(Context::new(environment))
}
