//! Terminal result of an execution.

use crate::error::{CleanupFailure, RunError};

/// The terminal, caller-visible result of running a handler or builder.
///
/// An `Outcome` carries two independent pieces of information:
///
/// 1. the primary result: the handler's value, or the single [`RunError`]
///    that terminated it, and
/// 2. every [`CleanupFailure`] collected while draining the cleanup
///    registry at teardown.
///
/// Cleanup failures attach even to a successful primary result; they are
/// never silently dropped and never displace the primary result. Transport
/// collaborators consume the `Outcome` to produce a response.
#[derive(Debug)]
pub struct Outcome<T> {
    result: Result<T, RunError>,
    cleanup_failures: Vec<CleanupFailure>,
}

impl<T> Outcome<T> {
    /// A successful outcome with no cleanup failures.
    pub fn success(value: T) -> Self {
        Self {
            result: Ok(value),
            cleanup_failures: Vec::new(),
        }
    }

    /// A failed outcome with no cleanup failures.
    pub fn failure(error: RunError) -> Self {
        Self {
            result: Err(error),
            cleanup_failures: Vec::new(),
        }
    }

    /// Attach the cleanup failures collected at teardown.
    pub fn with_cleanup_failures(mut self, failures: Vec<CleanupFailure>) -> Self {
        self.cleanup_failures = failures;
        self
    }

    /// Whether the primary execution completed with a value.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Whether the primary execution succeeded *and* teardown was clean.
    pub fn is_clean(&self) -> bool {
        self.result.is_ok() && self.cleanup_failures.is_empty()
    }

    /// Borrow the primary result.
    pub fn result(&self) -> Result<&T, &RunError> {
        self.result.as_ref()
    }

    /// The cleanup failures collected at teardown, in drain order.
    pub fn cleanup_failures(&self) -> &[CleanupFailure] {
        &self.cleanup_failures
    }

    /// Split into the primary result and the cleanup failures.
    pub fn into_parts(self) -> (Result<T, RunError>, Vec<CleanupFailure>) {
        (self.result, self.cleanup_failures)
    }

    /// The primary result, discarding cleanup failures.
    pub fn into_result(self) -> Result<T, RunError> {
        self.result
    }

    /// Map the success value, keeping failures intact.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            result: self.result.map(f),
            cleanup_failures: self.cleanup_failures,
        }
    }
}
