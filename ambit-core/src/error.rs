//! Error types for Ambit.
//!
//! This module provides the failure taxonomy using `thiserror`:
//!
//! - [`RunError`] - Primary failure of a handler or builder execution
//! - [`CleanupFailure`] - Failure of a single cleanup action during drain
//! - [`RegistryError`] - Misuse of the cleanup registry

use std::any::Any;
use std::borrow::Cow;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The primary failure of an execution.
///
/// Exactly one `RunError` terminates a failed execution. Cleanup failures
/// are collected separately (see [`CleanupFailure`]) and never displace the
/// primary failure.
#[derive(Error, Debug)]
pub enum RunError {
    /// The handler or builder returned an error.
    #[error("handler failed: {0}")]
    Handler(#[source] BoxError),

    /// The handler or builder panicked during execution.
    #[error("handler panicked: {0}")]
    Panic(String),

    /// The execution was cancelled externally (client disconnect, timeout).
    #[error("execution cancelled")]
    Cancelled,
}

impl RunError {
    /// Wrap an arbitrary error as a handler failure.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        RunError::Handler(err.into())
    }

    /// Whether this failure came from external cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunError::Cancelled)
    }
}

/// Failure of a single cleanup action during drain.
///
/// Drain never stops at a failing action; every failure is collected into
/// the final [`Outcome`](crate::Outcome), even when the primary execution
/// succeeded.
#[derive(Debug)]
pub struct CleanupFailure {
    index: usize,
    label: Option<Cow<'static, str>>,
    source: BoxError,
}

impl std::fmt::Display for CleanupFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.label {
            Some(label) => write!(f, "cleanup action `{label}` failed: {}", self.source),
            None => write!(f, "cleanup action `#{}` failed: {}", self.index, self.source),
        }
    }
}

impl std::error::Error for CleanupFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl CleanupFailure {
    pub(crate) fn new(index: usize, label: Option<Cow<'static, str>>, source: BoxError) -> Self {
        Self {
            index,
            label,
            source,
        }
    }

    /// Registration index of the failed action.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Label given at registration, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Errors from misusing the cleanup registry.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// `register` was called from inside a draining action.
    #[error("cleanup registry is draining; late registration rejected")]
    Draining,

    /// `register` was called after the registry was drained.
    #[error("cleanup registry has already been drained")]
    Drained,
}

/// Extract a readable message from a panic payload.
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_failure_display_prefers_label() {
        let labeled = CleanupFailure::new(3, Some("db-checkin".into()), "boom".into());
        assert!(labeled.to_string().contains("`db-checkin`"));

        let unlabeled = CleanupFailure::new(3, None, "boom".into());
        assert!(unlabeled.to_string().contains("`#3`"));
    }

    #[test]
    fn panic_message_handles_common_payloads() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(42_u32)), "non-string panic payload");
    }
}
