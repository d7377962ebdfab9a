//! # Guaranteed Finalization (CleanupRegistry)
//!
//! An ordered collection of zero-argument cleanup actions, appended to
//! during execution and drained exactly once at context teardown, on
//! success, failure, panic and cancellation alike.
//!
//! # Invariants
//!
//! - Every still-registered action runs **exactly once** during drain.
//! - Drain runs actions in **reverse registration order** (release mirrors
//!   acquisition).
//! - A failing or panicking action never prevents later actions from
//!   running; its failure is collected as a [`CleanupFailure`].
//! - Registration from inside a draining action is rejected with
//!   [`RegistryError::Draining`].

use crate::error::{BoxError, CleanupFailure, RegistryError, panic_message};
use std::borrow::Cow;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A boxed cleanup action.
pub type CleanupAction = Box<dyn FnOnce() -> Result<(), BoxError> + Send + 'static>;

/// A token identifying a registered action, permitting cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupToken {
    index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Open,
    Draining,
    Drained,
}

struct Slot {
    label: Option<Cow<'static, str>>,
    action: CleanupAction,
}

struct Inner {
    slots: Vec<Option<Slot>>,
    phase: Phase,
}

/// The ordered cleanup-action registry owned by a context.
///
/// Handlers register checkout/release pairs, temporary-state erasure and
/// similar finalizers here instead of relying on unwind paths; the owning
/// runner drains the registry on every exit path.
pub struct CleanupRegistry {
    inner: Mutex<Inner>,
}

impl CleanupRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                slots: Vec::new(),
                phase: Phase::Open,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `action` to the registry.
    ///
    /// The returned token permits cancellation before drain begins.
    ///
    /// # Errors
    ///
    /// Fails fast with [`RegistryError::Draining`] or
    /// [`RegistryError::Drained`] when registration arrives after teardown
    /// has begun.
    pub fn register<A>(&self, action: A) -> Result<CleanupToken, RegistryError>
    where
        A: FnOnce() -> Result<(), BoxError> + Send + 'static,
    {
        self.push(None, Box::new(action))
    }

    /// Append a labeled `action`; the label names the action in any
    /// [`CleanupFailure`] it produces.
    pub fn register_labeled<A>(
        &self,
        label: impl Into<Cow<'static, str>>,
        action: A,
    ) -> Result<CleanupToken, RegistryError>
    where
        A: FnOnce() -> Result<(), BoxError> + Send + 'static,
    {
        self.push(Some(label.into()), Box::new(action))
    }

    fn push(
        &self,
        label: Option<Cow<'static, str>>,
        action: CleanupAction,
    ) -> Result<CleanupToken, RegistryError> {
        let mut inner = self.lock();
        match inner.phase {
            Phase::Open => {}
            Phase::Draining => return Err(RegistryError::Draining),
            Phase::Drained => return Err(RegistryError::Drained),
        }
        let index = inner.slots.len();
        inner.slots.push(Some(Slot { label, action }));
        Ok(CleanupToken { index })
    }

    /// Remove a not-yet-run action.
    ///
    /// Returns `true` iff the action was still pending; once drain has
    /// begun, cancellation has no effect and returns `false`.
    pub fn cancel(&self, token: CleanupToken) -> bool {
        let mut inner = self.lock();
        if inner.phase != Phase::Open {
            return false;
        }
        inner
            .slots
            .get_mut(token.index)
            .and_then(Option::take)
            .is_some()
    }

    /// Number of actions still pending.
    pub fn pending(&self) -> usize {
        self.lock().slots.iter().flatten().count()
    }

    /// Invoke every still-registered action, in reverse registration order.
    ///
    /// Called exactly once by the owning runner at context teardown. Each
    /// action's failure (an `Err` return or a panic) is caught and
    /// collected; later actions still run. A second call is a no-op that
    /// returns no failures.
    pub fn drain(&self) -> Vec<CleanupFailure> {
        let slots = {
            let mut inner = self.lock();
            if inner.phase != Phase::Open {
                return Vec::new();
            }
            inner.phase = Phase::Draining;
            std::mem::take(&mut inner.slots)
        };

        let mut failures = Vec::new();
        for (index, slot) in slots.into_iter().enumerate().rev() {
            let Some(slot) = slot else { continue };
            let outcome = catch_unwind(AssertUnwindSafe(slot.action));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(source)) => {
                    failures.push(CleanupFailure::new(index, slot.label, source));
                }
                Err(payload) => {
                    let message = format!("cleanup panicked: {}", panic_message(payload));
                    failures.push(CleanupFailure::new(index, slot.label, message.into()));
                }
            }
        }

        self.lock().phase = Phase::Drained;
        failures
    }
}

impl Default for CleanupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CleanupRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("CleanupRegistry")
            .field("pending", &inner.slots.iter().flatten().count())
            .field("phase", &inner.phase)
            .finish()
    }
}
