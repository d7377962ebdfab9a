//! # Mutable Request State (StateCell)
//!
//! A single mutable slot holding handler-local state as a map of string
//! keys to opaque values (pending session writes, per-request annotations).
//!
//! # Durability
//!
//! Writes are visible to every subsequent read within the same context,
//! including through nested builder contexts, and are **not** rolled back
//! when the execution later fails. The cell is a plain mutable map, not a
//! transaction log; values written before a failure remain readable until
//! teardown (e.g. by cleanup actions).

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// An opaque value stored in a [`StateCell`].
///
/// Values are reference-counted so reads are cheap and never move data out
/// of the cell. Use [`StateCell::get`] to downcast to a concrete type.
pub type StateValue = std::sync::Arc<dyn Any + Send + Sync>;

/// The mutable state slot owned by a context.
///
/// One cell exists per context; at most one logical task touches it at a
/// time (one context per request), so the internal lock is uncontended.
/// [`StateCell::modify`] is still an atomic read-modify-write under that
/// lock, which keeps it correct if parallel sub-tasks ever share a context.
#[derive(Default)]
pub struct StateCell {
    slots: Mutex<HashMap<String, StateValue>>,
}

impl StateCell {
    /// Create an empty cell.
    pub fn new() -> Self {
        Self::default()
    }

    // A panic inside a `modify` closure must not wedge the cell: the
    // poisoned map still holds the latest writes, which must stay readable
    // until teardown.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, StateValue>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read the current value for `key`, or `None` if absent. Never fails.
    pub fn read(&self, key: &str) -> Option<StateValue> {
        self.lock().get(key).cloned()
    }

    /// Read and downcast the value for `key` to a concrete type.
    ///
    /// Returns `None` if the key is absent or holds a different type.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<std::sync::Arc<T>> {
        self.read(key)?.downcast::<T>().ok()
    }

    /// Write `value` for `key`, replacing any previous value.
    ///
    /// Visible to every subsequent read within the same context.
    pub fn write<V: Any + Send + Sync>(&self, key: impl Into<String>, value: V) {
        self.write_value(key, std::sync::Arc::new(value));
    }

    /// Write an already-wrapped [`StateValue`] for `key`.
    pub fn write_value(&self, key: impl Into<String>, value: StateValue) {
        self.lock().insert(key.into(), value);
    }

    /// Atomic read-modify-write for `key`.
    ///
    /// Equivalent to `write(key, f(read(key)))` observed as a single step.
    /// Returning `None` from `f` removes the key.
    pub fn modify<F>(&self, key: &str, f: F)
    where
        F: FnOnce(Option<StateValue>) -> Option<StateValue>,
    {
        let mut slots = self.lock();
        // The map is only mutated after `f` returns: a panicking closure
        // leaves the previous value in place.
        let current = slots.get(key).cloned();
        match f(current) {
            Some(next) => {
                slots.insert(key.to_owned(), next);
            }
            None => {
                slots.remove(key);
            }
        }
    }

    /// Remove and return the value for `key`, if any.
    pub fn remove(&self, key: &str) -> Option<StateValue> {
        self.lock().remove(key)
    }

    /// Whether `key` currently holds a value.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cell holds no keys.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl std::fmt::Debug for StateCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.lock();
        f.debug_struct("StateCell").field("keys", &slots.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn write_then_read_returns_value() {
        let cell = StateCell::new();
        cell.write("user", 42_u64);
        assert_eq!(cell.get::<u64>("user").as_deref(), Some(&42));
        assert!(cell.read("missing").is_none());
    }

    #[test]
    fn write_replaces_previous_value() {
        let cell = StateCell::new();
        cell.write("flash", "first".to_string());
        cell.write("flash", "second".to_string());
        assert_eq!(
            cell.get::<String>("flash").as_deref().map(String::as_str),
            Some("second")
        );
        assert_eq!(cell.len(), 1);
    }

    #[test]
    fn get_with_wrong_type_returns_none() {
        let cell = StateCell::new();
        cell.write("n", 1_i32);
        assert!(cell.get::<String>("n").is_none());
        assert!(cell.get::<i32>("n").is_some());
    }

    #[test]
    fn modify_updates_in_place() {
        let cell = StateCell::new();
        cell.write("count", 1_i32);
        cell.modify("count", |current| {
            let n = current
                .and_then(|v| v.downcast::<i32>().ok())
                .map_or(0, |v| *v);
            Some(Arc::new(n + 1))
        });
        assert_eq!(cell.get::<i32>("count").as_deref(), Some(&2));
    }

    #[test]
    fn modify_panic_preserves_prior_write() {
        let cell = StateCell::new();
        cell.write("session.visits", 3_u32);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cell.modify("session.visits", |_| panic!("annotation step failed"));
        }));
        assert!(result.is_err());

        // The value written before the panicking modify is still readable.
        assert_eq!(cell.get::<u32>("session.visits").as_deref(), Some(&3));
        cell.write("session.visits", 4_u32);
        assert_eq!(cell.get::<u32>("session.visits").as_deref(), Some(&4));
    }

    #[test]
    fn modify_returning_none_removes_key() {
        let cell = StateCell::new();
        cell.write("tmp", ());
        cell.modify("tmp", |_| None);
        assert!(!cell.contains("tmp"));
        assert!(cell.is_empty());
    }

    #[test]
    fn remove_returns_value() {
        let cell = StateCell::new();
        cell.write("x", 7_u8);
        let removed = cell.remove("x").and_then(|v| v.downcast::<u8>().ok());
        assert_eq!(removed.as_deref(), Some(&7));
        assert!(cell.remove("x").is_none());
    }
}
