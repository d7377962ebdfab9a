//! # Output Accumulation (BuilderContext)
//!
//! A builder is a unit of output-producing work. `BuilderContext<E, F>`
//! wraps a [`Context`] and adds an ordered output accumulator plus a
//! merge-commutative metadata side channel, while still exposing every
//! capability of the wrapped context.
//!
//! Rather than layering an accumulation abstraction on top of a
//! state/cleanup abstraction and converting between the two at every call
//! site, the builder context *delegates*: state writes and cleanup
//! registrations made from inside a builder land in the enclosing context,
//! and a builder can drop into a plain handler at any point via
//! [`BuilderContext::run_as_handler`]. A plain handler is simply a
//! degenerate builder with no accumulator.
//!
//! Fragments are opaque to this module; their structure (markup, script,
//! style) is the concern of the templating collaborator.

use crate::context::Context;
use ambit_core::{
    BoxError, Capabilities, CleanupRegistry, Environment, Handler, StateCell,
};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A marker trait for output fragment types.
///
/// Fragments are treated as opaque ordered payload; any `Send + 'static`
/// type qualifies by implementing this marker.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Fragment",
    label = "must be `Send + 'static`",
    note = "Output fragments must be thread-safe and static."
)]
pub trait Fragment: Send + 'static {}

// Common Fragment implementations
impl Fragment for String {}
impl Fragment for &'static str {}
impl Fragment for Cow<'static, str> {}
impl Fragment for Vec<u8> {}
impl<T: Fragment> Fragment for Box<T> {}
impl<T: Fragment + Sync> Fragment for Arc<T> {}

/// A side-channel metadata entry, deduplicated by identity.
///
/// Typical use is "required asset" records emitted while building output,
/// e.g. `MetadataEntry::new("stylesheet", "/css/forms.css")`: merging the
/// same entry twice collapses to one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetadataEntry {
    kind: Cow<'static, str>,
    value: Cow<'static, str>,
}

impl MetadataEntry {
    /// Create an entry from a kind and a value.
    pub fn new(kind: impl Into<Cow<'static, str>>, value: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// The entry kind (e.g. `"stylesheet"`).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The entry value (e.g. an asset path).
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// The output accumulated by one builder execution.
///
/// An ordered sequence of opaque fragments plus a set of metadata entries
/// with idempotent-merge semantics. Append-only while the builder runs;
/// returned by value (finalized, read-only) once the builder completes.
#[derive(Debug)]
pub struct OutputAccumulator<F: Fragment> {
    fragments: Vec<F>,
    metadata: BTreeSet<MetadataEntry>,
}

impl<F: Fragment> OutputAccumulator<F> {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self {
            fragments: Vec::new(),
            metadata: BTreeSet::new(),
        }
    }

    /// Append a fragment to the ordered sequence.
    pub fn push(&mut self, fragment: F) {
        self.fragments.push(fragment);
    }

    /// Insert a metadata entry; duplicates collapse.
    ///
    /// Returns `true` iff the entry was not already present.
    pub fn merge_metadata(&mut self, entry: MetadataEntry) -> bool {
        self.metadata.insert(entry)
    }

    /// Merge another accumulator into this one: its fragments are appended
    /// in order, its metadata unioned.
    pub fn absorb(&mut self, other: OutputAccumulator<F>) {
        self.fragments.extend(other.fragments);
        self.metadata.extend(other.metadata);
    }

    /// The accumulated fragments, in append order.
    pub fn fragments(&self) -> &[F] {
        &self.fragments
    }

    /// The merged metadata entries, in stable order.
    pub fn metadata(&self) -> impl Iterator<Item = &MetadataEntry> {
        self.metadata.iter()
    }

    /// Number of merged metadata entries.
    pub fn metadata_len(&self) -> usize {
        self.metadata.len()
    }

    /// Consume the accumulator, returning the fragment sequence.
    pub fn into_fragments(self) -> Vec<F> {
        self.fragments
    }

    /// Whether no fragments and no metadata have been accumulated.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.metadata.is_empty()
    }
}

impl<F: Fragment> Default for OutputAccumulator<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`Context`] extended with an output accumulator.
///
/// Cloning is O(1); clones share both the underlying context and the
/// accumulator, so a builder may hand clones to helper functions and every
/// append lands in the same ordered sequence.
pub struct BuilderContext<E: Environment, F: Fragment> {
    context: Context<E>,
    output: Arc<Mutex<OutputAccumulator<F>>>,
}

impl<E: Environment, F: Fragment> BuilderContext<E, F> {
    pub(crate) fn new(context: Context<E>) -> Self {
        Self {
            context,
            output: Arc::new(Mutex::new(OutputAccumulator::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, OutputAccumulator<F>> {
        self.output.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The wrapped execution context.
    pub fn context(&self) -> &Context<E> {
        &self.context
    }

    /// The immutable request environment.
    pub fn environment(&self) -> &E {
        self.context.environment()
    }

    /// The state cell of the wrapped context. Writes made here are visible
    /// to the enclosing context and vice versa.
    pub fn state(&self) -> &StateCell {
        self.context.state()
    }

    /// The cleanup registry of the wrapped context.
    pub fn cleanup(&self) -> &CleanupRegistry {
        self.context.cleanup()
    }

    /// Append a fragment to the ordered output sequence. Never fails.
    pub fn append(&self, fragment: F) {
        self.lock().push(fragment);
    }

    /// Insert a metadata entry into the side channel; duplicates collapse.
    ///
    /// Returns `true` iff the entry was not already present.
    pub fn merge_metadata(&self, entry: MetadataEntry) -> bool {
        self.lock().merge_metadata(entry)
    }

    /// Merge a nested builder's finalized output into this accumulator.
    pub fn absorb(&self, child: OutputAccumulator<F>) {
        self.lock().absorb(child);
    }

    /// Execute a plain handler against the wrapped context.
    ///
    /// This is the explicit lift bridging the accumulating context down to
    /// the plain handler context: the handler gets the full capability set
    /// (state, cleanup, environment) and its result is returned directly.
    /// Callable any number of times; each call completes before the builder
    /// continues.
    ///
    /// Deliberately not an `async fn`: the returned future must not capture
    /// `&self`'s lifetime, otherwise proving `Send` for an enclosing handler
    /// closure trips a higher-ranked lifetime error (E0308 "one type is more
    /// general than the other").
    pub fn run_as_handler<H>(
        &self,
        handler: H,
    ) -> impl Future<Output = Result<H::Output, BoxError>> + Send + use<E, F, H>
    where
        H: Handler<Context<E>>,
    {
        let context = self.context.clone();
        async move { handler.run(context).await }
    }

    /// Execute a nested builder over the **same underlying context** with a
    /// fresh accumulator.
    ///
    /// State writes and cleanup registrations made by the nested builder
    /// land in the shared context, so nesting composes without isolation
    /// leaks. The nested output is returned for the caller to
    /// [`absorb`](Self::absorb) or discard.
    ///
    /// Deliberately not an `async fn`, for the same lifetime-capture reason
    /// as [`run_as_handler`](Self::run_as_handler).
    pub fn run_builder<H>(
        &self,
        builder: H,
    ) -> impl Future<Output = Result<(H::Output, OutputAccumulator<F>), BoxError>> + Send + use<E, F, H>
    where
        H: Handler<BuilderContext<E, F>>,
    {
        let context = self.context.clone();
        async move {
            let child = BuilderContext::new(context);
            let value = builder.run(child.clone()).await?;
            Ok((value, child.finish()))
        }
    }

    /// Finalize the accumulator.
    ///
    /// If a straggler clone survives (e.g. stashed in a cleanup action),
    /// the contents are moved out and the straggler sees an empty,
    /// no-longer-meaningful accumulator.
    pub(crate) fn finish(self) -> OutputAccumulator<F> {
        match Arc::try_unwrap(self.output) {
            Ok(exclusive) => exclusive
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner),
            Err(shared) => std::mem::take(
                &mut *shared.lock().unwrap_or_else(PoisonError::into_inner),
            ),
        }
    }
}

impl<E: Environment, F: Fragment> Clone for BuilderContext<E, F> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            output: Arc::clone(&self.output),
        }
    }
}

impl<E: Environment, F: Fragment> Capabilities for BuilderContext<E, F> {
    type Env = E;

    fn environment(&self) -> &E {
        self.context.environment()
    }

    fn state(&self) -> &StateCell {
        self.context.state()
    }

    fn cleanup(&self) -> &CleanupRegistry {
        self.context.cleanup()
    }
}
