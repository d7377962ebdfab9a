//! Environment trait for per-request immutable data.

/// A marker trait for immutable, request-scoped environment types.
///
/// The environment holds request metadata, application-wide shared handles
/// (connection pools, configuration) and is constructed once per request.
/// It is shared by reference for the lifetime of the request and never
/// mutated; cross-request resources it points at synchronize themselves.
///
/// # Example
///
/// ```rust,ignore
/// struct RequestEnv {
///     request_id: u64,
///     pool: PoolHandle,
/// }
///
/// impl Environment for RequestEnv {}
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Environment",
    label = "must be `Send + Sync + 'static`",
    note = "Request environments must be thread-safe and static."
)]
pub trait Environment: Send + Sync + 'static {}

// Common Environment implementations
impl Environment for () {}
impl Environment for String {}
impl Environment for &'static str {}
impl<T: Environment> Environment for Box<T> {}
impl<T: Environment> Environment for std::sync::Arc<T> {}
