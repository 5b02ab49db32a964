//! Disposal traits for resource cleanup.

/// Trait for synchronous resource disposal.
///
/// Implement this for services that need structured teardown (flushing a
/// buffer, closing a connection). The container only calls it for services
/// whose descriptor opted in with
/// [`ServiceDescriptor::disposable`](crate::ServiceDescriptor::disposable) or
/// that were registered through
/// [`ServiceContainer::register_disposable`](crate::ServiceContainer::register_disposable).
///
/// # Examples
///
/// ```
/// use pulse_di::{Dispose, Lifetime, Resolver, ServiceContainer};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// struct DbSession {
///     closed: AtomicBool,
/// }
///
/// impl Dispose for DbSession {
///     fn dispose(&self) {
///         self.closed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let container = ServiceContainer::new();
/// container
///     .register_disposable(Lifetime::Scoped, |()| {
///         Arc::new(DbSession { closed: AtomicBool::new(false) })
///     })
///     .unwrap();
///
/// let scope = container.create_scope();
/// let session = scope.get_required::<DbSession>();
/// scope.dispose();
/// assert!(session.closed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}

/// Trait for asynchronous resource disposal.
///
/// `dispose_async` awaits these hooks. The synchronous `dispose` spawns them on
/// the current tokio runtime, or drops them with a warning when there is none.
/// Async hooks run before sync hooks, each group LIFO.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use pulse_di::{AsyncDispose, Lifetime, Resolver, ServiceContainer, ServiceDescriptor};
/// use std::sync::Arc;
///
/// struct HttpClient;
///
/// #[async_trait]
/// impl AsyncDispose for HttpClient {
///     async fn dispose(&self) {
///         // drain pooled connections
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let container = ServiceContainer::new();
/// container
///     .register(
///         ServiceDescriptor::factory(Lifetime::Singleton, |()| Arc::new(HttpClient))
///             .async_disposable::<HttpClient>(),
///     )
///     .unwrap();
///
/// let _client = container.get_required::<HttpClient>();
/// container.dispose_async().await;
/// # }
/// ```
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    /// Perform asynchronous cleanup of resources.
    async fn dispose(&self);
}
