//! Guaranteed-release scope helpers.

use std::future::Future;

use crate::container::ServiceContainer;
use crate::provider::ServiceProvider;

/// Disposes its scope when dropped, unless [`finish`](Self::finish) took it
/// first. Covers panics and dropped futures.
pub(crate) struct ScopeGuard {
    scope: Option<ServiceProvider>,
}

impl ScopeGuard {
    pub(crate) fn new(scope: ServiceProvider) -> Self {
        Self { scope: Some(scope) }
    }

    /// Disarms the guard and hands the scope back for an orderly dispose.
    pub(crate) fn finish(mut self) -> Option<ServiceProvider> {
        self.scope.take()
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if let Some(scope) = self.scope.take() {
            scope.dispose();
        }
    }
}

impl ServiceContainer {
    /// Runs `f` inside a fresh scope and disposes the scope on every exit
    /// path, including panics.
    ///
    /// Async disposers of the scope are handed to the current tokio runtime
    /// when one is available.
    ///
    /// # Examples
    ///
    /// ```
    /// use pulse_di::{Dispose, Lifetime, Resolver, ServiceContainer};
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// static CLOSED: AtomicUsize = AtomicUsize::new(0);
    ///
    /// struct DbSession;
    /// impl Dispose for DbSession {
    ///     fn dispose(&self) {
    ///         CLOSED.fetch_add(1, Ordering::SeqCst);
    ///     }
    /// }
    ///
    /// let container = ServiceContainer::new();
    /// container.register_disposable(Lifetime::Scoped, |()| Arc::new(DbSession)).unwrap();
    ///
    /// let count = container.with_scope(|scope| {
    ///     let _session = scope.get_required::<DbSession>();
    ///     scope.scoped_count()
    /// });
    /// assert_eq!(count, 1);
    /// assert_eq!(CLOSED.load(Ordering::SeqCst), 1);
    /// ```
    pub fn with_scope<R>(&self, f: impl FnOnce(&ServiceProvider) -> R) -> R {
        let scope = self.create_scope();
        let _guard = ScopeGuard::new(scope.clone());
        f(&scope)
    }

    /// Async counterpart of [`with_scope`](Self::with_scope).
    ///
    /// The scope is disposed with the async path after `f` completes. If the
    /// returned future is dropped early, the scope is still disposed and its
    /// async disposers run on the current tokio runtime.
    ///
    /// # Examples
    ///
    /// ```
    /// use pulse_di::{Resolver, ServiceContainer};
    /// use std::sync::Arc;
    ///
    /// struct DbSession;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let container = ServiceContainer::new();
    /// container.register_scoped(|()| Arc::new(DbSession)).unwrap();
    ///
    /// let scope_id = container
    ///     .using_scope(|scope| async move {
    ///         let _session = scope.get_async::<DbSession>().await.unwrap();
    ///         scope.id()
    ///     })
    ///     .await;
    /// assert!(scope_id > 0);
    /// # }
    /// ```
    pub async fn using_scope<F, Fut, R>(&self, f: F) -> R
    where
        F: FnOnce(ServiceProvider) -> Fut,
        Fut: Future<Output = R>,
    {
        let scope = self.create_scope();
        let guard = ScopeGuard::new(scope.clone());
        let out = f(scope).await;
        if let Some(scope) = guard.finish() {
            scope.dispose_async().await;
        }
        out
    }
}
