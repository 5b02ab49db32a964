//! Scopes and the context used while resolving dependencies.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::container::ServiceContainer;
use crate::error::{DiError, DiResult};
use crate::internal::{AnyArc, BoxFuture, DisposeBag, DisposeState, Hook, InstanceSlot, SlotMap};
use crate::key::ServiceKey;
use crate::traits::{Resolver, ResolverCore};

mod context;
pub(crate) mod lifecycle;

pub use context::ResolverContext;

/// A scope: one logical unit of work, typically one request.
///
/// Holds the scoped instances built through it and their disposal hooks.
/// Singletons and transients are delegated to the container. Clones share the
/// same scope; [`create_scope`](Self::create_scope) creates an independent one.
///
/// # Examples
///
/// ```
/// use pulse_di::{Resolver, ServiceContainer};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// struct DbSession(usize);
///
/// let opened = Arc::new(AtomicUsize::new(0));
/// let counter = opened.clone();
///
/// let container = ServiceContainer::new();
/// container
///     .register_scoped(move |()| Arc::new(DbSession(counter.fetch_add(1, Ordering::SeqCst))))
///     .unwrap();
///
/// let s1 = container.create_scope();
/// let a = s1.get_service::<DbSession>().unwrap();
/// let b = s1.get_service::<DbSession>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// let s2 = s1.create_scope();
/// let c = s2.get_service::<DbSession>().unwrap();
/// assert!(!Arc::ptr_eq(&a, &c));
/// assert_eq!(opened.load(Ordering::SeqCst), 2);
///
/// s1.dispose();
/// s1.dispose(); // no-op
/// assert!(s1.get_service::<DbSession>().is_err());
/// ```
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    container: ServiceContainer,
    id: u64,
    parent: Option<u64>,
    instances: SlotMap,
    disposal: DisposeState,
}

impl ServiceProvider {
    pub(crate) fn new(container: ServiceContainer, parent: Option<u64>) -> Self {
        let id = container.next_scope_id();
        debug!(scope = id, parent, "scope created");
        Self {
            inner: Arc::new(ScopeInner {
                container,
                id,
                parent,
                instances: SlotMap::default(),
                disposal: DisposeState::default(),
            }),
        }
    }

    /// Scope identifier, unique within its container.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Identifier of the scope this one was created from, if any.
    pub fn parent_id(&self) -> Option<u64> {
        self.inner.parent
    }

    /// The owning container.
    pub fn container(&self) -> &ServiceContainer {
        &self.inner.container
    }

    /// Creates a nested scope sharing the container but with its own scoped
    /// cache. Disposing either scope does not affect the other.
    pub fn create_scope(&self) -> ServiceProvider {
        ServiceProvider::new(self.inner.container.clone(), Some(self.inner.id))
    }

    /// Resolves `T` from this scope.
    pub fn get_service<T>(&self) -> DiResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get::<T>()
    }

    /// Resolves `T` from this scope, panicking on failure.
    pub fn get_required_service<T>(&self) -> Arc<T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_required::<T>()
    }

    /// Resolves `T` from this scope on the asynchronous path.
    pub fn get_service_async<T>(&self) -> BoxFuture<'static, DiResult<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_async::<T>()
    }

    /// Number of scoped instances currently cached.
    pub fn scoped_count(&self) -> usize {
        self.inner.instances.len()
    }

    /// Number of disposal hooks waiting for this scope to end.
    pub fn pending_disposers(&self) -> usize {
        self.inner.disposal.pending()
    }

    /// Whether [`dispose`](Self::dispose) or
    /// [`dispose_async`](Self::dispose_async) has started.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposal.is_disposed()
    }

    /// Disposes the scope without awaiting.
    ///
    /// Sync hooks run LIFO and the scoped cache is cleared. Async hooks are
    /// spawned on the current tokio runtime; without one they are dropped
    /// with a warning. Calling it again is a no-op.
    pub fn dispose(&self) {
        if let Some(bag) = self.inner.disposal.begin() {
            self.inner.finish_detached(bag);
        }
    }

    /// Disposes the scope: async hooks, then sync hooks, each LIFO. Calling it
    /// again is a no-op.
    pub async fn dispose_async(&self) {
        let Some(bag) = self.inner.disposal.begin() else {
            return;
        };
        let hooks = bag.len();
        bag.run_all().await;
        self.inner.instances.clear();
        debug!(scope = self.inner.id, hooks, "scope disposed");
    }

    /// Scoped cache slot for `key`.
    pub(crate) fn slot(&self, key: ServiceKey) -> DiResult<Arc<InstanceSlot>> {
        self.ensure_live(key)?;
        Ok(self.inner.instances.slot(key))
    }

    pub(crate) fn track(&self, hook: Hook) {
        self.inner.disposal.push(hook);
    }

    fn ensure_live(&self, key: ServiceKey) -> DiResult<()> {
        if self.is_disposed() {
            return Err(DiError::ScopeDisposed(key));
        }
        Ok(())
    }
}

impl ScopeInner {
    fn finish_detached(&self, bag: DisposeBag) {
        let hooks = bag.len();
        let dropped = bag.run_detached();
        if dropped > 0 {
            warn!(
                scope = self.id,
                dropped, "async disposers dropped: no tokio runtime to run them on"
            );
        }
        self.instances.clear();
        debug!(scope = self.id, hooks, "scope disposed");
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        let Some(bag) = self.disposal.begin() else {
            return;
        };
        if bag.is_empty() {
            return;
        }
        if self.container.options().warn_on_undisposed {
            warn!(
                scope = self.id,
                pending = bag.len(),
                "scope dropped without being disposed"
            );
        }
        self.finish_detached(bag);
    }
}

impl ResolverCore for ServiceProvider {
    fn resolve_any(&self, key: ServiceKey) -> DiResult<AnyArc> {
        self.ensure_live(key)?;
        let ctx = ResolverContext::root(self.inner.container.clone(), Some(self.clone()));
        self.inner.container.resolve_in(&ctx, key)
    }

    fn resolve_any_async(&self, key: ServiceKey) -> BoxFuture<'static, DiResult<AnyArc>> {
        if let Err(err) = self.ensure_live(key) {
            return Box::pin(async move { Err(err) });
        }
        let ctx = ResolverContext::root(self.inner.container.clone(), Some(self.clone()));
        self.inner.container.resolve_in_async(ctx, key)
    }
}

impl std::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("id", &self.inner.id)
            .field("parent", &self.inner.parent)
            .field("scoped", &self.inner.instances.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
