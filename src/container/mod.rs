//! The root service container.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::descriptors::ServiceDescriptor;
use crate::error::{DiError, DiResult};
use crate::internal::{AnyArc, BoxFuture, DisposeState, SlotMap};
use crate::key::ServiceKey;
use crate::options::ContainerOptions;
use crate::provider::{ResolverContext, ServiceProvider};
use crate::traits::ResolverCore;

mod registration;
mod resolve;

/// Root registry and resolver.
///
/// Holds every descriptor, the singleton cache and the singleton disposal
/// hooks. Handles are cheap to clone and share the same container; build one
/// at startup and pass it down explicitly.
///
/// Resolving directly from the container has no scope, so scoped services
/// fail with [`DiError::NoActiveScope`]. Use [`create_scope`](Self::create_scope),
/// [`with_scope`](Self::with_scope) or [`using_scope`](Self::using_scope)
/// for those.
///
/// # Examples
///
/// ```
/// use pulse_di::{DiError, Resolver, ServiceContainer};
/// use std::sync::Arc;
///
/// struct Logger;
/// struct DbSession;
/// struct WorkoutService {
///     logger: Arc<Logger>,
///     session: Arc<DbSession>,
/// }
///
/// let container = ServiceContainer::new();
/// container
///     .register_singleton(|()| Arc::new(Logger))
///     .unwrap()
///     .register_scoped(|()| Arc::new(DbSession))
///     .unwrap()
///     .register_transient(|(logger, session): (Arc<Logger>, Arc<DbSession>)| {
///         Arc::new(WorkoutService { logger, session })
///     })
///     .unwrap();
///
/// assert!(matches!(
///     container.get::<WorkoutService>(),
///     Err(DiError::NoActiveScope(_))
/// ));
///
/// let scope = container.create_scope();
/// let service = scope.get_required::<WorkoutService>();
/// assert!(Arc::ptr_eq(&service.logger, &container.get_required::<Logger>()));
/// assert!(Arc::ptr_eq(&service.session, &scope.get_required::<DbSession>()));
/// ```
#[derive(Clone)]
pub struct ServiceContainer {
    inner: Arc<ContainerInner>,
}

struct ContainerInner {
    registry: RwLock<Registry>,
    resolved: Mutex<HashSet<ServiceKey>>,
    singletons: SlotMap,
    disposal: DisposeState,
    options: ContainerOptions,
    next_scope: AtomicU64,
}

/// Descriptors by key, plus first-registration order for introspection.
#[derive(Default)]
struct Registry {
    descriptors: HashMap<ServiceKey, ServiceDescriptor>,
    order: Vec<ServiceKey>,
}

impl Registry {
    /// Inserts or replaces. Returns whether a descriptor was replaced.
    fn insert(&mut self, descriptor: ServiceDescriptor) -> bool {
        let key = descriptor.key();
        let replaced = self.descriptors.insert(key, descriptor).is_some();
        if !replaced {
            self.order.push(key);
        }
        replaced
    }
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceContainer {
    /// Creates an empty container with default options.
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    /// Creates an empty container.
    pub fn with_options(options: ContainerOptions) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                registry: RwLock::new(Registry::default()),
                resolved: Mutex::new(HashSet::new()),
                singletons: SlotMap::default(),
                disposal: DisposeState::default(),
                options,
                next_scope: AtomicU64::new(1),
            }),
        }
    }

    /// Options this container was built with.
    pub fn options(&self) -> &ContainerOptions {
        &self.inner.options
    }

    /// Creates a new scope with an empty scoped cache.
    pub fn create_scope(&self) -> ServiceProvider {
        ServiceProvider::new(self.clone(), None)
    }

    pub(crate) fn next_scope_id(&self) -> u64 {
        self.inner.next_scope.fetch_add(1, Ordering::Relaxed)
    }

    /// Descriptor registered for `key`.
    pub fn descriptor(&self, key: ServiceKey) -> Option<ServiceDescriptor> {
        self.inner.registry.read().descriptors.get(&key).cloned()
    }

    /// All descriptors, in the order their keys were first registered.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        let registry = self.inner.registry.read();
        registry
            .order
            .iter()
            .filter_map(|key| registry.descriptors.get(key).cloned())
            .collect()
    }

    /// Whether a descriptor is registered for `T`.
    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.inner
            .registry
            .read()
            .descriptors
            .contains_key(&ServiceKey::of::<T>())
    }

    /// Whether `T` has been resolved at least once.
    pub fn was_resolved<T: ?Sized + 'static>(&self) -> bool {
        self.inner.resolved.lock().contains(&ServiceKey::of::<T>())
    }

    /// Number of singleton instances constructed so far.
    pub fn singleton_count(&self) -> usize {
        self.inner.singletons.len()
    }

    /// Whether the container has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposal.is_disposed()
    }

    /// Releases every singleton disposable, LIFO, then drops the singleton
    /// cache. Async disposers are spawned on the current tokio runtime; with
    /// no runtime they are dropped with a warning. Await
    /// [`dispose_async`](Self::dispose_async) to wait for them instead.
    ///
    /// Afterwards registration and resolution fail with
    /// [`DiError::ContainerDisposed`]. Calling it again is a no-op.
    pub fn dispose(&self) {
        let Some(bag) = self.inner.disposal.begin() else {
            return;
        };
        let hooks = bag.len();
        let dropped = bag.run_detached();
        if dropped > 0 {
            warn!(dropped, "async disposers dropped: no tokio runtime to run them on");
        }
        self.inner.singletons.clear();
        info!(hooks, "service container disposed");
    }

    /// Releases every singleton disposable: async hooks, then sync hooks.
    pub async fn dispose_async(&self) {
        let Some(bag) = self.inner.disposal.begin() else {
            return;
        };
        let hooks = bag.len();
        bag.run_all().await;
        self.inner.singletons.clear();
        info!(hooks, "service container disposed");
    }

    fn ensure_live(&self, key: ServiceKey) -> DiResult<()> {
        if self.is_disposed() {
            return Err(DiError::ContainerDisposed(key));
        }
        Ok(())
    }

    fn lookup(&self, key: ServiceKey) -> DiResult<ServiceDescriptor> {
        self.inner
            .registry
            .read()
            .descriptors
            .get(&key)
            .cloned()
            .ok_or(DiError::Unregistered(key))
    }

    fn mark_resolved(&self, key: ServiceKey) {
        self.inner.resolved.lock().insert(key);
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        let Some(bag) = self.disposal.begin() else {
            return;
        };
        if bag.is_empty() {
            return;
        }
        if self.options.warn_on_undisposed {
            warn!(pending = bag.len(), "service container dropped without being disposed");
        }
        let dropped = bag.run_detached();
        if dropped > 0 {
            warn!(dropped, "async disposers dropped: no tokio runtime to run them on");
        }
    }
}

impl ResolverCore for ServiceContainer {
    fn resolve_any(&self, key: ServiceKey) -> DiResult<AnyArc> {
        let ctx = ResolverContext::root(self.clone(), None);
        self.resolve_in(&ctx, key)
    }

    fn resolve_any_async(&self, key: ServiceKey) -> BoxFuture<'static, DiResult<AnyArc>> {
        let ctx = ResolverContext::root(self.clone(), None);
        self.resolve_in_async(ctx, key)
    }
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("registered", &self.inner.registry.read().descriptors.len())
            .field("singletons", &self.inner.singletons.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
