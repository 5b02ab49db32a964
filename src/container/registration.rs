//! Registration API.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use super::ServiceContainer;
use crate::dependencies::{Dependencies, Injectable, Upcast};
use crate::descriptors::{Construction, ServiceDescriptor};
use crate::error::{BoxError, DiError, DiResult};
use crate::lifetime::Lifetime;
use crate::traits::Dispose;

impl ServiceContainer {
    /// Registers a descriptor, replacing any previous one for the same key.
    ///
    /// Nothing is constructed here, so services may be registered in any
    /// order. Fails with:
    /// - [`DiError::InvalidRegistration`] when the descriptor has no
    ///   construction strategy or a mismatched disposer,
    /// - [`DiError::AlreadyResolved`] when the key was already resolved and
    ///   late replacement is disabled,
    /// - [`DiError::ContainerDisposed`] after disposal.
    pub fn register(&self, descriptor: ServiceDescriptor) -> DiResult<&Self> {
        let key = descriptor.key();
        self.ensure_live(key)?;
        descriptor.check()?;

        if self.inner.resolved.lock().contains(&key) {
            if !self.inner.options.allow_late_replacement {
                return Err(DiError::AlreadyResolved(key));
            }
            warn!(
                service = %key,
                "replacing an already resolved service; cached instances are kept"
            );
        }

        // Instances never go through construction, so their hook is taken now.
        if let Construction::Instance(instance) = descriptor.construction() {
            if let Some(hook) = descriptor.hook_for(instance) {
                self.inner.disposal.push(hook);
            }
        }

        let lifetime = descriptor.lifetime();
        let strategy = descriptor.strategy();
        let replaced = self.inner.registry.write().insert(descriptor);
        debug!(service = %key, %lifetime, ?strategy, replaced, "service registered");
        Ok(self)
    }

    /// Registers a singleton built by `factory` on first resolution.
    pub fn register_singleton<T, D, F>(&self, factory: F) -> DiResult<&Self>
    where
        T: ?Sized + Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D) -> Arc<T> + Send + Sync + 'static,
    {
        self.register(ServiceDescriptor::factory(Lifetime::Singleton, factory))
    }

    /// Registers a scoped service built by `factory` once per scope.
    pub fn register_scoped<T, D, F>(&self, factory: F) -> DiResult<&Self>
    where
        T: ?Sized + Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D) -> Arc<T> + Send + Sync + 'static,
    {
        self.register(ServiceDescriptor::factory(Lifetime::Scoped, factory))
    }

    /// Registers a transient service built by `factory` on every resolution.
    pub fn register_transient<T, D, F>(&self, factory: F) -> DiResult<&Self>
    where
        T: ?Sized + Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D) -> Arc<T> + Send + Sync + 'static,
    {
        self.register(ServiceDescriptor::factory(Lifetime::Transient, factory))
    }

    /// Registers a fallible factory with an explicit lifetime.
    pub fn register_factory<T, D, F>(&self, lifetime: Lifetime, factory: F) -> DiResult<&Self>
    where
        T: ?Sized + Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
    {
        self.register(ServiceDescriptor::try_factory(lifetime, factory))
    }

    /// Registers a singleton built once by the async `factory`.
    pub fn register_singleton_async<T, D, F, Fut>(&self, factory: F) -> DiResult<&Self>
    where
        T: ?Sized + Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<T>, BoxError>> + Send + 'static,
    {
        self.register(ServiceDescriptor::async_factory(Lifetime::Singleton, factory))
    }

    /// Registers a scoped service built once per scope by the async `factory`.
    pub fn register_scoped_async<T, D, F, Fut>(&self, factory: F) -> DiResult<&Self>
    where
        T: ?Sized + Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<T>, BoxError>> + Send + 'static,
    {
        self.register(ServiceDescriptor::async_factory(Lifetime::Scoped, factory))
    }

    /// Registers a transient service built by the async `factory` on every
    /// resolution.
    pub fn register_transient_async<T, D, F, Fut>(&self, factory: F) -> DiResult<&Self>
    where
        T: ?Sized + Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<T>, BoxError>> + Send + 'static,
    {
        self.register(ServiceDescriptor::async_factory(Lifetime::Transient, factory))
    }

    /// Registers implementation `T` as the singleton for interface `I`.
    pub fn register_singleton_type<I, T>(&self) -> DiResult<&Self>
    where
        I: ?Sized + Send + Sync + 'static,
        T: Injectable + Upcast<I>,
    {
        self.register(ServiceDescriptor::implementation::<I, T>(Lifetime::Singleton))
    }

    /// Registers implementation `T` as the scoped service for interface `I`.
    pub fn register_scoped_type<I, T>(&self) -> DiResult<&Self>
    where
        I: ?Sized + Send + Sync + 'static,
        T: Injectable + Upcast<I>,
    {
        self.register(ServiceDescriptor::implementation::<I, T>(Lifetime::Scoped))
    }

    /// Registers implementation `T` as the transient service for interface `I`.
    pub fn register_transient_type<I, T>(&self) -> DiResult<&Self>
    where
        I: ?Sized + Send + Sync + 'static,
        T: Injectable + Upcast<I>,
    {
        self.register(ServiceDescriptor::implementation::<I, T>(Lifetime::Transient))
    }

    /// Binds a pre-built instance as a singleton.
    pub fn register_instance<T>(&self, instance: Arc<T>) -> DiResult<&Self>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.register(ServiceDescriptor::instance(instance))
    }

    /// Registers a factory whose instances are disposed with their owner:
    /// the scope for scoped services, the container for singletons.
    pub fn register_disposable<T, D, F>(&self, lifetime: Lifetime, factory: F) -> DiResult<&Self>
    where
        T: ?Sized + Dispose,
        D: Dependencies,
        F: Fn(D) -> Arc<T> + Send + Sync + 'static,
    {
        self.register(ServiceDescriptor::factory(lifetime, factory).disposable::<T>())
    }
}
