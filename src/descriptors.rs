//! Service descriptors: the declarative record of how to build a service.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::dependencies::{Dependencies, Dependency, Injectable, Upcast};
use crate::error::{BoxError, DiError, DiResult};
use crate::internal::{erase, unerase, AnyArc, BoxFuture, BoxFutureUnit, Hook};
use crate::key::ServiceKey;
use crate::lifetime::Lifetime;
use crate::provider::ResolverContext;
use crate::traits::{AsyncDispose, Dispose};

pub(crate) type SyncCtor = Arc<dyn Fn(&ResolverContext) -> DiResult<AnyArc> + Send + Sync>;
pub(crate) type AsyncCtor =
    Arc<dyn Fn(ResolverContext) -> BoxFuture<'static, DiResult<AnyArc>> + Send + Sync>;
type HookFactory = Arc<dyn Fn(&AnyArc) -> Option<Hook> + Send + Sync>;

/// How a descriptor builds its service. Sync constructors also carry an async
/// variant that awaits their dependencies first.
#[derive(Clone)]
pub(crate) enum Construction {
    Sync { ctor: SyncCtor, async_ctor: AsyncCtor },
    Async(AsyncCtor),
    Instance(AnyArc),
    Missing,
}

/// Construction strategy of a descriptor, for introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// A synchronous factory closure.
    Factory,
    /// An asynchronous factory closure.
    AsyncFactory,
    /// An [`Injectable`] implementation type, named here.
    Implementation(&'static str),
    /// A pre-built instance.
    Instance,
    /// No strategy at all. Never accepted by the container.
    Missing,
}

/// Immutable registration record for one service key.
///
/// Descriptors are cheap to clone and are replaced wholesale, never mutated
/// after registration. Exactly one strategy drives construction. Instance
/// descriptors are always singletons.
///
/// # Examples
///
/// ```rust
/// use pulse_di::{Dispose, Lifetime, ServiceContainer, ServiceDescriptor, Strategy};
/// use std::sync::Arc;
///
/// struct Engine;
/// struct DbSession;
///
/// impl Dispose for DbSession {
///     fn dispose(&self) {}
/// }
///
/// let session = ServiceDescriptor::factory(Lifetime::Scoped, |_: Arc<Engine>| Arc::new(DbSession))
///     .disposable::<DbSession>();
/// assert_eq!(session.lifetime(), Lifetime::Scoped);
/// assert_eq!(session.strategy(), Strategy::Factory);
/// assert_eq!(session.dependency_keys()[0].type_name(), std::any::type_name::<Engine>());
/// assert!(session.is_disposable());
///
/// let container = ServiceContainer::new();
/// container.register(ServiceDescriptor::instance(Arc::new(Engine))).unwrap();
/// container.register(session).unwrap();
///
/// let registered = container.descriptors();
/// assert_eq!(registered.len(), 2);
/// assert_eq!(registered[0].lifetime(), Lifetime::Singleton);
/// ```
#[derive(Clone)]
pub struct ServiceDescriptor {
    key: ServiceKey,
    lifetime: Lifetime,
    strategy: Strategy,
    construction: Construction,
    dependencies: Vec<Dependency>,
    disposer: Option<HookFactory>,
    invalid: Option<String>,
}

impl ServiceDescriptor {
    fn new(
        key: ServiceKey,
        lifetime: Lifetime,
        strategy: Strategy,
        construction: Construction,
        dependencies: Vec<Dependency>,
    ) -> Self {
        Self {
            key,
            lifetime,
            strategy,
            construction,
            dependencies,
            disposer: None,
            invalid: None,
        }
    }

    /// Descriptor for an infallible synchronous factory.
    pub fn factory<T, D, F>(lifetime: Lifetime, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D) -> Arc<T> + Send + Sync + 'static,
    {
        Self::try_factory(lifetime, move |deps: D| -> Result<Arc<T>, BoxError> {
            Ok(factory(deps))
        })
    }

    /// Descriptor for a fallible synchronous factory.
    ///
    /// Factory errors surface as [`DiError::Construction`] and nothing is
    /// cached, so a later resolution calls the factory again.
    pub fn try_factory<T, D, F>(lifetime: Lifetime, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
    {
        let key = ServiceKey::of::<T>();
        let factory = Arc::new(factory);

        let sync_factory = factory.clone();
        let ctor: SyncCtor = Arc::new(move |ctx: &ResolverContext| {
            let deps = D::resolve(ctx)?;
            let service = sync_factory(deps).map_err(|err| DiError::construction(key, err))?;
            Ok(erase(service))
        });

        let async_ctor: AsyncCtor = Arc::new(move |ctx: ResolverContext| {
            let factory = factory.clone();
            let pending: BoxFuture<'static, DiResult<AnyArc>> = Box::pin(async move {
                let deps = D::resolve_async(ctx).await?;
                let service = factory(deps).map_err(|err| DiError::construction(key, err))?;
                Ok(erase(service))
            });
            pending
        });

        Self::new(
            key,
            lifetime,
            Strategy::Factory,
            Construction::Sync { ctor, async_ctor },
            D::dependencies(),
        )
    }

    /// Descriptor for an asynchronous factory.
    ///
    /// Only the async resolution path can build it. The sync path fails with
    /// [`DiError::AsyncFactoryRequiresAsyncResolution`].
    pub fn async_factory<T, D, F, Fut>(lifetime: Lifetime, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<T>, BoxError>> + Send + 'static,
    {
        let key = ServiceKey::of::<T>();
        let factory = Arc::new(factory);
        let async_ctor: AsyncCtor = Arc::new(move |ctx: ResolverContext| {
            let factory = factory.clone();
            let pending: BoxFuture<'static, DiResult<AnyArc>> = Box::pin(async move {
                let deps = D::resolve_async(ctx).await?;
                let service = factory(deps)
                    .await
                    .map_err(|err| DiError::construction(key, err))?;
                Ok(erase(service))
            });
            pending
        });

        Self::new(
            key,
            lifetime,
            Strategy::AsyncFactory,
            Construction::Async(async_ctor),
            D::dependencies(),
        )
    }

    /// Descriptor that builds `T` through [`Injectable`] and registers it
    /// under the interface `I`.
    pub fn implementation<I, T>(lifetime: Lifetime) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        T: Injectable + Upcast<I>,
    {
        let mut descriptor = Self::factory::<I, T::Deps, _>(lifetime, |deps| {
            <T as Upcast<I>>::upcast(Arc::new(T::inject(deps)))
        });
        descriptor.strategy = Strategy::Implementation(std::any::type_name::<T>());
        descriptor
    }

    /// Descriptor for a pre-built instance. The lifetime is always
    /// [`Lifetime::Singleton`].
    pub fn instance<T>(instance: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Self::new(
            ServiceKey::of::<T>(),
            Lifetime::Singleton,
            Strategy::Instance,
            Construction::Instance(erase(instance)),
            Vec::new(),
        )
    }

    /// Descriptor with no construction strategy. The container rejects it
    /// with [`DiError::InvalidRegistration`].
    pub fn empty<T>(lifetime: Lifetime) -> Self
    where
        T: ?Sized + 'static,
    {
        Self::new(
            ServiceKey::of::<T>(),
            lifetime,
            Strategy::Missing,
            Construction::Missing,
            Vec::new(),
        )
    }

    /// Calls [`Dispose::dispose`] on every instance this descriptor builds
    /// when its owner (container or scope) is disposed.
    ///
    /// `T` must be the registered service type. Transient instances are never
    /// tracked.
    pub fn disposable<T>(mut self) -> Self
    where
        T: ?Sized + Dispose,
    {
        self.expect_key::<T>();
        self.disposer = Some(Arc::new(|any: &AnyArc| {
            unerase::<T>(any).map(|service| Hook::Sync(Box::new(move || service.dispose())))
        }));
        self
    }

    /// Like [`disposable`](Self::disposable) for [`AsyncDispose`] services.
    pub fn async_disposable<T>(mut self) -> Self
    where
        T: ?Sized + AsyncDispose,
    {
        self.expect_key::<T>();
        self.disposer = Some(Arc::new(|any: &AnyArc| {
            unerase::<T>(any).map(|service| {
                Hook::Async(Box::new(move || -> BoxFutureUnit {
                    Box::pin(async move { service.dispose().await })
                }))
            })
        }));
        self
    }

    fn expect_key<T: ?Sized + 'static>(&mut self) {
        if ServiceKey::of::<T>() != self.key {
            self.invalid = Some(format!(
                "disposer type {} does not match the service type",
                std::any::type_name::<T>()
            ));
        }
    }

    /// The key this descriptor is registered under.
    pub fn key(&self) -> ServiceKey {
        self.key
    }

    /// The service type name.
    pub fn type_name(&self) -> &'static str {
        self.key.type_name()
    }

    /// The caching policy.
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// The construction strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// The implementation type name for [`Strategy::Implementation`].
    pub fn implementation_type(&self) -> Option<&'static str> {
        match self.strategy {
            Strategy::Implementation(name) => Some(name),
            _ => None,
        }
    }

    /// Ordered dependencies of the factory or implementation type.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Ordered dependency keys.
    pub fn dependency_keys(&self) -> Vec<ServiceKey> {
        self.dependencies.iter().map(|dep| dep.key).collect()
    }

    /// Whether only the async resolution path can construct this service.
    pub fn requires_async(&self) -> bool {
        matches!(self.construction, Construction::Async(_))
    }

    /// Whether constructed instances get a disposal hook.
    pub fn is_disposable(&self) -> bool {
        self.disposer.is_some()
    }

    pub(crate) fn construction(&self) -> &Construction {
        &self.construction
    }

    /// Rejects descriptors that can never build their service.
    pub(crate) fn check(&self) -> DiResult<()> {
        if let Some(reason) = &self.invalid {
            return Err(DiError::invalid(self.key, reason.clone()));
        }
        if matches!(self.construction, Construction::Missing) {
            return Err(DiError::invalid(
                self.key,
                "no factory, implementation type or instance",
            ));
        }
        Ok(())
    }

    /// Disposal hook for a freshly built instance, if this descriptor has one.
    pub(crate) fn hook_for(&self, instance: &AnyArc) -> Option<Hook> {
        self.disposer.as_ref().and_then(|make| make(instance))
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("strategy", &self.strategy)
            .field("dependencies", &self.dependencies)
            .field("disposable", &self.is_disposable())
            .finish()
    }
}
