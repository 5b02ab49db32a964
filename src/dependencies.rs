//! Dependency bundles and implementation-type binding.
//!
//! Factories never receive loose positional arguments. They receive a single
//! value implementing [`Dependencies`], whose type lists exactly which services
//! fill which slot. The bundle is resolved before the factory runs, one member
//! at a time from left to right, so given `A(B)` and `B(C)` the construction
//! order is always `C`, `B`, `A`.

use std::sync::Arc;

use crate::error::DiResult;
use crate::internal::BoxFuture;
use crate::key::ServiceKey;
use crate::provider::ResolverContext;
use crate::traits::Resolver;

/// One entry in a descriptor's dependency list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dependency {
    /// The service key the dependency resolves.
    pub key: ServiceKey,
    /// Optional dependencies resolve to `None` when unregistered.
    pub optional: bool,
}

impl Dependency {
    /// A required dependency on `T`.
    pub fn required<T: ?Sized + 'static>() -> Self {
        Self {
            key: ServiceKey::of::<T>(),
            optional: false,
        }
    }

    /// An optional dependency on `T`.
    pub fn optional<T: ?Sized + 'static>() -> Self {
        Self {
            key: ServiceKey::of::<T>(),
            optional: true,
        }
    }
}

/// A bundle of already-resolved services handed to a factory.
///
/// Implemented for `()`, `Arc<T>`, `Option<Arc<T>>` and tuples of up to eight
/// bundles. Implement it by hand for a named struct when a tuple gets hard to
/// read.
///
/// # Examples
///
/// ```
/// use pulse_di::{
///     BoxFuture, Dependencies, Dependency, DiResult, Resolver, ResolverContext,
///     ServiceContainer,
/// };
/// use std::sync::Arc;
///
/// struct Engine;
/// struct Cache;
///
/// struct ReportDeps {
///     engine: Arc<Engine>,
///     cache: Option<Arc<Cache>>,
/// }
///
/// impl Dependencies for ReportDeps {
///     fn resolve(ctx: &ResolverContext) -> DiResult<Self> {
///         Ok(Self { engine: ctx.get()?, cache: ctx.try_get()? })
///     }
///
///     fn resolve_async(ctx: ResolverContext) -> BoxFuture<'static, DiResult<Self>> {
///         Box::pin(async move {
///             Ok(Self {
///                 engine: ctx.get_async().await?,
///                 cache: ctx.try_get_async().await?,
///             })
///         })
///     }
///
///     fn dependencies() -> Vec<Dependency> {
///         vec![Dependency::required::<Engine>(), Dependency::optional::<Cache>()]
///     }
/// }
///
/// struct Report {
///     has_cache: bool,
/// }
///
/// let container = ServiceContainer::new();
/// container.register_singleton(|()| Arc::new(Engine)).unwrap();
/// container
///     .register_transient(|deps: ReportDeps| {
///         let _ = deps.engine;
///         Arc::new(Report { has_cache: deps.cache.is_some() })
///     })
///     .unwrap();
///
/// assert!(!container.get_required::<Report>().has_cache);
/// ```
pub trait Dependencies: Sized + Send + 'static {
    /// Resolves the bundle on the synchronous path.
    fn resolve(ctx: &ResolverContext) -> DiResult<Self>;

    /// Resolves the bundle on the asynchronous path.
    fn resolve_async(ctx: ResolverContext) -> BoxFuture<'static, DiResult<Self>>;

    /// The ordered dependency list, recorded on the descriptor.
    fn dependencies() -> Vec<Dependency>;

    /// The ordered dependency keys.
    fn keys() -> Vec<ServiceKey> {
        Self::dependencies().into_iter().map(|dep| dep.key).collect()
    }
}

impl Dependencies for () {
    fn resolve(_ctx: &ResolverContext) -> DiResult<Self> {
        Ok(())
    }

    fn resolve_async(_ctx: ResolverContext) -> BoxFuture<'static, DiResult<Self>> {
        Box::pin(async { Ok(()) })
    }

    fn dependencies() -> Vec<Dependency> {
        Vec::new()
    }
}

impl<T> Dependencies for Arc<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn resolve(ctx: &ResolverContext) -> DiResult<Self> {
        ctx.get::<T>()
    }

    fn resolve_async(ctx: ResolverContext) -> BoxFuture<'static, DiResult<Self>> {
        ctx.get_async::<T>()
    }

    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::required::<T>()]
    }
}

impl<T> Dependencies for Option<Arc<T>>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn resolve(ctx: &ResolverContext) -> DiResult<Self> {
        ctx.try_get::<T>()
    }

    fn resolve_async(ctx: ResolverContext) -> BoxFuture<'static, DiResult<Self>> {
        ctx.try_get_async::<T>()
    }

    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::optional::<T>()]
    }
}

macro_rules! impl_dependencies_for_tuple {
    ($($name:ident),+) => {
        impl<$($name: Dependencies),+> Dependencies for ($($name,)+) {
            fn resolve(ctx: &ResolverContext) -> DiResult<Self> {
                Ok(($($name::resolve(ctx)?,)+))
            }

            fn resolve_async(ctx: ResolverContext) -> BoxFuture<'static, DiResult<Self>> {
                Box::pin(async move {
                    Ok(($($name::resolve_async(ctx.clone()).await?,)+))
                })
            }

            fn dependencies() -> Vec<Dependency> {
                let mut deps = Vec::new();
                $(deps.extend($name::dependencies());)+
                deps
            }
        }
    };
}

impl_dependencies_for_tuple!(A);
impl_dependencies_for_tuple!(A, B);
impl_dependencies_for_tuple!(A, B, C);
impl_dependencies_for_tuple!(A, B, C, D);
impl_dependencies_for_tuple!(A, B, C, D, E);
impl_dependencies_for_tuple!(A, B, C, D, E, F);
impl_dependencies_for_tuple!(A, B, C, D, E, F, G);
impl_dependencies_for_tuple!(A, B, C, D, E, F, G, H);

/// A type the container can build from its declared dependencies.
///
/// Used with the `register_*_type` methods so a type can be registered without
/// writing a factory closure.
///
/// # Examples
///
/// ```
/// use pulse_di::{Injectable, Resolver, ServiceContainer};
/// use std::sync::Arc;
///
/// struct DbSession;
///
/// struct WorkoutRepository {
///     session: Arc<DbSession>,
/// }
///
/// impl Injectable for WorkoutRepository {
///     type Deps = Arc<DbSession>;
///
///     fn inject(session: Self::Deps) -> Self {
///         Self { session }
///     }
/// }
///
/// let container = ServiceContainer::new();
/// container.register_scoped(|()| Arc::new(DbSession)).unwrap();
/// container
///     .register_transient_type::<WorkoutRepository, WorkoutRepository>()
///     .unwrap();
///
/// let scope = container.create_scope();
/// let a = scope.get_required::<WorkoutRepository>();
/// let b = scope.get_required::<WorkoutRepository>();
/// assert!(Arc::ptr_eq(&a.session, &b.session));
/// ```
pub trait Injectable: Send + Sync + Sized + 'static {
    /// The dependency bundle the constructor takes.
    type Deps: Dependencies;

    /// Builds the value from its resolved dependencies.
    fn inject(deps: Self::Deps) -> Self;
}

/// Statically checked conversion from an implementation to the interface it
/// is registered under.
///
/// Every type converts to itself. Trait-object bindings are declared with
/// [`bind_interface!`](crate::bind_interface).
pub trait Upcast<I: ?Sized>: Send + Sync + 'static {
    /// Converts the shared implementation into the interface type.
    fn upcast(self: Arc<Self>) -> Arc<I>;
}

impl<T: Send + Sync + 'static> Upcast<T> for T {
    fn upcast(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// Declares that an implementation type can be registered under a trait
/// object key.
///
/// # Examples
///
/// ```
/// use pulse_di::{bind_interface, Injectable, Resolver, ServiceContainer};
///
/// trait Recommender: Send + Sync {
///     fn top(&self) -> &'static str;
/// }
///
/// struct PopularityRecommender;
///
/// impl Recommender for PopularityRecommender {
///     fn top(&self) -> &'static str {
///         "squats"
///     }
/// }
///
/// impl Injectable for PopularityRecommender {
///     type Deps = ();
///     fn inject(_: ()) -> Self {
///         Self
///     }
/// }
///
/// bind_interface!(PopularityRecommender => dyn Recommender);
///
/// let container = ServiceContainer::new();
/// container
///     .register_singleton_type::<dyn Recommender, PopularityRecommender>()
///     .unwrap();
/// assert_eq!(container.get_required::<dyn Recommender>().top(), "squats");
/// ```
#[macro_export]
macro_rules! bind_interface {
    ($implementation:ty => $interface:ty) => {
        impl $crate::Upcast<$interface> for $implementation {
            fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$interface> {
                self
            }
        }
    };
}
