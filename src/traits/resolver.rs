//! Resolver traits for service resolution.

use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::internal::{unerase, AnyArc, BoxFuture};
use crate::key::ServiceKey;

/// Object-safe resolution core.
///
/// Implementations decide which scope (if any) backs scoped services; the
/// generic [`Resolver`] methods are built on top of these two calls.
pub trait ResolverCore: Send + Sync {
    /// Resolves `key` on the synchronous path.
    ///
    /// Fails with [`DiError::AsyncFactoryRequiresAsyncResolution`] when the
    /// key, or anything it depends on, is built by an async factory.
    fn resolve_any(&self, key: ServiceKey) -> DiResult<AnyArc>;

    /// Resolves `key` on the asynchronous path. Async factories are awaited
    /// and sync factories are called once their dependencies are resolved.
    fn resolve_any_async(&self, key: ServiceKey) -> BoxFuture<'static, DiResult<AnyArc>>;
}

/// Typed resolution API shared by the container, scopes and the resolver
/// context handed to dependency bundles.
///
/// # Examples
///
/// ```
/// use pulse_di::{Resolver, ServiceContainer};
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// struct FixedClock;
/// impl Clock for FixedClock {
///     fn now(&self) -> u64 { 42 }
/// }
///
/// let container = ServiceContainer::new();
/// container.register_instance::<dyn Clock>(Arc::new(FixedClock)).unwrap();
///
/// let clock = container.get::<dyn Clock>().unwrap();
/// assert_eq!(clock.now(), 42);
/// assert!(container.try_get::<String>().unwrap().is_none());
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves `T` synchronously.
    fn get<T>(&self) -> DiResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let any = self.resolve_any(ServiceKey::of::<T>())?;
        downcast::<T>(&any)
    }

    /// Resolves `T` synchronously, panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics with the error message when resolution fails.
    fn get_required<T>(&self) -> Arc<T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match self.get::<T>() {
            Ok(service) => service,
            Err(err) => panic!("failed to resolve required service: {err}"),
        }
    }

    /// Resolves `T` synchronously, returning `Ok(None)` when `T` itself is not
    /// registered. Errors from `T`'s own dependencies still propagate.
    fn try_get<T>(&self) -> DiResult<Option<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        optional(ServiceKey::of::<T>(), self.get::<T>())
    }

    /// Resolves `T` on the asynchronous path.
    fn get_async<T>(&self) -> BoxFuture<'static, DiResult<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let pending = self.resolve_any_async(ServiceKey::of::<T>());
        Box::pin(async move {
            let any = pending.await?;
            downcast::<T>(&any)
        })
    }

    /// Async counterpart of [`try_get`](Self::try_get).
    fn try_get_async<T>(&self) -> BoxFuture<'static, DiResult<Option<Arc<T>>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let pending = self.get_async::<T>();
        Box::pin(async move { optional(ServiceKey::of::<T>(), pending.await) })
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}

pub(crate) fn downcast<T>(any: &AnyArc) -> DiResult<Arc<T>>
where
    T: ?Sized + Send + Sync + 'static,
{
    unerase::<T>(any).ok_or(DiError::TypeMismatch(ServiceKey::of::<T>()))
}

fn optional<T: ?Sized>(key: ServiceKey, result: DiResult<Arc<T>>) -> DiResult<Option<Arc<T>>> {
    match result {
        Ok(service) => Ok(Some(service)),
        Err(DiError::Unregistered(missing)) if missing == key => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::erase;

    #[test]
    fn downcast_mismatch_names_the_requested_key() {
        let cached = erase(Arc::new(7u32));
        assert_eq!(*downcast::<u32>(&cached).unwrap(), 7);

        let err = downcast::<String>(&cached).unwrap_err();
        assert!(matches!(err, DiError::TypeMismatch(_)));
        assert_eq!(err.key(), ServiceKey::of::<String>());
        assert!(err.to_string().contains("String"));
    }
}
