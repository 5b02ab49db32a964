//! Resolution: lifetime branching and construction.
//!
//! Both paths look up the descriptor, pick the cache for its lifetime and
//! construct on a miss. A cache is written only after construction succeeds,
//! so failed or cancelled constructions are retried by the next resolution.

use tracing::trace;

use super::ServiceContainer;
use crate::descriptors::{Construction, ServiceDescriptor};
use crate::error::{DiError, DiResult};
use crate::internal::{AnyArc, BoxFuture};
use crate::key::ServiceKey;
use crate::lifetime::Lifetime;
use crate::provider::ResolverContext;

impl ServiceContainer {
    /// Synchronous resolution of `key` within `ctx`.
    pub(crate) fn resolve_in(&self, ctx: &ResolverContext, key: ServiceKey) -> DiResult<AnyArc> {
        self.ensure_live(key)?;
        let descriptor = self.lookup(key)?;
        let lifetime = descriptor.lifetime();
        trace!(service = %key, %lifetime, depth = ctx.depth(), "resolving");

        let value = match lifetime {
            Lifetime::Transient => self.construct(ctx, &descriptor)?,
            Lifetime::Singleton => {
                let slot = self.inner.singletons.slot(key);
                let (value, created) = slot.get_or_try_init(!ctx.is_constructing(key), || {
                    self.construct(ctx, &descriptor)
                })?;
                if created {
                    self.track_singleton(&descriptor, &value);
                }
                value
            }
            Lifetime::Scoped => {
                let scope = ctx.scope().ok_or(DiError::NoActiveScope(key))?;
                let slot = scope.slot(key)?;
                let (value, created) = slot.get_or_try_init(!ctx.is_constructing(key), || {
                    self.construct(ctx, &descriptor)
                })?;
                if created {
                    if let Some(hook) = descriptor.hook_for(&value) {
                        scope.track(hook);
                    }
                }
                value
            }
        };

        self.mark_resolved(key);
        Ok(value)
    }

    /// Asynchronous resolution of `key` within `ctx`.
    pub(crate) fn resolve_in_async(
        &self,
        ctx: ResolverContext,
        key: ServiceKey,
    ) -> BoxFuture<'static, DiResult<AnyArc>> {
        let container = self.clone();
        Box::pin(async move {
            container.ensure_live(key)?;
            let descriptor = container.lookup(key)?;
            let lifetime = descriptor.lifetime();
            trace!(service = %key, %lifetime, depth = ctx.depth(), "resolving async");

            let value = match lifetime {
                Lifetime::Transient => container.construct_async(&ctx, &descriptor).await?,
                Lifetime::Singleton => {
                    let slot = container.inner.singletons.slot(key);
                    let (value, created) = slot
                        .get_or_try_init_async(
                            !ctx.is_constructing(key),
                            container.construct_async(&ctx, &descriptor),
                        )
                        .await?;
                    if created {
                        container.track_singleton(&descriptor, &value);
                    }
                    value
                }
                Lifetime::Scoped => {
                    let scope = ctx.scope().ok_or(DiError::NoActiveScope(key))?.clone();
                    let slot = scope.slot(key)?;
                    let (value, created) = slot
                        .get_or_try_init_async(
                            !ctx.is_constructing(key),
                            container.construct_async(&ctx, &descriptor),
                        )
                        .await?;
                    if created {
                        if let Some(hook) = descriptor.hook_for(&value) {
                            scope.track(hook);
                        }
                    }
                    value
                }
            };

            container.mark_resolved(key);
            Ok(value)
        })
    }

    fn construct(&self, ctx: &ResolverContext, descriptor: &ServiceDescriptor) -> DiResult<AnyArc> {
        let key = descriptor.key();
        let ctx = ctx.enter(key)?;
        trace!(service = %key, depth = ctx.depth(), "constructing");
        match descriptor.construction() {
            Construction::Instance(instance) => Ok(instance.clone()),
            Construction::Sync { ctor, .. } => ctor(&ctx),
            Construction::Async(_) => Err(DiError::AsyncFactoryRequiresAsyncResolution(key)),
            Construction::Missing => Err(DiError::invalid(
                key,
                "no factory, implementation type or instance",
            )),
        }
    }

    fn construct_async(
        &self,
        ctx: &ResolverContext,
        descriptor: &ServiceDescriptor,
    ) -> BoxFuture<'static, DiResult<AnyArc>> {
        let key = descriptor.key();
        let entered = ctx.enter(key);
        let construction = descriptor.construction().clone();
        Box::pin(async move {
            let ctx = entered?;
            trace!(service = %key, depth = ctx.depth(), "constructing async");
            match construction {
                Construction::Instance(instance) => Ok(instance),
                Construction::Sync { async_ctor, .. } | Construction::Async(async_ctor) => {
                    async_ctor(ctx).await
                }
                Construction::Missing => Err(DiError::invalid(
                    key,
                    "no factory, implementation type or instance",
                )),
            }
        })
    }

    // Instance descriptors registered their hook at registration time.
    fn track_singleton(&self, descriptor: &ServiceDescriptor, value: &AnyArc) {
        if matches!(descriptor.construction(), Construction::Instance(_)) {
            return;
        }
        if let Some(hook) = descriptor.hook_for(value) {
            self.inner.disposal.push(hook);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ContainerOptions;
    use crate::traits::Resolver;
    use std::sync::Arc;

    struct Node;

    #[test]
    fn self_dependency_hits_depth_limit() {
        let container =
            ServiceContainer::with_options(ContainerOptions::default().with_max_resolution_depth(8));
        container
            .register_transient(|_: Arc<Node>| Arc::new(Node))
            .unwrap();

        match container.get::<Node>() {
            Err(DiError::DepthExceeded { key, depth }) => {
                assert_eq!(key, ServiceKey::of::<Node>());
                assert_eq!(depth, 8);
            }
            other => panic!("expected DepthExceeded, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn self_dependent_singleton_does_not_deadlock() {
        let container =
            ServiceContainer::with_options(ContainerOptions::default().with_max_resolution_depth(4));
        container
            .register_singleton(|_: Arc<Node>| Arc::new(Node))
            .unwrap();
        assert!(matches!(
            container.get::<Node>(),
            Err(DiError::DepthExceeded { .. })
        ));
        assert_eq!(container.singleton_count(), 0);
    }

    #[tokio::test]
    async fn self_dependent_singleton_does_not_deadlock_async() {
        let container =
            ServiceContainer::with_options(ContainerOptions::default().with_max_resolution_depth(4));
        container
            .register_singleton(|_: Arc<Node>| Arc::new(Node))
            .unwrap();
        assert!(matches!(
            container.get_async::<Node>().await,
            Err(DiError::DepthExceeded { .. })
        ));
    }
}
