//! Resolver context for dependency bundles.

use std::sync::Arc;

use crate::container::ServiceContainer;
use crate::error::{DiError, DiResult};
use crate::internal::{AnyArc, BoxFuture};
use crate::key::ServiceKey;
use crate::provider::ServiceProvider;
use crate::traits::ResolverCore;

/// The services currently being constructed, innermost first.
struct Frame {
    key: ServiceKey,
    parent: Option<Arc<Frame>>,
}

/// Context a [`Dependencies`](crate::Dependencies) bundle resolves against.
///
/// It carries the container, the scope the outermost request came from (if
/// any) and the chain of services under construction. Every dependency of a
/// service resolves against the same scope as the service itself. Cloning is
/// cheap.
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
/// struct RequestInfo {
///     depth: usize,
///     scoped: bool,
/// }
///
/// impl Dependencies for RequestInfo {
///     fn resolve(ctx: &ResolverContext) -> DiResult<Self> {
///         Ok(Self { depth: ctx.depth(), scoped: ctx.scope().is_some() })
///     }
///
///     fn resolve_async(ctx: ResolverContext) -> BoxFuture<'static, DiResult<Self>> {
///         Box::pin(async move { Self::resolve(&ctx) })
///     }
///
///     fn dependencies() -> Vec<Dependency> {
///         Vec::new()
///     }
/// }
///
/// struct Inspector(RequestInfo);
///
/// let container = ServiceContainer::new();
/// container.register_transient(|info: RequestInfo| Arc::new(Inspector(info))).unwrap();
///
/// let inspector = container.create_scope().get_required::<Inspector>();
/// assert_eq!(inspector.0.depth, 1);
/// assert!(inspector.0.scoped);
/// ```
#[derive(Clone)]
pub struct ResolverContext {
    container: ServiceContainer,
    scope: Option<ServiceProvider>,
    chain: Option<Arc<Frame>>,
    depth: usize,
}

impl ResolverContext {
    pub(crate) fn root(container: ServiceContainer, scope: Option<ServiceProvider>) -> Self {
        Self {
            container,
            scope,
            chain: None,
            depth: 0,
        }
    }

    /// Context for constructing `key` one level deeper.
    pub(crate) fn enter(&self, key: ServiceKey) -> DiResult<Self> {
        let depth = self.depth + 1;
        let max = self.container.options().max_resolution_depth;
        if depth > max {
            return Err(DiError::DepthExceeded { key, depth: max });
        }
        Ok(Self {
            container: self.container.clone(),
            scope: self.scope.clone(),
            chain: Some(Arc::new(Frame {
                key,
                parent: self.chain.clone(),
            })),
            depth,
        })
    }

    /// Whether `key` is already under construction further up this chain.
    pub(crate) fn is_constructing(&self, key: ServiceKey) -> bool {
        let mut frame = self.chain.as_deref();
        while let Some(current) = frame {
            if current.key == key {
                return true;
            }
            frame = current.parent.as_deref();
        }
        false
    }

    /// The container backing this resolution.
    pub fn container(&self) -> &ServiceContainer {
        &self.container
    }

    /// The scope scoped services resolve from, if any.
    pub fn scope(&self) -> Option<&ServiceProvider> {
        self.scope.as_ref()
    }

    /// How many services are under construction in this chain.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The service being constructed, if any.
    pub fn current(&self) -> Option<ServiceKey> {
        self.chain.as_ref().map(|frame| frame.key)
    }
}

impl ResolverCore for ResolverContext {
    fn resolve_any(&self, key: ServiceKey) -> DiResult<AnyArc> {
        self.container.resolve_in(self, key)
    }

    fn resolve_any_async(&self, key: ServiceKey) -> BoxFuture<'static, DiResult<AnyArc>> {
        self.container.resolve_in_async(self.clone(), key)
    }
}
