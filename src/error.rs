//! Error types for the service container.

use std::sync::Arc;

use thiserror::Error;

use crate::key::ServiceKey;

/// Boxed error returned by fallible factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Container errors.
///
/// Every variant names the offending service key. Apart from
/// [`DiError::Construction`], these describe wiring mistakes in registration
/// code and are never retried by the container.
///
/// # Examples
///
/// ```rust
/// use pulse_di::{DiError, Resolver, ServiceContainer};
///
/// let container = ServiceContainer::new();
/// match container.get::<String>() {
///     Err(DiError::Unregistered(key)) => {
///         assert_eq!(key.type_name(), "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// No descriptor is registered for the key.
    #[error("service not registered: {0}")]
    Unregistered(ServiceKey),

    /// A scoped service was resolved without a scope.
    #[error("no active scope to resolve scoped service {0}")]
    NoActiveScope(ServiceKey),

    /// The descriptor cannot be used to construct the service.
    #[error("invalid registration for {key}: {reason}")]
    InvalidRegistration { key: ServiceKey, reason: String },

    /// The synchronous entry point reached an async factory.
    #[error("service {0} has an async factory and must be resolved with the async entry point")]
    AsyncFactoryRequiresAsyncResolution(ServiceKey),

    /// A cached instance could not be downcast to the requested type.
    #[error("type mismatch for {0}")]
    TypeMismatch(ServiceKey),

    /// The key was already resolved and late replacement is disabled.
    #[error("service {0} was already resolved and cannot be re-registered")]
    AlreadyResolved(ServiceKey),

    /// The container has been disposed.
    #[error("container already disposed (service {0})")]
    ContainerDisposed(ServiceKey),

    /// The scope has been disposed.
    #[error("scope already disposed (service {0})")]
    ScopeDisposed(ServiceKey),

    /// The dependency chain grew past the configured depth.
    #[error("max resolution depth {depth} exceeded while resolving {key}")]
    DepthExceeded { key: ServiceKey, depth: usize },

    /// A factory returned an error.
    #[error("failed to construct {key}: {source}")]
    Construction {
        key: ServiceKey,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
}

impl DiError {
    /// The key this error refers to.
    pub fn key(&self) -> ServiceKey {
        match self {
            DiError::Unregistered(key)
            | DiError::NoActiveScope(key)
            | DiError::AsyncFactoryRequiresAsyncResolution(key)
            | DiError::TypeMismatch(key)
            | DiError::AlreadyResolved(key)
            | DiError::ContainerDisposed(key)
            | DiError::ScopeDisposed(key) => *key,
            DiError::InvalidRegistration { key, .. }
            | DiError::DepthExceeded { key, .. }
            | DiError::Construction { key, .. } => *key,
        }
    }

    pub(crate) fn construction(key: ServiceKey, source: BoxError) -> Self {
        DiError::Construction {
            key,
            source: Arc::from(source),
        }
    }

    pub(crate) fn invalid(key: ServiceKey, reason: impl Into<String>) -> Self {
        DiError::InvalidRegistration {
            key,
            reason: reason.into(),
        }
    }
}

/// Result type for container operations.
pub type DiResult<T> = Result<T, DiError>;
