//! Axum integration: one scope per request.
//!
//! [`RequestScopeLayer`] creates a scope for every inbound request, places it
//! in the request extensions and disposes it once the response is produced
//! (or the request future is dropped). Handlers pull services out with the
//! [`RequestScope`] and [`Inject`] extractors.
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use pulse_di::axum_integration::{Inject, RequestScopeLayer};
//! use pulse_di::ServiceContainer;
//! use std::sync::Arc;
//!
//! struct Greeter;
//! impl Greeter {
//!     fn greet(&self) -> &'static str {
//!         "hello"
//!     }
//! }
//!
//! async fn hello(Inject(greeter): Inject<Greeter>) -> &'static str {
//!     greeter.greet()
//! }
//!
//! # async fn run() {
//! let container = ServiceContainer::new();
//! container.register_scoped(|()| Arc::new(Greeter)).unwrap();
//!
//! let app: Router = Router::new()
//!     .route("/", get(hello))
//!     .layer(RequestScopeLayer::new(container));
//! # let _ = app;
//! # }
//! ```

use std::ops::Deref;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, Request, StatusCode},
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};
use tracing::error;

use crate::container::ServiceContainer;
use crate::error::DiError;
use crate::internal::BoxFuture;
use crate::provider::lifecycle::ScopeGuard;
use crate::provider::ServiceProvider;
use crate::traits::Resolver;

/// Tower layer that wraps each request in its own scope.
#[derive(Clone, Debug)]
pub struct RequestScopeLayer {
    container: ServiceContainer,
}

impl RequestScopeLayer {
    pub fn new(container: ServiceContainer) -> Self {
        Self { container }
    }
}

impl<S> Layer<S> for RequestScopeLayer {
    type Service = RequestScopeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestScopeService {
            inner,
            container: self.container.clone(),
        }
    }
}

/// Service produced by [`RequestScopeLayer`].
#[derive(Clone, Debug)]
pub struct RequestScopeService<S> {
    inner: S,
    container: ServiceContainer,
}

impl<S, B> Service<Request<B>> for RequestScopeService<S>
where
    S: Service<Request<B>> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        let scope = self.container.create_scope();
        request.extensions_mut().insert(scope.clone());

        // The clone may not be ready; keep the one that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let guard = ScopeGuard::new(scope);
            let response = inner.call(request).await;
            if let Some(scope) = guard.finish() {
                scope.dispose_async().await;
            }
            response
        })
    }
}

/// Extracts the request's scope.
#[derive(Clone, Debug)]
pub struct RequestScope(pub ServiceProvider);

impl Deref for RequestScope {
    type Target = ServiceProvider;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = DiRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ServiceProvider>()
            .cloned()
            .map(RequestScope)
            .ok_or(DiRejection::MissingScope)
    }
}

/// Resolves `T` from the request's scope on the async path.
pub struct Inject<T: ?Sized>(pub Arc<T>);

impl<T: ?Sized> Deref for Inject<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S, T> FromRequestParts<S> for Inject<T>
where
    S: Send + Sync,
    T: ?Sized + Send + Sync + 'static,
{
    type Rejection = DiRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequestScope(scope) = RequestScope::from_request_parts(parts, state).await?;
        let service = scope.get_async::<T>().await?;
        Ok(Inject(service))
    }
}

/// Why a DI extractor failed. Always a wiring defect, so always a 500.
#[derive(Debug)]
pub enum DiRejection {
    /// The router is missing [`RequestScopeLayer`].
    MissingScope,
    /// Resolution failed.
    Resolution(DiError),
}

impl From<DiError> for DiRejection {
    fn from(err: DiError) -> Self {
        DiRejection::Resolution(err)
    }
}

impl IntoResponse for DiRejection {
    fn into_response(self) -> Response {
        match self {
            DiRejection::MissingScope => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "request scope not found; add RequestScopeLayer to the router",
            )
                .into_response(),
            DiRejection::Resolution(err) => err.into_response(),
        }
    }
}

impl IntoResponse for DiError {
    fn into_response(self) -> Response {
        error!(service = %self.key(), error = %self, "dependency resolution failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::ServiceKey;

    struct Session;

    #[test]
    fn resolution_errors_are_server_errors() {
        let response =
            DiRejection::from(DiError::NoActiveScope(ServiceKey::of::<Session>())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = DiRejection::MissingScope.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
