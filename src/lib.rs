//! # pulse-di
//!
//! Service container with singleton, scoped and transient lifetimes, sync and
//! async factories, and scope-bound disposal.
//!
//! ## Features
//!
//! - **Lifetimes**: Singleton (one per container), Scoped (one per scope) and
//!   Transient (fresh every time)
//! - **Explicit dependencies**: factories take a typed bundle of resolved
//!   services, so every dependency is visible in the factory signature
//! - **Async factories**: awaited on the async resolution path, rejected on
//!   the sync one
//! - **Disposal**: LIFO, exactly once, at scope end or container shutdown
//! - **Per-request scopes**: an axum layer and extractors behind the
//!   `axum-integration` feature
//!
//! ## Quick Start
//!
//! ```rust
//! use pulse_di::{Resolver, ServiceContainer};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let container = ServiceContainer::new();
//! container
//!     .register_instance(Arc::new(Database { url: "postgres://localhost".to_string() }))
//!     .unwrap();
//! container
//!     .register_transient(|db: Arc<Database>| Arc::new(UserService { db }))
//!     .unwrap();
//!
//! let users = container.get_required::<UserService>();
//! assert_eq!(users.db.url, "postgres://localhost");
//! ```
//!
//! ## Service Lifetimes
//!
//! - **Singleton**: created on first resolution, shared by every scope, released
//!   by [`ServiceContainer::dispose`]
//! - **Scoped**: created once per [`ServiceProvider`], released when the scope
//!   is disposed; resolving one without a scope is an error
//! - **Transient**: created on every resolution and never tracked
//!
//! ## Async Factories
//!
//! ```rust
//! use pulse_di::{BoxError, DiError, Resolver, ServiceContainer};
//! use std::sync::Arc;
//!
//! struct Pool;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let container = ServiceContainer::new();
//! container
//!     .register_singleton_async(|()| async { Ok::<_, BoxError>(Arc::new(Pool)) })
//!     .unwrap();
//!
//! assert!(matches!(
//!     container.get::<Pool>(),
//!     Err(DiError::AsyncFactoryRequiresAsyncResolution(_))
//! ));
//! let _pool = container.get_async::<Pool>().await.unwrap();
//! # }
//! ```

pub mod container;
pub mod dependencies;
pub mod descriptors;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod options;
pub mod provider;
pub mod traits;
pub mod validation;

#[cfg(feature = "axum-integration")]
pub mod axum_integration;

mod internal;

pub use container::ServiceContainer;
pub use dependencies::{Dependencies, Dependency, Injectable, Upcast};
pub use descriptors::{ServiceDescriptor, Strategy};
pub use error::{BoxError, DiError, DiResult};
pub use internal::{AnyArc, BoxFuture};
pub use key::ServiceKey;
pub use lifetime::Lifetime;
pub use options::{ContainerOptions, OptionsError};
pub use provider::{ResolverContext, ServiceProvider};
pub use traits::{AsyncDispose, Dispose, Resolver, ResolverCore};
pub use validation::{ValidationError, ValidationReport, ValidationWarning};
