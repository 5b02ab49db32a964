//! Service lifetime definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Caching policy for constructed instances.
///
/// # Examples
///
/// ```rust
/// use pulse_di::{Lifetime, Resolver, ServiceContainer};
/// use std::sync::Arc;
///
/// struct Engine;
/// struct Session;
/// struct Query;
///
/// let container = ServiceContainer::new();
/// container.register_singleton(|()| Arc::new(Engine)).unwrap();
/// container.register_scoped(|()| Arc::new(Session)).unwrap();
/// container.register_transient(|()| Arc::new(Query)).unwrap();
///
/// let scope = container.create_scope();
///
/// // Singleton: shared with the root
/// let e1 = container.get_required::<Engine>();
/// let e2 = scope.get_required::<Engine>();
/// assert!(Arc::ptr_eq(&e1, &e2));
///
/// // Scoped: one per scope
/// let s1 = scope.get_required::<Session>();
/// let s2 = scope.get_required::<Session>();
/// assert!(Arc::ptr_eq(&s1, &s2));
///
/// // Transient: always fresh
/// let q1 = scope.get_required::<Query>();
/// let q2 = scope.get_required::<Query>();
/// assert!(!Arc::ptr_eq(&q1, &q2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// One instance per container, created on first resolution and kept until
    /// the container is disposed.
    Singleton,
    /// One instance per scope, released when the scope is disposed.
    Scoped,
    /// A new instance on every resolution. The container never tracks it.
    Transient,
}

impl Lifetime {
    /// Whether instances with this lifetime are cached somewhere.
    pub fn is_cached(self) -> bool {
        !matches!(self, Lifetime::Transient)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
            Lifetime::Transient => "transient",
        };
        f.write_str(s)
    }
}
