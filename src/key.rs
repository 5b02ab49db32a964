//! Service key types for the container.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity used to register and look up a service.
///
/// A key is built from any `'static` type, sized or not, so concrete types and
/// trait objects (`dyn Trait`) share the same key space. At most one
/// descriptor is active per key.
///
/// # Examples
///
/// ```rust
/// use pulse_di::ServiceKey;
///
/// trait Clock: Send + Sync {}
///
/// let a = ServiceKey::of::<String>();
/// let b = ServiceKey::of::<String>();
/// let c = ServiceKey::of::<dyn Clock>();
///
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// assert!(c.type_name().contains("Clock"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ServiceKey {
    id: TypeId,
    name: &'static str,
}

impl ServiceKey {
    /// Key for the type `T`.
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The `TypeId` backing this key.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Human-readable type name, for diagnostics only.
    pub fn type_name(&self) -> &'static str {
        self.name
    }
}

// TypeId-only comparison: the name is diagnostic and never part of identity.
impl PartialEq for ServiceKey {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
