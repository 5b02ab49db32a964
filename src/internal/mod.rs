//! Internal implementation details.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub(crate) mod dispose_bag;
pub(crate) mod slot;

pub(crate) use dispose_bag::{BoxFutureUnit, DisposeBag, DisposeState, Hook};
pub(crate) use slot::{InstanceSlot, SlotMap};

/// Type-erased shared instance. Always holds an `Arc<T>` for the service type `T`.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Boxed, sendable future used wherever async resolution recurses.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Erases `Arc<T>` into an [`AnyArc`]. Unsized `T` is supported through the
/// extra indirection.
#[inline]
pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> AnyArc {
    Arc::new(value)
}

/// Recovers `Arc<T>` from an [`AnyArc`] produced by [`erase`].
#[inline]
pub(crate) fn unerase<T: ?Sized + Send + Sync + 'static>(value: &AnyArc) -> Option<Arc<T>> {
    value.downcast_ref::<Arc<T>>().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn hello(&self) -> &'static str;
    }

    struct English;
    impl Greeter for English {
        fn hello(&self) -> &'static str {
            "hello"
        }
    }

    #[test]
    fn erase_roundtrips_trait_objects() {
        let greeter: Arc<dyn Greeter> = Arc::new(English);
        let any = erase(greeter.clone());
        let back = unerase::<dyn Greeter>(&any).unwrap();
        assert!(Arc::ptr_eq(&greeter, &back));
        assert_eq!(back.hello(), "hello");
        assert!(unerase::<English>(&any).is_none());
    }
}
