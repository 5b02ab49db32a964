//! Property-based tests for lifetime semantics.
//!
//! Resolution sequences are generated at random and every returned instance is
//! checked against the identity rules of its lifetime.

use proptest::prelude::*;
use pulse_di::{BoxError, Lifetime, Resolver, ServiceContainer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Counted {
    serial: usize,
}

fn lifetime_strategy() -> impl Strategy<Value = Lifetime> {
    prop_oneof![
        Just(Lifetime::Singleton),
        Just(Lifetime::Scoped),
        Just(Lifetime::Transient),
    ]
}

fn container_for(lifetime: Lifetime) -> (ServiceContainer, Arc<AtomicUsize>) {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    let container = ServiceContainer::new();
    container
        .register_factory(lifetime, move |()| {
            Ok::<_, BoxError>(Arc::new(Counted {
                serial: counter.fetch_add(1, Ordering::SeqCst),
            }))
        })
        .unwrap();
    (container, built)
}

proptest! {
    #[test]
    fn identity_follows_lifetime(
        lifetime in lifetime_strategy(),
        picks in prop::collection::vec(0usize..4, 1..40),
    ) {
        let (container, built) = container_for(lifetime);
        let scopes: Vec<_> = (0..4).map(|_| container.create_scope()).collect();

        let resolved: Vec<(usize, Arc<Counted>)> = picks
            .iter()
            .map(|&i| (i, scopes[i].get_required::<Counted>()))
            .collect();

        for (i, a) in &resolved {
            for (j, b) in &resolved {
                let same = Arc::ptr_eq(a, b);
                match lifetime {
                    Lifetime::Singleton => prop_assert!(same),
                    Lifetime::Scoped => prop_assert_eq!(same, i == j),
                    Lifetime::Transient => prop_assert_eq!(same, a.serial == b.serial),
                }
            }
        }

        let distinct_scopes = {
            let mut seen = picks.clone();
            seen.sort_unstable();
            seen.dedup();
            seen.len()
        };
        let expected = match lifetime {
            Lifetime::Singleton => 1,
            Lifetime::Scoped => distinct_scopes,
            Lifetime::Transient => picks.len(),
        };
        prop_assert_eq!(built.load(Ordering::SeqCst), expected);
    }
}

proptest! {
    #[test]
    fn optional_dependency_matches_registration(registered in any::<bool>()) {
        struct Cache;
        struct Feed {
            cache: Option<Arc<Cache>>,
        }

        let container = ServiceContainer::new();
        if registered {
            container.register_singleton(|()| Arc::new(Cache)).unwrap();
        }
        container
            .register_transient(|cache: Option<Arc<Cache>>| Arc::new(Feed { cache }))
            .unwrap();

        let feed = container.get_required::<Feed>();
        prop_assert_eq!(feed.cache.is_some(), registered);
        prop_assert_eq!(container.try_get::<Cache>().unwrap().is_some(), registered);
    }
}

proptest! {
    #[test]
    fn disposal_count_matches_constructed_scoped_instances(
        resolutions in prop::collection::vec(any::<bool>(), 1..20),
    ) {
        use pulse_di::Dispose;

        static DISPOSED: AtomicUsize = AtomicUsize::new(0);

        struct Session;
        impl Dispose for Session {
            fn dispose(&self) {
                DISPOSED.fetch_add(1, Ordering::SeqCst);
            }
        }

        DISPOSED.store(0, Ordering::SeqCst);
        let container = ServiceContainer::new();
        container
            .register_disposable(Lifetime::Scoped, |()| Arc::new(Session))
            .unwrap();

        let mut expected = 0;
        for resolve in &resolutions {
            let scope = container.create_scope();
            if *resolve {
                scope.get_required::<Session>();
                scope.get_required::<Session>();
                expected += 1;
            }
            scope.dispose();
            scope.dispose();
        }
        prop_assert_eq!(DISPOSED.load(Ordering::SeqCst), expected);
    }
}
