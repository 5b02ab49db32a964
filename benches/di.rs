use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pulse_di::{BoxError, Dispose, Lifetime, Resolver, ServiceContainer};
use std::sync::Arc;

// ===== Micro Benchmarks =====

fn bench_singleton_hit(c: &mut Criterion) {
    let container = ServiceContainer::new();
    container.register_instance(Arc::new(42u64)).unwrap();

    // Prime the cache
    let _ = container.get::<u64>().unwrap();

    c.bench_function("singleton_hit_u64", |b| {
        b.iter(|| {
            let v = container.get::<u64>().unwrap();
            black_box(v);
        })
    });
}

fn bench_singleton_cold(c: &mut Criterion) {
    struct ExpensiveToCreate {
        data: Vec<u64>,
    }

    c.bench_function("singleton_cold_expensive", |b| {
        b.iter_batched(
            || {
                let container = ServiceContainer::new();
                container
                    .register_singleton(|()| {
                        Arc::new(ExpensiveToCreate {
                            data: (0..1000).collect(),
                        })
                    })
                    .unwrap();
                container
            },
            |container| {
                let v = container.get::<ExpensiveToCreate>().unwrap();
                black_box(v.data.len());
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_scoped_vs_transient(c: &mut Criterion) {
    struct Service {
        data: [u8; 64],
    }

    let mut group = c.benchmark_group("scoped_vs_transient");

    let scoped = ServiceContainer::new();
    scoped.register_scoped(|()| Arc::new(Service { data: [0; 64] })).unwrap();
    let scope = scoped.create_scope();
    let _ = scope.get::<Service>().unwrap();

    group.bench_function("scoped_hit", |b| {
        b.iter(|| {
            let v = scope.get::<Service>().unwrap();
            black_box(v.data[0]);
        })
    });

    let transient = ServiceContainer::new();
    transient
        .register_transient(|()| Arc::new(Service { data: [0; 64] }))
        .unwrap();

    group.bench_function("transient_construct", |b| {
        b.iter(|| {
            let v = transient.get::<Service>().unwrap();
            black_box(v.data[0]);
        })
    });

    group.finish();
}

fn bench_concrete_vs_trait(c: &mut Criterion) {
    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    struct SystemClock;
    impl Clock for SystemClock {
        fn now(&self) -> u64 {
            1
        }
    }

    let container = ServiceContainer::new();
    container.register_singleton(|()| Arc::new(SystemClock)).unwrap();
    container
        .register_singleton(|()| Arc::new(SystemClock) as Arc<dyn Clock>)
        .unwrap();

    let mut group = c.benchmark_group("concrete_vs_trait");

    group.bench_function("concrete", |b| {
        b.iter(|| black_box(container.get::<SystemClock>().unwrap().now()))
    });

    group.bench_function("trait_object", |b| {
        b.iter(|| black_box(container.get::<dyn Clock>().unwrap().now()))
    });

    group.finish();
}

// ===== Dependency Chains =====

fn bench_chain_depth(c: &mut Criterion) {
    struct L0;
    struct L1(#[allow(dead_code)] Arc<L0>);
    struct L2(#[allow(dead_code)] Arc<L1>);
    struct L3(#[allow(dead_code)] Arc<L2>);
    struct L4(#[allow(dead_code)] Arc<L3>);

    let mut group = c.benchmark_group("transient_chain");

    let container = ServiceContainer::new();
    container
        .register_transient(|()| Arc::new(L0))
        .unwrap()
        .register_transient(|d: Arc<L0>| Arc::new(L1(d)))
        .unwrap()
        .register_transient(|d: Arc<L1>| Arc::new(L2(d)))
        .unwrap()
        .register_transient(|d: Arc<L2>| Arc::new(L3(d)))
        .unwrap()
        .register_transient(|d: Arc<L3>| Arc::new(L4(d)))
        .unwrap();

    group.bench_with_input(BenchmarkId::new("depth", 1), &(), |b, _| {
        b.iter(|| black_box(container.get::<L1>().unwrap()))
    });
    group.bench_with_input(BenchmarkId::new("depth", 4), &(), |b, _| {
        b.iter(|| black_box(container.get::<L4>().unwrap()))
    });

    group.finish();
}

// ===== Scope Lifecycle =====

fn bench_scope_lifecycle(c: &mut Criterion) {
    struct DbSession;
    impl Dispose for DbSession {
        fn dispose(&self) {
            black_box(());
        }
    }

    let container = ServiceContainer::new();
    container
        .register_disposable(Lifetime::Scoped, |()| Arc::new(DbSession))
        .unwrap();

    let mut group = c.benchmark_group("scope_lifecycle");

    group.bench_function("create_and_dispose_empty", |b| {
        b.iter(|| {
            let scope = container.create_scope();
            scope.dispose();
        })
    });

    group.bench_function("create_resolve_dispose", |b| {
        b.iter(|| {
            let scope = container.create_scope();
            black_box(scope.get::<DbSession>().unwrap());
            scope.dispose();
        })
    });

    group.bench_function("with_scope", |b| {
        b.iter(|| {
            container.with_scope(|scope| black_box(scope.get::<DbSession>().unwrap()));
        })
    });

    group.finish();
}

// ===== Async Path =====

fn bench_async_resolution(c: &mut Criterion) {
    struct Pool;
    struct Session(#[allow(dead_code)] Arc<Pool>);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    let container = ServiceContainer::new();
    container
        .register_singleton_async(|()| async { Ok::<_, BoxError>(Arc::new(Pool)) })
        .unwrap()
        .register_scoped(|pool: Arc<Pool>| Arc::new(Session(pool)))
        .unwrap();

    let mut group = c.benchmark_group("async_resolution");

    group.bench_function("using_scope", |b| {
        b.iter(|| {
            runtime.block_on(container.using_scope(|scope| async move {
                black_box(scope.get_async::<Session>().await.unwrap());
            }))
        })
    });

    group.finish();
}

// ===== Contention =====

fn bench_contention(c: &mut Criterion) {
    struct Shared;

    let container = ServiceContainer::new();
    container.register_singleton(|()| Arc::new(Shared)).unwrap();
    let _ = container.get::<Shared>().unwrap();

    let mut group = c.benchmark_group("contention");

    for threads in [1usize, 4, 8] {
        group.bench_with_input(BenchmarkId::new("singleton_hit", threads), &threads, |b, &n| {
            b.iter(|| {
                std::thread::scope(|s| {
                    for _ in 0..n {
                        s.spawn(|| {
                            for _ in 0..100 {
                                black_box(container.get::<Shared>().unwrap());
                            }
                        });
                    }
                });
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_singleton_hit,
    bench_singleton_cold,
    bench_scoped_vs_transient,
    bench_concrete_vs_trait,
    bench_chain_depth,
    bench_scope_lifecycle,
    bench_async_resolution,
    bench_contention,
);
criterion_main!(benches);
