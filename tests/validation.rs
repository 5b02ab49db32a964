use pulse_di::{
    BoxError, Injectable, ServiceContainer, ServiceKey, ValidationError, ValidationWarning,
};
use std::sync::Arc;

struct Settings;
struct Engine;
struct DbSession;
struct Metrics;

struct WorkoutRepository {
    _session: Arc<DbSession>,
    _metrics: Option<Arc<Metrics>>,
}

impl Injectable for WorkoutRepository {
    type Deps = (Arc<DbSession>, Option<Arc<Metrics>>);

    fn inject((session, metrics): Self::Deps) -> Self {
        Self {
            _session: session,
            _metrics: metrics,
        }
    }
}

#[test]
fn application_graph_validates() {
    let container = ServiceContainer::new();
    container
        .register_instance(Arc::new(Settings))
        .unwrap()
        .register_singleton_async(|_: Arc<Settings>| async { Ok::<_, BoxError>(Arc::new(Engine)) })
        .unwrap()
        .register_scoped_async(|_: Arc<Engine>| async { Ok::<_, BoxError>(Arc::new(DbSession)) })
        .unwrap()
        .register_transient_type::<WorkoutRepository, WorkoutRepository>()
        .unwrap();

    let report = container.validate();
    assert!(report.is_ok(), "{:?}", report.errors);
    // The repository's factory is sync but its session is async-only.
    assert_eq!(
        report.warnings,
        vec![ValidationWarning::SyncDependsOnAsync {
            service: ServiceKey::of::<WorkoutRepository>(),
            dependency: ServiceKey::of::<DbSession>(),
        }]
    );
}

#[test]
fn every_missing_dependency_is_reported() {
    let container = ServiceContainer::new();
    container
        .register_transient_type::<WorkoutRepository, WorkoutRepository>()
        .unwrap()
        .register_singleton(|(_, _): (Arc<Settings>, Arc<Metrics>)| Arc::new(Engine))
        .unwrap();

    let report = container.validate();
    assert!(!report.is_ok());
    assert_eq!(
        report.errors,
        vec![
            ValidationError::MissingDependency {
                service: ServiceKey::of::<WorkoutRepository>(),
                dependency: ServiceKey::of::<DbSession>(),
            },
            ValidationError::MissingDependency {
                service: ServiceKey::of::<Engine>(),
                dependency: ServiceKey::of::<Settings>(),
            },
            ValidationError::MissingDependency {
                service: ServiceKey::of::<Engine>(),
                dependency: ServiceKey::of::<Metrics>(),
            },
        ]
    );
    assert!(report.errors[0].to_string().contains("not registered"));
}

#[test]
fn validation_does_not_construct_anything() {
    let container = ServiceContainer::new();
    container
        .register_singleton(|()| -> Arc<Engine> { panic!("constructed during validation") })
        .unwrap();

    assert!(container.validate().is_ok());
    assert_eq!(container.singleton_count(), 0);
}
