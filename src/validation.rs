//! Startup validation of container registrations.
//!
//! Walks every descriptor's declared dependencies without constructing
//! anything. Cycle detection is out of scope; cycles are cut short and
//! reported by the resolution depth limit at runtime instead.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::container::ServiceContainer;
use crate::descriptors::ServiceDescriptor;
use crate::key::ServiceKey;
use crate::lifetime::Lifetime;

/// A registration that cannot resolve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required dependency has no descriptor.
    #[error("{service} depends on {dependency}, which is not registered")]
    MissingDependency {
        service: ServiceKey,
        dependency: ServiceKey,
    },
}

/// A registration that resolves, but probably not the way it was meant to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationWarning {
    /// A singleton holds on to a scoped instance (possibly through transient
    /// services) past the end of the scope it came from.
    #[error("singleton {singleton} captures scoped service {scoped}")]
    SingletonCapturesScoped {
        singleton: ServiceKey,
        scoped: ServiceKey,
    },

    /// A synchronous factory can only be resolved on the async path, because
    /// something it depends on has an async factory.
    #[error("{service} has a sync factory but depends on async-only {dependency}")]
    SyncDependsOnAsync {
        service: ServiceKey,
        dependency: ServiceKey,
    },
}

/// Result of [`ServiceContainer::validate`].
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Problems that make resolution fail.
    pub errors: Vec<ValidationError>,
    /// Configurations that resolve but are likely mistakes.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    /// `true` when there are no errors. Warnings do not count.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

impl ServiceContainer {
    /// Checks every registration's declared dependencies.
    ///
    /// # Examples
    ///
    /// ```
    /// use pulse_di::{ServiceContainer, ValidationError, ValidationWarning, ServiceKey};
    /// use std::sync::Arc;
    ///
    /// struct Engine;
    /// struct DbSession;
    /// struct Cache;
    /// struct Stats;
    ///
    /// let container = ServiceContainer::new();
    /// container.register_scoped(|()| Arc::new(DbSession)).unwrap();
    /// container.register_singleton(|_: Arc<DbSession>| Arc::new(Cache)).unwrap();
    /// container.register_singleton(|_: Arc<Engine>| Arc::new(Stats)).unwrap();
    ///
    /// let report = container.validate();
    /// assert!(!report.is_ok());
    /// assert_eq!(
    ///     report.errors,
    ///     vec![ValidationError::MissingDependency {
    ///         service: ServiceKey::of::<Stats>(),
    ///         dependency: ServiceKey::of::<Engine>(),
    ///     }]
    /// );
    /// assert_eq!(
    ///     report.warnings,
    ///     vec![ValidationWarning::SingletonCapturesScoped {
    ///         singleton: ServiceKey::of::<Cache>(),
    ///         scoped: ServiceKey::of::<DbSession>(),
    ///     }]
    /// );
    /// ```
    pub fn validate(&self) -> ValidationReport {
        let descriptors = self.descriptors();
        let by_key: HashMap<ServiceKey, &ServiceDescriptor> =
            descriptors.iter().map(|d| (d.key(), d)).collect();
        let mut report = ValidationReport::default();
        let mut async_only = HashMap::new();

        for descriptor in &descriptors {
            let service = descriptor.key();

            for dep in descriptor.dependencies() {
                match by_key.get(&dep.key) {
                    None if !dep.optional => {
                        report.errors.push(ValidationError::MissingDependency {
                            service,
                            dependency: dep.key,
                        });
                    }
                    Some(_)
                        if !descriptor.requires_async()
                            && is_async_only(dep.key, &by_key, &mut async_only, &mut HashSet::new()) =>
                    {
                        report.warnings.push(ValidationWarning::SyncDependsOnAsync {
                            service,
                            dependency: dep.key,
                        });
                    }
                    _ => {}
                }
            }

            if descriptor.lifetime() == Lifetime::Singleton {
                let mut seen = HashSet::new();
                for scoped in captured_scoped(descriptor, &by_key, &mut seen) {
                    report.warnings.push(ValidationWarning::SingletonCapturesScoped {
                        singleton: service,
                        scoped,
                    });
                }
            }
        }

        report
    }
}

/// Whether `key` can only be built on the async path. Memoized; keys on the
/// current walk count as sync so cycles terminate.
fn is_async_only(
    key: ServiceKey,
    by_key: &HashMap<ServiceKey, &ServiceDescriptor>,
    memo: &mut HashMap<ServiceKey, bool>,
    visiting: &mut HashSet<ServiceKey>,
) -> bool {
    if let Some(known) = memo.get(&key) {
        return *known;
    }
    let Some(descriptor) = by_key.get(&key) else {
        return false;
    };
    if !visiting.insert(key) {
        return false;
    }
    let result = descriptor.requires_async()
        || descriptor
            .dependencies()
            .iter()
            .any(|dep| is_async_only(dep.key, by_key, memo, visiting));
    visiting.remove(&key);
    memo.insert(key, result);
    result
}

/// Scoped keys reachable from `descriptor` directly or through transients.
fn captured_scoped(
    descriptor: &ServiceDescriptor,
    by_key: &HashMap<ServiceKey, &ServiceDescriptor>,
    seen: &mut HashSet<ServiceKey>,
) -> Vec<ServiceKey> {
    let mut found = Vec::new();
    for dep in descriptor.dependencies() {
        if !seen.insert(dep.key) {
            continue;
        }
        let Some(target) = by_key.get(&dep.key) else {
            continue;
        };
        match target.lifetime() {
            Lifetime::Scoped => found.push(dep.key),
            Lifetime::Transient => found.extend(captured_scoped(target, by_key, seen)),
            Lifetime::Singleton => {}
        }
    }
    found
}
