//! Once-only instance slots backing the singleton and scoped caches.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::{Condvar, Mutex};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::Notify;

use super::AnyArc;
use crate::error::DiResult;
use crate::key::ServiceKey;

/// Who is currently running the slot's factory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Building {
    #[default]
    Idle,
    Sync,
    Async,
}

/// A cache entry that is filled at most once.
///
/// The value is only stored after construction succeeds, so a failed or
/// cancelled construction leaves the slot empty and the next resolution
/// retries. Sync and async resolutions share one construction gate: whoever
/// claims it builds, everyone else waits for the stored value.
#[derive(Default)]
pub(crate) struct InstanceSlot {
    cell: OnceCell<AnyArc>,
    building: Mutex<Building>,
    built: Condvar,
    built_async: Notify,
}

enum Claim<'a> {
    Ready(AnyArc),
    Build(BuildClaim<'a>),
    Unguarded,
}

/// Holds the construction gate; releasing it wakes every waiter, including
/// when the builder fails, panics or is cancelled.
struct BuildClaim<'a> {
    slot: &'a InstanceSlot,
}

impl Drop for BuildClaim<'_> {
    fn drop(&mut self) {
        *self.slot.building.lock() = Building::Idle;
        self.slot.built.notify_all();
        self.slot.built_async.notify_waiters();
    }
}

impl InstanceSlot {
    pub(crate) fn get(&self) -> Option<AnyArc> {
        self.cell.get().cloned()
    }

    /// Returns the cached value, constructing it with `init` on a miss.
    ///
    /// The boolean is `true` only for the call whose value was stored. Pass
    /// `guarded = false` when the caller is already constructing this slot
    /// further up the same resolution chain.
    pub(crate) fn get_or_try_init<F>(&self, guarded: bool, init: F) -> DiResult<(AnyArc, bool)>
    where
        F: FnOnce() -> DiResult<AnyArc>,
    {
        if let Some(value) = self.cell.get() {
            return Ok((value.clone(), false));
        }
        if !guarded {
            return init().map(|value| self.store(value));
        }
        match self.claim_blocking() {
            Claim::Ready(value) => Ok((value, false)),
            Claim::Build(_claim) => init().map(|value| self.store(value)),
            Claim::Unguarded => init().map(|value| self.store(value)),
        }
    }

    /// Async counterpart of [`get_or_try_init`](Self::get_or_try_init).
    pub(crate) async fn get_or_try_init_async<Fut>(
        &self,
        guarded: bool,
        init: Fut,
    ) -> DiResult<(AnyArc, bool)>
    where
        Fut: Future<Output = DiResult<AnyArc>>,
    {
        if let Some(value) = self.cell.get() {
            return Ok((value.clone(), false));
        }
        if !guarded {
            return init.await.map(|value| self.store(value));
        }
        let _claim = loop {
            let mut built = std::pin::pin!(self.built_async.notified());
            built.as_mut().enable();
            {
                let mut building = self.building.lock();
                if let Some(value) = self.cell.get() {
                    return Ok((value.clone(), false));
                }
                if *building == Building::Idle {
                    *building = Building::Async;
                    break BuildClaim { slot: self };
                }
            }
            built.await;
        };
        init.await.map(|value| self.store(value))
    }

    fn claim_blocking(&self) -> Claim<'_> {
        let mut building = self.building.lock();
        loop {
            if let Some(value) = self.cell.get() {
                return Claim::Ready(value.clone());
            }
            match *building {
                Building::Idle => {
                    *building = Building::Sync;
                    return Claim::Build(BuildClaim { slot: self });
                }
                // Parking the only runtime thread would stall the async builder.
                Building::Async if on_current_thread_runtime() => return Claim::Unguarded,
                _ => self.built.wait(&mut building),
            }
        }
    }

    fn store(&self, value: AnyArc) -> (AnyArc, bool) {
        match self.cell.try_insert(value) {
            Ok(stored) => (stored.clone(), true),
            Err((existing, _rejected)) => (existing.clone(), false),
        }
    }
}

fn on_current_thread_runtime() -> bool {
    Handle::try_current()
        .map(|handle| handle.runtime_flavor() == RuntimeFlavor::CurrentThread)
        .unwrap_or(false)
}

/// Key to slot map shared by the container (singletons) and each scope.
#[derive(Default)]
pub(crate) struct SlotMap {
    slots: Mutex<HashMap<ServiceKey, Arc<InstanceSlot>>>,
}

impl SlotMap {
    pub(crate) fn slot(&self, key: ServiceKey) -> Arc<InstanceSlot> {
        self.slots.lock().entry(key).or_default().clone()
    }

    /// Number of slots holding a constructed instance.
    pub(crate) fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    pub(crate) fn clear(&self) {
        let drained: Vec<_> = self.slots.lock().drain().collect();
        drop(drained);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn value(n: usize) -> AnyArc {
        Arc::new(Arc::new(n))
    }

    #[test]
    fn constructs_once() {
        let slot = InstanceSlot::default();
        let calls = AtomicUsize::new(0);
        let init = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(value(7))
        };

        let (first, created) = slot.get_or_try_init(true, init).unwrap();
        assert!(created);
        let (second, created) = slot
            .get_or_try_init(true, || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(value(8))
            })
            .unwrap();
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failure_leaves_slot_empty() {
        let slot = InstanceSlot::default();
        let key = ServiceKey::of::<usize>();
        let err = slot.get_or_try_init(true, || Err(DiError::Unregistered(key)));
        assert!(err.is_err());
        assert!(slot.get().is_none());

        let (_, created) = slot.get_or_try_init(true, || Ok(value(1))).unwrap();
        assert!(created);
    }

    #[tokio::test]
    async fn cancelled_async_init_leaves_slot_empty() {
        let slot = Arc::new(InstanceSlot::default());
        let pending = {
            let slot = slot.clone();
            tokio::spawn(async move {
                slot.get_or_try_init_async(true, async {
                    std::future::pending::<()>().await;
                    Ok(value(1))
                })
                .await
            })
        };
        tokio::task::yield_now().await;
        pending.abort();
        let _ = pending.await;
        assert!(slot.get().is_none());

        let (_, created) = slot
            .get_or_try_init_async(true, async { Ok(value(2)) })
            .await
            .unwrap();
        assert!(created);
    }

    #[test]
    fn concurrent_sync_resolutions_wait_for_the_builder() {
        let slot = Arc::new(InstanceSlot::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let slot = slot.clone();
                let calls = calls.clone();
                std::thread::spawn(move || {
                    slot.get_or_try_init(true, || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(20));
                        Ok(value(5))
                    })
                    .unwrap()
                    .0
                })
            })
            .collect();
        let values: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn async_resolution_waits_for_a_sync_builder() {
        let slot = Arc::new(InstanceSlot::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let builder = {
            let slot = slot.clone();
            let calls = calls.clone();
            std::thread::spawn(move || {
                slot.get_or_try_init(true, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(50));
                    Ok(value(1))
                })
                .unwrap()
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let (waited, created) = slot
            .get_or_try_init_async(true, async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(value(2))
            })
            .await
            .unwrap();
        let (built, _) = builder.join().unwrap();

        assert!(!created);
        assert!(Arc::ptr_eq(&waited, &built));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn slot_map_counts_filled_slots() {
        let map = SlotMap::default();
        let key = ServiceKey::of::<usize>();
        assert_eq!(map.len(), 0);
        map.slot(key).get_or_try_init(true, || Ok(value(3))).unwrap();
        map.slot(ServiceKey::of::<u8>());
        assert_eq!(map.len(), 1);
        map.clear();
        assert_eq!(map.len(), 0);
        assert!(map.slot(key).get().is_none());
    }
}
