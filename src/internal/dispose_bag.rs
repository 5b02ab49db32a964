//! Internal disposal bag for managing cleanup hooks.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::debug;

/// Future type for disposal operations.
pub(crate) type BoxFutureUnit = Pin<Box<dyn Future<Output = ()> + Send>>;

pub(crate) type SyncHook = Box<dyn FnOnce() + Send>;
pub(crate) type AsyncHook = Box<dyn FnOnce() -> BoxFutureUnit + Send>;

/// A single disposal hook bound to a constructed instance.
pub(crate) enum Hook {
    Sync(SyncHook),
    Async(AsyncHook),
}

/// Disposal hooks for one owner (the container or a scope), run LIFO.
///
/// Async hooks are executed first, followed by sync hooks. Every hook is
/// consumed when it runs, so a bag can only ever fire a hook once.
#[derive(Default)]
pub(crate) struct DisposeBag {
    sync: Vec<SyncHook>,
    asyncs: Vec<AsyncHook>,
}

impl DisposeBag {
    pub(crate) fn push_sync(&mut self, f: SyncHook) {
        self.sync.push(f);
    }

    pub(crate) fn push_async(&mut self, f: AsyncHook) {
        self.asyncs.push(f);
    }

    pub(crate) fn push(&mut self, hook: Hook) {
        match hook {
            Hook::Sync(f) => self.push_sync(f),
            Hook::Async(f) => self.push_async(f),
        }
    }

    /// Execute all sync hooks in reverse order (LIFO).
    pub(crate) fn run_all_sync_reverse(&mut self) {
        while let Some(f) = self.sync.pop() {
            (f)();
        }
    }

    /// Execute all async hooks in reverse order (LIFO).
    pub(crate) async fn run_all_async_reverse(&mut self) {
        while let Some(f) = self.asyncs.pop() {
            (f)().await;
        }
    }

    /// Full teardown: async hooks, then sync hooks.
    ///
    /// If the returned future is dropped part way through, the hooks that
    /// have not started yet are handed to [`run_detached`](Self::run_detached).
    pub(crate) async fn run_all(self) {
        let mut teardown = Teardown { bag: self };
        teardown.bag.run_all_async_reverse().await;
        teardown.bag.run_all_sync_reverse();
    }

    /// Sync-only teardown. Returns how many async hooks were discarded.
    pub(crate) fn run_sync_discarding_async(mut self) -> usize {
        let dropped = self.asyncs.len();
        self.asyncs.clear();
        self.run_all_sync_reverse();
        dropped
    }

    /// Teardown from a context that cannot await.
    ///
    /// When async hooks are pending and a tokio runtime is reachable, the whole
    /// bag moves onto a spawned task so the async-then-sync order holds.
    /// Otherwise sync hooks run inline and the number of discarded async hooks
    /// is returned.
    pub(crate) fn run_detached(self) -> usize {
        if self.asyncs.is_empty() {
            return self.run_sync_discarding_async();
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(self.run_all());
                0
            }
            Err(_) => self.run_sync_discarding_async(),
        }
    }

    /// Check if the bag is empty (no disposers registered).
    pub(crate) fn is_empty(&self) -> bool {
        self.sync.is_empty() && self.asyncs.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.sync.len() + self.asyncs.len()
    }
}

/// Hooks still owed by an in-flight [`DisposeBag::run_all`].
struct Teardown {
    bag: DisposeBag,
}

impl Drop for Teardown {
    fn drop(&mut self) {
        if self.bag.is_empty() {
            return;
        }
        let remaining = self.bag.len();
        let dropped = std::mem::take(&mut self.bag).run_detached();
        debug!(remaining, dropped, "disposal interrupted, finishing detached");
    }
}

/// A dispose bag plus the flag that closes it.
///
/// Once [`begin`](Self::begin) hands the bag out, later hooks no longer queue
/// up: they run straight away in detached mode, so nothing registered after
/// disposal is lost.
#[derive(Default)]
pub(crate) struct DisposeState {
    bag: Mutex<DisposeBag>,
    disposed: AtomicBool,
}

impl DisposeState {
    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub(crate) fn push(&self, hook: Hook) {
        let mut bag = self.bag.lock();
        if !self.is_disposed() {
            bag.push(hook);
            return;
        }
        drop(bag);
        let mut late = DisposeBag::default();
        late.push(hook);
        late.run_detached();
    }

    /// Closes the state and returns the pending hooks. `None` if it was
    /// already closed.
    pub(crate) fn begin(&self) -> Option<DisposeBag> {
        let mut bag = self.bag.lock();
        if self.disposed.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(std::mem::take(&mut *bag))
    }

    pub(crate) fn pending(&self) -> usize {
        self.bag.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> SyncHook) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handle = log.clone();
        let make = move |name: &'static str| -> SyncHook {
            let log = handle.clone();
            Box::new(move || log.lock().unwrap().push(name))
        };
        (log, make)
    }

    #[test]
    fn sync_hooks_run_lifo() {
        let (log, make) = recorder();
        let mut bag = DisposeBag::default();
        bag.push_sync(make("first"));
        bag.push_sync(make("second"));
        bag.push_sync(make("third"));
        assert_eq!(bag.len(), 3);

        bag.run_all_sync_reverse();
        assert!(bag.is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn async_hooks_run_before_sync_hooks() {
        let (log, make) = recorder();
        let mut bag = DisposeBag::default();
        bag.push_sync(make("sync"));
        let async_log = log.clone();
        bag.push_async(Box::new(move || -> BoxFutureUnit {
            Box::pin(async move { async_log.lock().unwrap().push("async") })
        }));

        bag.run_all().await;
        assert_eq!(*log.lock().unwrap(), vec!["async", "sync"]);
    }

    #[test]
    fn state_hands_out_the_bag_once() {
        let (log, make) = recorder();
        let state = DisposeState::default();
        state.push(Hook::Sync(make("early")));
        assert_eq!(state.pending(), 1);

        let bag = state.begin().unwrap();
        assert!(state.is_disposed());
        assert!(state.begin().is_none());
        bag.run_sync_discarding_async();

        state.push(Hook::Sync(make("late")));
        assert_eq!(*log.lock().unwrap(), vec!["early", "late"]);
    }

    #[tokio::test]
    async fn interrupted_teardown_still_runs_pending_hooks() {
        let (log, make) = recorder();
        let mut bag = DisposeBag::default();
        bag.push_sync(make("sync"));
        let later = log.clone();
        bag.push_async(Box::new(move || -> BoxFutureUnit {
            Box::pin(async move { later.lock().unwrap().push("later async") })
        }));
        bag.push_async(Box::new(|| -> BoxFutureUnit {
            Box::pin(std::future::pending::<()>())
        }));

        let interrupted =
            tokio::time::timeout(std::time::Duration::from_millis(10), bag.run_all()).await;
        assert!(interrupted.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(*log.lock().unwrap(), vec!["later async", "sync"]);
    }

    #[test]
    fn detached_without_runtime_discards_async_hooks() {
        let (log, make) = recorder();
        let mut bag = DisposeBag::default();
        bag.push_sync(make("sync"));
        bag.push_async(Box::new(|| -> BoxFutureUnit { Box::pin(async {}) }));

        assert_eq!(bag.run_detached(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["sync"]);
    }
}
