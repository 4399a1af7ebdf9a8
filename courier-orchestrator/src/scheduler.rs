//! Recurring poll timer
//!
//! Explicit scheduler loop: one tokio task per timer name, ticks executed
//! sequentially inside that task so two runs of the same task can never
//! overlap. `ensure` is idempotent (re-arming replaces the previous task)
//! and a drained outstanding set retires both the task and the persisted
//! batch marker so a stale timer cannot resurrect a finished session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, warn};

use crate::state::{ACTIVE_BATCH_KEY, OutstandingSet, StateError, StateStore};

/// Timer name used for the poll loop
pub const POLL_TASK: &str = "poll-outstanding";

/// Maintains at most one recurring task per name
pub struct TimerScheduler {
    state: Arc<dyn StateStore>,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TimerScheduler {
    pub fn new(state: Arc<dyn StateStore>) -> Self {
        Self {
            state,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Installs exactly one recurring task under `name`.
    ///
    /// Any existing task of that name is aborted first, so calling this
    /// twice leaves a single active timer. `tick` runs to completion once
    /// per period (the first run starts immediately) and returns whether
    /// polling should continue; when it returns `false` the task clears
    /// the batch marker and retires itself.
    pub fn ensure<F, Fut>(&self, name: &str, period: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap();

        if let Some(previous) = tasks.remove(name) {
            debug!(task = name, "replacing existing timer");
            previous.abort();
        }

        let state = Arc::clone(&self.state);
        let task_name = name.to_string();
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            loop {
                ticker.tick().await;
                if !tick().await {
                    if let Err(e) = state.clear(ACTIVE_BATCH_KEY) {
                        warn!(task = %task_name, error = %e, "failed to clear batch marker");
                    }
                    debug!(task = %task_name, "nothing outstanding, timer retired");
                    break;
                }
            }
        });

        tasks.insert(name.to_string(), handle);
    }

    /// Removes the named timer if the outstanding set has drained.
    ///
    /// Also clears the persisted batch marker. Returns whether the timer
    /// was (or already had been) retired.
    pub fn cancel_if_empty(&self, name: &str) -> Result<bool, StateError> {
        let set = OutstandingSet::load(self.state.as_ref())?;
        if !set.is_empty() {
            return Ok(false);
        }

        if let Some(handle) = self.tasks.lock().unwrap().remove(name) {
            handle.abort();
        }
        self.state.clear(ACTIVE_BATCH_KEY)?;

        Ok(true)
    }

    /// Whether a timer for `name` is currently installed and running
    pub fn is_active(&self, name: &str) -> bool {
        self.tasks
            .lock()
            .unwrap()
            .get(name)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Number of currently active timers
    pub fn active_timers(&self) -> usize {
        self.tasks
            .lock()
            .unwrap()
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Waits until the named timer retires (its tick reported no work
    /// left), then returns. A missing timer returns immediately.
    pub async fn join(&self, name: &str) {
        let handle = self.tasks.lock().unwrap().remove(name);
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FileStateStore;
    use courier_core::domain::ledger::LedgerRef;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn scheduler() -> (TempDir, Arc<FileStateStore>, TimerScheduler) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileStateStore::new(dir.path().join("state.json")));
        let scheduler = TimerScheduler::new(store.clone());
        (dir, store, scheduler)
    }

    #[tokio::test]
    async fn ensure_twice_leaves_one_active_timer() {
        let (_dir, _store, scheduler) = scheduler();

        let first_ticks = Arc::new(AtomicUsize::new(0));
        let counter = first_ticks.clone();
        scheduler.ensure(POLL_TASK, Duration::from_secs(3600), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { true }
        });

        let second_ticks = Arc::new(AtomicUsize::new(0));
        let counter = second_ticks.clone();
        scheduler.ensure(POLL_TASK, Duration::from_secs(3600), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { true }
        });

        // Let the replacement's immediate first tick run
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(scheduler.active_timers(), 1);
        assert!(scheduler.is_active(POLL_TASK));
        assert_eq!(second_ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timer_retires_itself_and_clears_the_marker_when_done() {
        let (_dir, store, scheduler) = scheduler();
        store.write(ACTIVE_BATCH_KEY, "batch-1").unwrap();

        scheduler.ensure(POLL_TASK, Duration::from_millis(1), || async { false });
        scheduler.join(POLL_TASK).await;

        assert!(!scheduler.is_active(POLL_TASK));
        assert!(store.read(ACTIVE_BATCH_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn cancel_if_empty_respects_outstanding_jobs() {
        let (_dir, store, scheduler) = scheduler();
        store.write(ACTIVE_BATCH_KEY, "batch-1").unwrap();

        let mut set = OutstandingSet::default();
        set.insert(crate::state::OutstandingEntry {
            job_id: "a".to_string(),
            table: LedgerRef::new("t1", "batch-1"),
            row_index: 1,
            action: "download".to_string(),
            submitted_at: chrono::Utc::now(),
        });
        set.save(store.as_ref()).unwrap();

        assert!(!scheduler.cancel_if_empty(POLL_TASK).unwrap());
        assert_eq!(
            store.read(ACTIVE_BATCH_KEY).unwrap().as_deref(),
            Some("batch-1")
        );

        set.remove("a");
        set.save(store.as_ref()).unwrap();

        assert!(scheduler.cancel_if_empty(POLL_TASK).unwrap());
        assert!(store.read(ACTIVE_BATCH_KEY).unwrap().is_none());
    }
}
