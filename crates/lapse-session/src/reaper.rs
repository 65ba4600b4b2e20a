//! Background eviction of stale sessions.
//!
//! The reaper wakes once per scan period and runs a single pass over the
//! store. It holds no lock while sleeping. The first pass happens one full
//! period after the reaper starts.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::store::StoreInner;

/// Shortest scan period the reaper will run with.
pub const MIN_SCAN_PERIOD: Duration = Duration::from_millis(1);

/// The reaper task shared by every handle to it.
#[derive(Debug)]
pub(crate) struct ReaperTask {
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReaperTask {
    fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
            && self
                .task
                .lock()
                .as_ref()
                .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for ReaperTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Slot recording the store's reaper, so at most one runs per store.
pub(crate) type ReaperSlot = Mutex<Weak<ReaperTask>>;

/// Handle to a running reaper task.
///
/// A store runs at most one reaper; every handle obtained while it runs
/// refers to the same task. The task is cancelled when any handle is
/// stopped or when the last handle is dropped.
#[derive(Debug)]
#[must_use = "dropping the handle stops the reaper"]
pub struct ReaperHandle {
    shared: Arc<ReaperTask>,
}

impl ReaperHandle {
    /// Whether the reaper task is still running.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Get a token that stops the reaper when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    /// Stop the reaper and wait for its task to finish.
    ///
    /// A pass already in progress completes before the task exits. A panic
    /// inside the reaper (e.g. from a caller-supplied clock) is re-raised.
    pub async fn stop(self) {
        self.shared.cancel.cancel();
        let task = self.shared.task.lock().take();
        if let Some(task) = task {
            match task.await {
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                // Cancelled by runtime shutdown, which is also a stop.
                _ => {}
            }
        }
    }
}

/// Start the store's reaper, or join the one already running.
pub(crate) fn spawn(
    slot: &ReaperSlot,
    store: Weak<StoreInner>,
    period: Duration,
) -> ReaperHandle {
    let mut current = slot.lock();
    if let Some(shared) = current.upgrade().filter(|shared| shared.is_running()) {
        debug!("Session reaper already running, sharing handle");
        return ReaperHandle { shared };
    }

    let cancel = CancellationToken::new();
    let task = tokio::spawn(run(store, period.max(MIN_SCAN_PERIOD), cancel.clone()));
    let shared = Arc::new(ReaperTask {
        cancel,
        task: Mutex::new(Some(task)),
    });
    *current = Arc::downgrade(&shared);

    ReaperHandle { shared }
}

async fn run(store: Weak<StoreInner>, period: Duration, cancel: CancellationToken) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so passes start one
    // period from now.
    ticker.tick().await;

    info!(scan_period = ?period, "Session reaper started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Session reaper stopped");
                break;
            }
            _ = ticker.tick() => {
                let Some(inner) = store.upgrade() else {
                    debug!("Session store dropped, reaper exiting");
                    break;
                };
                let evicted = inner.reap();
                debug!(evicted = evicted, "Reaper pass complete");
            }
        }
    }
}
