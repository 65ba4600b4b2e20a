//! Session store with time-based eviction.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::config::{ReapMode, StoreConfig};
use crate::entry::{Payload, SessionEntry};
use crate::error::{Error, Result};
use crate::id::{self, EntropySource, OsEntropy, SessionId};
use crate::reaper::{self, ReaperHandle, ReaperSlot};

/// Attempts at drawing an unused identifier before `create` gives up.
const MAX_ID_ATTEMPTS: usize = 8;

/// State shared between store handles and the reaper.
pub(crate) struct StoreInner {
    /// The index. Every read and mutation happens under this lock.
    sessions: Mutex<HashMap<String, SessionEntry>>,

    config: StoreConfig,
    clock: Box<dyn Clock>,
    entropy: Box<dyn EntropySource>,

    /// Running total of reaper evictions.
    evicted_total: AtomicU64,

    /// The reaper currently running for this store, if any.
    reaper: ReaperSlot,
}

impl StoreInner {
    /// Run one reaper pass, returning how many entries were evicted.
    pub(crate) fn reap(&self) -> usize {
        let threshold = self.config.threshold_secs();

        let evicted = match self.config.reap_mode {
            ReapMode::SinglePass => self.reap_single_pass(threshold),
            ReapMode::PerEntry => self
                .stale_candidates(threshold)
                .into_iter()
                .filter(|session_id| self.evict_if_stale(session_id, threshold))
                .count(),
        };

        if evicted > 0 {
            self.evicted_total.fetch_add(evicted as u64, Ordering::Relaxed);
            info!(
                evicted = evicted,
                remaining = self.sessions.lock().len(),
                "Reaped stale sessions"
            );
        }

        evicted
    }

    fn reap_single_pass(&self, threshold: i64) -> usize {
        let mut sessions = self.sessions.lock();
        let now = self.clock.now();
        let before = sessions.len();

        sessions.retain(|session_id, entry| {
            let stale = entry.is_stale(now, threshold);
            if stale {
                debug!(session_id = %session_id, age = entry.age(now), "Evicting stale session");
            }
            !stale
        });

        before - sessions.len()
    }

    /// Collect the ids that look stale right now.
    ///
    /// The result is only a candidate list: each id must be re-checked under
    /// the lock before it is removed.
    pub(crate) fn stale_candidates(&self, threshold: i64) -> Vec<String> {
        let sessions = self.sessions.lock();
        let now = self.clock.now();

        sessions
            .iter()
            .filter(|(_, entry)| entry.is_stale(now, threshold))
            .map(|(session_id, _)| session_id.clone())
            .collect()
    }

    /// Remove `session_id` if it is still stale under the lock.
    pub(crate) fn evict_if_stale(&self, session_id: &str, threshold: i64) -> bool {
        let mut sessions = self.sessions.lock();
        let now = self.clock.now();

        match sessions.get(session_id) {
            Some(entry) if entry.is_stale(now, threshold) => {
                debug!(session_id = %session_id, age = entry.age(now), "Evicting stale session");
                sessions.remove(session_id);
                true
            }
            Some(_) => {
                trace!(session_id = %session_id, "Session refreshed during scan, keeping");
                false
            }
            None => false,
        }
    }
}

/// In-memory session store.
///
/// Sessions are addressed by an unguessable [`SessionId`] and hold a
/// [`Payload`]. Only [`update`](Self::update) refreshes a session; reads do
/// not. A background reaper (see [`spawn_reaper`](Self::spawn_reaper))
/// evicts sessions that have not been updated within the configured
/// staleness threshold.
///
/// Cloning is cheap; clones share the same index.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    /// Create a store using the system entropy source and a monotonic clock.
    pub fn new(config: StoreConfig) -> Self {
        Self::builder(config).build()
    }

    /// Start building a store with custom collaborators.
    pub fn builder(config: StoreConfig) -> StoreBuilder {
        StoreBuilder::new(config)
    }

    /// Get the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Create a new, empty session and return its identifier.
    pub fn create(&self) -> Result<SessionId> {
        for attempt in 1..=MAX_ID_ATTEMPTS {
            // Drawn outside the lock.
            let session_id = id::generate(self.inner.entropy.as_ref())?;

            let mut sessions = self.inner.sessions.lock();
            if sessions.contains_key(session_id.as_str()) {
                warn!(attempt = attempt, "Generated session id already in use, retrying");
                continue;
            }

            let now = self.inner.clock.now();
            sessions.insert(session_id.to_string(), SessionEntry::new(now));
            let store_size = sessions.len();
            drop(sessions);

            debug!(
                session_id = %session_id,
                created_at = now,
                store_size = store_size,
                "Session created"
            );
            return Ok(session_id);
        }

        Err(Error::IdentifierGeneration(format!(
            "no unused identifier after {MAX_ID_ATTEMPTS} attempts"
        )))
    }

    /// Get a snapshot of a session's payload.
    ///
    /// Does not refresh the session.
    pub fn read(&self, session_id: &str) -> Result<Payload> {
        let sessions = self.inner.sessions.lock();
        match sessions.get(session_id) {
            Some(entry) => {
                trace!(session_id = %session_id, "Session read");
                Ok(entry.payload.clone())
            }
            None => Err(Error::NotFound(session_id.to_string())),
        }
    }

    /// Replace a session's payload and refresh its timestamp.
    pub fn update(&self, session_id: &str, payload: Payload) -> Result<()> {
        let mut sessions = self.inner.sessions.lock();
        let Some(entry) = sessions.get_mut(session_id) else {
            return Err(Error::NotFound(session_id.to_string()));
        };

        let now = self.inner.clock.now();
        entry.touch(payload, now);
        trace!(session_id = %session_id, last_touched = entry.last_touched, "Session updated");

        Ok(())
    }

    /// Remove a session, returning its final payload.
    pub fn delete(&self, session_id: &str) -> Result<Payload> {
        let removed = self.inner.sessions.lock().remove(session_id);
        match removed {
            Some(entry) => {
                debug!(session_id = %session_id, "Session deleted");
                Ok(entry.payload)
            }
            None => Err(Error::NotFound(session_id.to_string())),
        }
    }

    /// Get a snapshot of a session's payload and timestamps.
    ///
    /// Does not refresh the session.
    pub fn entry(&self, session_id: &str) -> Result<SessionEntry> {
        self.inner
            .sessions
            .lock()
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(session_id.to_string()))
    }

    /// Check if a session is currently live.
    pub fn contains(&self, session_id: &str) -> bool {
        self.inner.sessions.lock().contains_key(session_id)
    }

    /// Get the current number of live sessions.
    pub fn len(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.sessions.lock().is_empty()
    }

    /// Get store statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            size: self.len(),
            evicted_total: self.inner.evicted_total.load(Ordering::Relaxed),
            staleness_threshold: self.inner.config.staleness_threshold,
            scan_period: self.inner.config.scan_period,
        }
    }

    /// Run a single reaper pass now, returning how many sessions were evicted.
    pub fn reap(&self) -> usize {
        self.inner.reap()
    }

    /// Start the background reaper on the current tokio runtime.
    ///
    /// A store runs at most one reaper. While one is running, further calls
    /// return another handle to it instead of starting a second task. The
    /// reaper runs until a handle is stopped, the last handle is dropped, or
    /// every handle to this store is gone.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use = "dropping the handle stops the reaper"]
    pub fn spawn_reaper(&self) -> ReaperHandle {
        reaper::spawn(
            &self.inner.reaper,
            Arc::downgrade(&self.inner),
            self.inner.config.scan_period,
        )
    }

    #[cfg(test)]
    pub(crate) fn inner(&self) -> &StoreInner {
        &self.inner
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("config", &self.inner.config)
            .field("size", &self.len())
            .finish()
    }
}

/// Builder for [`SessionStore`] with pluggable clock and entropy.
pub struct StoreBuilder {
    config: StoreConfig,
    clock: Option<Box<dyn Clock>>,
    entropy: Option<Box<dyn EntropySource>>,
}

impl StoreBuilder {
    /// Create a builder with the given configuration.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            clock: None,
            entropy: None,
        }
    }

    /// Use `clock` for timestamps (default: [`MonotonicClock`]).
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Use `entropy` for identifier generation (default: [`OsEntropy`]).
    pub fn entropy(mut self, entropy: impl EntropySource) -> Self {
        self.entropy = Some(Box::new(entropy));
        self
    }

    /// Build the store.
    pub fn build(self) -> SessionStore {
        let inner = StoreInner {
            sessions: Mutex::new(HashMap::new()),
            config: self.config,
            clock: self.clock.unwrap_or_else(|| Box::new(MonotonicClock::new())),
            entropy: self.entropy.unwrap_or_else(|| Box::new(OsEntropy)),
            evicted_total: AtomicU64::new(0),
            reaper: ReaperSlot::default(),
        };

        SessionStore {
            inner: Arc::new(inner),
        }
    }
}

/// Store statistics.
#[derive(Debug, Clone)]
pub struct StoreStats {
    /// Current number of live sessions.
    pub size: usize,

    /// Sessions evicted by the reaper since the store was created.
    pub evicted_total: u64,

    /// Configured staleness threshold.
    pub staleness_threshold: Duration,

    /// Configured scan period.
    pub scan_period: Duration,
}
