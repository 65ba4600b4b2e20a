//! In-memory session store with time-based eviction.
//!
//! This crate provides a thread-safe session store where:
//! - Sessions are addressed by unguessable random identifiers
//! - Each session holds a caller-defined JSON payload
//! - Updates refresh a session's timestamp; reads do not
//! - A background reaper evicts sessions that have gone stale
//!
//! An entry last touched at `t` is guaranteed readable before `t + T` and
//! guaranteed gone by `t + T + P` (plus up to one second of timestamp
//! rounding), where T is the staleness threshold and P the scan period.
//!
//! # Example
//!
//! ```rust,ignore
//! use lapse_session::{SessionStore, StoreConfig};
//!
//! let store = SessionStore::new(StoreConfig::default());
//! let reaper = store.spawn_reaper();
//!
//! let id = store.create()?;
//! let mut data = lapse_session::Payload::new();
//! data.insert("website".into(), "longhoang.de".into());
//! store.update(&id, data)?;
//!
//! reaper.stop().await;
//! ```

mod clock;
mod config;
mod entry;
mod error;
mod id;
mod reaper;
mod store;

pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use config::{DEFAULT_SCAN_PERIOD, DEFAULT_STALENESS_THRESHOLD, ReapMode, StoreConfig};
pub use entry::{Payload, SessionEntry};
pub use error::{Error, Result};
pub use id::{EntropySource, ID_BYTES, OsEntropy, SessionId};
pub use reaper::{MIN_SCAN_PERIOD, ReaperHandle};
pub use store::{SessionStore, StoreBuilder, StoreStats};
