//! Configuration for the session store and its reaper.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default staleness threshold (T). Entries untouched for longer are evicted.
pub const DEFAULT_STALENESS_THRESHOLD: Duration = Duration::from_secs(5);

/// Default scan period (P) between reaper passes.
pub const DEFAULT_SCAN_PERIOD: Duration = Duration::from_secs(5);

/// How a reaper pass holds the index lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReapMode {
    /// Collect candidates under one lock, then re-check and remove each
    /// candidate under its own short critical section.
    #[default]
    PerEntry,
    /// Scan and remove in a single critical section.
    SinglePass,
}

impl std::fmt::Display for ReapMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReapMode::PerEntry => write!(f, "per-entry"),
            ReapMode::SinglePass => write!(f, "single-pass"),
        }
    }
}

/// Configuration for the session store.
///
/// An entry last touched at `t` is readable at least until `t + T` and is
/// gone after the first pass at or past `t + T + 1s`, i.e. no later than
/// `t + T + P + 1s` (timestamps have whole-second resolution).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Minimum age past which an entry becomes eligible for eviction (T).
    /// Only whole seconds are significant.
    pub staleness_threshold: Duration,

    /// Interval between successive reaper passes (P).
    pub scan_period: Duration,

    /// Locking strategy used by each reaper pass.
    pub reap_mode: ReapMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            staleness_threshold: DEFAULT_STALENESS_THRESHOLD,
            scan_period: DEFAULT_SCAN_PERIOD,
            reap_mode: ReapMode::default(),
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the staleness threshold.
    pub fn with_staleness_threshold(mut self, threshold: Duration) -> Self {
        self.staleness_threshold = threshold;
        self
    }

    /// Set the scan period.
    pub fn with_scan_period(mut self, period: Duration) -> Self {
        self.scan_period = period;
        self
    }

    /// Set the reap mode.
    pub fn with_reap_mode(mut self, mode: ReapMode) -> Self {
        self.reap_mode = mode;
        self
    }

    /// Staleness threshold in whole seconds, as compared against timestamps.
    pub(crate) fn threshold_secs(&self) -> i64 {
        i64::try_from(self.staleness_threshold.as_secs()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_policy() {
        let config = StoreConfig::default();
        assert_eq!(config.staleness_threshold, Duration::from_secs(5));
        assert_eq!(config.scan_period, Duration::from_secs(5));
        assert_eq!(config.reap_mode, ReapMode::PerEntry);
    }

    #[test]
    fn test_builders() {
        let config = StoreConfig::new()
            .with_staleness_threshold(Duration::from_secs(30))
            .with_scan_period(Duration::from_secs(10))
            .with_reap_mode(ReapMode::SinglePass);

        assert_eq!(config.threshold_secs(), 30);
        assert_eq!(config.scan_period, Duration::from_secs(10));
        assert_eq!(config.reap_mode, ReapMode::SinglePass);
    }

    #[test]
    fn test_threshold_truncates_to_seconds() {
        let config = StoreConfig::new().with_staleness_threshold(Duration::from_millis(2_900));
        assert_eq!(config.threshold_secs(), 2);
    }

    #[test]
    fn test_reap_mode_serde_names() {
        let mode: ReapMode = serde_json::from_str("\"single-pass\"").unwrap();
        assert_eq!(mode, ReapMode::SinglePass);
        assert_eq!(ReapMode::PerEntry.to_string(), "per-entry");
    }
}
