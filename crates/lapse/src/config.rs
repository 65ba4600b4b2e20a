//! Configuration file loading for the lapse host.
//!
//! Discovery order (first match wins):
//! 1. Path given with `--config` / `LAPSE_CONFIG` (must exist)
//! 2. `./lapse.toml` (project-local)
//! 3. `~/.config/lapse/config.toml` (XDG user config)
//!
//! With no file found, defaults apply.
//!
//! ```toml
//! [session]
//! staleness_threshold_secs = 5
//! scan_period_secs = 5
//! reap_mode = "per-entry"
//!
//! [logging]
//! level = "info"
//! directory = "/var/log/lapse"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use lapse_session::{ReapMode, StoreConfig};
use serde::{Deserialize, Serialize};

/// Project-local config file name.
const PROJECT_CONFIG_FILE: &str = "lapse.toml";

/// User config file name within the XDG config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LapseConfig {
    /// Session store settings.
    pub session: SessionConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl LapseConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: LapseConfig = toml::from_str(contents)?;
        config.session.validate()?;
        Ok(config)
    }
}

/// Session store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds without an update after which a session may be evicted.
    pub staleness_threshold_secs: u64,
    /// Seconds between reaper passes.
    pub scan_period_secs: u64,
    /// How each reaper pass holds the index lock.
    pub reap_mode: ReapMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let defaults = StoreConfig::default();
        Self {
            staleness_threshold_secs: defaults.staleness_threshold.as_secs(),
            scan_period_secs: defaults.scan_period.as_secs(),
            reap_mode: defaults.reap_mode,
        }
    }
}

impl SessionConfig {
    fn validate(&self) -> Result<()> {
        if self.scan_period_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "session.scan_period_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Convert into the store's configuration.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new()
            .with_staleness_threshold(Duration::from_secs(self.staleness_threshold_secs))
            .with_scan_period(Duration::from_secs(self.scan_period_secs))
            .with_reap_mode(self.reap_mode)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Console log level for lapse crates.
    pub level: String,
    /// Directory for daily-rotated JSON logs. Disabled when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// A loaded configuration and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The configuration.
    pub config: LapseConfig,
    /// The file it was read from, if any.
    pub source: Option<PathBuf>,
}

/// Load configuration, following the discovery order described above.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        return Ok(LoadedConfig {
            config: load_config_file(path)?,
            source: Some(path.to_path_buf()),
        });
    }

    let candidates = [Some(PathBuf::from(PROJECT_CONFIG_FILE)), xdg_config_path()];
    for path in candidates.into_iter().flatten() {
        if path.is_file() {
            return Ok(LoadedConfig {
                config: load_config_file(&path)?,
                source: Some(path),
            });
        }
    }

    Ok(LoadedConfig {
        config: LapseConfig::default(),
        source: None,
    })
}

/// Load a single config file.
pub fn load_config_file(path: &Path) -> Result<LapseConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    LapseConfig::from_toml(&contents)
}

/// Path of the user config file (`~/.config/lapse/config.toml` on Linux).
pub fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lapse").join(USER_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = LapseConfig::default();
        assert_eq!(config.session.staleness_threshold_secs, 5);
        assert_eq!(config.session.scan_period_secs, 5);
        assert_eq!(config.session.reap_mode, ReapMode::PerEntry);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.directory.is_none());
    }

    #[test]
    fn test_parse_full() {
        let config = LapseConfig::from_toml(
            r#"
[session]
staleness_threshold_secs = 30
scan_period_secs = 10
reap_mode = "single-pass"

[logging]
level = "debug"
directory = "/tmp/lapse-logs"
"#,
        )
        .unwrap();

        let store = config.session.store_config();
        assert_eq!(store.staleness_threshold, Duration::from_secs(30));
        assert_eq!(store.scan_period, Duration::from_secs(10));
        assert_eq!(store.reap_mode, ReapMode::SinglePass);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.logging.directory,
            Some(PathBuf::from("/tmp/lapse-logs"))
        );
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config = LapseConfig::from_toml("[session]\nscan_period_secs = 2\n").unwrap();
        assert_eq!(config.session.scan_period_secs, 2);
        assert_eq!(config.session.staleness_threshold_secs, 5);
    }

    #[test]
    fn test_zero_scan_period_rejected() {
        let err = LapseConfig::from_toml("[session]\nscan_period_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "session.scan_period_secs"));
    }

    #[test]
    fn test_unknown_reap_mode_rejected() {
        let err = LapseConfig::from_toml("[session]\nreap_mode = \"sometimes\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lapse.toml");
        fs::write(&path, "[session]\nstaleness_threshold_secs = 60\n").unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.config.session.staleness_threshold_secs, 60);
        assert_eq!(loaded.source, Some(path));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = load_config(Some(Path::new("/nonexistent/lapse.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lapse.toml");
        fs::write(&path, "this is not valid toml {{{{").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_xdg_path_shape() {
        if let Some(p) = xdg_config_path() {
            assert!(p.ends_with("lapse/config.toml"));
        }
    }
}
