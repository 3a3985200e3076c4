//! Service configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default value for `datadir` in [`HodlockConfig`].
const DEFAULT_DATADIR: &str = "hodlock-data";

/// Default overlay topic this service tracks.
const DEFAULT_TOPIC: &str = "tm_hodlock";

/// Default seconds between watchman height polls.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 6;

/// Default seconds allowed for one redemption attempt.
const DEFAULT_ENTRY_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HodlockConfig {
    /// The data directory where the lock registry resides.
    #[serde(default = "default_datadir")]
    pub datadir: PathBuf,

    /// Overlay topic whose outputs this service tracks.
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Wallet endpoint serving height, public-key and signature requests.
    pub wallet_url: String,

    /// Overlay endpoint accepting finished transactions for broadcast.
    pub submit_url: String,

    #[serde(default)]
    pub watchman: WatchmanConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchmanConfig {
    /// Seconds between chain-height polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Per-entry redemption budget in seconds.
    #[serde(default = "default_entry_timeout_secs")]
    pub entry_timeout_secs: u64,
}

impl Default for WatchmanConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            entry_timeout_secs: DEFAULT_ENTRY_TIMEOUT_SECS,
        }
    }
}

impl HodlockConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

fn default_datadir() -> PathBuf {
    DEFAULT_DATADIR.into()
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_owned()
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_entry_timeout_secs() -> u64 {
    DEFAULT_ENTRY_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let cfg: HodlockConfig = toml::from_str(
            r#"
            wallet_url = "http://localhost:3321"
            submit_url = "http://localhost:8088/submit"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.topic, "tm_hodlock");
        assert_eq!(cfg.datadir, PathBuf::from("hodlock-data"));
        assert_eq!(cfg.watchman.poll_interval_secs, 6);
        assert_eq!(cfg.watchman.entry_timeout_secs, 30);
    }

    #[test]
    fn overrides_apply() {
        let cfg: HodlockConfig = toml::from_str(
            r#"
            datadir = "/var/lib/hodlock"
            topic = "tm_hodlock_test"
            wallet_url = "http://localhost:3321"
            submit_url = "http://localhost:8088/submit"

            [watchman]
            poll_interval_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(cfg.topic, "tm_hodlock_test");
        assert_eq!(cfg.watchman.poll_interval_secs, 60);
        assert_eq!(cfg.watchman.entry_timeout_secs, 30);
    }
}
