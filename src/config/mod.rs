//! Runtime configuration.
//!
//! Values come from an optional TOML file plus environment overrides; every
//! tunable has a baked-in default, so an empty config is a valid (if inert,
//! since no channels are monitored) one.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Messages inside one window that count as spam.
const DEFAULT_MESSAGE_THRESHOLD: usize = 5;

/// Sliding-window length: 5 seconds.
const DEFAULT_TIME_WINDOW_SECS: u64 = 5;

/// Quiet period after which warnings reset: 10 seconds.
const DEFAULT_WARNING_RESET_SECS: u64 = 10;

/// Mute duration before automatic reversal: 1 hour.
const DEFAULT_MUTE_DURATION_SECS: u64 = 60 * 60;

/// Idle user-state eviction horizon: 2 hours.
const DEFAULT_STALE_TTL_SECS: u64 = 2 * 60 * 60;

/// How often the coordinator sweeps idle user state: 5 minutes.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5 * 60;

/// Moderation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Channels subject to rate moderation. Empty = moderate nothing.
    pub monitored_channels: Vec<String>,
    /// Channel receiving staff notices for mutes and unmutes.
    pub staff_channel_id: String,
    /// Messages within the window that trigger an escalation step.
    pub message_threshold: usize,
    /// Sliding-window length in seconds.
    pub time_window_secs: u64,
    /// Quiet gap after which a user's warning stage resets, in seconds.
    pub warning_reset_secs: u64,
    /// How long a mute lasts before automatic reversal, in seconds.
    pub mute_duration_secs: u64,
    /// How long an idle, clean user's state is kept, in seconds.
    pub stale_ttl_secs: u64,
    /// Interval between idle-state sweeps, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            monitored_channels: Vec::new(),
            staff_channel_id: String::new(),
            message_threshold: DEFAULT_MESSAGE_THRESHOLD,
            time_window_secs: DEFAULT_TIME_WINDOW_SECS,
            warning_reset_secs: DEFAULT_WARNING_RESET_SECS,
            mute_duration_secs: DEFAULT_MUTE_DURATION_SECS,
            stale_ttl_secs: DEFAULT_STALE_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file, then apply
    /// environment overrides and validate.
    ///
    /// A missing explicit path is an error; no path means defaults + env.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .with_context(|| format!("reading config file {}", p.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("parsing config file {}", p.display()))?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// `STAFF_CHANNEL_ID` from the environment wins over the file.
    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("STAFF_CHANNEL_ID") {
            if !id.is_empty() {
                self.staff_channel_id = id;
            }
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.message_threshold == 0 {
            anyhow::bail!("message_threshold must be at least 1");
        }
        if self.time_window_secs == 0 {
            anyhow::bail!("time_window_secs must be at least 1");
        }
        Ok(())
    }

    /// Sliding-window length.
    pub fn time_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.time_window_secs as i64)
    }

    /// Warning-reset gap.
    pub fn warning_reset(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.warning_reset_secs as i64)
    }

    /// Idle-state eviction horizon.
    pub fn stale_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_ttl_secs as i64)
    }

    /// Mute duration for the deferred reversal timer.
    pub fn mute_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.mute_duration_secs)
    }

    /// Interval between idle-state sweeps.
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_deployment_tuning() {
        let config = Config::default();
        assert_eq!(config.message_threshold, 5);
        assert_eq!(config.time_window_secs, 5);
        assert_eq!(config.warning_reset_secs, 10);
        assert_eq!(config.mute_duration_secs, 3600);
        assert!(config.monitored_channels.is_empty());
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            monitored_channels = ["12345678", "23456789"]
            staff_channel_id = "999"
            mute_duration_secs = 600
            "#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.monitored_channels.len(), 2);
        assert_eq!(config.staff_channel_id, "999");
        assert_eq!(config.mute_duration_secs, 600);
        // Untouched fields keep their defaults.
        assert_eq!(config.message_threshold, 5);
        assert_eq!(config.warning_reset_secs, 10);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mesage_treshold = 5").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "message_threshold = 0").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/floodwarden.toml"))).is_err());
    }

    #[test]
    fn staff_channel_env_override_wins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"staff_channel_id = "from-file""#).unwrap();

        std::env::set_var("STAFF_CHANNEL_ID", "from-env");
        let config = Config::load(Some(file.path())).unwrap();
        std::env::remove_var("STAFF_CHANNEL_ID");

        assert_eq!(config.staff_channel_id, "from-env");
    }
}
