//! Daemon configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file is a valid
//! configuration for a local server.

use bridge_platform::RoomPreset;
use bridge_reconcile::ReconcileConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration loading and validation failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{field} must be greater than zero")]
    ZeroPeriod { field: &'static str },

    #[error("watchdog_reset_secs ({reset}s) is shorter than {field} ({period}s)")]
    ResetTooShort {
        field: &'static str,
        reset: u64,
        period: u64,
    },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

/// Top-level bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Homeserver name used for canonical aliases
    pub server_name: String,
    /// Account that owns created rooms
    pub service_account: String,
    pub full_resync_interval_secs: u64,
    pub membership_remap_interval_secs: u64,
    /// A run older than this is overridden by the next tick
    pub watchdog_reset_secs: u64,
    pub topology_sync_period_secs: u64,
    pub user_sync_period_secs: u64,
    /// Delay before the first tick of each daemon
    pub initial_delay_secs: u64,
    /// Upper bound on each platform call
    pub call_timeout_secs: u64,
    pub room_preset: RoomPreset,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            server_name: "localhost".to_string(),
            service_account: "@ops-bridge:localhost".to_string(),
            full_resync_interval_secs: 600,
            membership_remap_interval_secs: 900,
            watchdog_reset_secs: 1800,
            topology_sync_period_secs: 30,
            user_sync_period_secs: 60,
            initial_delay_secs: 5,
            call_timeout_secs: 30,
            room_preset: RoomPreset::PrivateChat,
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on bad syntax or a validation error.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`BridgeConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Check periods and thresholds for consistency
    ///
    /// # Errors
    ///
    /// Rejects empty identities, zero periods, and a watchdog reset threshold
    /// shorter than either sync period.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_name.trim().is_empty() {
            return Err(ConfigError::Empty { field: "server_name" });
        }
        if self.service_account.trim().is_empty() {
            return Err(ConfigError::Empty {
                field: "service_account",
            });
        }

        let periods = [
            ("full_resync_interval_secs", self.full_resync_interval_secs),
            ("membership_remap_interval_secs", self.membership_remap_interval_secs),
            ("watchdog_reset_secs", self.watchdog_reset_secs),
            ("topology_sync_period_secs", self.topology_sync_period_secs),
            ("user_sync_period_secs", self.user_sync_period_secs),
            ("call_timeout_secs", self.call_timeout_secs),
        ];
        if let Some((field, _)) = periods.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::ZeroPeriod { field });
        }

        for (field, period) in [
            ("topology_sync_period_secs", self.topology_sync_period_secs),
            ("user_sync_period_secs", self.user_sync_period_secs),
        ] {
            if self.watchdog_reset_secs < period {
                return Err(ConfigError::ResetTooShort {
                    field,
                    reset: self.watchdog_reset_secs,
                    period,
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn with_server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = server_name.into();
        self
    }

    #[must_use]
    pub fn with_service_account(mut self, account: impl Into<String>) -> Self {
        self.service_account = account.into();
        self
    }

    #[must_use]
    pub fn with_full_resync_interval(mut self, secs: u64) -> Self {
        self.full_resync_interval_secs = secs;
        self
    }

    #[must_use]
    pub fn with_membership_remap_interval(mut self, secs: u64) -> Self {
        self.membership_remap_interval_secs = secs;
        self
    }

    #[must_use]
    pub fn with_watchdog_reset(mut self, secs: u64) -> Self {
        self.watchdog_reset_secs = secs;
        self
    }

    #[must_use]
    pub fn with_topology_sync_period(mut self, secs: u64) -> Self {
        self.topology_sync_period_secs = secs;
        self
    }

    #[must_use]
    pub fn with_user_sync_period(mut self, secs: u64) -> Self {
        self.user_sync_period_secs = secs;
        self
    }

    #[must_use]
    pub fn with_initial_delay(mut self, secs: u64) -> Self {
        self.initial_delay_secs = secs;
        self
    }

    #[must_use]
    pub fn with_call_timeout(mut self, secs: u64) -> Self {
        self.call_timeout_secs = secs;
        self
    }

    #[inline]
    #[must_use]
    pub fn watchdog_reset(&self) -> Duration {
        Duration::from_secs(self.watchdog_reset_secs)
    }

    #[inline]
    #[must_use]
    pub fn topology_sync_period(&self) -> Duration {
        Duration::from_secs(self.topology_sync_period_secs)
    }

    #[inline]
    #[must_use]
    pub fn user_sync_period(&self) -> Duration {
        Duration::from_secs(self.user_sync_period_secs)
    }

    #[inline]
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    #[inline]
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Engine settings derived from this configuration
    #[must_use]
    pub fn to_reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig::default()
            .with_service_account(self.service_account.clone())
            .with_full_resync_interval(self.full_resync_interval_secs)
            .with_membership_remap_interval(self.membership_remap_interval_secs)
            .with_room_preset(self.room_preset)
    }
}
