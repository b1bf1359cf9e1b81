//! Configuration for the realtime client
//!
//! Loaded from realtime.toml at startup. All tunables live here so the
//! connection and retry behavior carries no hardcoded constants.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ws::backoff::ReconnectPolicy;
use crate::{RealtimeError, Result};

/// Realtime client configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RealtimeConfig {
    /// Endpoint and socket settings
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Retry behavior after abnormal closes
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// Endpoint and socket settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionConfig {
    /// Backend host (and port) serving the realtime endpoint
    #[serde(default = "default_host")]
    pub host: String,

    /// Use the secure socket scheme (wss); mirror the app's own scheme
    #[serde(default)]
    pub secure: bool,

    /// Handshake timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Heartbeat ping interval in seconds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
}

/// Retry behavior after abnormal closes
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconnectConfig {
    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on any retry delay, in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Retry budget since the last successful open
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            secure: false,
            connect_timeout_secs: default_connect_timeout(),
            heartbeat_interval_secs: default_heartbeat_interval(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_base_delay_ms() -> u64 {
    5_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    10
}

impl RealtimeConfig {
    /// Load configuration from realtime.toml
    ///
    /// Path overridable via `REALTIME_CONFIG_PATH`. A missing file yields
    /// the defaults.
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("REALTIME_CONFIG_PATH")
            .unwrap_or_else(|_| "realtime.toml".to_string());

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => {
                toml::from_str(&contents).map_err(|e| RealtimeError::Config(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(RealtimeError::Io(e)),
        }
    }

    /// Handshake timeout as a Duration
    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.connect_timeout_secs)
    }

    /// Heartbeat interval as a Duration
    #[inline]
    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_secs(self.connection.heartbeat_interval_secs)
    }

    /// Reconnect policy derived from the retry section
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            Duration::from_millis(self.reconnect.base_delay_ms),
            Duration::from_millis(self.reconnect.max_delay_ms),
            self.reconnect.max_attempts,
        )
    }
}
