//! Daemon configuration with TOML file support.

use dist_registry::{TierThresholds, DEFAULT_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{EngineError, LogFormat};

/// Configuration for the verification daemon.
///
/// Can be loaded from a TOML file via [`DaemonConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default, so an
/// empty file is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Base URL of the ledger node's API.
    #[serde(default = "default_node_url")]
    pub node_url: String,

    /// Seconds to sleep between processing cycles.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Namespace that owns the registry pages.
    #[serde(default = "default_root_namespace")]
    pub root_namespace: String,

    /// Maximum entries per shard page.
    #[serde(default = "default_shard_capacity")]
    pub shard_capacity: usize,

    /// Per-call timeout for ledger requests, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Minimum effective balance per tier, in display units.
    #[serde(default)]
    pub tier_thresholds: TierThresholds,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_node_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_check_interval() -> u64 {
    300
}

fn default_root_namespace() -> String {
    "distordia".to_string()
}

fn default_shard_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl DaemonConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        self.tier_thresholds.validate()?;
        if self.shard_capacity == 0 {
            return Err(EngineError::Config("shard_capacity must be at least 1".into()));
        }
        if self.check_interval_secs == 0 {
            return Err(EngineError::Config("check_interval_secs must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(EngineError::Config("request_timeout_secs must be at least 1".into()));
        }
        if self.root_namespace.trim().is_empty() {
            return Err(EngineError::Config("root_namespace must not be empty".into()));
        }
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            node_url: default_node_url(),
            check_interval_secs: default_check_interval(),
            root_namespace: default_root_namespace(),
            shard_capacity: default_shard_capacity(),
            request_timeout_secs: default_request_timeout(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            tier_thresholds: TierThresholds::default(),
        }
    }
}
