//! Bot runtime configuration.
//!
//! Loaded once at startup and passed explicitly into the scheduler; no
//! process-wide singletons. Values come from an optional TOML file
//! (`LIQUIDATOR_CONFIG`), with sensible defaults for every field.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable naming a TOML config file.
pub const CONFIG_ENV: &str = "LIQUIDATOR_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Profile name (for logging/identification)
    #[serde(default = "default_profile_name")]
    pub profile: String,

    /// Approximate chain block time, used to size event timeouts
    #[serde(default = "default_block_time_ms")]
    pub approx_block_time_ms: u64,

    /// How many block times to wait for a liquidation event before
    /// giving up on confirmation
    #[serde(default = "default_event_timeout_blocks")]
    pub event_timeout_blocks: u32,
}

fn default_profile_name() -> String {
    "default".to_string()
}

fn default_block_time_ms() -> u64 {
    12_000
}

fn default_event_timeout_blocks() -> u32 {
    10
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            profile: default_profile_name(),
            approx_block_time_ms: default_block_time_ms(),
            event_timeout_blocks: default_event_timeout_blocks(),
        }
    }
}

impl BotConfig {
    /// Load from the file named by `LIQUIDATOR_CONFIG`, falling back to
    /// defaults when the variable is unset. A named but unreadable or
    /// invalid file is an error rather than a silent default.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("failed to read {path}: {e}"))?;
                let config: Self = toml::from_str(&raw)
                    .map_err(|e| anyhow::anyhow!("failed to parse {path}: {e}"))?;
                Ok(config)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn block_time(&self) -> Duration {
        Duration::from_millis(self.approx_block_time_ms)
    }

    /// Timeout for awaiting the on-chain liquidation event.
    pub fn event_timeout(&self) -> Duration {
        self.block_time() * self.event_timeout_blocks
    }

    /// Log the active configuration at startup.
    pub fn log_config(&self) {
        info!(
            profile = %self.profile,
            block_time_ms = self.approx_block_time_ms,
            event_timeout_blocks = self.event_timeout_blocks,
            "Bot configuration loaded"
        );
        if let Ok(json) = serde_json::to_string(self) {
            debug!(config = %json, "Full configuration");
        }
    }
}
