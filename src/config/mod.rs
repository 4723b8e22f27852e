//! Configuration management.
//!
//! Settings layer in this order, later sources overriding earlier ones:
//! compiled-in defaults, `config/default.toml`, `config/{environment}.toml`
//! (environment from `TASKOPS_ENV` / `APP_ENV`, defaulting to
//! `development`), and `TASKOPS_`-prefixed environment variables with `__`
//! as the nesting separator (e.g. `TASKOPS_CHANNEL__CAPACITY=4096`).

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskopsError};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskopsConfig {
    /// Deployment environment name (development/test/production).
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Per-environment event channel settings.
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Task listing settings.
    #[serde(default)]
    pub tasks: TasksConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    /// Buffered events per environment channel before slow subscribers lag.
    #[serde(default = "default_channel_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TasksConfig {
    /// Cap on snapshot listings for live views; `None` means unlimited.
    #[serde(default)]
    pub snapshot_limit: Option<usize>,
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_channel_capacity() -> usize {
    1024
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: default_channel_capacity(),
        }
    }
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            snapshot_limit: None,
        }
    }
}

impl Default for TaskopsConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            channel: ChannelConfig::default(),
            tasks: TasksConfig::default(),
        }
    }
}

impl TaskopsConfig {
    /// Load layered configuration. Missing files are fine; a present but
    /// malformed source is a `Configuration` error.
    pub fn load() -> Result<Self> {
        let environment = detect_environment();

        Config::builder()
            .set_default("environment", environment.clone())
            .map_err(|e| TaskopsError::Configuration(e.to_string()))?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(Environment::with_prefix("TASKOPS").separator("__"))
            .build()
            .map_err(|e| TaskopsError::Configuration(e.to_string()))?
            .try_deserialize()
            .map_err(|e| TaskopsError::Configuration(e.to_string()))
    }
}

fn detect_environment() -> String {
    std::env::var("TASKOPS_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| default_environment())
}
