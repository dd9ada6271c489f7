//! Configuration data model and validation

use crate::{
    logging::LogLevel,
    types::{AppError, BackoffKind, DeadlineMode, Result},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Streaming endpoint prefix, e.g. `wss://host:9443/ws/`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Stream identifier appended to the base URL
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Number of concurrent connections to open
    #[serde(default = "default_num_connections")]
    pub num_connections: usize,

    /// Collection window per worker, in seconds
    #[serde(default = "default_collect_time")]
    pub collect_time_seconds: u64,

    /// Maximum connect attempts per worker
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    /// Base delay between connect attempts, in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,

    /// Backoff strategy between connect attempts
    #[serde(default)]
    pub backoff: BackoffKind,

    /// How collection windows are anchored
    #[serde(default)]
    pub deadline_mode: DeadlineMode,

    /// Pooled-variance t-test when true, Welch's test when false
    #[serde(default = "default_equal_var")]
    pub equal_var: bool,

    /// Minimum log level
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,

    /// Print the run report as JSON instead of tables
    #[serde(default)]
    pub json_output: bool,

    /// Write the finished ledger to this path as JSON
    #[serde(default)]
    pub export_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            symbol: default_symbol(),
            num_connections: default_num_connections(),
            collect_time_seconds: default_collect_time(),
            retry_limit: default_retry_limit(),
            retry_delay_seconds: default_retry_delay(),
            backoff: BackoffKind::default(),
            deadline_mode: DeadlineMode::default(),
            equal_var: default_equal_var(),
            log_level: default_log_level(),
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
            json_output: false,
            export_path: None,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Full endpoint URL every connection opens
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, self.symbol)
    }

    /// Collection window as Duration
    pub fn collect_time(&self) -> Duration {
        Duration::from_secs(self.collect_time_seconds)
    }

    /// Retry delay as Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(AppError::config("BASE_URL cannot be empty"));
        }

        match url::Url::parse(&self.base_url) {
            Ok(parsed) => {
                if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
                    return Err(AppError::config(format!(
                        "BASE_URL must start with ws:// or wss://, got: {}",
                        self.base_url
                    )));
                }
            }
            Err(e) => {
                return Err(AppError::config(format!("Invalid BASE_URL '{}': {}", self.base_url, e)));
            }
        }

        if self.symbol.trim().is_empty() {
            return Err(AppError::config("SYMBOL cannot be empty"));
        }

        if self.num_connections == 0 {
            return Err(AppError::config("Connection count must be greater than 0"));
        }

        if self.num_connections > crate::defaults::MAX_CONNECTIONS {
            return Err(AppError::config(format!(
                "Connection count cannot exceed {}",
                crate::defaults::MAX_CONNECTIONS
            )));
        }

        if self.collect_time_seconds == 0 {
            return Err(AppError::config("Collect time must be greater than 0"));
        }

        if self.collect_time_seconds > crate::defaults::MAX_COLLECT_TIME_SECS {
            return Err(AppError::config(format!(
                "Collect time cannot exceed {} seconds",
                crate::defaults::MAX_COLLECT_TIME_SECS
            )));
        }

        if self.retry_limit == 0 {
            return Err(AppError::config("Retry limit must be greater than 0"));
        }

        if self.retry_limit > crate::defaults::MAX_RETRY_LIMIT {
            return Err(AppError::config(format!(
                "Retry limit cannot exceed {}",
                crate::defaults::MAX_RETRY_LIMIT
            )));
        }

        if self.retry_delay_seconds == 0 {
            return Err(AppError::config("Retry delay must be greater than 0"));
        }

        if self.retry_delay_seconds > crate::defaults::MAX_RETRY_DELAY_SECS {
            return Err(AppError::config(format!(
                "Retry delay cannot exceed {} seconds",
                crate::defaults::MAX_RETRY_DELAY_SECS
            )));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(base_url) = std::env::var("BASE_URL") {
            self.base_url = base_url.trim().to_string();
        }

        if let Ok(symbol) = std::env::var("SYMBOL") {
            self.symbol = symbol.trim().to_string();
        }

        if let Ok(num_connections) = std::env::var("NUM_CONNECTIONS") {
            self.num_connections = num_connections.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid NUM_CONNECTIONS value '{}': {}", num_connections, e)))?;
        }

        if let Ok(collect_time) = std::env::var("COLLECT_TIME") {
            self.collect_time_seconds = collect_time.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid COLLECT_TIME value '{}': {}", collect_time, e)))?;
        }

        if let Ok(retry_limit) = std::env::var("RETRY_LIMIT") {
            self.retry_limit = retry_limit.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid RETRY_LIMIT value '{}': {}", retry_limit, e)))?;
        }

        if let Ok(retry_delay) = std::env::var("RETRY_DELAY") {
            self.retry_delay_seconds = retry_delay.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid RETRY_DELAY value '{}': {}", retry_delay, e)))?;
        }

        if let Ok(backoff) = std::env::var("BACKOFF") {
            self.backoff = backoff.parse()
                .map_err(|e| AppError::config(format!("Invalid BACKOFF value '{}': {}", backoff, e)))?;
        }

        if let Ok(deadline_mode) = std::env::var("DEADLINE_MODE") {
            self.deadline_mode = deadline_mode.parse()
                .map_err(|e| AppError::config(format!("Invalid DEADLINE_MODE value '{}': {}", deadline_mode, e)))?;
        }

        if let Ok(equal_var) = std::env::var("EQUAL_VAR") {
            self.equal_var = equal_var.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid EQUAL_VAR value '{}': {}", equal_var, e)))?;
        }

        if let Ok(log_level) = std::env::var("LOG_LEVEL") {
            self.log_level = log_level.parse()
                .map_err(|e| AppError::config(format!("Invalid LOG_LEVEL value '{}': {}", log_level, e)))?;
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_base_url() -> String {
    crate::defaults::DEFAULT_BASE_URL.to_string()
}

fn default_symbol() -> String {
    crate::defaults::DEFAULT_SYMBOL.to_string()
}

fn default_num_connections() -> usize {
    crate::defaults::DEFAULT_NUM_CONNECTIONS
}

fn default_collect_time() -> u64 {
    crate::defaults::DEFAULT_COLLECT_TIME.as_secs()
}

fn default_retry_limit() -> u32 {
    crate::defaults::DEFAULT_RETRY_LIMIT
}

fn default_retry_delay() -> u64 {
    crate::defaults::DEFAULT_RETRY_DELAY.as_secs()
}

fn default_equal_var() -> bool {
    crate::defaults::DEFAULT_EQUAL_VAR
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
