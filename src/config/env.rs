//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::logging::LogLevel;
use crate::types::{BackoffKind, DeadlineMode};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists. Variables already set in the process win.
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Stream Latency Tester Configuration
#
# Values here are defaults; process environment variables and
# command-line arguments override them.

# Streaming endpoint prefix; the symbol is appended to it
# BASE_URL=wss://stream.binance.com:9443/ws/

# Stream identifier
# SYMBOL=btcusdt@depth

# Number of concurrent connections (1-64)
# NUM_CONNECTIONS=5

# Collection window in seconds (1-86400)
# COLLECT_TIME=60

# Connect attempts per connection (1-100)
# RETRY_LIMIT=3

# Seconds between connect attempts (1-3600)
# RETRY_DELAY=5

# Retry delay schedule: fixed or exponential
# BACKOFF=fixed

# Collection window anchor: per-worker or global
# DEADLINE_MODE=per-worker

# Pooled-variance t-test (true) or Welch's test (false)
# EQUAL_VAR=true

# Minimum log level: TRACE, DEBUG, INFO, WARN, ERROR
# LOG_LEVEL=INFO

# Enable colored output (true/false)
# ENABLE_COLOR=true
"#
        .to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        let content = Self::create_example_env_content();
        std::fs::write(path, content)
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "BASE_URL" => {
                let parsed = url::Url::parse(value)
                    .map_err(|e| AppError::config(format!("Invalid BASE_URL '{}': {}", value, e)))?;
                if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
                    return Err(AppError::config(format!("BASE_URL must use ws:// or wss://: {}", value)));
                }
            }
            "SYMBOL" => {
                if value.is_empty() {
                    return Err(AppError::config("SYMBOL cannot be empty"));
                }
            }
            "NUM_CONNECTIONS" => {
                Self::check_range::<usize>(key, value, 1, crate::defaults::MAX_CONNECTIONS)?;
            }
            "COLLECT_TIME" => {
                Self::check_range::<u64>(key, value, 1, crate::defaults::MAX_COLLECT_TIME_SECS)?;
            }
            "RETRY_LIMIT" => {
                Self::check_range::<u32>(key, value, 1, crate::defaults::MAX_RETRY_LIMIT)?;
            }
            "RETRY_DELAY" => {
                Self::check_range::<u64>(key, value, 1, crate::defaults::MAX_RETRY_DELAY_SECS)?;
            }
            "BACKOFF" => {
                value.parse::<BackoffKind>()
                    .map_err(|e| AppError::config(format!("Invalid BACKOFF value '{}': {}", value, e)))?;
            }
            "DEADLINE_MODE" => {
                value.parse::<DeadlineMode>()
                    .map_err(|e| AppError::config(format!("Invalid DEADLINE_MODE value '{}': {}", value, e)))?;
            }
            "LOG_LEVEL" => {
                value.parse::<LogLevel>()
                    .map_err(|e| AppError::config(format!("Invalid LOG_LEVEL value '{}': {}", value, e)))?;
            }
            "EQUAL_VAR" | "ENABLE_COLOR" => {
                value.parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    fn check_range<T>(key: &str, value: &str, min: T, max: T) -> Result<()>
    where
        T: std::str::FromStr + PartialOrd + std::fmt::Display,
        T::Err: std::fmt::Display,
    {
        let parsed: T = value.parse()
            .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
        if parsed < min || parsed > max {
            return Err(AppError::config(format!("{} must be between {} and {}, got: {}", key, min, max, parsed)));
        }
        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("BASE_URL", "Streaming endpoint prefix (ws/wss)", "wss://stream.binance.com:9443/ws/"),
            ("SYMBOL", "Stream identifier appended to BASE_URL", "btcusdt@depth"),
            ("NUM_CONNECTIONS", "Concurrent connections (1-64)", "5"),
            ("COLLECT_TIME", "Collection window in seconds (1-86400)", "60"),
            ("RETRY_LIMIT", "Connect attempts per connection (1-100)", "3"),
            ("RETRY_DELAY", "Seconds between connect attempts (1-3600)", "5"),
            ("BACKOFF", "Retry delay schedule (fixed, exponential)", "fixed"),
            ("DEADLINE_MODE", "Collection window anchor (per-worker, global)", "per-worker"),
            ("EQUAL_VAR", "Pooled-variance t-test instead of Welch's", "true"),
            ("LOG_LEVEL", "Minimum log level", "INFO"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<18} {}\n", var, description));
            help.push_str(&format!("  {:<18} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        let mut warnings = Vec::new();

        for (var_name, _, _) in Self::get_supported_env_vars() {
            if let Ok(value) = std::env::var(var_name) {
                if let Err(e) = Self::validate_env_var(var_name, &value) {
                    warnings.push(format!("Warning: {}", e));
                }
            }
        }

        warnings
    }

    /// Validate the contents of a .env file without loading it
    pub fn check_env_file(path: &Path) -> Result<Option<Vec<String>>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read {}: {}", path.display(), e)))?;

        let mut warnings = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                if let Err(e) = Self::validate_env_var(key.trim(), value) {
                    warnings.push(format!("Line '{}': {}", line, e));
                }
            }
        }

        Ok(Some(warnings))
    }
}
