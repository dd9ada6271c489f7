//! Command-line interface

use crate::logging::LogLevel;
use clap::Parser;
use std::path::PathBuf;

/// Stream Latency Tester - compare update latency across concurrent feed connections
#[derive(Parser, Debug, Clone)]
#[command(name = "slt")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Streaming endpoint prefix (ws:// or wss://) [env: BASE_URL]
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Stream identifier appended to the base URL [env: SYMBOL]
    #[arg(long)]
    pub symbol: Option<String>,

    /// Number of concurrent connections [env: NUM_CONNECTIONS]
    #[arg(short = 'n', long, value_name = "N")]
    pub connections: Option<usize>,

    /// Collection window in seconds [env: COLLECT_TIME]
    #[arg(short = 't', long, value_name = "SECONDS", value_parser = parse_seconds)]
    pub collect_time: Option<u64>,

    /// Maximum connect attempts per connection [env: RETRY_LIMIT]
    #[arg(long, value_name = "N")]
    pub retry_limit: Option<u32>,

    /// Delay between connect attempts in seconds [env: RETRY_DELAY]
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds)]
    pub retry_delay: Option<u64>,

    /// Double the retry delay after each failed attempt
    #[arg(long)]
    pub exponential_backoff: bool,

    /// End every connection's window at run start plus the collect time
    #[arg(long)]
    pub global_deadline: bool,

    /// Use Welch's unequal-variance t-test instead of the pooled test
    #[arg(long)]
    pub welch: bool,

    /// Minimum log level (trace, debug, info, warn, error) [env: LOG_LEVEL]
    #[arg(long, value_name = "LEVEL", value_parser = parse_log_level)]
    pub log_level: Option<LogLevel>,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the collected samples to this file as JSON
    #[arg(long, value_name = "PATH")]
    pub export_ledger: Option<PathBuf>,

    /// Show supported environment variables and exit
    #[arg(long)]
    pub env_help: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if let Some(0) = self.connections {
            return Err("--connections must be at least 1".to_string());
        }

        if let Some(0) = self.retry_limit {
            return Err("--retry-limit must be at least 1".to_string());
        }

        if let Some(path) = &self.export_ledger {
            if path.as_os_str().is_empty() {
                return Err("--export-ledger requires a file path".to_string());
            }
        }

        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }

    /// Get configuration summary for display
    pub fn get_config_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("Command-line Overrides:\n");
        if let Some(ref base_url) = self.base_url {
            summary.push_str(&format!("  Base URL: {}\n", base_url));
        }
        if let Some(ref symbol) = self.symbol {
            summary.push_str(&format!("  Symbol: {}\n", symbol));
        }
        if let Some(connections) = self.connections {
            summary.push_str(&format!("  Connections: {}\n", connections));
        }
        if let Some(collect_time) = self.collect_time {
            summary.push_str(&format!("  Collect time: {}s\n", collect_time));
        }
        if let Some(retry_limit) = self.retry_limit {
            summary.push_str(&format!("  Retry limit: {}\n", retry_limit));
        }
        if let Some(retry_delay) = self.retry_delay {
            summary.push_str(&format!("  Retry delay: {}s\n", retry_delay));
        }
        summary.push_str(&format!("  Exponential backoff: {}\n", self.exponential_backoff));
        summary.push_str(&format!("  Global deadline: {}\n", self.global_deadline));
        summary.push_str(&format!("  Welch t-test: {}\n", self.welch));
        summary.push_str(&format!("  Colored output: {}\n", self.use_colors()));
        summary.push_str(&format!("  Verbose mode: {}\n", self.verbose));
        summary.push_str(&format!("  Debug mode: {}\n", self.debug));

        summary
    }
}

/// Parse a positive whole number of seconds
fn parse_seconds(s: &str) -> Result<u64, String> {
    // Reject strings with leading + sign or other invalid formats
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Duration must be greater than 0".to_string())
            } else {
                Ok(secs)
            }
        })
}

fn parse_log_level(s: &str) -> Result<LogLevel, String> {
    s.parse::<LogLevel>().map_err(|e| e.to_string())
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    // Default to true on Unix-like systems, false on Windows
    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
