//! Configuration validation utilities and rules

use crate::{
    error::{AppError, Result},
    models::Config,
    types::DeadlineMode,
};
use colored::Colorize;

/// Configuration validator producing non-fatal warnings on top of `Config::validate`
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration with comprehensive checks
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        config.validate()?;

        warnings.extend(Self::validate_endpoint(config)?);
        warnings.extend(Self::validate_collection_settings(config));
        warnings.extend(Self::validate_retry_settings(config));

        Ok(warnings)
    }

    fn validate_endpoint(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();
        let endpoint = config.endpoint();

        let parsed = url::Url::parse(&endpoint)
            .map_err(|e| AppError::config(format!("Invalid endpoint '{}': {}", endpoint, e)))?;

        if parsed.scheme() == "ws" {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Endpoint '{}' uses unencrypted ws://", endpoint),
            ));
        }

        if let Some(url::Host::Ipv4(ip)) = parsed.host() {
            if ip.is_private() || ip.is_loopback() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("Endpoint '{}' targets a private/local network", endpoint),
                ));
            }
        }

        if !config.base_url.ends_with('/') && !config.symbol.starts_with('/') {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "BASE_URL '{}' has no trailing slash; the symbol is appended directly ('{}')",
                    config.base_url, endpoint
                ),
            ));
        }

        Ok(warnings)
    }

    fn validate_collection_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.num_connections == 1 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "A single connection has nothing to compare against; no t-tests will run".to_string(),
            ));
        } else if config.num_connections > 16 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "{} connections will run {} pairwise tests",
                    config.num_connections,
                    config.num_connections * (config.num_connections - 1) / 2
                ),
            ));
        }

        if config.collect_time_seconds < 10 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Collect time of {}s may not gather enough samples for reliable statistics",
                    config.collect_time_seconds
                ),
            ));
        } else if config.collect_time_seconds > 3600 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Long collect time of {}s; samples are held in memory", config.collect_time_seconds),
            ));
        }

        warnings
    }

    fn validate_retry_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        // Per-worker windows start after connect, so long retries only delay the run.
        // A global deadline is consumed by them.
        let worst_case_retry = config.retry_delay_seconds * u64::from(config.retry_limit.saturating_sub(1));
        if config.deadline_mode == DeadlineMode::Global && worst_case_retry >= config.collect_time_seconds {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Retries can take {}s, longer than the {}s global window",
                    worst_case_retry, config.collect_time_seconds
                ),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    /// Get color for terminal display
    pub fn color(&self) -> &'static str {
        match self {
            Self::Info => "blue",
            Self::Warning => "yellow",
            Self::Error => "red",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        if use_color {
            format!("{} {}", tag.color(self.level.color()), self.message)
        } else {
            format!("{} {}", tag, self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
