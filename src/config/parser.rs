//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::Result,
    models::Config,
    types::{BackoffKind, DeadlineMode},
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Build the configuration: defaults, `.env`, process env, CLI, then validate
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        EnvManager::load_env_file(self.cli.debug)?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config);
        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    pub fn apply_cli_overrides(&self, config: &mut Config) {
        if let Some(ref base_url) = self.cli.base_url {
            config.base_url = base_url.trim().to_string();
        }
        if let Some(ref symbol) = self.cli.symbol {
            config.symbol = symbol.trim().to_string();
        }
        if let Some(connections) = self.cli.connections {
            config.num_connections = connections;
        }
        if let Some(collect_time) = self.cli.collect_time {
            config.collect_time_seconds = collect_time;
        }
        if let Some(retry_limit) = self.cli.retry_limit {
            config.retry_limit = retry_limit;
        }
        if let Some(retry_delay) = self.cli.retry_delay {
            config.retry_delay_seconds = retry_delay;
        }
        if self.cli.exponential_backoff {
            config.backoff = BackoffKind::Exponential;
        }
        if self.cli.global_deadline {
            config.deadline_mode = DeadlineMode::Global;
        }
        if self.cli.welch {
            config.equal_var = false;
        }
        if let Some(level) = self.cli.log_level {
            config.log_level = level;
        }

        if self.cli.color {
            config.enable_color = true;
        } else if self.cli.no_color {
            config.enable_color = false;
        }

        // CLI-only flags
        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;
        config.json_output = self.cli.json;
        config.export_path = self.cli.export_ledger.clone();

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
            eprintln!("{}", display_config_summary(config));
        }
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Endpoint: {}", config.endpoint()));
    summary.push(format!("Connections: {}", config.num_connections));
    summary.push(format!("Collect Time: {}s ({} deadline)", config.collect_time_seconds, config.deadline_mode));
    summary.push(format!(
        "Retry: {} attempts, {}s {} backoff",
        config.retry_limit, config.retry_delay_seconds, config.backoff
    ));
    summary.push(format!("T-test: {}", if config.equal_var { "Student (pooled)" } else { "Welch" }));
    summary.push(format!("Log Level: {}", config.log_level.as_str()));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
