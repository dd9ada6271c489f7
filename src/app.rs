//! Main application orchestration and execution

use crate::{
    cli::Cli,
    client::WebSocketConnector,
    config::{display_config_summary, load_config, validate_config, EnvManager},
    error::{AppError, Result},
    executor::{CollectionTemplate, Orchestrator},
    logging::LoggerFactory,
    models::Config,
    output::{OutputCoordinator, OutputFormatterFactory, RunReport},
    stats::AnalysisEngine,
};
use std::path::Path;
use std::sync::Arc;

/// Main application struct that coordinates all components
pub struct App {
    cli: Cli,
}

impl App {
    /// Create a new application instance with CLI configuration
    pub fn new(cli: Cli) -> Result<Self> {
        cli.validate().map_err(AppError::config)?;
        Ok(Self { cli })
    }

    /// Run the application and return the finished report, if a run happened
    pub async fn run(self) -> Result<Option<RunReport>> {
        if self.cli.env_help {
            println!("{}", EnvManager::display_env_help());
            return Ok(None);
        }

        let config = load_config(self.cli.clone())?;

        if config.debug {
            eprint!("{}", self.cli.get_config_summary());
            for warning in EnvManager::validate_current_env() {
                eprintln!("{}", warning);
            }
            if let Some(warnings) = EnvManager::check_env_file(Path::new(".env"))? {
                for warning in warnings {
                    eprintln!(".env: {}", warning);
                }
            }
        }

        let report = Self::execute(&config).await?;
        Ok(Some(report))
    }

    /// Collect, analyze, render and export for an already loaded configuration
    pub async fn execute(config: &Config) -> Result<RunReport> {
        let factory = LoggerFactory::new(config.clone());
        let logger = factory.create_logger("APP");
        let mut perf = factory.create_performance_logger();

        if config.debug {
            eprintln!(
                "{} v{} ({} {}, built {}) session {}",
                crate::PKG_NAME,
                crate::VERSION,
                crate::GIT_COMMIT,
                crate::TARGET_TRIPLE,
                crate::BUILD_TIME,
                factory.session_id()
            );
            eprintln!("{}", display_config_summary(config));
        }

        for warning in validate_config(config)? {
            eprintln!("{}", warning.format(config.enable_color));
        }

        let endpoints = Orchestrator::endpoints_for(&config.base_url, &config.symbol, config.num_connections);
        let template = CollectionTemplate::from(config);

        logger
            .info(&format!(
                "Collecting from {} with {} connections for {}s",
                config.endpoint(),
                config.num_connections,
                config.collect_time_seconds
            ))
            .field("deadline_mode", config.deadline_mode.to_string())
            .log();

        let orchestrator = Orchestrator::new(
            Arc::new(WebSocketConnector::default()),
            factory.create_connection_logger(),
        );

        perf.start_timing("collection");
        let results = orchestrator.run(&endpoints, &template).await?;
        perf.end_timing("collection");

        let summary = results.summary();
        logger
            .info(&format!(
                "Collected {} samples; {}/{} connections streamed",
                summary.total_samples, summary.streamed, summary.total_connections
            ))
            .field("given_up", summary.given_up)
            .field("stream_errors", summary.stream_errors)
            .log();
        if summary.given_up > 0 {
            crate::log_warn!(
                logger,
                "{} of {} connections never streamed",
                summary.given_up,
                summary.total_connections
            );
        }

        perf.start_timing("analysis");
        let engine = AnalysisEngine::new(config.equal_var).with_logger(factory.create_analysis_logger());
        let analysis = engine.analyze_ledger(&results.ledger)?;
        perf.end_timing("analysis");
        crate::log_debug!(
            logger,
            "Analysis finished: {} tested pairs, {} warnings",
            analysis.tested_pairs(),
            analysis.warnings.len()
        );

        let report = RunReport::new(config, factory.session_id(), &results, analysis);

        let coordinator =
            OutputCoordinator::new(OutputFormatterFactory::create_formatter(config.enable_color, config.verbose));
        if config.json_output {
            println!("{}", report.to_json()?);
        } else {
            println!("{}", coordinator.display_results(&report)?);
        }

        if let Some(path) = &config.export_path {
            results.ledger.export(path)?;
            crate::log_info!(logger, "Exported {} samples to {}", results.ledger.len(), path.display());
            if !config.json_output {
                eprintln!("{}", coordinator.display_success(&format!("Ledger written to {}", path.display()))?);
            }
        }

        if summary.streamed == 0 {
            factory
                .create_error_logger()
                .log_error(&AppError::connect("no connection could be established"), Some("collection"));
            if !config.json_output {
                eprintln!("{}", coordinator.display_error("No connection could be established; nothing was measured")?);
            }
        }

        Ok(report)
    }
}
