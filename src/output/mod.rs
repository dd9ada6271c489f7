//! Output formatting and display system
//!
//! This module renders a finished run as text tables, colored or plain,
//! or as a single JSON document.

mod formatter;
mod colored;

pub use formatter::{
    format_delay,
    format_elapsed,
    format_p_value,
    format_ratio,
    Alignment,
    Column,
    FormattingOptions,
    OutputFormatter,
    PlainFormatter,
    RowData,
    TableFormat,
    SIGNIFICANCE_LEVEL,
};
pub use colored::{
    ColorScheme,
    ColoredFormatter,
    RatioLevel,
};

use crate::{
    error::Result,
    executor::{CollectionResults, CollectionSummary, WorkerReport},
    models::Config,
    stats::AnalysisReport,
};
use serde::{Deserialize, Serialize};

/// Everything a run produced, in the shape printed by `--json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub version: String,
    pub session_id: String,
    pub endpoint: String,
    pub config: Config,
    pub collection: CollectionSummary,
    pub workers: Vec<WorkerReport>,
    pub analysis: AnalysisReport,
}

impl RunReport {
    pub fn new(config: &Config, session_id: &str, results: &CollectionResults, analysis: AnalysisReport) -> Self {
        Self {
            version: crate::VERSION.to_string(),
            session_id: session_id.to_string(),
            endpoint: config.endpoint(),
            config: config.clone(),
            collection: results.summary(),
            workers: results.workers.clone(),
            analysis,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            ..Default::default()
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }

    /// Create a plain text formatter for scripts/logs
    pub fn create_plain_formatter() -> Box<dyn OutputFormatter> {
        Self::create_formatter(false, true)
    }
}

/// Main output coordinator that handles all result display
pub struct OutputCoordinator {
    formatter: Box<dyn OutputFormatter>,
}

impl OutputCoordinator {
    /// Create a new output coordinator with the specified formatter
    pub fn new(formatter: Box<dyn OutputFormatter>) -> Self {
        Self { formatter }
    }

    /// Render the complete report
    pub fn display_results(&self, report: &RunReport) -> Result<String> {
        let analysis = &report.analysis;
        let mut sections = vec![
            self.formatter.format_header(&format!("Stream Latency Results: {}", report.endpoint))?,
            self.formatter.format_collection_summary(&report.collection, &report.workers)?,
            self.formatter.format_quick_ratios(&analysis.quick_ratios, analysis.update_groups)?,
            self.formatter.format_pairwise(&analysis.pairwise, analysis.test_kind)?,
            self.formatter.format_delay_summaries(&analysis.summaries)?,
        ];

        if !analysis.warnings.is_empty() {
            sections.push(self.formatter.format_analysis_warnings(&analysis.warnings)?);
        }

        sections.push(self.display_quick_summary(report)?);

        Ok(sections.join("\n\n"))
    }

    /// One-line summary of the run
    pub fn display_quick_summary(&self, report: &RunReport) -> Result<String> {
        self.formatter.format_quick_summary(report)
    }

    pub fn display_error(&self, error: &str) -> Result<String> {
        self.formatter.format_error(error)
    }

    pub fn display_success(&self, message: &str) -> Result<String> {
        self.formatter.format_success(message)
    }
}
