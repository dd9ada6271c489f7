//! Colored formatter implementation with terminal color support
//!
//! Tables are laid out by the plain formatter first and colored line by
//! line afterwards, so ANSI escapes never disturb column widths.

use crate::{
    error::Result,
    executor::{CollectionSummary, WorkerReport},
    stats::{AnalysisWarning, DelaySummary, PairOutcome, PairwiseComparison, QuickRatio, TTestKind},
};
use super::formatter::{
    format_elapsed, format_ratio, worker_failed, FormattingOptions, OutputFormatter, PlainFormatter,
    SIGNIFICANCE_LEVEL,
};
use super::RunReport;
use colored::*;

/// Latency class of a connection's quick ratio, for color coding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatioLevel {
    /// Fastest on most updates
    Leading,
    Competitive,
    Trailing,
    NoData,
}

impl RatioLevel {
    pub fn from_ratio(ratio: Option<f64>) -> Self {
        match ratio {
            None => Self::NoData,
            Some(r) if r >= 0.5 => Self::Leading,
            Some(r) if r >= 0.2 => Self::Competitive,
            Some(_) => Self::Trailing,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Leading => Color::Green,
            Self::Competitive => Color::Yellow,
            Self::Trailing => Color::Red,
            Self::NoData => Color::BrightBlack,
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub highlight: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            highlight: Color::Magenta,
            border: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    plain_formatter: PlainFormatter,
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    /// Create a new colored formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self::with_color_scheme(options, ColorScheme::default())
    }

    /// Create a colored formatter with custom color scheme
    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        let plain_formatter = PlainFormatter::new(options.clone());
        Self {
            plain_formatter,
            options,
            color_scheme,
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    /// Apply bold formatting if colors are enabled
    fn bold(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold()
        } else {
            text.normal()
        }
    }

    fn section_title(&self, title: &str) -> String {
        self.bold(title).color(self.color_scheme.header).to_string()
    }

    /// Color a bordered table. `row_color` picks a color for each data row.
    fn color_table<F>(&self, table: &str, row_color: F) -> String
    where
        F: Fn(usize) -> Option<Color>,
    {
        let mut data_row = 0;
        let mut seen_header = false;

        table
            .lines()
            .map(|line| {
                if line.starts_with('+') {
                    return self.colorize(line, self.color_scheme.border).to_string();
                }
                if !seen_header {
                    seen_header = true;
                    return self.bold(line).to_string();
                }
                let colored = match row_color(data_row) {
                    Some(color) => self.colorize(line, color).to_string(),
                    None => line.to_string(),
                };
                data_row += 1;
                colored
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let border = "═".repeat(title.chars().count() + 4);
        Ok(format!(
            "{}\n  {}  \n{}",
            self.colorize(&border, self.color_scheme.header),
            self.bold(title).color(self.color_scheme.header),
            self.colorize(&border, self.color_scheme.header)
        ))
    }

    fn format_collection_summary(&self, summary: &CollectionSummary, workers: &[WorkerReport]) -> Result<String> {
        let streamed = if summary.streamed == summary.total_connections {
            self.colorize(&summary.streamed.to_string(), self.color_scheme.success)
        } else {
            self.colorize(&summary.streamed.to_string(), self.color_scheme.warning)
        };
        let given_up = if summary.given_up > 0 {
            self.colorize(&summary.given_up.to_string(), self.color_scheme.error)
        } else {
            summary.given_up.to_string().normal()
        };
        let stream_errors = if summary.stream_errors > 0 {
            self.colorize(&summary.stream_errors.to_string(), self.color_scheme.warning)
        } else {
            summary.stream_errors.to_string().normal()
        };

        let mut output = format!(
            "{}\n⏱  Elapsed:          {}\n🔌 Connections:      {}\n📡 Streamed:         {}\n❌ Given Up:         {}\n⚠️  Stream Errors:    {}\n📊 Samples:          {}\n⏭  Skipped Messages: {}",
            self.section_title("Collection Summary"),
            format_elapsed(summary.elapsed),
            summary.total_connections,
            streamed,
            given_up,
            stream_errors,
            self.colorize(&summary.total_samples.to_string(), self.color_scheme.info),
            summary.skipped_messages,
        );

        if !workers.is_empty() {
            let table = self.plain_formatter.worker_table(workers);
            let colored = self.color_table(&table, |row| {
                workers.get(row).and_then(|w| worker_failed(w).then_some(self.color_scheme.error))
            });
            output.push_str("\n\n");
            output.push_str(&colored);
        }

        Ok(output)
    }

    fn format_quick_ratios(&self, ratios: &[QuickRatio], update_groups: usize) -> Result<String> {
        let title = self.section_title(&format!("Quick Update Ratios ({} updates)", update_groups));
        if ratios.is_empty() {
            return Ok(format!("{}\nNo connections to compare.", title));
        }

        let table = self.plain_formatter.quick_ratio_table(ratios);
        let colored = self.color_table(&table, |row| ratios.get(row).map(|r| RatioLevel::from_ratio(r.ratio).color()));

        Ok(format!("{}\n{}", title, colored))
    }

    fn format_pairwise(&self, comparisons: &[PairwiseComparison], kind: TTestKind) -> Result<String> {
        let title = self.section_title(&format!("Pairwise T-Tests ({}, alpha = {})", kind, SIGNIFICANCE_LEVEL));
        if comparisons.is_empty() {
            return Ok(format!("{}\nFewer than two connections; nothing to compare.", title));
        }

        let table = self.plain_formatter.pairwise_table(comparisons);
        let colored = self.color_table(&table, |row| {
            comparisons.get(row).and_then(|c| match &c.outcome {
                PairOutcome::Tested(result) if result.is_significant(SIGNIFICANCE_LEVEL) => {
                    Some(self.color_scheme.highlight)
                }
                PairOutcome::Tested(_) => None,
                PairOutcome::Skipped { .. } => Some(self.color_scheme.border),
            })
        });

        Ok(format!("{}\n{}", title, colored))
    }

    fn format_delay_summaries(&self, summaries: &[DelaySummary]) -> Result<String> {
        let title = self.section_title("Delay Distribution");
        if summaries.is_empty() {
            return Ok(format!("{}\n{}", title, self.colorize("No samples were collected.", self.color_scheme.warning)));
        }

        let table = self.plain_formatter.delay_summary_table(summaries);
        Ok(format!("{}\n{}", title, self.color_table(&table, |_| None)))
    }

    fn format_analysis_warnings(&self, warnings: &[AnalysisWarning]) -> Result<String> {
        let mut lines = vec![self.section_title("Warnings")];
        for warning in warnings {
            lines.push(self.format_warning(&warning.to_string())?);
        }
        Ok(lines.join("\n"))
    }

    fn format_quick_summary(&self, report: &RunReport) -> Result<String> {
        let fastest = match report.analysis.fastest_connection() {
            Some(id) => {
                let ratio = report
                    .analysis
                    .quick_ratios
                    .get(id)
                    .and_then(|r| r.ratio)
                    .map(format_ratio)
                    .unwrap_or_default();
                self.colorize(&format!("connection {} ({})", id, ratio), self.color_scheme.highlight)
            }
            None => self.colorize("none", self.color_scheme.warning),
        };

        Ok(format!(
            "📊 {}/{} streamed | 🧪 {} samples | 🏆 {} | 📈 {}/{} significant | ⏱ {}",
            self.colorize(&report.collection.streamed.to_string(), self.color_scheme.success),
            report.collection.total_connections,
            report.collection.total_samples,
            fastest,
            report.analysis.significant_pairs(SIGNIFICANCE_LEVEL).len(),
            report.analysis.tested_pairs(),
            format_elapsed(report.collection.elapsed)
        ))
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("❌ {}", self.colorize(error, self.color_scheme.error)))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("⚠️  {}", self.colorize(warning, self.color_scheme.warning)))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("✅ {}", self.colorize(message, self.color_scheme.success)))
    }
}
