//! Core formatting traits and implementations
//!
//! This module defines the output formatting interface and provides
//! a plain text implementation with table formatting capabilities.

use crate::{
    error::{AppError, Result},
    executor::{CollectionSummary, WorkerReport},
    stats::{AnalysisWarning, DelaySummary, PairOutcome, PairwiseComparison, QuickRatio, TTestKind},
    types::WorkerState,
};
use super::RunReport;
use std::fmt::Write as _;

/// Significance level used to flag pairwise results
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Main trait for output formatting
pub trait OutputFormatter {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    /// Format the collection summary with one row per worker
    fn format_collection_summary(&self, summary: &CollectionSummary, workers: &[WorkerReport]) -> Result<String>;

    /// Format quick update ratios as a table
    fn format_quick_ratios(&self, ratios: &[QuickRatio], update_groups: usize) -> Result<String>;

    /// Format pairwise t-test results as a table
    fn format_pairwise(&self, comparisons: &[PairwiseComparison], kind: TTestKind) -> Result<String>;

    /// Format per-connection delay summaries as a table
    fn format_delay_summaries(&self, summaries: &[DelaySummary]) -> Result<String>;

    /// Format analysis warnings
    fn format_analysis_warnings(&self, warnings: &[AnalysisWarning]) -> Result<String>;

    /// Format a one-line summary of the whole run
    fn format_quick_summary(&self, report: &RunReport) -> Result<String>;

    /// Format error messages
    fn format_error(&self, error: &str) -> Result<String>;

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> Result<String>;

    /// Format success messages
    fn format_success(&self, message: &str) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Enable verbose mode with detailed information
    pub verbose_mode: bool,
    /// Show table borders
    pub table_borders: bool,
    /// Maximum output width
    pub max_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            table_borders: true,
            max_width: 120,
        }
    }
}

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    /// Column definitions
    pub columns: Vec<Column>,
    /// Show borders around table
    pub show_borders: bool,
    /// Show header row
    pub show_header: bool,
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    /// Column header
    pub header: String,
    /// Column alignment
    pub alignment: Alignment,
    /// Minimum width
    pub min_width: usize,
    /// Maximum width
    pub max_width: usize,
}

impl Column {
    pub fn left(header: &str, min_width: usize, max_width: usize) -> Self {
        Self { header: header.to_string(), alignment: Alignment::Left, min_width, max_width }
    }

    pub fn right(header: &str, min_width: usize, max_width: usize) -> Self {
        Self { header: header.to_string(), alignment: Alignment::Right, min_width, max_width }
    }

    pub fn center(header: &str, min_width: usize, max_width: usize) -> Self {
        Self { header: header.to_string(), alignment: Alignment::Center, min_width, max_width }
    }
}

/// Text alignment options
#[derive(Debug, Clone)]
pub enum Alignment {
    Left,
    Right,
    Center,
}

/// Row data for table formatting
pub type RowData = Vec<String>;

fn fmt_err(e: std::fmt::Error) -> AppError {
    AppError::io(format!("Failed to format output: {}", e))
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    /// Create a table with the given format and data
    pub(crate) fn create_table(&self, format: &TableFormat, rows: &[RowData]) -> String {
        if rows.is_empty() {
            return String::new();
        }

        let column_widths = self.calculate_column_widths(format, rows);
        let mut output = String::new();

        if format.show_header && !format.columns.is_empty() {
            if format.show_borders {
                output.push_str(&self.create_horizontal_border(&column_widths));
                output.push('\n');
            }

            let headers: Vec<String> = format.columns.iter().map(|c| c.header.clone()).collect();
            output.push_str(&self.create_row(&headers, &column_widths, format));
            output.push('\n');

            if format.show_borders {
                output.push_str(&self.create_horizontal_border(&column_widths));
                output.push('\n');
            }
        }

        for row in rows {
            output.push_str(&self.create_row(row, &column_widths, format));
            output.push('\n');
        }

        if format.show_borders {
            output.push_str(&self.create_horizontal_border(&column_widths));
        }

        output.trim_end().to_string()
    }

    fn calculate_column_widths(&self, format: &TableFormat, rows: &[RowData]) -> Vec<usize> {
        let num_columns = format.columns.len().max(rows.iter().map(|r| r.len()).max().unwrap_or(0));

        (0..num_columns)
            .map(|col_idx| {
                let column = format.columns.get(col_idx);
                let mut width = column.map(|c| c.min_width.max(c.header.chars().count())).unwrap_or(8);

                for row in rows {
                    if let Some(cell) = row.get(col_idx) {
                        width = width.max(cell.chars().count());
                    }
                }

                width.min(column.map(|c| c.max_width).unwrap_or(self.options.max_width))
            })
            .collect()
    }

    fn create_row(&self, data: &[String], widths: &[usize], format: &TableFormat) -> String {
        let mut row = String::new();

        if format.show_borders {
            row.push('|');
        }

        for (idx, (cell, &width)) in data.iter().zip(widths.iter()).enumerate() {
            let alignment = format.columns.get(idx).map(|c| &c.alignment).unwrap_or(&Alignment::Left);
            let padded_cell = align_text(cell, width, alignment);

            if format.show_borders {
                row.push(' ');
                row.push_str(&padded_cell);
                row.push_str(" |");
            } else {
                row.push_str(&padded_cell);
                row.push_str("  ");
            }
        }

        row.trim_end().to_string()
    }

    fn create_horizontal_border(&self, widths: &[usize]) -> String {
        let mut border = String::new();

        if !widths.is_empty() {
            border.push('+');
            for &width in widths {
                border.push_str(&"-".repeat(width + 2));
                border.push('+');
            }
        }

        border
    }

    pub(crate) fn worker_table(&self, workers: &[WorkerReport]) -> String {
        let format = TableFormat {
            columns: vec![
                Column::right("Conn", 4, 6),
                Column::left("State", 8, 10),
                Column::right("Attempts", 8, 8),
                Column::right("Samples", 7, 10),
                Column::right("Skipped", 7, 10),
                Column::left("Termination", 12, 60),
            ],
            show_borders: self.options.table_borders,
            show_header: true,
        };

        let rows: Vec<RowData> = workers
            .iter()
            .map(|w| {
                vec![
                    w.connection_id.to_string(),
                    w.final_state.label().to_string(),
                    w.attempts.to_string(),
                    w.samples_recorded.to_string(),
                    w.messages_skipped.to_string(),
                    w.termination.to_string(),
                ]
            })
            .collect();

        self.create_table(&format, &rows)
    }

    pub(crate) fn quick_ratio_table(&self, ratios: &[QuickRatio]) -> String {
        let format = TableFormat {
            columns: vec![
                Column::right("Conn", 4, 6),
                Column::right("Fastest", 7, 10),
                Column::right("Samples", 7, 10),
                Column::right("Quick Ratio", 11, 11),
            ],
            show_borders: self.options.table_borders,
            show_header: true,
        };

        let rows: Vec<RowData> = ratios
            .iter()
            .map(|r| {
                vec![
                    r.connection_id.to_string(),
                    r.fastest_count.to_string(),
                    r.total_count.to_string(),
                    r.ratio.map(format_ratio).unwrap_or_else(|| "N/A".to_string()),
                ]
            })
            .collect();

        self.create_table(&format, &rows)
    }

    pub(crate) fn pairwise_table(&self, comparisons: &[PairwiseComparison]) -> String {
        let format = TableFormat {
            columns: vec![
                Column::center("Pair", 7, 9),
                Column::right("t-stat", 9, 12),
                Column::right("df", 7, 10),
                Column::right("p-value", 9, 10),
                Column::left("Result", 10, 60),
            ],
            show_borders: self.options.table_borders,
            show_header: true,
        };

        let rows: Vec<RowData> = comparisons
            .iter()
            .map(|c| {
                let pair = format!("{} vs {}", c.first, c.second);
                match &c.outcome {
                    PairOutcome::Tested(result) => vec![
                        pair,
                        format!("{:.4}", result.t_stat),
                        format!("{:.2}", result.degrees_of_freedom),
                        format_p_value(result.p_value),
                        if result.is_significant(SIGNIFICANCE_LEVEL) {
                            "significant".to_string()
                        } else {
                            "not significant".to_string()
                        },
                    ],
                    PairOutcome::Skipped { reason } => vec![
                        pair,
                        "-".to_string(),
                        "-".to_string(),
                        "-".to_string(),
                        format!("skipped: {}", reason),
                    ],
                }
            })
            .collect();

        self.create_table(&format, &rows)
    }

    pub(crate) fn delay_summary_table(&self, summaries: &[DelaySummary]) -> String {
        let mut columns = vec![
            Column::right("Conn", 4, 6),
            Column::right("Count", 5, 10),
            Column::right("Mean", 9, 12),
            Column::right("Median", 9, 12),
        ];
        if self.options.verbose_mode {
            columns.extend([
                Column::right("Std Dev", 9, 12),
                Column::right("Min", 9, 12),
                Column::right("Q1", 9, 12),
                Column::right("Q3", 9, 12),
                Column::right("Max", 9, 12),
            ]);
        }
        let format = TableFormat { columns, show_borders: self.options.table_borders, show_header: true };

        let rows: Vec<RowData> = summaries
            .iter()
            .map(|s| {
                let mut row = vec![
                    s.connection_id.to_string(),
                    s.count.to_string(),
                    format_delay(s.mean),
                    format_delay(s.median),
                ];
                if self.options.verbose_mode {
                    row.extend([
                        format_delay(s.std_dev),
                        format_delay(s.min),
                        format_delay(s.q1),
                        format_delay(s.q3),
                        format_delay(s.max),
                    ]);
                }
                row
            })
            .collect();

        self.create_table(&format, &rows)
    }
}

/// Align text within specified width
pub(crate) fn align_text(text: &str, width: usize, alignment: &Alignment) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.chars().take(width).collect();
    }

    let padding = width - len;
    match alignment {
        Alignment::Left => format!("{}{}", text, " ".repeat(padding)),
        Alignment::Right => format!("{}{}", " ".repeat(padding), text),
        Alignment::Center => {
            let left_pad = padding / 2;
            let right_pad = padding - left_pad;
            format!("{}{}{}", " ".repeat(left_pad), text, " ".repeat(right_pad))
        }
    }
}

/// Format a delay given in seconds
pub fn format_delay(seconds: f64) -> String {
    let ms = seconds * 1000.0;
    if ms.abs() < 1.0 {
        format!("{:.1}us", ms * 1000.0)
    } else if ms.abs() < 1000.0 {
        format!("{:.2}ms", ms)
    } else {
        format!("{:.3}s", seconds)
    }
}

/// Format an elapsed wall-clock duration
pub fn format_elapsed(elapsed: std::time::Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        let minutes = (secs / 60.0) as u64;
        format!("{}m{:.1}s", minutes, secs - (minutes as f64) * 60.0)
    }
}

pub fn format_ratio(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

pub fn format_p_value(p: f64) -> String {
    if p < 0.0001 {
        "<0.0001".to_string()
    } else {
        format!("{:.4}", p)
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(title.len() + 4);

        writeln!(output, "{}", border).map_err(fmt_err)?;
        writeln!(output, "  {}  ", title).map_err(fmt_err)?;
        write!(output, "{}", border).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_collection_summary(&self, summary: &CollectionSummary, workers: &[WorkerReport]) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "Collection Summary:").map_err(fmt_err)?;
        writeln!(output, "-------------------").map_err(fmt_err)?;
        writeln!(output, "Elapsed:          {}", format_elapsed(summary.elapsed)).map_err(fmt_err)?;
        writeln!(output, "Connections:      {}", summary.total_connections).map_err(fmt_err)?;
        writeln!(output, "Streamed:         {}", summary.streamed).map_err(fmt_err)?;
        writeln!(output, "Given Up:         {}", summary.given_up).map_err(fmt_err)?;
        writeln!(output, "Stream Errors:    {}", summary.stream_errors).map_err(fmt_err)?;
        writeln!(output, "Samples:          {}", summary.total_samples).map_err(fmt_err)?;
        write!(output, "Skipped Messages: {}", summary.skipped_messages).map_err(fmt_err)?;

        if !workers.is_empty() {
            write!(output, "\n\n{}", self.worker_table(workers)).map_err(fmt_err)?;
        }

        Ok(output)
    }

    fn format_quick_ratios(&self, ratios: &[QuickRatio], update_groups: usize) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "Quick Update Ratios ({} updates):", update_groups).map_err(fmt_err)?;
        writeln!(output, "---------------------------------").map_err(fmt_err)?;

        if ratios.is_empty() {
            write!(output, "No connections to compare.").map_err(fmt_err)?;
        } else {
            write!(output, "{}", self.quick_ratio_table(ratios)).map_err(fmt_err)?;
        }

        Ok(output)
    }

    fn format_pairwise(&self, comparisons: &[PairwiseComparison], kind: TTestKind) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "Pairwise T-Tests ({}, alpha = {}):", kind, SIGNIFICANCE_LEVEL).map_err(fmt_err)?;
        writeln!(output, "----------------").map_err(fmt_err)?;

        if comparisons.is_empty() {
            write!(output, "Fewer than two connections; nothing to compare.").map_err(fmt_err)?;
        } else {
            write!(output, "{}", self.pairwise_table(comparisons)).map_err(fmt_err)?;
        }

        Ok(output)
    }

    fn format_delay_summaries(&self, summaries: &[DelaySummary]) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "Delay Distribution:").map_err(fmt_err)?;
        writeln!(output, "-------------------").map_err(fmt_err)?;

        if summaries.is_empty() {
            write!(output, "No samples were collected.").map_err(fmt_err)?;
        } else {
            write!(output, "{}", self.delay_summary_table(summaries)).map_err(fmt_err)?;
        }

        Ok(output)
    }

    fn format_analysis_warnings(&self, warnings: &[AnalysisWarning]) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "Warnings:").map_err(fmt_err)?;
        write!(output, "---------").map_err(fmt_err)?;
        for warning in warnings {
            write!(output, "\n{}", self.format_warning(&warning.to_string())?).map_err(fmt_err)?;
        }

        Ok(output)
    }

    fn format_quick_summary(&self, report: &RunReport) -> Result<String> {
        let fastest = report
            .analysis
            .fastest_connection()
            .map(|id| format!("connection {}", id))
            .unwrap_or_else(|| "none".to_string());

        Ok(format!(
            "Connections: {}/{} streamed | Samples: {} | Fastest: {} | Significant pairs: {}/{} | Duration: {}",
            report.collection.streamed,
            report.collection.total_connections,
            report.collection.total_samples,
            fastest,
            report.analysis.significant_pairs(SIGNIFICANCE_LEVEL).len(),
            report.analysis.tested_pairs(),
            format_elapsed(report.collection.elapsed)
        ))
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("ERROR: {}", error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("WARNING: {}", warning))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("SUCCESS: {}", message))
    }
}

/// Whether a worker ended in a way worth highlighting
pub(crate) fn worker_failed(report: &WorkerReport) -> bool {
    report.final_state == WorkerState::GivenUp
        || matches!(report.termination, crate::types::TerminationReason::StreamError(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::TTestResult;
    use crate::types::TerminationReason;
    use std::time::Duration;

    fn formatter() -> PlainFormatter {
        PlainFormatter::new(FormattingOptions { enable_color: false, ..Default::default() })
    }

    #[test]
    fn test_header() {
        let header = formatter().format_header("Title").unwrap();
        assert_eq!(header, "=========\n  Title  \n=========");
    }

    #[test]
    fn test_table_alignment() {
        let format = TableFormat {
            columns: vec![Column::left("Name", 4, 10), Column::right("Value", 5, 10)],
            show_borders: true,
            show_header: true,
        };
        let rows = vec![vec!["a".to_string(), "1".to_string()], vec!["bbbbbb".to_string(), "22".to_string()]];
        let table = formatter().create_table(&format, &rows);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "+--------+-------+");
        assert_eq!(lines[1], "| Name   | Value |");
        assert_eq!(lines[3], "| a      |     1 |");
        assert_eq!(lines[4], "| bbbbbb |    22 |");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_empty_table() {
        let format = TableFormat { columns: vec![Column::left("A", 1, 5)], show_borders: true, show_header: true };
        assert!(formatter().create_table(&format, &[]).is_empty());
    }

    #[test]
    fn test_value_formatting() {
        assert_eq!(format_delay(0.0125), "12.50ms");
        assert_eq!(format_delay(0.0000005), "0.5us");
        assert_eq!(format_delay(2.5), "2.500s");
        assert_eq!(format_delay(-0.002), "-2.00ms");
        assert_eq!(format_ratio(0.5), "50.0%");
        assert_eq!(format_p_value(0.00001), "<0.0001");
        assert_eq!(format_p_value(0.346593), "0.3466");
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_elapsed(Duration::from_secs(90)), "1m30.0s");
    }

    #[test]
    fn test_quick_ratio_table_marks_missing_data() {
        let ratios = vec![
            QuickRatio { connection_id: 0, fastest_count: 3, total_count: 4, ratio: Some(0.75) },
            QuickRatio { connection_id: 1, fastest_count: 0, total_count: 0, ratio: None },
        ];
        let output = formatter().format_quick_ratios(&ratios, 4).unwrap();

        assert!(output.contains("Quick Update Ratios (4 updates)"));
        assert!(output.contains("75.0%"));
        assert!(output.contains("N/A"));
    }

    #[test]
    fn test_pairwise_table() {
        let comparisons = vec![
            PairwiseComparison {
                first: 0,
                second: 1,
                outcome: PairOutcome::Tested(TTestResult {
                    t_stat: -1.0,
                    p_value: 0.346593,
                    degrees_of_freedom: 8.0,
                    kind: TTestKind::Student,
                }),
            },
            PairwiseComparison {
                first: 0,
                second: 2,
                outcome: PairOutcome::Skipped { reason: "no data".to_string() },
            },
        ];
        let output = formatter().format_pairwise(&comparisons, TTestKind::Student).unwrap();

        assert!(output.contains("0 vs 1"));
        assert!(output.contains("-1.0000"));
        assert!(output.contains("0.3466"));
        assert!(output.contains("not significant"));
        assert!(output.contains("skipped: no data"));
    }

    #[test]
    fn test_collection_summary_lists_workers() {
        let summary = CollectionSummary {
            total_connections: 2,
            streamed: 1,
            given_up: 1,
            stream_errors: 0,
            total_samples: 10,
            skipped_messages: 2,
            elapsed: Duration::from_secs(5),
        };
        let workers = vec![
            WorkerReport {
                connection_id: 0,
                endpoint: "ws://127.0.0.1:1/a".to_string(),
                final_state: WorkerState::Done,
                attempts: 1,
                samples_recorded: 10,
                messages_skipped: 2,
                termination: TerminationReason::DeadlineReached,
                streaming_started: None,
            },
            WorkerReport {
                connection_id: 1,
                endpoint: "ws://127.0.0.1:1/a".to_string(),
                final_state: WorkerState::GivenUp,
                attempts: 3,
                samples_recorded: 0,
                messages_skipped: 0,
                termination: TerminationReason::RetriesExhausted,
                streaming_started: None,
            },
        ];
        let output = formatter().format_collection_summary(&summary, &workers).unwrap();

        assert!(output.contains("Given Up:         1"));
        assert!(output.contains("deadline reached"));
        assert!(output.contains("retries exhausted"));
        assert!(!worker_failed(&workers[0]));
        assert!(worker_failed(&workers[1]));
    }

    #[test]
    fn test_verbose_delay_summary_has_quartiles() {
        let summaries = vec![DelaySummary {
            connection_id: 0,
            count: 5,
            mean: 0.003,
            std_dev: 0.001,
            min: 0.001,
            q1: 0.002,
            median: 0.003,
            q3: 0.004,
            max: 0.005,
        }];

        let compact = formatter().format_delay_summaries(&summaries).unwrap();
        assert!(!compact.contains("Q1"));

        let verbose = PlainFormatter::new(FormattingOptions { verbose_mode: true, ..Default::default() })
            .format_delay_summaries(&summaries)
            .unwrap();
        assert!(verbose.contains("Q1"));
        assert!(verbose.contains("5.00ms"));
    }
}
