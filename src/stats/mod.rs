//! Latency analysis across connections
//!
//! Given a finished ledger, the engine computes:
//! - quick-update ratios: how often each connection saw an update first
//! - pairwise two-sample t-tests between connections' delay distributions
//! - a five-number summary of each connection's delays

pub mod ttest;


pub use ttest::{two_sample_ttest, TTestKind, TTestResult};

use crate::{
    error::{AppError, Result},
    ledger::DelayLedger,
    logging::AnalysisLogger,
    models::DelaySample,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Fraction of a connection's samples that were fastest for their update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuickRatio {
    pub connection_id: usize,
    pub fastest_count: usize,
    pub total_count: usize,
    /// `None` when the connection recorded nothing
    pub ratio: Option<f64>,
}

/// Result of comparing two connections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseComparison {
    pub first: usize,
    pub second: usize,
    pub outcome: PairOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PairOutcome {
    Tested(TTestResult),
    Skipped { reason: String },
}

/// Five-number summary plus mean and spread, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelaySummary {
    pub connection_id: usize,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; zero for a single sample
    pub std_dev: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Data-availability problems found during analysis. Not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisWarning {
    /// Row excluded because its connection id or delay is unusable
    MalformedRow { index: usize, connection_id: usize, delay: f64 },
    NoSamples { connection_id: usize },
    EmptyPair { first: usize, second: usize },
    DegenerateTest { first: usize, second: usize, reason: String },
}

impl fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisWarning::MalformedRow { index, connection_id, delay } => write!(
                f,
                "Excluding row {} (connection_id={}, delay={}): malformed",
                index, connection_id, delay
            ),
            AnalysisWarning::NoSamples { connection_id } => {
                write!(f, "No data for connection {}", connection_id)
            }
            AnalysisWarning::EmptyPair { first, second } => write!(
                f,
                "Not enough data to perform t-test between connection {} and connection {}",
                first, second
            ),
            AnalysisWarning::DegenerateTest { first, second, reason } => write!(
                f,
                "Skipping t-test between connection {} and connection {}: {}",
                first, second, reason
            ),
        }
    }
}

/// Complete analysis output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub num_connections: usize,
    /// Rows that passed validation
    pub analyzed_samples: usize,
    pub excluded_samples: usize,
    pub update_groups: usize,
    pub test_kind: TTestKind,
    /// One entry per connection, in id order
    pub quick_ratios: Vec<QuickRatio>,
    /// Every `(i, j)` with `i < j`, in lexicographic order
    pub pairwise: Vec<PairwiseComparison>,
    /// Non-empty connections only
    pub summaries: Vec<DelaySummary>,
    pub warnings: Vec<AnalysisWarning>,
    pub generated_at: DateTime<Utc>,
}

impl AnalysisReport {
    /// Connection with the highest quick ratio
    pub fn fastest_connection(&self) -> Option<usize> {
        self.quick_ratios
            .iter()
            .filter_map(|r| r.ratio.map(|ratio| (r.connection_id, ratio)))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(id, _)| id)
    }

    /// Tested pairs whose p-value falls below `alpha`
    pub fn significant_pairs(&self, alpha: f64) -> Vec<&PairwiseComparison> {
        self.pairwise
            .iter()
            .filter(|c| matches!(&c.outcome, PairOutcome::Tested(r) if r.is_significant(alpha)))
            .collect()
    }

    pub fn tested_pairs(&self) -> usize {
        self.pairwise
            .iter()
            .filter(|c| matches!(c.outcome, PairOutcome::Tested(_)))
            .count()
    }
}

/// Computes quick ratios, pairwise tests and delay summaries
pub struct AnalysisEngine {
    kind: TTestKind,
    logger: Option<AnalysisLogger>,
}

impl AnalysisEngine {
    /// `equal_var` selects the pooled-variance test; otherwise Welch's
    pub fn new(equal_var: bool) -> Self {
        Self {
            kind: TTestKind::from_equal_var(equal_var),
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: AnalysisLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn test_kind(&self) -> TTestKind {
        self.kind
    }

    pub fn analyze_ledger(&self, ledger: &DelayLedger) -> Result<AnalysisReport> {
        self.analyze(ledger.samples(), ledger.num_connections())
    }

    /// Analyze `samples` recorded by `num_connections` connections
    pub fn analyze(&self, samples: &[DelaySample], num_connections: usize) -> Result<AnalysisReport> {
        if num_connections == 0 {
            let err = AppError::validation("num_connections must be a positive integer");
            if let Some(logger) = &self.logger {
                logger.log_error(&err);
            }
            return Err(err);
        }

        let mut warnings = Vec::new();
        let valid = partition_valid(samples, num_connections, &mut warnings);

        let (quick_ratios, update_groups) = quick_ratios(&valid, num_connections);
        for ratio in quick_ratios.iter().filter(|r| r.ratio.is_none()) {
            warnings.push(AnalysisWarning::NoSamples { connection_id: ratio.connection_id });
        }

        let by_connection = delays_by_connection(&valid, num_connections);
        let pairwise = self.pairwise_tests(&by_connection, &mut warnings);

        let summaries = by_connection
            .iter()
            .enumerate()
            .filter_map(|(id, delays)| summarize(id, delays))
            .collect();

        let report = AnalysisReport {
            num_connections,
            analyzed_samples: valid.len(),
            excluded_samples: samples.len() - valid.len(),
            update_groups,
            test_kind: self.kind,
            quick_ratios,
            pairwise,
            summaries,
            warnings,
            generated_at: Utc::now(),
        };

        if let Some(logger) = &self.logger {
            logger.log_quick_ratios(&report.quick_ratios);
            for comparison in &report.pairwise {
                logger.log_pairwise(comparison);
            }
            for warning in &report.warnings {
                logger.log_warning(warning);
            }
        }

        Ok(report)
    }

    fn pairwise_tests(
        &self,
        by_connection: &[Vec<f64>],
        warnings: &mut Vec<AnalysisWarning>,
    ) -> Vec<PairwiseComparison> {
        let n = by_connection.len();
        let mut comparisons = Vec::with_capacity(n * n.saturating_sub(1) / 2);

        for first in 0..n {
            for second in (first + 1)..n {
                let (a, b) = (&by_connection[first], &by_connection[second]);

                let outcome = if a.is_empty() || b.is_empty() {
                    let warning = AnalysisWarning::EmptyPair { first, second };
                    let reason = warning.to_string();
                    warnings.push(warning);
                    PairOutcome::Skipped { reason }
                } else {
                    match two_sample_ttest(a, b, self.kind) {
                        Ok(result) => PairOutcome::Tested(result),
                        Err(e) => {
                            let reason = match e {
                                AppError::Statistics(msg) => msg,
                                other => other.to_string(),
                            };
                            warnings.push(AnalysisWarning::DegenerateTest {
                                first,
                                second,
                                reason: reason.clone(),
                            });
                            PairOutcome::Skipped { reason }
                        }
                    }
                };

                comparisons.push(PairwiseComparison { first, second, outcome });
            }
        }

        comparisons
    }
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new(crate::defaults::DEFAULT_EQUAL_VAR)
    }
}

/// Keep rows with an in-range connection and a finite delay
fn partition_valid(
    samples: &[DelaySample],
    num_connections: usize,
    warnings: &mut Vec<AnalysisWarning>,
) -> Vec<DelaySample> {
    let mut valid = Vec::with_capacity(samples.len());
    for (index, sample) in samples.iter().enumerate() {
        if sample.connection_id < num_connections && sample.delay.is_finite() {
            valid.push(*sample);
        } else {
            warnings.push(AnalysisWarning::MalformedRow {
                index,
                connection_id: sample.connection_id,
                delay: sample.delay,
            });
        }
    }
    valid
}

/// Per-connection fastest fractions and the number of update groups.
///
/// A sample is fastest when its delay equals its group's minimum exactly,
/// so ties credit every tied connection.
pub fn quick_ratios(samples: &[DelaySample], num_connections: usize) -> (Vec<QuickRatio>, usize) {
    let mut group_min: HashMap<u64, f64> = HashMap::new();
    for sample in samples {
        group_min
            .entry(sample.update_id)
            .and_modify(|m| *m = m.min(sample.delay))
            .or_insert(sample.delay);
    }

    let mut fastest = vec![0usize; num_connections];
    let mut total = vec![0usize; num_connections];
    for sample in samples {
        total[sample.connection_id] += 1;
        if group_min.get(&sample.update_id) == Some(&sample.delay) {
            fastest[sample.connection_id] += 1;
        }
    }

    let ratios = (0..num_connections)
        .map(|connection_id| QuickRatio {
            connection_id,
            fastest_count: fastest[connection_id],
            total_count: total[connection_id],
            ratio: (total[connection_id] > 0)
                .then(|| fastest[connection_id] as f64 / total[connection_id] as f64),
        })
        .collect();

    (ratios, group_min.len())
}

fn delays_by_connection(samples: &[DelaySample], num_connections: usize) -> Vec<Vec<f64>> {
    let mut delays = vec![Vec::new(); num_connections];
    for sample in samples {
        delays[sample.connection_id].push(sample.delay);
    }
    delays
}

fn summarize(connection_id: usize, delays: &[f64]) -> Option<DelaySummary> {
    if delays.is_empty() {
        return None;
    }

    let mut sorted = delays.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count as f64;
    let std_dev = if count > 1 {
        (sorted.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (count - 1) as f64).sqrt()
    } else {
        0.0
    };

    Some(DelaySummary {
        connection_id,
        count,
        mean,
        std_dev,
        min: sorted[0],
        q1: percentile(&sorted, 25.0),
        median: percentile(&sorted, 50.0),
        q3: percentile(&sorted, 75.0),
        max: sorted[count - 1],
    })
}

/// Linear-interpolated percentile of sorted, non-empty values
fn percentile(sorted_values: &[f64], percentile: f64) -> f64 {
    let index = (percentile / 100.0) * (sorted_values.len() as f64 - 1.0);
    let lower_index = index.floor() as usize;
    let upper_index = index.ceil() as usize;

    if lower_index == upper_index {
        sorted_values[lower_index]
    } else {
        let weight = index - lower_index as f64;
        sorted_values[lower_index] + weight * (sorted_values[upper_index] - sorted_values[lower_index])
    }
}
