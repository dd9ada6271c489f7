//! Two-sample t-tests

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::fmt;

/// Variance assumption of the test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TTestKind {
    /// Pooled variance, `df = n1 + n2 - 2`
    Student,
    /// Unequal variances, Welch-Satterthwaite `df`
    Welch,
}

impl TTestKind {
    pub fn from_equal_var(equal_var: bool) -> Self {
        if equal_var {
            TTestKind::Student
        } else {
            TTestKind::Welch
        }
    }
}

impl fmt::Display for TTestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TTestKind::Student => write!(f, "Student (pooled variance)"),
            TTestKind::Welch => write!(f, "Welch (unequal variance)"),
        }
    }
}

/// Outcome of an unpaired two-sided t-test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TTestResult {
    pub t_stat: f64,
    /// Two-sided, within `[0, 1]`
    pub p_value: f64,
    pub degrees_of_freedom: f64,
    pub kind: TTestKind,
}

impl TTestResult {
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

struct Moments {
    n: f64,
    mean: f64,
    /// Sum of squared deviations from the mean
    ss: f64,
}

impl Moments {
    fn of(values: &[f64]) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let ss = values.iter().map(|v| (v - mean).powi(2)).sum();
        Self { n, mean, ss }
    }
}

/// Run an unpaired two-sided t-test of `a` against `b`.
///
/// Fails with a statistics error when the test is undefined: empty inputs,
/// non-positive degrees of freedom, or a zero standard error.
pub fn two_sample_ttest(a: &[f64], b: &[f64], kind: TTestKind) -> Result<TTestResult> {
    if a.is_empty() || b.is_empty() {
        return Err(AppError::statistics("t-test needs samples on both sides"));
    }

    let x = Moments::of(a);
    let y = Moments::of(b);

    let (se, df) = match kind {
        TTestKind::Student => {
            let df = x.n + y.n - 2.0;
            if df <= 0.0 {
                return Err(AppError::statistics(format!(
                    "degrees of freedom must be positive, got {}",
                    df
                )));
            }
            let pooled = (x.ss + y.ss) / df;
            ((pooled * (1.0 / x.n + 1.0 / y.n)).sqrt(), df)
        }
        TTestKind::Welch => {
            if x.n < 2.0 || y.n < 2.0 {
                return Err(AppError::statistics(
                    "Welch's test needs at least two samples per side",
                ));
            }
            let vx = x.ss / (x.n - 1.0) / x.n;
            let vy = y.ss / (y.n - 1.0) / y.n;
            let se2 = vx + vy;
            let df = se2.powi(2) / (vx.powi(2) / (x.n - 1.0) + vy.powi(2) / (y.n - 1.0));
            (se2.sqrt(), df)
        }
    };

    if !se.is_finite() || se == 0.0 {
        return Err(AppError::statistics("standard error is zero; samples are constant"));
    }
    if !df.is_finite() || df <= 0.0 {
        return Err(AppError::statistics(format!(
            "degrees of freedom must be positive, got {}",
            df
        )));
    }

    let t_stat = (x.mean - y.mean) / se;
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| AppError::statistics(format!("invalid t distribution: {}", e)))?;
    let p_value = (2.0 * dist.sf(t_stat.abs())).clamp(0.0, 1.0);

    Ok(TTestResult {
        t_stat,
        p_value,
        degrees_of_freedom: df,
        kind,
    })
}
