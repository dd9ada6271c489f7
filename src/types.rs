//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Lifecycle states of a single connection worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    /// Not yet attempted
    Disconnected,
    /// Connect attempt in flight
    Connecting,
    /// Waiting out the backoff after a failed attempt
    Retrying { attempt: u32 },
    /// Connected and receiving updates
    Streaming,
    /// Collection window finished or the remote side ended the stream
    Done,
    /// Connect retries exhausted
    GivenUp,
}

impl WorkerState {
    /// Whether the worker has stopped for good
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Done | WorkerState::GivenUp)
    }

    /// Short label for tables and logs
    pub fn label(&self) -> &'static str {
        match self {
            WorkerState::Disconnected => "disconnected",
            WorkerState::Connecting => "connecting",
            WorkerState::Retrying { .. } => "retrying",
            WorkerState::Streaming => "streaming",
            WorkerState::Done => "done",
            WorkerState::GivenUp => "given up",
        }
    }
}

/// Why a worker stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The collection deadline passed
    DeadlineReached,
    /// The remote side closed the connection cleanly
    RemoteClosed,
    /// The connection failed after it was established
    StreamError(String),
    /// Every connect attempt failed
    RetriesExhausted,
    /// The worker task itself failed (panic or cancellation)
    TaskFailed(String),
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::DeadlineReached => write!(f, "deadline reached"),
            TerminationReason::RemoteClosed => write!(f, "closed by remote"),
            TerminationReason::StreamError(msg) => write!(f, "stream error: {}", msg),
            TerminationReason::RetriesExhausted => write!(f, "retries exhausted"),
            TerminationReason::TaskFailed(msg) => write!(f, "task failed: {}", msg),
        }
    }
}

/// How each worker's collection window is anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DeadlineMode {
    /// Window starts after the worker's own successful connect
    #[default]
    PerWorker,
    /// Every window ends at run start plus the collection duration
    Global,
}

impl FromStr for DeadlineMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "per-worker" | "per_worker" | "worker" => Ok(DeadlineMode::PerWorker),
            "global" => Ok(DeadlineMode::Global),
            other => Err(AppError::parse(format!("Invalid deadline mode: {}", other))),
        }
    }
}

impl fmt::Display for DeadlineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeadlineMode::PerWorker => write!(f, "per-worker"),
            DeadlineMode::Global => write!(f, "global"),
        }
    }
}

/// Backoff strategy selector used by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BackoffKind {
    /// Same delay between every attempt
    #[default]
    Fixed,
    /// Delay doubles after each failed attempt
    Exponential,
}

impl FromStr for BackoffKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(BackoffKind::Fixed),
            "exponential" | "exp" => Ok(BackoffKind::Exponential),
            other => Err(AppError::parse(format!("Invalid backoff strategy: {}", other))),
        }
    }
}

impl fmt::Display for BackoffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackoffKind::Fixed => write!(f, "fixed"),
            BackoffKind::Exponential => write!(f, "exponential"),
        }
    }
}
