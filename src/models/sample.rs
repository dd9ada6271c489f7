//! Latency sample record

use serde::{Deserialize, Serialize};

/// One latency observation: a single update seen on a single connection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelaySample {
    /// Receipt time minus event time, in seconds. Negative under clock skew.
    pub delay: f64,
    /// Identifier of the logical update, shared across connections
    pub update_id: u64,
    /// Index of the observing connection
    pub connection_id: usize,
}

impl DelaySample {
    pub fn new(delay: f64, update_id: u64, connection_id: usize) -> Self {
        Self {
            delay,
            update_id,
            connection_id,
        }
    }

    /// Delay in milliseconds, for display
    pub fn delay_ms(&self) -> f64 {
        self.delay * 1000.0
    }
}
