//! Shared sample ledger
//!
//! Workers append through [`SharedLedger`] while collection runs. Once every
//! worker has finished, the orchestrator freezes it into a [`DelayLedger`]
//! that analysis reads.

use crate::error::{AppError, Result};
use crate::models::DelaySample;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Append-only handle cloned into every worker
#[derive(Debug, Clone)]
pub struct SharedLedger {
    samples: Arc<Mutex<Vec<DelaySample>>>,
    num_connections: usize,
}

impl SharedLedger {
    /// Create an empty ledger for `num_connections` connections
    pub fn new(num_connections: usize) -> Self {
        Self {
            samples: Arc::new(Mutex::new(Vec::new())),
            num_connections,
        }
    }

    pub fn num_connections(&self) -> usize {
        self.num_connections
    }

    /// Append one sample. Out-of-range connection ids are rejected.
    pub fn append(&self, sample: DelaySample) -> Result<()> {
        if sample.connection_id >= self.num_connections {
            return Err(AppError::validation(format!(
                "connection_id {} out of range for {} connections",
                sample.connection_id, self.num_connections
            )));
        }

        let mut samples = self
            .samples
            .lock()
            .map_err(|_| AppError::internal("ledger lock poisoned"))?;
        samples.push(sample);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the samples recorded so far
    pub fn snapshot(&self) -> Vec<DelaySample> {
        self.samples.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Freeze into a read-only ledger
    pub fn into_ledger(self) -> DelayLedger {
        let num_connections = self.num_connections;
        let samples = match Arc::try_unwrap(self.samples) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()),
            // Other handles still alive; fall back to a copy
            Err(shared) => match shared.lock() {
                Ok(guard) => guard.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            },
        };

        DelayLedger {
            samples,
            num_connections,
        }
    }
}

/// Finished, read-only ledger
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DelayLedger {
    samples: Vec<DelaySample>,
    num_connections: usize,
}

impl DelayLedger {
    /// Build a ledger from existing samples, validating connection ids
    pub fn from_samples(samples: Vec<DelaySample>, num_connections: usize) -> Result<Self> {
        if let Some(bad) = samples.iter().find(|s| s.connection_id >= num_connections) {
            return Err(AppError::validation(format!(
                "connection_id {} out of range for {} connections",
                bad.connection_id, num_connections
            )));
        }

        Ok(Self {
            samples,
            num_connections,
        })
    }

    pub fn samples(&self) -> &[DelaySample] {
        &self.samples
    }

    pub fn num_connections(&self) -> usize {
        self.num_connections
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample count per connection, including connections with none
    pub fn counts_by_connection(&self) -> Vec<usize> {
        let mut counts = vec![0; self.num_connections];
        for sample in &self.samples {
            counts[sample.connection_id] += 1;
        }
        counts
    }

    /// Samples grouped by update id
    pub fn by_update(&self) -> BTreeMap<u64, Vec<DelaySample>> {
        let mut groups: BTreeMap<u64, Vec<DelaySample>> = BTreeMap::new();
        for sample in &self.samples {
            groups.entry(sample.update_id).or_default().push(*sample);
        }
        groups
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.samples)?)
    }

    /// Write the samples as a JSON array
    pub fn export(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| {
            AppError::io(format!("Failed to write ledger to {}: {}", path.display(), e))
        })
    }
}
