//! Collection engine
//!
//! This module contains the components that gather latency samples:
//! - [`RetryPolicy`] for bounded connect retries with fixed or exponential backoff
//! - [`ConnectionWorker`] owning one streaming connection's lifecycle
//! - [`Orchestrator`] running N workers concurrently over a shared ledger

pub mod retry;
pub mod worker;

pub use retry::{Backoff, RetryPolicy};
pub use worker::ConnectionWorker;

use crate::{
    client::{validate_endpoint, FeedConnector},
    error::{AppError, Result},
    ledger::{DelayLedger, SharedLedger},
    logging::ConnectionLogger,
    models::Config,
    types::{BackoffKind, DeadlineMode, TerminationReason, WorkerState},
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Settings shared by every worker of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionTemplate {
    pub collection_duration: Duration,
    pub retry_limit: u32,
    pub retry_delay: Duration,
    pub backoff: BackoffKind,
    pub deadline_mode: DeadlineMode,
}

impl Default for CollectionTemplate {
    fn default() -> Self {
        Self {
            collection_duration: crate::defaults::DEFAULT_COLLECT_TIME,
            retry_limit: crate::defaults::DEFAULT_RETRY_LIMIT,
            retry_delay: crate::defaults::DEFAULT_RETRY_DELAY,
            backoff: BackoffKind::default(),
            deadline_mode: DeadlineMode::default(),
        }
    }
}

impl CollectionTemplate {
    pub fn validate(&self) -> Result<()> {
        if self.collection_duration.is_zero() {
            return Err(AppError::validation("collection duration must be positive"));
        }
        if self.retry_limit == 0 {
            return Err(AppError::validation("retry limit must be positive"));
        }
        if self.retry_delay.is_zero() {
            return Err(AppError::validation("retry delay must be positive"));
        }
        Ok(())
    }

    /// Per-worker configuration for connection `connection_id`
    pub fn connection_config(
        &self,
        endpoint: &str,
        connection_id: usize,
        global_deadline: Option<Instant>,
    ) -> ConnectionConfig {
        ConnectionConfig {
            endpoint: endpoint.to_string(),
            connection_id,
            collection_duration: self.collection_duration,
            retry_limit: self.retry_limit,
            retry_delay: self.retry_delay,
            backoff: self.backoff,
            global_deadline,
        }
    }
}

impl From<&Config> for CollectionTemplate {
    fn from(config: &Config) -> Self {
        Self {
            collection_duration: config.collect_time(),
            retry_limit: config.retry_limit,
            retry_delay: config.retry_delay(),
            backoff: config.backoff,
            deadline_mode: config.deadline_mode,
        }
    }
}

/// Immutable configuration of one worker
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub endpoint: String,
    pub connection_id: usize,
    pub collection_duration: Duration,
    pub retry_limit: u32,
    pub retry_delay: Duration,
    pub backoff: BackoffKind,
    /// Shared end of the run in global deadline mode
    pub global_deadline: Option<Instant>,
}

impl ConnectionConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_settings(self.retry_limit, self.retry_delay, self.backoff)
    }
}

/// Terminal outcome of one worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub connection_id: usize,
    pub endpoint: String,
    pub final_state: WorkerState,
    pub attempts: u32,
    pub samples_recorded: usize,
    pub messages_skipped: usize,
    pub termination: TerminationReason,
    pub streaming_started: Option<DateTime<Utc>>,
}

/// Everything a finished collection run produced
#[derive(Debug, Clone)]
pub struct CollectionResults {
    pub ledger: DelayLedger,
    /// Ordered by connection id
    pub workers: Vec<WorkerReport>,
    pub elapsed: Duration,
}

impl CollectionResults {
    pub fn summary(&self) -> CollectionSummary {
        CollectionSummary {
            total_connections: self.workers.len(),
            streamed: self
                .workers
                .iter()
                .filter(|w| w.final_state == WorkerState::Done)
                .count(),
            given_up: self
                .workers
                .iter()
                .filter(|w| w.final_state == WorkerState::GivenUp)
                .count(),
            stream_errors: self
                .workers
                .iter()
                .filter(|w| matches!(w.termination, TerminationReason::StreamError(_)))
                .count(),
            total_samples: self.ledger.len(),
            skipped_messages: self.workers.iter().map(|w| w.messages_skipped).sum(),
            elapsed: self.elapsed,
        }
    }
}

/// Aggregate counts over all workers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub total_connections: usize,
    pub streamed: usize,
    pub given_up: usize,
    pub stream_errors: usize,
    pub total_samples: usize,
    pub skipped_messages: usize,
    pub elapsed: Duration,
}

/// Runs one worker per endpoint and gathers their samples
pub struct Orchestrator {
    connector: Arc<dyn FeedConnector>,
    logger: ConnectionLogger,
}

impl Orchestrator {
    pub fn new(connector: Arc<dyn FeedConnector>, logger: ConnectionLogger) -> Self {
        Self { connector, logger }
    }

    /// `n` identical endpoints of the form `{base_url}{symbol}`
    pub fn endpoints_for(base_url: &str, symbol: &str, n: usize) -> Vec<String> {
        vec![format!("{}{}", base_url, symbol); n]
    }

    /// Run every worker to completion and return the ledger with per-worker reports
    pub async fn run(&self, endpoints: &[String], template: &CollectionTemplate) -> Result<CollectionResults> {
        if endpoints.is_empty() {
            return Err(AppError::validation("at least one endpoint is required"));
        }
        template.validate()?;
        for endpoint in endpoints {
            validate_endpoint(endpoint)?;
        }

        let ledger = SharedLedger::new(endpoints.len());
        let started = Instant::now();
        let global_deadline = match template.deadline_mode {
            DeadlineMode::Global => Some(started + template.collection_duration),
            DeadlineMode::PerWorker => None,
        };

        let tasks: Vec<_> = endpoints
            .iter()
            .enumerate()
            .map(|(connection_id, endpoint)| {
                let worker = ConnectionWorker::new(
                    template.connection_config(endpoint, connection_id, global_deadline),
                    self.connector.clone(),
                    ledger.clone(),
                    self.logger.clone(),
                );
                tokio::spawn(worker.run())
            })
            .collect();

        let outcomes = join_all(tasks).await;

        let workers = outcomes
            .into_iter()
            .enumerate()
            .map(|(connection_id, outcome)| match outcome {
                Ok(report) => report,
                Err(e) => {
                    self.logger.log_task_failed(connection_id, &e.to_string());
                    WorkerReport {
                        connection_id,
                        endpoint: endpoints[connection_id].clone(),
                        final_state: WorkerState::GivenUp,
                        attempts: 0,
                        samples_recorded: 0,
                        messages_skipped: 0,
                        termination: TerminationReason::TaskFailed(e.to_string()),
                        streaming_started: None,
                    }
                }
            })
            .collect();

        Ok(CollectionResults {
            ledger: ledger.into_ledger(),
            workers,
            elapsed: started.elapsed(),
        })
    }

    /// Run every worker and return only the finished ledger
    pub async fn collect(&self, endpoints: &[String], template: &CollectionTemplate) -> Result<DelayLedger> {
        Ok(self.run(endpoints, template).await?.ledger)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Script, ScriptedConnector};
    use super::*;
    use crate::client::FeedFrame;
    use crate::logging::LogLevel;

    fn quiet_logger() -> ConnectionLogger {
        ConnectionLogger::new(&Config {
            log_level: LogLevel::Fatal,
            ..Default::default()
        })
    }

    fn template(duration: Duration) -> CollectionTemplate {
        CollectionTemplate {
            collection_duration: duration,
            retry_limit: 3,
            retry_delay: Duration::from_millis(5),
            backoff: BackoffKind::Fixed,
            deadline_mode: DeadlineMode::PerWorker,
        }
    }

    fn update(event_ms: i64, update_id: u64) -> FeedFrame {
        FeedFrame::Text(format!(r#"{{"E":{},"u":{}}}"#, event_ms, update_id))
    }

    #[test]
    fn test_endpoints_for() {
        let endpoints = Orchestrator::endpoints_for("wss://feed.example.com/ws/", "btcusdt@depth", 3);
        assert_eq!(endpoints.len(), 3);
        assert!(endpoints.iter().all(|e| e == "wss://feed.example.com/ws/btcusdt@depth"));
    }

    #[test]
    fn test_template_from_config() {
        let config = Config {
            collect_time_seconds: 30,
            retry_limit: 7,
            deadline_mode: DeadlineMode::Global,
            ..Default::default()
        };
        let template = CollectionTemplate::from(&config);

        assert_eq!(template.collection_duration, Duration::from_secs(30));
        assert_eq!(template.retry_limit, 7);
        assert_eq!(template.deadline_mode, DeadlineMode::Global);
        assert!(template.validate().is_ok());
    }

    #[tokio::test]
    async fn test_empty_endpoints_is_validation_error() {
        let orchestrator = Orchestrator::new(Arc::new(ScriptedConnector::new()), quiet_logger());
        let err = orchestrator.run(&[], &template(Duration::from_secs(1))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_invalid_template_is_validation_error() {
        let orchestrator = Orchestrator::new(Arc::new(ScriptedConnector::new()), quiet_logger());
        let mut bad = template(Duration::from_secs(1));
        bad.retry_limit = 0;

        let err = orchestrator
            .run(&["ws://feed-a.test/x".to_string()], &bad)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = orchestrator
            .run(&["http://feed-a.test/x".to_string()], &template(Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_one_worker_gives_up_others_stream() {
        let endpoints: Vec<String> = (0..3).map(|i| format!("ws://feed-{}.test/x", i)).collect();
        let connector = ScriptedConnector::new()
            .script(&endpoints[0], vec![Script::frames(vec![update(1000, 1), update(1000, 2)])])
            // endpoints[1] is unscripted: every attempt is refused
            .script(&endpoints[2], vec![Script::frames(vec![update(1000, 1)])]);
        let attempts = connector.attempts_handle();

        let orchestrator = Orchestrator::new(Arc::new(connector), quiet_logger());
        let results = orchestrator.run(&endpoints, &template(Duration::from_secs(5))).await.unwrap();

        assert_eq!(results.workers.len(), 3);
        assert_eq!(results.workers[1].final_state, WorkerState::GivenUp);
        assert_eq!(results.workers[1].attempts, 3);
        assert_eq!(attempts.count(&endpoints[1]), 3);

        let counts = results.ledger.counts_by_connection();
        assert_eq!(counts, vec![2, 0, 1]);

        let summary = results.summary();
        assert_eq!(summary.streamed, 2);
        assert_eq!(summary.given_up, 1);
        assert_eq!(summary.total_samples, 3);
    }

    #[tokio::test]
    async fn test_panicking_worker_is_reported_not_propagated() {
        let endpoints: Vec<String> = (0..2).map(|i| format!("ws://feed-{}.test/x", i)).collect();
        let connector = ScriptedConnector::new()
            .script(&endpoints[0], vec![Script::frames_then_panic(vec![update(1000, 1)])])
            .script(&endpoints[1], vec![Script::frames(vec![update(1000, 1)])]);

        let orchestrator = Orchestrator::new(Arc::new(connector), quiet_logger());
        let results = orchestrator.run(&endpoints, &template(Duration::from_secs(5))).await.unwrap();

        assert_eq!(results.workers[0].final_state, WorkerState::GivenUp);
        assert!(matches!(results.workers[0].termination, TerminationReason::TaskFailed(_)));
        assert_eq!(results.workers[1].final_state, WorkerState::Done);
        // Samples appended before the panic stay in the ledger
        assert_eq!(results.ledger.len(), 2);
    }

    #[tokio::test]
    async fn test_global_deadline_bounds_the_whole_run() {
        let endpoints: Vec<String> = (0..2).map(|i| format!("ws://feed-{}.test/x", i)).collect();
        let connector = ScriptedConnector::new()
            .script(&endpoints[0], vec![Script::silent()])
            .script(&endpoints[1], vec![Script::fail("refused"), Script::silent()]);

        let mut global = template(Duration::from_millis(150));
        global.deadline_mode = DeadlineMode::Global;

        let orchestrator = Orchestrator::new(Arc::new(connector), quiet_logger());
        let results = orchestrator.run(&endpoints, &global).await.unwrap();

        assert!(results
            .workers
            .iter()
            .all(|w| w.termination == TerminationReason::DeadlineReached));
        assert!(results.elapsed < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_collect_returns_ledger() {
        let endpoints = vec!["ws://feed-0.test/x".to_string()];
        let connector = ScriptedConnector::new().script(&endpoints[0], vec![Script::frames(vec![update(1000, 5)])]);

        let orchestrator = Orchestrator::new(Arc::new(connector), quiet_logger());
        let ledger = orchestrator.collect(&endpoints, &template(Duration::from_secs(5))).await.unwrap();

        assert_eq!(ledger.num_connections(), 1);
        assert_eq!(ledger.samples()[0].update_id, 5);
    }
}
