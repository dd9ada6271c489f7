//! Single connection lifecycle: connect with retry, receive, stop at deadline

use super::{ConnectionConfig, WorkerReport};
use crate::client::{unix_now_secs, FeedConnector, FeedFrame, FeedStream, FeedUpdate};
use crate::error::Result;
use crate::ledger::SharedLedger;
use crate::logging::ConnectionLogger;
use crate::models::DelaySample;
use crate::types::{TerminationReason, WorkerState};
use chrono::Utc;
use futures::StreamExt;
use std::sync::Arc;
use tokio::time::{sleep_until, timeout_at, Instant};

/// Owns one streaming connection for the length of a run
pub struct ConnectionWorker {
    config: ConnectionConfig,
    connector: Arc<dyn FeedConnector>,
    ledger: SharedLedger,
    logger: ConnectionLogger,
    state: WorkerState,
    attempts: u32,
    samples: usize,
    skipped: usize,
}

impl ConnectionWorker {
    pub fn new(
        config: ConnectionConfig,
        connector: Arc<dyn FeedConnector>,
        ledger: SharedLedger,
        logger: ConnectionLogger,
    ) -> Self {
        Self {
            config,
            connector,
            ledger,
            logger,
            state: WorkerState::Disconnected,
            attempts: 0,
            samples: 0,
            skipped: 0,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Drive the worker to a terminal state. Never fails: every outcome
    /// is described by the returned report.
    pub async fn run(mut self) -> WorkerReport {
        let stream = match self.connect_with_retry().await {
            Ok(stream) => stream,
            Err(reason) => {
                self.state = WorkerState::GivenUp;
                self.logger
                    .log_given_up(self.config.connection_id, &self.config.endpoint, self.attempts);
                return self.report(reason, None);
            }
        };

        self.state = WorkerState::Streaming;
        let started = Utc::now();
        let deadline = self
            .config
            .global_deadline
            .unwrap_or_else(|| Instant::now() + self.config.collection_duration);

        let reason = self.receive_until(stream, deadline).await;

        self.state = WorkerState::Done;
        self.logger
            .log_stream_end(self.config.connection_id, &reason, self.samples, self.skipped);
        self.report(reason, Some(started))
    }

    /// Connect, retrying per policy. A shared deadline that passes while
    /// still connecting ends the attempts early.
    async fn connect_with_retry(&mut self) -> std::result::Result<FeedStream, TerminationReason> {
        let policy = self.config.retry_policy();
        let id = self.config.connection_id;
        let global_deadline = self.config.global_deadline;

        loop {
            if global_deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(TerminationReason::DeadlineReached);
            }

            self.state = WorkerState::Connecting;
            self.attempts += 1;
            self.logger
                .log_connect_attempt(id, &self.config.endpoint, self.attempts, policy.max_attempts);

            match self.connector.connect(&self.config.endpoint).await {
                Ok(stream) => {
                    self.logger.log_connected(id, &self.config.endpoint, self.attempts);
                    return Ok(stream);
                }
                Err(e) => {
                    // Non-recoverable failures (bad endpoint) will not improve with retries
                    let next_delay = if e.is_recoverable() {
                        policy.delay_for(self.attempts)
                    } else {
                        None
                    };

                    self.logger.log_connect_failure(
                        id,
                        &self.config.endpoint,
                        self.attempts,
                        policy.max_attempts,
                        &e,
                        next_delay,
                    );

                    match next_delay {
                        Some(delay) => {
                            self.state = WorkerState::Retrying { attempt: self.attempts };
                            let wake = Instant::now() + delay;
                            sleep_until(global_deadline.map_or(wake, |deadline| wake.min(deadline))).await;
                        }
                        None => return Err(TerminationReason::RetriesExhausted),
                    }
                }
            }
        }
    }

    async fn receive_until(&mut self, mut stream: FeedStream, deadline: Instant) -> TerminationReason {
        loop {
            // An always-ready stream would otherwise never observe the timeout
            if Instant::now() >= deadline {
                return TerminationReason::DeadlineReached;
            }

            match timeout_at(deadline, stream.next()).await {
                Err(_) => return TerminationReason::DeadlineReached,
                Ok(None) => return TerminationReason::RemoteClosed,
                Ok(Some(Err(e))) => return TerminationReason::StreamError(e.to_string()),
                Ok(Some(Ok(frame))) => {
                    let received_at = unix_now_secs();
                    match frame {
                        FeedFrame::Text(text) => self.record(FeedUpdate::parse(&text), received_at),
                        FeedFrame::Binary(data) => {
                            self.record(FeedUpdate::parse_bytes(&data), received_at)
                        }
                        FeedFrame::Close(_) => return TerminationReason::RemoteClosed,
                        FeedFrame::Control => {}
                    }
                }
            }
        }
    }

    fn record(&mut self, update: Result<FeedUpdate>, received_at: f64) {
        let id = self.config.connection_id;
        let appended = update.and_then(|update| {
            self.ledger.append(DelaySample::new(
                update.delay_from(received_at),
                update.update_id,
                id,
            ))
        });

        match appended {
            Ok(()) => self.samples += 1,
            Err(e) => {
                self.skipped += 1;
                self.logger.log_skipped_message(id, &e);
            }
        }
    }

    fn report(&self, reason: TerminationReason, started: Option<chrono::DateTime<Utc>>) -> WorkerReport {
        WorkerReport {
            connection_id: self.config.connection_id,
            endpoint: self.config.endpoint.clone(),
            final_state: self.state,
            attempts: self.attempts,
            samples_recorded: self.samples,
            messages_skipped: self.skipped,
            termination: reason,
            streaming_started: started,
        }
    }
}
