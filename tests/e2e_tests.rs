//! End-to-end tests against a local WebSocket feed
//!
//! A small feed server runs on 127.0.0.1 and pushes depth-style updates to
//! every connection. The tests drive the public API (orchestrator, ledger,
//! analysis, report) and the `slt` binary against it.

use assert_cmd::prelude::*;
use futures::SinkExt;
use serde_json::Value;
use std::process::Command;
use std::time::Duration;
use stream_latency_tester::{
    client::WebSocketConnector,
    executor::{CollectionTemplate, Orchestrator},
    logging::{ConnectionLogger, LogLevel},
    output::{OutputCoordinator, OutputFormatterFactory, RunReport},
    stats::{AnalysisEngine, PairOutcome},
    types::{DeadlineMode, TerminationReason, WorkerState},
    Config,
};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// How the local feed behaves on every accepted connection
#[derive(Clone, Copy)]
struct FeedBehavior {
    updates: u64,
    interval: Duration,
    /// Close after the last update instead of idling
    close_when_done: bool,
}

/// Start a feed server and return its base URL (with trailing slash)
async fn start_feed(behavior: FeedBehavior) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(stream).await else { return };

                for update_id in 1..=behavior.updates {
                    let event_time = chrono::Utc::now().timestamp_millis();
                    let payload = format!(r#"{{"e":"depthUpdate","E":{},"u":{}}}"#, event_time, update_id);
                    if ws.send(Message::Text(payload.into())).await.is_err() {
                        return;
                    }
                    if update_id % 5 == 0 {
                        let _ = ws.send(Message::Text("not json".into())).await;
                    }
                    tokio::time::sleep(behavior.interval).await;
                }

                if behavior.close_when_done {
                    let _ = ws.close(None).await;
                } else {
                    // Idle until the client leaves
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
            });
        }
    });

    format!("ws://{}/ws/", addr)
}

fn quiet_logger() -> ConnectionLogger {
    let config = Config {
        log_level: LogLevel::Error,
        enable_color: false,
        ..Default::default()
    };
    ConnectionLogger::new(&config)
}

fn template(collect: Duration) -> CollectionTemplate {
    CollectionTemplate {
        collection_duration: collect,
        retry_limit: 2,
        retry_delay: Duration::from_millis(50),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_collect_and_analyze_three_connections() {
    let base = start_feed(FeedBehavior {
        updates: 20,
        interval: Duration::from_millis(10),
        close_when_done: false,
    })
    .await;

    let orchestrator = Orchestrator::new(std::sync::Arc::new(WebSocketConnector::default()), quiet_logger());
    let endpoints = Orchestrator::endpoints_for(&base, "btcusdt@depth", 3);
    let results = orchestrator.run(&endpoints, &template(Duration::from_millis(800))).await.unwrap();

    assert_eq!(results.workers.len(), 3);
    for worker in &results.workers {
        assert_eq!(worker.final_state, WorkerState::Done);
        assert_eq!(worker.termination, TerminationReason::DeadlineReached);
        assert_eq!(worker.samples_recorded, 20);
        assert_eq!(worker.messages_skipped, 4);
        assert_eq!(worker.attempts, 1);
    }
    assert_eq!(results.ledger.len(), 60);
    assert_eq!(results.ledger.counts_by_connection(), vec![20, 20, 20]);
    assert_eq!(results.ledger.by_update().len(), 20);

    let analysis = AnalysisEngine::new(true).analyze_ledger(&results.ledger).unwrap();
    assert_eq!(analysis.quick_ratios.len(), 3);
    assert_eq!(analysis.pairwise.len(), 3);
    assert_eq!(analysis.update_groups, 20);
    for ratio in &analysis.quick_ratios {
        assert_eq!(ratio.total_count, 20);
        assert!(ratio.ratio.is_some());
    }
    assert_eq!(analysis.summaries.len(), 3);
}

#[tokio::test]
async fn test_remote_close_ends_workers_early() {
    let base = start_feed(FeedBehavior {
        updates: 3,
        interval: Duration::from_millis(5),
        close_when_done: true,
    })
    .await;

    let orchestrator = Orchestrator::new(std::sync::Arc::new(WebSocketConnector::default()), quiet_logger());
    let endpoints = Orchestrator::endpoints_for(&base, "btcusdt@depth", 2);

    let started = std::time::Instant::now();
    let results = orchestrator.run(&endpoints, &template(Duration::from_secs(30))).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(results.ledger.len(), 6);
    for worker in &results.workers {
        assert_eq!(worker.termination, TerminationReason::RemoteClosed);
    }
}

#[tokio::test]
async fn test_unreachable_endpoint_gives_up_and_analysis_reports_gaps() {
    // Bind then drop so the port is very likely closed
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let live = start_feed(FeedBehavior {
        updates: 10,
        interval: Duration::from_millis(10),
        close_when_done: false,
    })
    .await;

    let endpoints = vec![
        format!("{}btcusdt@depth", live),
        format!("ws://127.0.0.1:{}/ws/btcusdt@depth", port),
    ];
    let orchestrator = Orchestrator::new(std::sync::Arc::new(WebSocketConnector::default()), quiet_logger());
    let template = CollectionTemplate {
        deadline_mode: DeadlineMode::Global,
        ..template(Duration::from_millis(600))
    };
    let results = orchestrator.run(&endpoints, &template).await.unwrap();

    assert_eq!(results.workers[0].final_state, WorkerState::Done);
    assert_eq!(results.workers[1].final_state, WorkerState::GivenUp);
    assert_eq!(results.workers[1].termination, TerminationReason::RetriesExhausted);
    assert_eq!(results.workers[1].attempts, 2);

    let summary = results.summary();
    assert_eq!(summary.streamed, 1);
    assert_eq!(summary.given_up, 1);

    let analysis = AnalysisEngine::new(false).analyze_ledger(&results.ledger).unwrap();
    assert_eq!(analysis.quick_ratios[0].ratio, Some(1.0));
    assert_eq!(analysis.quick_ratios[1].ratio, None);
    assert!(matches!(analysis.pairwise[0].outcome, PairOutcome::Skipped { .. }));

    let config = Config { num_connections: 2, ..Default::default() };
    let report = RunReport::new(&config, "e2e", &results, analysis);
    let rendered = OutputCoordinator::new(OutputFormatterFactory::create_plain_formatter())
        .display_results(&report)
        .unwrap();
    assert!(rendered.contains("retries exhausted"));
    assert!(rendered.contains("No data for connection 1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_binary_json_report_and_ledger_export() {
    let base = start_feed(FeedBehavior {
        updates: 15,
        interval: Duration::from_millis(20),
        close_when_done: false,
    })
    .await;
    let temp_dir = TempDir::new().unwrap();
    let ledger_path = temp_dir.path().join("ledger.json");

    let mut cmd = Command::cargo_bin("slt").unwrap();
    cmd.current_dir(temp_dir.path())
        .env_remove("NUM_CONNECTIONS")
        .env_remove("BASE_URL")
        .env_remove("SYMBOL")
        .args(["--base-url", &base, "--symbol", "btcusdt@depth"])
        .args(["-n", "2", "-t", "1", "--retry-limit", "1", "--retry-delay", "1"])
        .args(["--log-level", "error", "--no-color", "--json"])
        .arg("--export-ledger")
        .arg(&ledger_path);

    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap()).await.unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["collection"]["total_connections"], 2);
    assert_eq!(report["collection"]["streamed"], 2);
    assert_eq!(report["collection"]["total_samples"], 30);
    assert_eq!(report["analysis"]["pairwise"].as_array().unwrap().len(), 1);
    assert_eq!(report["analysis"]["test_kind"], "Student");

    let exported: Value = serde_json::from_str(&std::fs::read_to_string(&ledger_path).unwrap()).unwrap();
    let rows = exported.as_array().unwrap();
    assert_eq!(rows.len(), 30);
    assert!(rows[0]["delay"].is_number());
    assert!(rows[0]["update_id"].is_number());
    assert!(rows[0]["connection_id"].is_number());
}
