//! Stream Latency Tester
//!
//! Opens several concurrent streaming connections to the same feed, records
//! how long each update took to arrive on each connection, and compares the
//! connections statistically: which one tends to see an update first, and
//! whether their delay distributions differ.

pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod output;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use executor::{CollectionResults, CollectionTemplate, ConnectionConfig, Orchestrator, WorkerReport};
pub use ledger::{DelayLedger, SharedLedger};
pub use models::{Config, DelaySample};
pub use stats::{AnalysisEngine, AnalysisReport, TTestResult};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build metadata set by `build.rs`
pub const BUILD_TIME: &str = env!("BUILD_TIME");
pub const GIT_COMMIT: &str = env!("GIT_COMMIT");
pub const TARGET_TRIPLE: &str = env!("TARGET_TRIPLE");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_BASE_URL: &str = "wss://stream.binance.com:9443/ws/";
    pub const DEFAULT_SYMBOL: &str = "btcusdt@depth";
    pub const DEFAULT_NUM_CONNECTIONS: usize = 5;
    pub const DEFAULT_COLLECT_TIME: Duration = Duration::from_secs(60);
    pub const DEFAULT_RETRY_LIMIT: u32 = 3;
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);
    pub const DEFAULT_EQUAL_VAR: bool = true;
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    /// Upper bound on a single WebSocket handshake
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    pub const MAX_CONNECTIONS: usize = 64;
    pub const MAX_COLLECT_TIME_SECS: u64 = 86_400;
    pub const MAX_RETRY_LIMIT: u32 = 100;
    pub const MAX_RETRY_DELAY_SECS: u64 = 3_600;

    /// Ceiling for exponential backoff
    pub const MAX_BACKOFF_DELAY: Duration = Duration::from_secs(300);
}
