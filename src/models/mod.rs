//! Data models and structures for the stream latency tester

pub mod config;
pub mod sample;

// Re-export main model types
pub use config::Config;
pub use sample::DelaySample;
