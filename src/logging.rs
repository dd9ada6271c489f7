//! Structured logging system for the stream latency tester
//!
//! This module provides:
//! - Structured logging with multiple levels and contexts
//! - Session correlation IDs shared by every logger of a run
//! - Domain loggers for connection lifecycles and analysis results
//! - JSON structured output for integration with log aggregators
//!
//! All log lines go to stderr so the report on stdout stays machine-readable.

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::stats::{AnalysisWarning, PairOutcome, PairwiseComparison, QuickRatio};
use crate::types::TerminationReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - detailed information for debugging
    Debug = 1,
    /// Info level - general application information
    Info = 2,
    /// Warning level - potentially harmful situations
    Warn = 3,
    /// Error level - error events but application can continue
    Error = 4,
    /// Fatal level - severe error events that cause application termination
    Fatal = 5,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",    // White
            LogLevel::Debug => "\x1b[36m",    // Cyan
            LogLevel::Info => "\x1b[32m",     // Green
            LogLevel::Warn => "\x1b[33m",     // Yellow
            LogLevel::Error => "\x1b[31m",    // Red
            LogLevel::Fatal => "\x1b[35m",    // Magenta
        }
    }

    /// Reset ANSI color code
    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" | "CRITICAL" => Ok(LogLevel::Fatal),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when log entry was created
    pub timestamp: DateTime<Utc>,
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID for tracking related events
    pub correlation_id: Option<String>,
    /// Additional structured fields
    pub fields: HashMap<String, serde_json::Value>,
    /// File and line information
    pub location: Option<LogLocation>,
}

/// Source code location information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLocation {
    pub file: String,
    pub line: u32,
    pub module: Option<String>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
    /// Compact single-line format
    Compact,
}

/// Shared logging context for correlation and session tracking
#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
    context_fields: HashMap<String, serde_json::Value>,
}

/// Logger implementation with multiple output formats
#[derive(Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    include_location: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Create a logger with specific configuration
    pub fn with_config(name: String, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else {
            config.log_level
        };

        Self {
            min_level,
            use_color: config.enable_color,
            include_location: config.debug,
            format: if config.debug {
                LogFormat::Json
            } else if config.json_output {
                // stdout carries the report; keep stderr lines short
                LogFormat::Compact
            } else {
                LogFormat::Console
            },
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Set session correlation ID
    pub fn set_session_id(&self, session_id: String) {
        if let Ok(mut context) = self.context.write() {
            context.session_id = Some(session_id);
        }
    }

    /// Add context field for all subsequent log entries
    pub fn add_context_field<T: Serialize>(&self, key: String, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            if let Ok(mut context) = self.context.write() {
                context.context_fields.insert(key, json_value);
            }
        }
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    fn write_entry(&self, mut entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }

        if let Ok(context) = self.context.read() {
            if let Some(session_id) = &context.session_id {
                entry.fields.insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
            }
            for (key, value) in &context.context_fields {
                entry.fields.insert(key.clone(), value.clone());
            }
        }

        let output = match self.format {
            LogFormat::Console => self.format_console(&entry),
            LogFormat::Json => self.format_json(&entry),
            LogFormat::Compact => self.format_compact(&entry),
        };

        let _ = writeln!(io::stderr(), "{}", output);
    }

    /// Format log entry for console output
    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}",
            timestamp,
            formatted_level,
            entry.logger,
            entry.message
        );

        if let Some(correlation_id) = &entry.correlation_id {
            let short = correlation_id.get(..8).unwrap_or(correlation_id);
            output.push_str(&format!(" [{}]", short));
        }

        // Sorted so console lines are stable across runs
        let session = entry.fields.get("session_id");
        let mut fields: Vec<_> = entry.fields.iter()
            .filter(|(k, _)| k.as_str() != "session_id")
            .collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        if !fields.is_empty() {
            let fields_str: Vec<String> = fields.iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            output.push_str(&format!(" {{{}}}", fields_str.join(", ")));
        }
        if let Some(serde_json::Value::String(session)) = session {
            output.push_str(&format!(" session={}", session.get(..8).unwrap_or(session)));
        }

        if self.include_location {
            if let Some(location) = &entry.location {
                output.push_str(&format!(" @ {}:{}", location.file, location.line));
            }
        }

        output
    }

    /// Format log entry as JSON
    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!("{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}", entry.message),
        }
    }

    /// Format log entry in compact format
    fn format_compact(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        format!("{} {} {}: {}",
            timestamp,
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.logger,
            entry.message
        )
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: HashMap::new(),
                location: None,
            },
        }
    }

    /// Add a correlation ID
    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Add location information
    pub fn location(mut self, file: &str, line: u32, module: Option<&str>) -> Self {
        self.entry.location = Some(LogLocation {
            file: file.to_string(),
            line,
            module: module.map(String::from),
        });
        self
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
    }

    /// Finalize and write the log entry
    pub fn log(self) {
        self.logger.write_entry(self.entry);
    }
}

/// Specialized logger for connection worker lifecycles
#[derive(Clone)]
pub struct ConnectionLogger {
    logger: Logger,
}

impl ConnectionLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("CONN".to_string(), config),
        }
    }

    /// Wrap an existing logger, keeping its level and session
    pub fn from_logger(logger: Logger) -> Self {
        Self { logger }
    }

    /// Entry tagged with the connection id, correlated per connection
    fn for_connection(&self, level: LogLevel, connection_id: usize, message: &str) -> LogEntryBuilder<'_> {
        self.logger
            .log(level, message)
            .field("connection_id", connection_id)
            .correlation_id(&format!("conn-{}", connection_id))
    }

    pub fn log_connect_attempt(&self, connection_id: usize, url: &str, attempt: u32, max_attempts: u32) {
        self.for_connection(LogLevel::Debug, connection_id, &format!("Connecting to {} with connection_id {} ({}/{})",
            url, connection_id, attempt, max_attempts))
            .field("url", url)
            .field("attempt", attempt)
            .log();
    }

    pub fn log_connected(&self, connection_id: usize, url: &str, attempt: u32) {
        self.for_connection(LogLevel::Info, connection_id, &format!("Connected to {} with connection_id {}", url, connection_id))
            .field("url", url)
            .field("attempt", attempt)
            .log();
    }

    pub fn log_connect_failure(
        &self,
        connection_id: usize,
        url: &str,
        attempt: u32,
        max_attempts: u32,
        error: &AppError,
        next_delay: Option<Duration>,
    ) {
        let mut builder = self.for_connection(LogLevel::Error, connection_id, &format!("Failed to connect to {} with connection_id {}: {}",
            url, connection_id, error))
            .field("url", url)
            .field("attempt", attempt)
            .field("max_attempts", max_attempts)
            .error_info(error);

        if let Some(delay) = next_delay {
            builder = builder.field("retry_in_ms", delay.as_millis() as u64);
        }

        builder.log();
    }

    pub fn log_given_up(&self, connection_id: usize, url: &str, attempts: u32) {
        self.for_connection(LogLevel::Warn, connection_id, &format!("Giving up on connection_id {} after {} attempts", connection_id, attempts))
            .field("url", url)
            .field("attempts", attempts)
            .log();
    }

    pub fn log_stream_end(&self, connection_id: usize, reason: &TerminationReason, samples: usize, skipped: usize) {
        let level = match reason {
            TerminationReason::StreamError(_) => LogLevel::Error,
            _ => LogLevel::Info,
        };

        self.for_connection(level, connection_id, &format!("Connection with connection_id {} is being closed: {}",
            connection_id, reason))
            .field("samples", samples)
            .field("skipped_messages", skipped)
            .log();
    }

    pub fn log_task_failed(&self, connection_id: usize, error: &str) {
        self.for_connection(LogLevel::Error, connection_id, &format!("Worker task for connection_id {} failed: {}", connection_id, error))
            .log();
    }

    pub fn log_skipped_message(&self, connection_id: usize, error: &AppError) {
        if !self.logger.would_log(LogLevel::Debug) {
            return;
        }
        self.for_connection(LogLevel::Debug, connection_id, &format!("Skipping malformed message on connection_id {}: {}", connection_id, error))
            .error_info(error)
            .log();
    }
}

/// Specialized logger for analysis results
#[derive(Clone)]
pub struct AnalysisLogger {
    logger: Logger,
}

impl AnalysisLogger {
    pub fn from_logger(logger: Logger) -> Self {
        Self { logger }
    }

    pub fn log_quick_ratios(&self, ratios: &[QuickRatio]) {
        self.logger.info("Quick update ratios per connection:").log();
        for ratio in ratios {
            let shown = ratio.ratio.map_or("n/a".to_string(), |r| format!("{:.4}", r));
            self.logger.info(&format!("  connection {}: {}", ratio.connection_id, shown))
                .field("connection_id", ratio.connection_id)
                .field("fastest", ratio.fastest_count)
                .field("total", ratio.total_count)
                .log();
        }
    }

    pub fn log_pairwise(&self, comparison: &PairwiseComparison) {
        if let PairOutcome::Tested(result) = &comparison.outcome {
            self.logger.info(&format!("T-test between connection {} and connection {}: t-stat = {}, p-val = {}",
                comparison.first, comparison.second, result.t_stat, result.p_value))
                .field("df", result.degrees_of_freedom)
                .log();
        }
    }

    pub fn log_warning(&self, warning: &AnalysisWarning) {
        self.logger.warn(&warning.to_string()).log();
    }

    pub fn log_error(&self, error: &AppError) {
        self.logger.error(&format!("Error analyzing delays: {}", error))
            .error_info(error)
            .log();
    }
}

/// Performance timing logger for run phases
pub struct PerformanceLogger {
    logger: Logger,
    start_times: HashMap<String, DateTime<Utc>>,
}

impl PerformanceLogger {
    /// Start timing an operation
    pub fn start_timing(&mut self, operation: &str) {
        let start_time = Utc::now();
        self.start_times.insert(operation.to_string(), start_time);

        self.logger.debug(&format!("Started timing: {}", operation))
            .field("operation", operation)
            .log();
    }

    /// End timing an operation and log the duration
    pub fn end_timing(&mut self, operation: &str) -> Option<chrono::Duration> {
        match self.start_times.remove(operation) {
            Some(start_time) => {
                let duration = Utc::now() - start_time;
                self.logger.info(&format!("Completed {} in {}ms", operation, duration.num_milliseconds()))
                    .field("operation", operation)
                    .field("duration_ms", duration.num_milliseconds())
                    .log();
                Some(duration)
            }
            None => {
                self.logger.warn(&format!("Attempted to end timing for unknown operation: {}", operation))
                    .field("operation", operation)
                    .log();
                None
            }
        }
    }
}

/// Error event logger with enhanced context
pub struct ErrorEventLogger {
    logger: Logger,
}

impl ErrorEventLogger {
    /// Log an application error with context
    pub fn log_error(&self, error: &AppError, context: Option<&str>) {
        let message = match context {
            Some(ctx) => format!("{}: {}", ctx, error),
            None => error.to_string(),
        };

        let mut builder = self.logger.error(&message).error_info(error);
        if let Some(ctx) = context {
            builder = builder.field("context", ctx);
        }
        builder.log();
    }
}

/// Global logger factory and management
pub struct LoggerFactory {
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a logger with a specific name
    pub fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name.to_string(), &self.config);
        logger.set_session_id(self.session_id.clone());
        logger.add_context_field("symbol".to_string(), &self.config.symbol);
        logger
    }

    pub fn create_connection_logger(&self) -> ConnectionLogger {
        ConnectionLogger::from_logger(self.create_logger("CONN"))
    }

    pub fn create_analysis_logger(&self) -> AnalysisLogger {
        AnalysisLogger::from_logger(self.create_logger("STATS"))
    }

    pub fn create_performance_logger(&self) -> PerformanceLogger {
        PerformanceLogger {
            logger: self.create_logger("PERF"),
            start_times: HashMap::new(),
        }
    }

    pub fn create_error_logger(&self) -> ErrorEventLogger {
        ErrorEventLogger {
            logger: self.create_logger("ERR"),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Convenience macros for logging with location information
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.info(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
    };
}
