//! Error handling for the stream latency tester

use thiserror::Error;

/// Custom error types for the stream latency tester
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input at a component entry point
    #[error("Validation error: {0}")]
    Validation(String),

    /// Failure to establish a streaming connection
    #[error("Connect error: {0}")]
    Connect(String),

    /// Loss of an already established streaming connection
    #[error("Stream error: {0}")]
    Stream(String),

    /// A single inbound payload failed structural validation
    #[error("Message parse error: {0}")]
    MessageParse(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (URLs, numbers, etc.)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Statistics calculation errors
    #[error("Statistics error: {0}")]
    Statistics(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new connect error
    pub fn connect<S: Into<String>>(message: S) -> Self {
        Self::Connect(message.into())
    }

    /// Create a new stream error
    pub fn stream<S: Into<String>>(message: S) -> Self {
        Self::Stream(message.into())
    }

    /// Create a new message parse error
    pub fn message_parse<S: Into<String>>(message: S) -> Self {
        Self::MessageParse(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new statistics error
    pub fn statistics<S: Into<String>>(message: S) -> Self {
        Self::Statistics(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Validation(_) => "VALIDATION",
            Self::Connect(_) => "CONNECT",
            Self::Stream(_) => "STREAM",
            Self::MessageParse(_) => "MESSAGE",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::Statistics(_) => "STATS",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Check if error is recoverable (can retry)
    ///
    /// Only connect failures feed the retry policy. Stream losses end the
    /// worker and message parse failures are skipped in place.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Connect(_) => true,
            Self::Stream(_) | Self::MessageParse(_) => false,
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => false,
            Self::Io(_) | Self::Statistics(_) | Self::Internal(_) => false,
        }
    }

    /// Get user-friendly error message with suggestions
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Config(msg) => {
                format!("Configuration problem: {}\n\nSuggestion: Check your .env file or command line arguments.", msg)
            }
            Self::Validation(msg) => {
                format!("Invalid input: {}\n\nSuggestion: Check connection counts, durations and endpoint URLs.", msg)
            }
            Self::Connect(msg) => {
                format!("Could not connect to the feed: {}\n\nSuggestion: Check BASE_URL, SYMBOL and your network connection.", msg)
            }
            Self::Stream(msg) => {
                format!("Feed connection was lost: {}\n\nSuggestion: The feed may be rate limiting or restarting. Try again later.", msg)
            }
            Self::MessageParse(msg) => {
                format!("Unexpected feed payload: {}\n\nSuggestion: Make sure the stream emits JSON with 'E' and 'u' fields.", msg)
            }
            Self::Io(msg) => {
                format!("File operation failed: {}\n\nSuggestion: Check file permissions and disk space.", msg)
            }
            Self::Parse(msg) => {
                format!("Failed to parse data: {}\n\nSuggestion: Check the format of your input data or configuration values.", msg)
            }
            Self::Statistics(msg) => {
                format!("Statistics calculation failed: {}\n\nSuggestion: This may indicate insufficient or invalid samples.", msg)
            }
            Self::Internal(msg) => {
                format!("Internal error: {}\n\nThis is likely a bug. Please report this issue with the error details.", msg)
            }
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,
            Self::Connect(_) | Self::Stream(_) => 2,
            Self::MessageParse(_) => 3,
            Self::Io(_) => 5,
            Self::Statistics(_) => 6,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Connect(_) | Self::Stream(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::MessageParse(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::Io(_) | Self::Statistics(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("URL parse error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for AppError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match error {
            WsError::ConnectionClosed | WsError::AlreadyClosed | WsError::Protocol(_) => {
                Self::stream(error.to_string())
            }
            other => Self::connect(other.to_string()),
        }
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::num::ParseFloatError> for AppError {
    fn from(error: std::num::ParseFloatError) -> Self {
        Self::parse(format!("Float parse error: {}", error))
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(error: std::str::ParseBoolError) -> Self {
        Self::parse(format!("Boolean parse error: {}", error))
    }
}

// Anyhow integration
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Exit code for a panic that reaches the top level
pub const PANIC_EXIT_CODE: i32 = 99;

/// Exit code to use when a panic happens on the named thread, if any.
///
/// Only the thread driving `main` ends the process. Panics on runtime
/// worker threads come back to the orchestrator as failed tasks.
pub fn panic_exit_code(thread_name: Option<&str>) -> Option<i32> {
    match thread_name {
        Some("main") => Some(PANIC_EXIT_CODE),
        _ => None,
    }
}

/// Error reporter for structured error logging and user feedback
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    /// Create a new error reporter
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Report an error to the user
    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", error.format_for_console(self.use_color));

        if self.verbose {
            eprintln!();
            eprintln!("{}", error.user_friendly_message());

            if error.is_recoverable() {
                eprintln!();
                if self.use_color {
                    use colored::Colorize;
                    eprintln!("{}", "This error might be temporary. You can try running the command again.".green());
                } else {
                    eprintln!("This error might be temporary. You can try running the command again.");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_error = AppError::config("Invalid configuration");
        assert_eq!(config_error.category(), "CONFIG");
        assert!(!config_error.is_recoverable());
        assert_eq!(config_error.exit_code(), 1);

        let connect_error = AppError::connect("Connection refused");
        assert_eq!(connect_error.category(), "CONNECT");
        assert!(connect_error.is_recoverable());
        assert_eq!(connect_error.exit_code(), 2);
    }

    #[test]
    fn test_error_display() {
        let error = AppError::validation("num_connections must be positive");
        let display = error.to_string();
        assert!(display.contains("Validation error"));
        assert!(display.contains("num_connections must be positive"));
    }

    #[test]
    fn test_error_categories() {
        let errors = [
            AppError::config("config"),
            AppError::validation("validation"),
            AppError::connect("connect"),
            AppError::stream("stream"),
            AppError::message_parse("message"),
            AppError::io("io"),
            AppError::parse("parse"),
            AppError::statistics("stats"),
            AppError::internal("internal"),
        ];

        let expected_categories = [
            "CONFIG", "VALIDATION", "CONNECT", "STREAM", "MESSAGE", "IO", "PARSE", "STATS", "INTERNAL",
        ];

        for (error, expected) in errors.iter().zip(expected_categories.iter()) {
            assert_eq!(error.category(), *expected);
        }
    }

    #[test]
    fn test_only_connect_errors_are_recoverable() {
        assert!(AppError::connect("test").is_recoverable());

        assert!(!AppError::stream("test").is_recoverable());
        assert!(!AppError::message_parse("test").is_recoverable());
        assert!(!AppError::validation("test").is_recoverable());
        assert!(!AppError::config("test").is_recoverable());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::config("test").exit_code(), 1);
        assert_eq!(AppError::validation("test").exit_code(), 1);
        assert_eq!(AppError::connect("test").exit_code(), 2);
        assert_eq!(AppError::stream("test").exit_code(), 2);
        assert_eq!(AppError::io("test").exit_code(), 5);
        assert_eq!(AppError::statistics("test").exit_code(), 6);
        assert_eq!(AppError::internal("test").exit_code(), 99);
    }

    #[test]
    fn test_user_friendly_messages() {
        let error = AppError::connect("wss://example.invalid refused");
        let message = error.user_friendly_message();
        assert!(message.contains("Could not connect"));
        assert!(message.contains("Suggestion:"));
        assert!(message.contains("wss://example.invalid refused"));
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let app_error: AppError = io_error.into();
        assert_eq!(app_error.category(), "IO");

        let parse_error = "not_a_number".parse::<i32>().unwrap_err();
        let app_error: AppError = parse_error.into();
        assert_eq!(app_error.category(), "PARSE");
    }

    #[test]
    fn test_websocket_error_conversion() {
        use tokio_tungstenite::tungstenite::Error as WsError;

        let closed: AppError = WsError::ConnectionClosed.into();
        assert_eq!(closed.category(), "STREAM");

        let url_error: AppError = WsError::Url(
            tokio_tungstenite::tungstenite::error::UrlError::UnsupportedUrlScheme,
        )
        .into();
        assert_eq!(url_error.category(), "CONNECT");
    }

    #[test]
    fn test_error_reporter_output() {
        let reporter = ErrorReporter::new(false, true);
        reporter.report_error(&AppError::connect("Error 1"));
        assert!(!reporter.use_color);
        assert!(reporter.verbose);
    }

    #[test]
    fn test_only_main_thread_panics_exit() {
        assert_eq!(panic_exit_code(Some("main")), Some(PANIC_EXIT_CODE));
        assert_eq!(panic_exit_code(Some("tokio-runtime-worker")), None);
        assert_eq!(panic_exit_code(None), None);
    }

    #[test]
    fn test_worker_thread_panic_is_recoverable() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();

        let outcome = runtime.block_on(async {
            let worker_thread = tokio::spawn(async { std::thread::current().name().map(str::to_string) })
                .await
                .unwrap();
            let failed = tokio::spawn(async { panic!("worker failure") }).await;
            (worker_thread, failed)
        });

        assert_eq!(panic_exit_code(outcome.0.as_deref()), None);
        assert!(outcome.1.unwrap_err().is_panic());
    }

    #[test]
    fn test_console_formatting() {
        let error = AppError::config("Test error");
        let formatted_no_color = error.format_for_console(false);
        let formatted_color = error.format_for_console(true);

        assert!(formatted_no_color.contains("[CONFIG]"));
        assert!(formatted_color.contains("CONFIG"));
        assert!(formatted_color.contains("Test error"));
    }

    #[test]
    fn test_json_parse_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let app_error: AppError = json_error.into();
        assert_eq!(app_error.category(), "PARSE");
        assert!(app_error.to_string().contains("JSON parse error"));
    }

    #[test]
    fn test_dotenv_error_conversion() {
        let dotenv_error = dotenv::Error::LineParse(".env".to_string(), 1);
        let app_error: AppError = dotenv_error.into();
        assert_eq!(app_error.category(), "CONFIG");
        assert!(app_error.to_string().contains("Environment file error"));
    }

    #[test]
    fn test_anyhow_integration() {
        let anyhow_error = anyhow::anyhow!("Test anyhow error");
        let app_error: AppError = anyhow_error.into();
        assert_eq!(app_error.category(), "INTERNAL");

        let app_error = AppError::config("Test config error");
        let anyhow_error = anyhow::anyhow!(app_error);
        assert!(anyhow_error.to_string().contains("Configuration error"));
    }
}
