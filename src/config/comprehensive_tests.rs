//! Comprehensive tests for configuration parsing and environment handling

use super::*;
use crate::logging::LogLevel;
use crate::types::{BackoffKind, DeadlineMode};
use std::sync::Mutex;

/// Serializes tests that mutate the process environment
static ENV_LOCK: Mutex<()> = Mutex::new(());

const VARS: [&str; 11] = [
    "BASE_URL",
    "SYMBOL",
    "NUM_CONNECTIONS",
    "COLLECT_TIME",
    "RETRY_LIMIT",
    "RETRY_DELAY",
    "BACKOFF",
    "DEADLINE_MODE",
    "EQUAL_VAR",
    "LOG_LEVEL",
    "ENABLE_COLOR",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

fn with_env<F: FnOnce()>(pairs: &[(&str, &str)], f: F) {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    clear_env();
    for (key, value) in pairs {
        std::env::set_var(key, value);
    }
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));
    clear_env();
    if let Err(panic) = outcome {
        std::panic::resume_unwind(panic);
    }
}

mod config_edge_cases {
    use super::*;

    #[test]
    fn test_boundary_values() {
        let config = Config {
            num_connections: 1,
            collect_time_seconds: 1,
            retry_limit: 1,
            retry_delay_seconds: 1,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = Config {
            num_connections: crate::defaults::MAX_CONNECTIONS,
            collect_time_seconds: crate::defaults::MAX_COLLECT_TIME_SECS,
            retry_limit: crate::defaults::MAX_RETRY_LIMIT,
            retry_delay_seconds: crate::defaults::MAX_RETRY_DELAY_SECS,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = Config {
            collect_time_seconds: crate::defaults::MAX_COLLECT_TIME_SECS + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            retry_limit: crate::defaults::MAX_RETRY_LIMIT + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_url_variants() {
        for base_url in ["ws://localhost:8080/", "wss://stream.example.com:9443/ws/", "ws://[::1]:9000/"] {
            let config = Config { base_url: base_url.to_string(), ..Default::default() };
            assert!(config.validate().is_ok(), "{} should be accepted", base_url);
        }

        for base_url in ["", "stream.example.com/ws/", "http://example.com/", "ftp://example.com/"] {
            let config = Config { base_url: base_url.to_string(), ..Default::default() };
            assert!(config.validate().is_err(), "{} should be rejected", base_url);
        }
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = Config {
            num_connections: 7,
            backoff: BackoffKind::Exponential,
            deadline_mode: DeadlineMode::Global,
            equal_var: false,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.num_connections, 7);
        assert_eq!(parsed.backoff, BackoffKind::Exponential);
        assert_eq!(parsed.deadline_mode, DeadlineMode::Global);
        assert!(!parsed.equal_var);
    }

    #[test]
    fn test_missing_json_fields_fall_back_to_defaults() {
        let parsed: Config = serde_json::from_str(r#"{"num_connections": 3}"#).unwrap();
        let defaults = Config::default();

        assert_eq!(parsed.num_connections, 3);
        assert_eq!(parsed.endpoint(), defaults.endpoint());
        assert_eq!(parsed.collect_time_seconds, defaults.collect_time_seconds);
        assert_eq!(parsed.retry_limit, defaults.retry_limit);
        assert_eq!(parsed.deadline_mode, DeadlineMode::PerWorker);
    }
}

mod env_parsing_tests {
    use super::*;

    #[test]
    fn test_merge_from_env_reads_every_variable() {
        with_env(
            &[
                ("BASE_URL", " ws://127.0.0.1:9000/ws/ "),
                ("SYMBOL", "ethusdt@trade"),
                ("NUM_CONNECTIONS", "12"),
                ("COLLECT_TIME", "30"),
                ("RETRY_LIMIT", "2"),
                ("RETRY_DELAY", "1"),
                ("BACKOFF", "exponential"),
                ("DEADLINE_MODE", "global"),
                ("EQUAL_VAR", "false"),
                ("LOG_LEVEL", "debug"),
                ("ENABLE_COLOR", "false"),
            ],
            || {
                let mut config = Config::default();
                config.merge_from_env().unwrap();

                assert_eq!(config.endpoint(), "ws://127.0.0.1:9000/ws/ethusdt@trade");
                assert_eq!(config.num_connections, 12);
                assert_eq!(config.collect_time_seconds, 30);
                assert_eq!(config.retry_limit, 2);
                assert_eq!(config.retry_delay_seconds, 1);
                assert_eq!(config.backoff, BackoffKind::Exponential);
                assert_eq!(config.deadline_mode, DeadlineMode::Global);
                assert!(!config.equal_var);
                assert_eq!(config.log_level, LogLevel::Debug);
                assert!(!config.enable_color);
                assert!(config.validate().is_ok());
            },
        );
    }

    #[test]
    fn test_unset_variables_keep_defaults() {
        with_env(&[("NUM_CONNECTIONS", "3")], || {
            let mut config = Config::default();
            config.merge_from_env().unwrap();

            assert_eq!(config.num_connections, 3);
            assert_eq!(config.collect_time_seconds, Config::default().collect_time_seconds);
            assert_eq!(config.backoff, BackoffKind::Fixed);
        });
    }

    #[test]
    fn test_malformed_numbers_are_config_errors() {
        for (key, value) in [
            ("NUM_CONNECTIONS", "five"),
            ("COLLECT_TIME", "-10"),
            ("RETRY_LIMIT", "1.5"),
            ("RETRY_DELAY", ""),
        ] {
            with_env(&[(key, value)], || {
                let mut config = Config::default();
                let err = config.merge_from_env().unwrap_err();
                assert!(matches!(err, crate::error::AppError::Config(_)), "{}", key);
                assert!(err.to_string().contains(key));
            });
        }
    }

    #[test]
    fn test_boolean_values_are_strict() {
        for value in ["TRUE", "True", "yes", "1"] {
            with_env(&[("EQUAL_VAR", value)], || {
                let mut config = Config::default();
                assert!(config.merge_from_env().is_err(), "EQUAL_VAR={} should be rejected", value);
            });
            assert!(EnvManager::validate_env_var("ENABLE_COLOR", value).is_err());
        }
    }

    #[test]
    fn test_out_of_range_env_values_fail_validation() {
        with_env(&[("NUM_CONNECTIONS", "0")], || {
            let mut config = Config::default();
            config.merge_from_env().unwrap();
            assert!(config.validate().is_err());
        });
    }

    #[test]
    fn test_validate_current_env_reports_bad_values() {
        with_env(&[("BACKOFF", "linear"), ("SYMBOL", "btcusdt@depth")], || {
            let warnings = EnvManager::validate_current_env();
            assert_eq!(warnings.len(), 1);
            assert!(warnings[0].contains("BACKOFF"));
        });
    }

    #[test]
    fn test_env_file_values_do_not_override_process_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "NUM_CONNECTIONS=9\nCOLLECT_TIME=45\n").unwrap();

        with_env(&[("NUM_CONNECTIONS", "4")], || {
            EnvManager::load_env_file_from(&path, false).unwrap();

            let mut config = Config::default();
            config.merge_from_env().unwrap();
            assert_eq!(config.num_connections, 4);
            assert_eq!(config.collect_time_seconds, 45);
        });
    }
}
