//! Logging infrastructure for pomo
//!
//! Provides unified logging setup using the tracing ecosystem.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::{paths, PomoError, Result};

/// Environment variable holding the log filter
pub const LOG_ENV_VAR: &str = "POMO_LOG";

/// Log output destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Log to stderr
    Stderr,
    /// Log to file under the state directory
    File,
    /// Log to both stderr and file
    Both,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output destination
    pub output: LogOutput,
    /// Log level filter (e.g., "info", "debug", "pomo_server=debug,tokio=warn")
    pub filter: String,
    /// Include span events (enter/exit)
    pub span_events: bool,
    /// Include file/line in logs
    pub file_line: bool,
    /// Optional custom log file name (defaults to "pomo.log")
    pub file_name: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: "info".into(),
            span_events: false,
            file_line: false,
            file_name: None,
        }
    }
}

impl LogConfig {
    /// Create config for the session daemon
    ///
    /// Stdout belongs to the console host, so logs go to stderr and the log file.
    pub fn server() -> Self {
        Self {
            output: LogOutput::Both,
            filter: std::env::var(LOG_ENV_VAR).unwrap_or_else(|_| "info".into()),
            span_events: false,
            file_line: true,
            file_name: None,
        }
    }

    /// Create config for development (verbose stderr)
    pub fn development() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: "debug".into(),
            span_events: true,
            file_line: true,
            file_name: None,
        }
    }

    /// Override the filter (e.g. from a command line flag)
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }
}

/// Initialize logging with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(LogConfig::default())
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| PomoError::config(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    let fmt_layer = if config.span_events {
        fmt_layer.with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
    } else {
        fmt_layer
    };

    let fmt_layer = if config.file_line {
        fmt_layer.with_file(true).with_line_number(true)
    } else {
        fmt_layer.with_file(false).with_line_number(false)
    };

    let file_name = config.file_name.as_deref().unwrap_or("pomo.log");

    match config.output {
        LogOutput::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| PomoError::internal(format!("Failed to init logging: {}", e)))?;
        }
        LogOutput::File => {
            let file = open_log_file(file_name)?;

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(file).with_ansi(false))
                .try_init()
                .map_err(|e| PomoError::internal(format!("Failed to init logging: {}", e)))?;
        }
        LogOutput::Both => {
            let file = open_log_file(file_name)?;

            let file_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(std::io::stderr))
                .with(file_layer)
                .try_init()
                .map_err(|e| PomoError::internal(format!("Failed to init logging: {}", e)))?;
        }
    }

    Ok(())
}

/// Open (append) the log file inside the log directory, creating the directory
fn open_log_file(file_name: &str) -> Result<std::fs::File> {
    let log_dir = paths::log_dir();
    paths::ensure_dir(&log_dir).map_err(|e| PomoError::FileWrite {
        path: log_dir.clone(),
        source: e,
    })?;

    let log_path = log_dir.join(file_name);
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| PomoError::FileWrite {
            path: log_path,
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.output, LogOutput::Stderr);
        assert_eq!(config.filter, "info");
        assert!(!config.span_events);
        assert!(!config.file_line);
        assert!(config.file_name.is_none());
    }

    #[test]
    fn test_log_config_server() {
        let config = LogConfig::server();
        assert_eq!(config.output, LogOutput::Both);
        assert!(config.file_line);
    }

    #[test]
    fn test_log_config_server_with_env() {
        let original = env::var(LOG_ENV_VAR).ok();
        env::set_var(LOG_ENV_VAR, "pomo_server=trace");

        let config = LogConfig::server();
        assert_eq!(config.filter, "pomo_server=trace");

        match original {
            Some(val) => env::set_var(LOG_ENV_VAR, val),
            None => env::remove_var(LOG_ENV_VAR),
        }
    }

    #[test]
    fn test_log_config_development() {
        let config = LogConfig::development();
        assert_eq!(config.output, LogOutput::Stderr);
        assert_eq!(config.filter, "debug");
        assert!(config.span_events);
        assert!(config.file_line);
    }

    #[test]
    fn test_with_filter_overrides() {
        let config = LogConfig::server().with_filter("warn");
        assert_eq!(config.filter, "warn");
        assert_eq!(config.output, LogOutput::Both);
    }

    #[test]
    fn test_invalid_filter_is_config_error() {
        let config = LogConfig::default().with_filter("pomo=notalevel");
        let result = init_logging_with_config(config);
        assert!(matches!(result, Err(PomoError::Config(_))));
    }

    // init_logging() itself is not exercised: the global subscriber can only be
    // installed once per test process.
}
