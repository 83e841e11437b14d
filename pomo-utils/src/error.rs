//! Error types for pomo
//!
//! Provides a unified error type used across all pomo crates.

use std::path::PathBuf;

/// Main error type for pomo operations
#[derive(Debug, thiserror::Error)]
pub enum PomoError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    // === Session Errors ===

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("A session is already active for group {0}")]
    SessionAlreadyActive(u64),

    #[error("No active session for group {0}")]
    NoActiveSession(u64),

    #[error("Timer is already paused")]
    AlreadyPaused,

    #[error("Timer is already running")]
    AlreadyRunning,

    #[error("Countdowns cannot be edited")]
    NotEditable,

    #[error("Countdowns cannot be skipped")]
    NotSkippable,

    #[error("Countdowns have no {0}")]
    NotApplicable(&'static str),

    // === Collaborator Errors ===

    #[error("Messaging error: {0}")]
    Messaging(String),

    #[error("Room error: {0}")]
    Room(String),

    #[error("Audio error: {0}")]
    Audio(String),

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PomoError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a settings validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a messaging error
    pub fn messaging(msg: impl Into<String>) -> Self {
        Self::Messaging(msg.into())
    }

    /// Create a room error
    pub fn room(msg: impl Into<String>) -> Self {
        Self::Room(msg.into())
    }

    /// Create an audio error
    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error should be reported back to the invoking user
    ///
    /// Collaborator and IO failures are logged by the caller instead.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::SessionAlreadyActive(_)
                | Self::NoActiveSession(_)
                | Self::AlreadyPaused
                | Self::AlreadyRunning
                | Self::NotEditable
                | Self::NotSkippable
                | Self::NotApplicable(_)
        )
    }
}

/// Result type alias using PomoError
pub type Result<T> = std::result::Result<T, PomoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PomoError::NoActiveSession(42);
        assert_eq!(err.to_string(), "No active session for group 42");
    }

    #[test]
    fn test_error_display_already_active() {
        let err = PomoError::SessionAlreadyActive(7);
        assert_eq!(err.to_string(), "A session is already active for group 7");
    }

    #[test]
    fn test_error_display_timer_state() {
        assert_eq!(PomoError::AlreadyPaused.to_string(), "Timer is already paused");
        assert_eq!(PomoError::AlreadyRunning.to_string(), "Timer is already running");
    }

    #[test]
    fn test_error_display_countdown_restrictions() {
        assert_eq!(PomoError::NotEditable.to_string(), "Countdowns cannot be edited");
        assert_eq!(PomoError::NotSkippable.to_string(), "Countdowns cannot be skipped");
        assert_eq!(
            PomoError::NotApplicable("stats").to_string(),
            "Countdowns have no stats"
        );
    }

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err = PomoError::FileRead {
            path: PathBuf::from("/etc/pomo/config.toml"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/etc/pomo/config.toml"));
    }

    #[test]
    fn test_error_display_config_invalid() {
        let err = PomoError::ConfigInvalid {
            path: PathBuf::from("/home/user/.config/pomo/config.toml"),
            message: "expected an integer".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Invalid configuration"));
        assert!(msg.contains("expected an integer"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PomoError = io_err.into();
        assert!(matches!(err, PomoError::Io(_)));
    }

    #[test]
    fn test_helper_constructors() {
        assert!(matches!(PomoError::config("x"), PomoError::Config(_)));
        assert!(matches!(PomoError::validation("x"), PomoError::Validation(_)));
        assert!(matches!(PomoError::messaging("x"), PomoError::Messaging(_)));
        assert!(matches!(PomoError::room("x"), PomoError::Room(_)));
        assert!(matches!(PomoError::audio("x"), PomoError::Audio(_)));
        assert!(matches!(PomoError::internal("x"), PomoError::Internal(_)));
    }

    #[test]
    fn test_is_user_facing() {
        assert!(PomoError::validation("focus must be positive").is_user_facing());
        assert!(PomoError::SessionAlreadyActive(1).is_user_facing());
        assert!(PomoError::NoActiveSession(1).is_user_facing());
        assert!(PomoError::AlreadyPaused.is_user_facing());
        assert!(PomoError::NotSkippable.is_user_facing());

        assert!(!PomoError::messaging("delivery failed").is_user_facing());
        assert!(!PomoError::room("voice gateway down").is_user_facing());
        assert!(!PomoError::internal("oops").is_user_facing());
    }
}
