//! Configuration loader

use std::path::Path;

use pomo_utils::{config_file, PomoError, Result};

use super::AppConfig;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from default location
    pub fn load() -> Result<AppConfig> {
        let path = config_file();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            Ok(AppConfig::default())
        }
    }

    /// Load configuration from a specific path
    ///
    /// Unlike [`load`](Self::load), a missing file is an error.
    pub fn load_from_path(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            return Err(PomoError::ConfigNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| PomoError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<AppConfig> {
        toml::from_str(content).map_err(|e| PomoError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate configuration
    pub fn validate(config: &AppConfig) -> Result<()> {
        let session = &config.session;
        if session.max_interval_minutes == 0 || session.max_intervals == 0 {
            return Err(PomoError::config(
                "max_interval_minutes and max_intervals must be at least 1",
            ));
        }

        // Defaults must pass the same validation as user input
        session
            .default_settings()
            .map_err(|e| PomoError::config(format!("invalid session defaults: {}", e)))?;

        if config.countdown.max_minutes == 0 {
            return Err(PomoError::config("countdown.max_minutes must be at least 1"));
        }
        if config.countdown.refresh_secs == 0 {
            return Err(PomoError::config("countdown.refresh_secs must be at least 1"));
        }

        let idle = &config.idle;
        if idle.poll_interval_secs == 0 {
            return Err(PomoError::config("idle.poll_interval_secs must be at least 1"));
        }
        if idle.challenge_timeout_secs == 0 {
            return Err(PomoError::config("idle.challenge_timeout_secs must be at least 1"));
        }
        if idle.running_grace_secs == 0 || idle.paused_grace_secs == 0 {
            return Err(PomoError::config("idle grace periods must be at least 1 second"));
        }

        Ok(())
    }

    /// Load and validate
    pub fn load_and_validate() -> Result<AppConfig> {
        let config = Self::load()?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load from an explicit path and validate
    pub fn load_path_and_validate(path: &Path) -> Result<AppConfig> {
        let config = Self::load_from_path(path)?;
        Self::validate(&config)?;
        Ok(config)
    }
}
