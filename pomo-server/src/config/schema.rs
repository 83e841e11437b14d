//! Configuration schema structs

use std::time::Duration;

use serde::{Deserialize, Serialize};

use pomo_utils::Result;

use crate::session::{Settings, SettingsLimits};

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub session: SessionConfig,
    pub countdown: CountdownConfig,
    pub idle: IdleConfig,
}

/// General settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Prefix shown in help text (e.g. "!start")
    pub command_prefix: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            command_prefix: "!".into(),
        }
    }
}

/// Pomodoro defaults and limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Default focus interval length in minutes
    pub focus_minutes: u32,
    /// Default short break length in minutes
    pub short_break_minutes: u32,
    /// Default long break length in minutes
    pub long_break_minutes: u32,
    /// Default focus intervals per cycle
    pub intervals: u32,
    /// Longest interval a member may request
    pub max_interval_minutes: u32,
    /// Most focus intervals per cycle a member may request
    pub max_intervals: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            focus_minutes: 20,
            short_break_minutes: 5,
            long_break_minutes: 15,
            intervals: 4,
            max_interval_minutes: 180,
            max_intervals: 12,
        }
    }
}

impl SessionConfig {
    pub fn limits(&self) -> SettingsLimits {
        SettingsLimits {
            max_interval_minutes: self.max_interval_minutes,
            max_intervals: self.max_intervals,
        }
    }

    /// The configured defaults as validated settings
    pub fn default_settings(&self) -> Result<Settings> {
        Settings::validate(
            i64::from(self.focus_minutes),
            i64::from(self.short_break_minutes),
            i64::from(self.long_break_minutes),
            i64::from(self.intervals),
            &self.limits(),
        )
    }
}

/// Countdown settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountdownConfig {
    /// Longest countdown in minutes
    pub max_minutes: u32,
    /// How often the pinned display is refreshed
    pub refresh_secs: u64,
    /// Title used when none is given
    pub default_title: String,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            max_minutes: 180,
            refresh_secs: 5,
            default_title: "Countdown".into(),
        }
    }
}

impl CountdownConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }
}

/// Idle supervision settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleConfig {
    /// Grace before a running session gets a liveness check
    pub running_grace_secs: u64,
    /// Grace before a paused session gets a liveness check
    pub paused_grace_secs: u64,
    /// Period of the supervisor's occupancy/deadline check
    pub poll_interval_secs: u64,
    /// How long members have to acknowledge the liveness prompt
    pub challenge_timeout_secs: u64,
    /// Text of the liveness prompt
    pub challenge_prompt: String,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            running_grace_secs: 30 * 60,
            paused_grace_secs: 60 * 60,
            poll_interval_secs: 5,
            challenge_timeout_secs: 60,
            challenge_prompt: "Are you still there?".into(),
        }
    }
}

impl IdleConfig {
    pub fn running_grace(&self) -> Duration {
        Duration::from_secs(self.running_grace_secs)
    }

    pub fn paused_grace(&self) -> Duration {
        Duration::from_secs(self.paused_grace_secs)
    }

    /// Grace matching the timer's mode
    pub fn grace_for(&self, running: bool) -> Duration {
        if running {
            self.running_grace()
        } else {
            self.paused_grace()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn challenge_timeout(&self) -> Duration {
        Duration::from_secs(self.challenge_timeout_secs)
    }
}
