use std::time::Duration;

use pomo_utils::{PomoError, Result};

use super::SessionState;

/// Upper bounds applied when validating user supplied settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsLimits {
    /// Longest allowed interval (focus, break or countdown) in minutes
    pub max_interval_minutes: u32,
    /// Most focus intervals allowed before a long break
    pub max_intervals: u32,
}

impl Default for SettingsLimits {
    fn default() -> Self {
        Self {
            max_interval_minutes: 180,
            max_intervals: 12,
        }
    }
}

/// Validated interval configuration for one session
///
/// Never mutated in place; an edit replaces the whole value. A countdown is
/// represented as a single interval of `focus_minutes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    focus_minutes: u32,
    short_break_minutes: u32,
    long_break_minutes: u32,
    intervals: u32,
}

impl Settings {
    /// Validate raw (user supplied) numbers into settings
    ///
    /// Every duration must be within `1..=max_interval_minutes` and the
    /// interval count within `1..=max_intervals`.
    pub fn validate(
        focus: i64,
        short_break: i64,
        long_break: i64,
        intervals: i64,
        limits: &SettingsLimits,
    ) -> Result<Self> {
        Ok(Self {
            focus_minutes: check_range("focus", focus, limits.max_interval_minutes)?,
            short_break_minutes: check_range("short break", short_break, limits.max_interval_minutes)?,
            long_break_minutes: check_range("long break", long_break, limits.max_interval_minutes)?,
            intervals: check_range("intervals", intervals, limits.max_intervals)?,
        })
    }

    /// Settings for a countdown of `minutes`
    pub fn countdown(minutes: i64, max_minutes: u32) -> Result<Self> {
        let minutes = check_range("countdown", minutes, max_minutes)?;
        Ok(Self {
            focus_minutes: minutes,
            short_break_minutes: minutes,
            long_break_minutes: minutes,
            intervals: 1,
        })
    }

    pub fn focus_minutes(&self) -> u32 {
        self.focus_minutes
    }

    pub fn short_break_minutes(&self) -> u32 {
        self.short_break_minutes
    }

    pub fn long_break_minutes(&self) -> u32 {
        self.long_break_minutes
    }

    /// Focus intervals per cycle (before a long break)
    pub fn intervals(&self) -> u32 {
        self.intervals
    }

    /// Length of an interval of the given state, in minutes
    pub fn minutes(&self, state: SessionState) -> u32 {
        match state {
            SessionState::Focus | SessionState::Countdown => self.focus_minutes,
            SessionState::ShortBreak => self.short_break_minutes,
            SessionState::LongBreak => self.long_break_minutes,
        }
    }

    /// Length of an interval of the given state
    pub fn duration(&self, state: SessionState) -> Duration {
        Duration::from_secs(u64::from(self.minutes(state)) * 60)
    }

    /// Minutes in one full cycle: every focus interval, the short breaks
    /// between them and the closing long break
    pub fn cycle_minutes(&self) -> u32 {
        self.focus_minutes
            .saturating_mul(self.intervals)
            .saturating_add(self.short_break_minutes.saturating_mul(self.intervals.saturating_sub(1)))
            .saturating_add(self.long_break_minutes)
    }

    /// Validate a partial update against these settings
    ///
    /// Omitted fields keep their current value.
    pub fn patched(&self, patch: &SettingsPatch, limits: &SettingsLimits) -> Result<Self> {
        Self::validate(
            patch.focus.unwrap_or(i64::from(self.focus_minutes)),
            patch.short_break.unwrap_or(i64::from(self.short_break_minutes)),
            patch.long_break.unwrap_or(i64::from(self.long_break_minutes)),
            patch.intervals.unwrap_or(i64::from(self.intervals)),
            limits,
        )
    }
}

/// Raw, unvalidated changes requested by an `edit`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub focus: Option<i64>,
    pub short_break: Option<i64>,
    pub long_break: Option<i64>,
    pub intervals: Option<i64>,
}

fn check_range(name: &str, value: i64, max: u32) -> Result<u32> {
    if value < 1 || value > i64::from(max) {
        return Err(PomoError::validation(format!(
            "{} must be between 1 and {}, got {}",
            name, max, value
        )));
    }
    // in range 1..=u32::MAX after the check above
    Ok(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> SettingsLimits {
        SettingsLimits::default()
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let settings = Settings::validate(20, 5, 15, 4, &limits()).unwrap();
        assert_eq!(settings.focus_minutes(), 20);
        assert_eq!(settings.short_break_minutes(), 5);
        assert_eq!(settings.long_break_minutes(), 15);
        assert_eq!(settings.intervals(), 4);
    }

    #[test]
    fn test_validate_rejects_non_positive() {
        assert!(Settings::validate(0, 5, 15, 4, &limits()).is_err());
        assert!(Settings::validate(20, -5, 15, 4, &limits()).is_err());
        assert!(Settings::validate(20, 5, 0, 4, &limits()).is_err());
        assert!(Settings::validate(20, 5, 15, 0, &limits()).is_err());
    }

    #[test]
    fn test_validate_rejects_above_limits() {
        let err = Settings::validate(181, 5, 15, 4, &limits()).unwrap_err();
        assert!(matches!(err, PomoError::Validation(_)));
        assert!(err.to_string().contains("focus"));

        let err = Settings::validate(20, 5, 15, 13, &limits()).unwrap_err();
        assert!(err.to_string().contains("intervals"));
    }

    #[test]
    fn test_validate_accepts_boundaries() {
        assert!(Settings::validate(1, 1, 1, 1, &limits()).is_ok());
        assert!(Settings::validate(180, 180, 180, 12, &limits()).is_ok());
    }

    #[test]
    fn test_duration_per_state() {
        let settings = Settings::validate(25, 5, 20, 4, &limits()).unwrap();
        assert_eq!(settings.duration(SessionState::Focus), Duration::from_secs(25 * 60));
        assert_eq!(settings.duration(SessionState::ShortBreak), Duration::from_secs(5 * 60));
        assert_eq!(settings.duration(SessionState::LongBreak), Duration::from_secs(20 * 60));
    }

    #[test]
    fn test_countdown_settings() {
        let settings = Settings::countdown(10, 180).unwrap();
        assert_eq!(settings.minutes(SessionState::Countdown), 10);
        assert!(Settings::countdown(0, 180).is_err());
        assert!(Settings::countdown(181, 180).is_err());
    }

    #[test]
    fn test_cycle_minutes() {
        let settings = Settings::validate(20, 5, 15, 4, &limits()).unwrap();
        // 4 focus + 3 short breaks + 1 long break
        assert_eq!(settings.cycle_minutes(), 80 + 15 + 15);
    }

    #[test]
    fn test_cycle_minutes_saturates_on_huge_limits() {
        let limits = SettingsLimits {
            max_interval_minutes: u32::MAX,
            max_intervals: u32::MAX,
        };
        let max = i64::from(u32::MAX);
        let settings = Settings::validate(max, max, max, max, &limits).unwrap();
        assert_eq!(settings.cycle_minutes(), u32::MAX);

        let single = Settings::validate(max, 1, 1, 1, &limits).unwrap();
        assert_eq!(single.cycle_minutes(), u32::MAX);
    }

    #[test]
    fn test_patched_keeps_omitted_fields() {
        let settings = Settings::validate(20, 5, 15, 4, &limits()).unwrap();
        let patch = SettingsPatch {
            focus: Some(40),
            intervals: Some(2),
            ..Default::default()
        };
        let edited = settings.patched(&patch, &limits()).unwrap();
        assert_eq!(edited.focus_minutes(), 40);
        assert_eq!(edited.short_break_minutes(), 5);
        assert_eq!(edited.long_break_minutes(), 15);
        assert_eq!(edited.intervals(), 2);

        let bad = SettingsPatch {
            long_break: Some(0),
            ..Default::default()
        };
        assert!(settings.patched(&bad, &limits()).is_err());
    }
}
