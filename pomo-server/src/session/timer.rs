use std::time::Duration;

use tokio::time::Instant;

use pomo_utils::{PomoError, Result};

/// Which of the two clock readings is authoritative
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// Counting down towards `ends_at`
    Running { ends_at: Instant },
    /// Stopped with `remaining` left on the interval
    Paused { remaining: Duration },
}

/// Countdown clock for the current interval
///
/// All operations take `now` explicitly so the timer stays a pure value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    /// Full length of the current interval
    duration: Duration,
    clock: Clock,
}

impl Timer {
    /// A paused timer holding a full interval of `duration`
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            clock: Clock::Paused { remaining: duration },
        }
    }

    /// Start a fresh interval of `duration`
    pub fn start(&mut self, duration: Duration, now: Instant) {
        self.duration = duration;
        self.clock = Clock::Running {
            ends_at: now + duration,
        };
    }

    /// Pause the timer, returning the captured remaining time
    pub fn pause(&mut self, now: Instant) -> Result<Duration> {
        match self.clock {
            Clock::Running { ends_at } => {
                let remaining = ends_at.saturating_duration_since(now);
                self.clock = Clock::Paused { remaining };
                Ok(remaining)
            }
            Clock::Paused { .. } => Err(PomoError::AlreadyPaused),
        }
    }

    /// Resume a paused timer, returning the new end time
    pub fn resume(&mut self, now: Instant) -> Result<Instant> {
        match self.clock {
            Clock::Paused { remaining } => {
                let ends_at = now + remaining;
                self.clock = Clock::Running { ends_at };
                Ok(ends_at)
            }
            Clock::Running { .. } => Err(PomoError::AlreadyRunning),
        }
    }

    /// Reset to a full interval of `duration`, keeping the running/paused mode
    pub fn set_from_settings(&mut self, duration: Duration, now: Instant) {
        self.duration = duration;
        self.clock = match self.clock {
            Clock::Running { .. } => Clock::Running {
                ends_at: now + duration,
            },
            Clock::Paused { .. } => Clock::Paused { remaining: duration },
        };
    }

    /// Change the interval length to `duration`, preserving the elapsed fraction
    ///
    /// A 20 minute interval with 10 minutes left becomes a 40 minute interval
    /// with 20 minutes left.
    pub fn rescale(&mut self, duration: Duration, now: Instant) {
        let remaining = self.time_remaining(now);
        let rescaled = if self.duration.is_zero() {
            duration
        } else {
            let nanos = duration.as_nanos() * remaining.as_nanos() / self.duration.as_nanos();
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        };

        self.duration = duration;
        self.clock = match self.clock {
            Clock::Running { .. } => Clock::Running {
                ends_at: now + rescaled,
            },
            Clock::Paused { .. } => Clock::Paused { remaining: rescaled },
        };
    }

    pub fn time_remaining(&self, now: Instant) -> Duration {
        match self.clock {
            Clock::Running { ends_at } => ends_at.saturating_duration_since(now),
            Clock::Paused { remaining } => remaining,
        }
    }

    pub fn has_elapsed(&self, now: Instant) -> bool {
        matches!(self.clock, Clock::Running { ends_at } if now >= ends_at)
    }

    pub fn is_running(&self) -> bool {
        matches!(self.clock, Clock::Running { .. })
    }

    /// End time of the interval, only while running
    pub fn ends_at(&self) -> Option<Instant> {
        match self.clock {
            Clock::Running { ends_at } => Some(ends_at),
            Clock::Paused { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_new_timer_is_paused_at_full_duration() {
        let timer = Timer::new(20 * MINUTE);
        assert!(!timer.is_running());
        assert_eq!(timer.time_remaining(Instant::now()), 20 * MINUTE);
        assert!(timer.ends_at().is_none());
    }

    #[test]
    fn test_start_sets_end_time() {
        let now = Instant::now();
        let mut timer = Timer::new(MINUTE);
        timer.start(20 * MINUTE, now);

        assert!(timer.is_running());
        assert_eq!(timer.ends_at(), Some(now + 20 * MINUTE));
        assert_eq!(timer.time_remaining(now + 5 * MINUTE), 15 * MINUTE);
    }

    #[test]
    fn test_pause_resume_round_trip() {
        let now = Instant::now();
        let mut timer = Timer::new(20 * MINUTE);
        timer.start(20 * MINUTE, now);

        let later = now + 8 * MINUTE;
        let remaining = timer.pause(later).unwrap();
        assert_eq!(remaining, 12 * MINUTE);
        assert!(!timer.is_running());

        // time passes while paused without consuming the interval
        let much_later = later + 30 * MINUTE;
        assert_eq!(timer.time_remaining(much_later), 12 * MINUTE);

        timer.resume(much_later).unwrap();
        assert!(timer.is_running());
        assert_eq!(timer.time_remaining(much_later), 12 * MINUTE);
    }

    #[test]
    fn test_pause_twice_is_rejected() {
        let now = Instant::now();
        let mut timer = Timer::new(MINUTE);
        timer.start(MINUTE, now);
        timer.pause(now).unwrap();

        let before = timer;
        assert!(matches!(timer.pause(now), Err(PomoError::AlreadyPaused)));
        assert_eq!(timer, before);
    }

    #[test]
    fn test_resume_running_is_rejected() {
        let now = Instant::now();
        let mut timer = Timer::new(MINUTE);
        timer.start(MINUTE, now);

        let before = timer;
        assert!(matches!(timer.resume(now), Err(PomoError::AlreadyRunning)));
        assert_eq!(timer, before);
    }

    #[test]
    fn test_has_elapsed() {
        let now = Instant::now();
        let mut timer = Timer::new(MINUTE);
        assert!(!timer.has_elapsed(now + 2 * MINUTE));

        timer.start(MINUTE, now);
        assert!(!timer.has_elapsed(now + Duration::from_secs(59)));
        assert!(timer.has_elapsed(now + MINUTE));
        assert_eq!(timer.time_remaining(now + 2 * MINUTE), Duration::ZERO);
    }

    #[test]
    fn test_paused_timer_never_elapses() {
        let now = Instant::now();
        let mut timer = Timer::new(MINUTE);
        timer.start(MINUTE, now);
        timer.pause(now + Duration::from_secs(30)).unwrap();
        assert!(!timer.has_elapsed(now + 10 * MINUTE));
    }

    #[test]
    fn test_set_from_settings_keeps_mode() {
        let now = Instant::now();
        let mut timer = Timer::new(MINUTE);
        timer.start(20 * MINUTE, now);
        timer.set_from_settings(25 * MINUTE, now + 10 * MINUTE);
        assert!(timer.is_running());
        assert_eq!(timer.time_remaining(now + 10 * MINUTE), 25 * MINUTE);

        timer.pause(now + 11 * MINUTE).unwrap();
        timer.set_from_settings(5 * MINUTE, now + 12 * MINUTE);
        assert!(!timer.is_running());
        assert_eq!(timer.time_remaining(now + 40 * MINUTE), 5 * MINUTE);
    }

    #[test]
    fn test_rescale_preserves_elapsed_fraction() {
        let now = Instant::now();
        let mut timer = Timer::new(20 * MINUTE);
        timer.start(20 * MINUTE, now);

        // half way through, the focus length is doubled
        let halfway = now + 10 * MINUTE;
        timer.rescale(40 * MINUTE, halfway);

        assert_eq!(timer.time_remaining(halfway), 20 * MINUTE);
        assert!(timer.is_running());
    }

    #[test]
    fn test_rescale_paused_timer_stays_paused() {
        let now = Instant::now();
        let mut timer = Timer::new(20 * MINUTE);
        timer.start(20 * MINUTE, now);
        timer.pause(now + 5 * MINUTE).unwrap();

        timer.rescale(40 * MINUTE, now + 30 * MINUTE);
        assert!(!timer.is_running());
        // 15 of 20 left -> 30 of 40 left
        assert_eq!(timer.time_remaining(now + 60 * MINUTE), 30 * MINUTE);
    }
}
