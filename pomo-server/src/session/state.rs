//! Interval state machine
//!
//! ```text
//! FOCUS       -> SHORT_BREAK  (cycle position % intervals != 0)
//! FOCUS       -> LONG_BREAK   (cycle position % intervals == 0)
//! SHORT_BREAK -> FOCUS
//! LONG_BREAK  -> FOCUS
//! COUNTDOWN   -> (terminal)
//! ```
//!
//! The cycle position of a focus interval is `completed + 1`, so skipping a
//! focus interval occupies its slot in the cycle without earning credit.

use std::fmt;
use std::time::Duration;

use super::{Settings, Stats, StatsDelta};

/// Kind of interval a session is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Focus,
    ShortBreak,
    LongBreak,
    Countdown,
}

impl SessionState {
    pub fn is_break(&self) -> bool {
        matches!(self, SessionState::ShortBreak | SessionState::LongBreak)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Focus => "focus",
            SessionState::ShortBreak => "short break",
            SessionState::LongBreak => "long break",
            SessionState::Countdown => "countdown",
        };
        f.write_str(name)
    }
}

/// What caused the interval to end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The timer ran out
    Elapsed,
    /// A member skipped the rest of the interval
    Skip,
}

/// Result of leaving an interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: SessionState,
    pub to: SessionState,
    /// Full length of the new interval
    pub duration: Duration,
    pub credit: StatsDelta,
}

/// Compute the transition out of `state`
///
/// Returns `None` for countdowns, which end instead of transitioning.
pub fn next_transition(
    state: SessionState,
    stats: &Stats,
    settings: &Settings,
    trigger: Trigger,
) -> Option<Transition> {
    let (to, credit) = match state {
        SessionState::Focus => {
            let position = stats.completed_focus_intervals() + 1;
            let to = if position % settings.intervals() == 0 {
                SessionState::LongBreak
            } else {
                SessionState::ShortBreak
            };
            let credit = match trigger {
                Trigger::Elapsed => StatsDelta::focus(settings.focus_minutes()),
                Trigger::Skip => StatsDelta::NONE,
            };
            (to, credit)
        }
        SessionState::ShortBreak | SessionState::LongBreak => (SessionState::Focus, StatsDelta::NONE),
        SessionState::Countdown => return None,
    };

    Some(Transition {
        from: state,
        to,
        duration: settings.duration(to),
        credit,
    })
}
