use std::collections::BTreeSet;
use std::time::Duration;

use tokio::time::Instant;

use pomo_utils::{PomoError, Result};

use super::state::{next_transition, Transition, Trigger};
use super::{SessionState, Settings, Stats, Timer};
use crate::services::{DisplayHandle, MuteTarget};
use crate::types::{GroupId, MemberId};

/// Per-member notification preferences attached to a session
///
/// Presentation configuration only: transitions never consult it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscribers {
    notify: BTreeSet<MemberId>,
    auto_mute: BTreeSet<MemberId>,
    auto_mute_everyone: bool,
}

impl Subscribers {
    /// Toggle direct notifications for `member`, returning the new state
    pub fn toggle_notify(&mut self, member: MemberId) -> bool {
        toggle(&mut self.notify, member)
    }

    /// Toggle auto-mute for `member`, returning the new state
    pub fn toggle_auto_mute(&mut self, member: MemberId) -> bool {
        toggle(&mut self.auto_mute, member)
    }

    /// Toggle auto-mute for the whole room, returning the new state
    pub fn toggle_auto_mute_everyone(&mut self) -> bool {
        self.auto_mute_everyone = !self.auto_mute_everyone;
        self.auto_mute_everyone
    }

    pub fn notify_members(&self) -> Vec<MemberId> {
        self.notify.iter().copied().collect()
    }

    /// Who gets muted while focusing, if anyone
    pub fn mute_target(&self) -> Option<MuteTarget> {
        if self.auto_mute_everyone {
            Some(MuteTarget::Everyone)
        } else if self.auto_mute.is_empty() {
            None
        } else {
            Some(MuteTarget::Members(self.auto_mute.iter().copied().collect()))
        }
    }
}

fn toggle(set: &mut BTreeSet<MemberId>, member: MemberId) -> bool {
    if set.remove(&member) {
        false
    } else {
        set.insert(member);
        true
    }
}

/// Presentation details of a countdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownInfo {
    pub title: String,
    /// Play the alert when the countdown finishes
    pub audio_alert: bool,
    /// Pinned display, once posted
    pub display: Option<DisplayHandle>,
}

/// Live state of one group's pomodoro or countdown
#[derive(Debug)]
pub struct Session {
    group_id: GroupId,
    state: SessionState,
    settings: Settings,
    stats: Stats,
    timer: Timer,
    /// Eligible for a liveness check once passed
    idle_deadline: Instant,
    subscribers: Subscribers,
    countdown: Option<CountdownInfo>,
}

/// Read-only view of a session at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub group_id: GroupId,
    pub state: SessionState,
    pub running: bool,
    pub remaining: Duration,
    pub settings: Settings,
    pub stats: Stats,
    pub title: Option<String>,
}

impl Session {
    /// Create a pomodoro session, waiting in FOCUS until started
    pub fn pomodoro(group_id: GroupId, settings: Settings, idle_deadline: Instant) -> Self {
        Self {
            group_id,
            state: SessionState::Focus,
            settings,
            stats: Stats::new(),
            timer: Timer::new(settings.duration(SessionState::Focus)),
            idle_deadline,
            subscribers: Subscribers::default(),
            countdown: None,
        }
    }

    /// Create a countdown session, waiting until started
    pub fn countdown(
        group_id: GroupId,
        settings: Settings,
        title: impl Into<String>,
        audio_alert: bool,
        idle_deadline: Instant,
    ) -> Self {
        Self {
            group_id,
            state: SessionState::Countdown,
            settings,
            stats: Stats::new(),
            timer: Timer::new(settings.duration(SessionState::Countdown)),
            idle_deadline,
            subscribers: Subscribers::default(),
            countdown: Some(CountdownInfo {
                title: title.into(),
                audio_alert,
                display: None,
            }),
        }
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_countdown(&self) -> bool {
        self.state == SessionState::Countdown
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    #[cfg(test)]
    pub fn idle_deadline(&self) -> Instant {
        self.idle_deadline
    }

    pub fn subscribers(&self) -> &Subscribers {
        &self.subscribers
    }

    pub fn subscribers_mut(&mut self) -> &mut Subscribers {
        &mut self.subscribers
    }

    pub fn countdown_info(&self) -> Option<&CountdownInfo> {
        self.countdown.as_ref()
    }

    pub fn set_countdown_display(&mut self, handle: DisplayHandle) {
        if let Some(info) = self.countdown.as_mut() {
            info.display = Some(handle);
        }
    }

    /// Who should currently be muted: the auto-mute target while a focus
    /// interval is running
    pub fn active_mute_target(&self) -> Option<MuteTarget> {
        if self.state == SessionState::Focus && self.timer.is_running() {
            self.subscribers.mute_target()
        } else {
            None
        }
    }

    /// Start the timer at the full duration of the current state
    pub fn start_timer(&mut self, now: Instant) {
        self.timer.start(self.settings.duration(self.state), now);
    }

    /// Pause the timer and extend the idle deadline by the pause grace
    pub fn pause(&mut self, now: Instant, paused_grace: Duration) -> Result<()> {
        self.timer.pause(now)?;
        self.idle_deadline = now + paused_grace;
        Ok(())
    }

    /// Resume the timer and restore the normal idle grace
    pub fn resume(&mut self, now: Instant, running_grace: Duration) -> Result<()> {
        self.timer.resume(now)?;
        self.idle_deadline = now + running_grace;
        Ok(())
    }

    /// Reset the current interval to its full length; state and stats are kept
    pub fn restart(&mut self, now: Instant) {
        self.timer.set_from_settings(self.settings.duration(self.state), now);
    }

    /// Replace the settings, rescaling the current interval
    pub fn replace_settings(&mut self, settings: Settings, now: Instant) -> Result<()> {
        if self.is_countdown() {
            return Err(PomoError::NotEditable);
        }
        self.timer.rescale(settings.duration(self.state), now);
        self.settings = settings;
        Ok(())
    }

    /// Leave the current interval
    ///
    /// Applies the stats credit and resets the timer to the new interval,
    /// keeping its running/paused mode. Returns `None` for countdowns.
    pub fn advance(&mut self, trigger: Trigger, now: Instant) -> Option<Transition> {
        let transition = next_transition(self.state, &self.stats, &self.settings, trigger)?;
        self.stats.apply(transition.credit);
        self.state = transition.to;
        self.timer.set_from_settings(transition.duration, now);
        Some(transition)
    }

    /// Push the idle deadline to `now + grace`
    pub fn extend_idle_deadline(&mut self, now: Instant, grace: Duration) {
        self.idle_deadline = now + grace;
    }

    pub fn is_idle(&self, now: Instant) -> bool {
        now >= self.idle_deadline
    }

    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        SessionSnapshot {
            group_id: self.group_id,
            state: self.state,
            running: self.timer.is_running(),
            remaining: self.timer.time_remaining(now),
            settings: self.settings,
            stats: self.stats,
            title: self.countdown.as_ref().map(|c| c.title.clone()),
        }
    }
}
