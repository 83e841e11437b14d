//! Collaborator contracts
//!
//! The core never talks to the chat platform directly. It announces semantic
//! [`Notice`]s through a [`Messenger`], asks a [`Room`] about occupancy and
//! muting, and fires [`AudioAlert`]s. Implementations live at the edge
//! (see `console`).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use pomo_utils::Result;

use crate::session::{SessionState, Settings, Stats};
use crate::types::{GroupId, MemberId};

/// Handle to a pinned, updatable countdown display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayHandle(pub u64);

/// Members to mute/unmute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuteTarget {
    /// Every occupant of the group's room
    Everyone,
    Members(Vec<MemberId>),
}

/// Alert sound to play in the group's room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Focus,
    ShortBreak,
    LongBreak,
    CountdownEnd,
}

impl From<SessionState> for AlertKind {
    fn from(state: SessionState) -> Self {
        match state {
            SessionState::Focus => AlertKind::Focus,
            SessionState::ShortBreak => AlertKind::ShortBreak,
            SessionState::LongBreak => AlertKind::LongBreak,
            SessionState::Countdown => AlertKind::CountdownEnd,
        }
    }
}

/// Why a session was torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// A member ran `stop`
    Stopped,
    /// The room had no non-automated occupants
    EmptyRoom,
    /// Nobody answered the liveness challenge
    NoResponse,
    CountdownFinished,
    Shutdown,
}

/// Something the group should be told about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    SessionStarted {
        settings: Settings,
    },
    IntervalStarted {
        state: SessionState,
        minutes: u32,
        stats: Stats,
    },
    CountdownFinished {
        title: String,
    },
    SessionEnded {
        reason: EndReason,
        /// Stats of a pomodoro session; `None` for countdowns
        stats: Option<Stats>,
    },
    /// The liveness challenge was acknowledged
    StillThere,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::SessionStarted { settings } => write!(
                f,
                "Pomodoro started: {} min focus, {} min short break, {} min long break every {} intervals.",
                settings.focus_minutes(),
                settings.short_break_minutes(),
                settings.long_break_minutes(),
                settings.intervals()
            ),
            Notice::IntervalStarted { state, minutes, .. } => match state {
                SessionState::Focus => write!(f, "Time to focus for {} minutes!", minutes),
                SessionState::Countdown => write!(f, "Countdown running for {} minutes.", minutes),
                _ => write!(f, "Take a {} for {} minutes.", state, minutes),
            },
            Notice::CountdownFinished { title } => write!(f, "{} is done!", title),
            Notice::SessionEnded { reason, .. } => match reason {
                EndReason::Stopped => f.write_str("Session ended."),
                EndReason::EmptyRoom => f.write_str("Everyone left, ending the session."),
                EndReason::NoResponse => f.write_str("No response, ending the session."),
                EndReason::CountdownFinished => f.write_str("Countdown complete."),
                EndReason::Shutdown => f.write_str("Shutting down, ending the session."),
            },
            Notice::StillThere => f.write_str("Great, carry on!"),
        }
    }
}

/// Chat-side messaging
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Post a notice to the group's channel
    async fn send(&self, group: GroupId, notice: Notice) -> Result<()>;

    /// Send a notice directly to one member
    async fn send_direct(&self, member: MemberId, group: GroupId, notice: Notice) -> Result<()>;

    /// Post a pinned countdown display that can be updated in place
    async fn post_countdown(&self, group: GroupId, title: &str, remaining: Duration) -> Result<DisplayHandle>;

    async fn update_countdown(&self, handle: DisplayHandle, remaining: Duration) -> Result<()>;

    /// Prompt the group and wait up to `timeout` for an acknowledgment
    async fn prompt_and_await_ack(&self, group: GroupId, prompt: &str, timeout: Duration) -> Result<bool>;
}

/// Voice room membership and moderation
#[async_trait]
pub trait Room: Send + Sync {
    /// Non-automated occupants of the group's room; zero when not connected
    async fn occupant_count(&self, group: GroupId) -> Result<usize>;

    async fn set_muted(&self, group: GroupId, target: &MuteTarget, muted: bool) -> Result<()>;
}

/// Audio alerts played into the group's room
#[async_trait]
pub trait AudioAlert: Send + Sync {
    async fn play(&self, group: GroupId, kind: AlertKind) -> Result<()>;
}

/// Bundle of collaborator handles used by the controller
///
/// The helpers are best effort: failures are logged and swallowed, so a lost
/// message can never leave a session half-updated.
#[derive(Clone)]
pub struct Services {
    pub messenger: Arc<dyn Messenger>,
    pub room: Arc<dyn Room>,
    pub audio: Arc<dyn AudioAlert>,
}

impl Services {
    pub fn new(messenger: Arc<dyn Messenger>, room: Arc<dyn Room>, audio: Arc<dyn AudioAlert>) -> Self {
        Self {
            messenger,
            room,
            audio,
        }
    }

    pub async fn notify(&self, group: GroupId, notice: Notice) {
        if let Err(e) = self.messenger.send(group, notice).await {
            warn!(group_id = %group, error = %e, "Failed to deliver notice");
        }
    }

    pub async fn notify_members(&self, group: GroupId, members: &[MemberId], notice: &Notice) {
        for member in members {
            if let Err(e) = self.messenger.send_direct(*member, group, notice.clone()).await {
                warn!(group_id = %group, member_id = %member, error = %e, "Failed to deliver direct notice");
            }
        }
    }

    pub async fn alert(&self, group: GroupId, kind: AlertKind) {
        if let Err(e) = self.audio.play(group, kind).await {
            warn!(group_id = %group, alert = ?kind, error = %e, "Failed to play alert");
        }
    }

    pub async fn set_muted(&self, group: GroupId, target: &MuteTarget, muted: bool) {
        if let Err(e) = self.room.set_muted(group, target, muted).await {
            warn!(group_id = %group, muted, error = %e, "Failed to update mute state");
        }
    }
}
