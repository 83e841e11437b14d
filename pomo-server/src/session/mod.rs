//! Session data model for the pomo server
//!
//! Settings, stats and the interval timer, aggregated into a [`Session`],
//! plus the interval state machine in [`state`].

// Allow session/session.rs naming - matches the Session struct inside
#![allow(clippy::module_inception)]

#[allow(clippy::module_inception)]
mod session;
mod settings;
pub mod state;
mod stats;
mod timer;

pub use session::{CountdownInfo, Session, SessionSnapshot, Subscribers};
pub use settings::{Settings, SettingsLimits, SettingsPatch};
pub use state::{SessionState, Transition, Trigger};
pub use stats::{Stats, StatsDelta};
pub use timer::Timer;
