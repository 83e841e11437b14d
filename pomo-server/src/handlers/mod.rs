//! Command handlers
//!
//! A [`HandlerContext`] is built per invocation and routes one [`Command`]
//! to the controller, turning the outcome into a reply for the invoking
//! member. Group-wide announcements are made by the controller itself.

mod info;
mod session;

use std::time::Duration;

use tracing::{debug, error};

use pomo_utils::PomoError;

use crate::commands::Command;
use crate::controller::SessionController;
use crate::types::{GroupId, MemberId};

/// Who ran a command, and where
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    pub group: GroupId,
    pub member: MemberId,
}

/// Result of handling a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResult {
    /// Text for the invoking member
    Reply(String),
    /// The command failed; text explains why
    Error(String),
    /// The controller's announcement already covers it
    NoResponse,
}

impl HandlerResult {
    pub fn text(&self) -> Option<&str> {
        match self {
            HandlerResult::Reply(text) | HandlerResult::Error(text) => Some(text),
            HandlerResult::NoResponse => None,
        }
    }

    #[cfg(test)]
    pub fn is_error(&self) -> bool {
        matches!(self, HandlerResult::Error(_))
    }
}

/// Context for command handlers
pub struct HandlerContext {
    pub controller: SessionController,
    pub invocation: Invocation,
}

impl HandlerContext {
    pub fn new(controller: SessionController, invocation: Invocation) -> Self {
        Self {
            controller,
            invocation,
        }
    }

    fn group(&self) -> GroupId {
        self.invocation.group
    }

    /// Parse and handle one command line
    pub async fn handle_line(&self, line: &str) -> HandlerResult {
        match Command::parse(line) {
            Ok(command) => self.route_command(command).await,
            Err(e) => Self::error(e),
        }
    }

    /// Route a command to its handler
    pub async fn route_command(&self, command: Command) -> HandlerResult {
        debug!(
            group_id = %self.invocation.group,
            member_id = %self.invocation.member,
            mutating = command.is_mutating(),
            command = ?command,
            "Handling command"
        );

        match command {
            Command::Start {
                focus,
                short_break,
                long_break,
                intervals,
            } => self.handle_start(focus, short_break, long_break, intervals).await,

            Command::Stop => self.handle_stop().await,

            Command::Pause => self.handle_pause().await,

            Command::Resume => self.handle_resume().await,

            Command::Restart => self.handle_restart().await,

            Command::Skip => self.handle_skip().await,

            Command::Edit {
                focus,
                short_break,
                long_break,
                intervals,
            } => self.handle_edit(focus, short_break, long_break, intervals).await,

            Command::Countdown { minutes, title, mute } => {
                self.handle_countdown(minutes, title, mute).await
            }

            Command::Time => self.handle_time(),

            Command::Stats => self.handle_stats(),

            Command::Settings => self.handle_settings(),

            Command::Servers => self.handle_servers(),

            Command::Dm => self.handle_dm(),

            Command::AutoShush { everyone } => self.handle_autoshush(everyone).await,

            Command::Help { command } => self.handle_help(command.as_deref()),
        }
    }

    /// Turn an error into a reply
    ///
    /// Only user-facing errors are shown verbatim; anything else is logged.
    pub(crate) fn error(err: PomoError) -> HandlerResult {
        if err.is_user_facing() {
            HandlerResult::Error(err.to_string())
        } else {
            error!(error = %err, "Command failed");
            HandlerResult::Error("Something went wrong, please try again.".into())
        }
    }
}

/// Format a duration as `m:ss`, or `h:mm:ss` from an hour up
pub(crate) fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
