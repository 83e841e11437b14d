//! Read-only and subscription handlers
//!
//! Handles: time, stats, settings, servers, dm, autoshush, help

use std::fmt::Write as _;

use pomo_utils::PomoError;

use super::session::{interval_name, plural};
use super::{format_duration, HandlerContext, HandlerResult};
use crate::commands::{help_for, COMMANDS};

impl HandlerContext {
    pub fn handle_time(&self) -> HandlerResult {
        match self.controller.snapshot(self.group()) {
            Ok(snapshot) => {
                let paused = if snapshot.running { "" } else { " (paused)" };
                HandlerResult::Reply(format!(
                    "{} left {}{}.",
                    format_duration(snapshot.remaining),
                    interval_name(&snapshot),
                    paused
                ))
            }
            Err(e) => Self::error(e),
        }
    }

    pub fn handle_stats(&self) -> HandlerResult {
        let snapshot = match self.controller.snapshot(self.group()) {
            Ok(snapshot) => snapshot,
            Err(e) => return Self::error(e),
        };
        if snapshot.title.is_some() {
            return Self::error(PomoError::NotApplicable("stats"));
        }

        let stats = snapshot.stats;
        HandlerResult::Reply(format!(
            "{} focus interval{} completed, {} minute{} of focus.",
            stats.completed_focus_intervals(),
            plural(stats.completed_focus_intervals()),
            stats.completed_minutes(),
            plural(stats.completed_minutes())
        ))
    }

    pub fn handle_settings(&self) -> HandlerResult {
        let snapshot = match self.controller.snapshot(self.group()) {
            Ok(snapshot) => snapshot,
            Err(e) => return Self::error(e),
        };
        if snapshot.title.is_some() {
            return Self::error(PomoError::NotApplicable("settings"));
        }

        let s = snapshot.settings;
        HandlerResult::Reply(format!(
            "{} min focus, {} min short break, {} min long break every {} intervals ({} min per cycle).",
            s.focus_minutes(),
            s.short_break_minutes(),
            s.long_break_minutes(),
            s.intervals(),
            s.cycle_minutes()
        ))
    }

    pub fn handle_servers(&self) -> HandlerResult {
        let count = self.controller.active_sessions();
        HandlerResult::Reply(format!("{} active session{}.", count, plural(count as u32)))
    }

    pub fn handle_dm(&self) -> HandlerResult {
        match self.controller.toggle_notify(self.group(), self.invocation.member) {
            Ok(true) => HandlerResult::Reply("You'll get a direct message when each interval starts.".into()),
            Ok(false) => HandlerResult::Reply("Direct messages turned off.".into()),
            Err(e) => Self::error(e),
        }
    }

    pub async fn handle_autoshush(&self, everyone: bool) -> HandlerResult {
        let member = (!everyone).then_some(self.invocation.member);
        match self.controller.toggle_auto_mute(self.group(), member).await {
            Ok(enabled) => {
                let who = if everyone { "Everyone" } else { "You" };
                let text = if enabled {
                    format!("{} will be muted during focus intervals.", who)
                } else {
                    format!("{} will no longer be muted during focus intervals.", who)
                };
                HandlerResult::Reply(text)
            }
            Err(e) => Self::error(e),
        }
    }

    pub fn handle_help(&self, command: Option<&str>) -> HandlerResult {
        let prefix = &self.controller.config().general.command_prefix;
        match command {
            Some(name) => match help_for(name) {
                Some(help) => HandlerResult::Reply(format!("{}{}\n{}", prefix, help.usage, help.summary)),
                None => Self::error(PomoError::validation(format!("unknown command '{}'", name))),
            },
            None => {
                let mut text = String::from("Commands:");
                for help in COMMANDS {
                    let _ = write!(text, "\n  {}{:<52} {}", prefix, help.usage, help.summary);
                }
                HandlerResult::Reply(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::{HandlerContext, HandlerResult, Invocation};
    use crate::services::MuteTarget;
    use crate::testing::harness;
    use crate::types::{GroupId, MemberId};
    use std::time::Duration;

    fn invocation(member: u64) -> Invocation {
        Invocation {
            group: GroupId::new(8),
            member: MemberId::new(member),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_reports_remaining_and_pause() {
        let h = harness();
        let ctx = HandlerContext::new(h.controller.clone(), invocation(1));
        assert!(ctx.handle_time().text().unwrap().contains("No active session"));

        ctx.handle_start(Some(20), None, None, None).await;
        tokio::time::sleep(Duration::from_secs(65)).await;
        assert_eq!(
            ctx.handle_time(),
            HandlerResult::Reply("18:55 left in this focus interval.".into())
        );

        ctx.handle_pause().await;
        assert_eq!(
            ctx.handle_time(),
            HandlerResult::Reply("18:55 left in this focus interval (paused).".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_and_settings_not_for_countdowns() {
        let h = harness();
        let ctx = HandlerContext::new(h.controller.clone(), invocation(1));
        ctx.handle_countdown(5, None, false).await;

        assert_eq!(
            ctx.handle_stats(),
            HandlerResult::Error("Countdowns have no stats".into())
        );
        assert_eq!(
            ctx.handle_settings(),
            HandlerResult::Error("Countdowns have no settings".into())
        );
        assert!(ctx.handle_time().text().unwrap().contains("on Countdown"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_and_settings_for_pomodoro() {
        let h = harness();
        let ctx = HandlerContext::new(h.controller.clone(), invocation(1));
        ctx.handle_start(None, None, None, None).await;

        assert_eq!(
            ctx.handle_stats(),
            HandlerResult::Reply("0 focus intervals completed, 0 minutes of focus.".into())
        );
        assert_eq!(
            ctx.handle_settings(),
            HandlerResult::Reply(
                "20 min focus, 5 min short break, 15 min long break every 4 intervals (110 min per cycle).".into()
            )
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_servers_counts_sessions() {
        let h = harness();
        let ctx = HandlerContext::new(h.controller.clone(), invocation(1));
        assert_eq!(ctx.handle_servers(), HandlerResult::Reply("0 active sessions.".into()));
        ctx.handle_start(None, None, None, None).await;
        assert_eq!(ctx.handle_servers(), HandlerResult::Reply("1 active session.".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dm_and_autoshush_toggle() {
        let h = harness();
        let ctx = HandlerContext::new(h.controller.clone(), invocation(42));
        assert!(ctx.handle_dm().is_error());

        ctx.handle_start(None, None, None, None).await;
        assert!(ctx.handle_dm().text().unwrap().contains("direct message"));
        assert!(ctx.handle_dm().text().unwrap().contains("turned off"));

        let result = ctx.handle_autoshush(false).await;
        assert_eq!(
            result,
            HandlerResult::Reply("You will be muted during focus intervals.".into())
        );
        assert_eq!(
            h.room.mutes(),
            vec![(MuteTarget::Members(vec![MemberId::new(42)]), true)]
        );
    }

    #[test]
    fn test_help_lists_commands_with_prefix() {
        let h = harness();
        let ctx = HandlerContext::new(h.controller.clone(), invocation(1));

        let all = ctx.handle_help(None);
        let text = all.text().unwrap();
        assert!(text.starts_with("Commands:"));
        assert!(text.contains("!countdown <minutes> [title] [mute]"));

        let one = ctx.handle_help(Some("edit"));
        assert!(one.text().unwrap().starts_with("!edit <focus>"));
        assert!(ctx.handle_help(Some("fly")).is_error());
    }
}
