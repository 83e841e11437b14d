//! Session lifecycle handlers
//!
//! Handles: start, stop, pause, resume, restart, skip, edit, countdown

use tracing::info;

use pomo_utils::PomoError;

use super::{format_duration, HandlerContext, HandlerResult};
use crate::services::EndReason;
use crate::session::{SessionSnapshot, SessionState, Settings, SettingsPatch};

impl HandlerContext {
    /// Start a pomodoro, filling omitted values from the configured defaults
    pub async fn handle_start(
        &self,
        focus: Option<i64>,
        short_break: Option<i64>,
        long_break: Option<i64>,
        intervals: Option<i64>,
    ) -> HandlerResult {
        let defaults = &self.controller.config().session;
        let settings = match Settings::validate(
            focus.unwrap_or(i64::from(defaults.focus_minutes)),
            short_break.unwrap_or(i64::from(defaults.short_break_minutes)),
            long_break.unwrap_or(i64::from(defaults.long_break_minutes)),
            intervals.unwrap_or(i64::from(defaults.intervals)),
            &defaults.limits(),
        ) {
            Ok(settings) => settings,
            Err(e) => return Self::error(e),
        };

        match self.controller.start(self.group(), settings).await {
            Ok(_) => HandlerResult::NoResponse,
            Err(e) => Self::error(e),
        }
    }

    /// End the session, reporting what was achieved
    pub async fn handle_stop(&self) -> HandlerResult {
        let Some(ended) = self.controller.end(self.group(), EndReason::Stopped).await else {
            return Self::error(PomoError::NoActiveSession(self.group().value()));
        };
        info!(group_id = %self.group(), member_id = %self.invocation.member, "Session stopped by member");

        match ended.stats {
            Some(stats) if stats.has_progress() => HandlerResult::Reply(format!(
                "Nice work! You completed {} focus interval{} ({} minute{}).",
                stats.completed_focus_intervals(),
                plural(stats.completed_focus_intervals()),
                stats.completed_minutes(),
                plural(stats.completed_minutes())
            )),
            _ => HandlerResult::NoResponse,
        }
    }

    pub async fn handle_pause(&self) -> HandlerResult {
        match self.controller.pause(self.group()).await {
            Ok(snapshot) => HandlerResult::Reply(format!(
                "Paused with {} left {}.",
                format_duration(snapshot.remaining),
                interval_name(&snapshot)
            )),
            Err(e) => Self::error(e),
        }
    }

    pub async fn handle_resume(&self) -> HandlerResult {
        match self.controller.resume(self.group()).await {
            Ok(snapshot) => HandlerResult::Reply(format!(
                "Resumed, {} left {}.",
                format_duration(snapshot.remaining),
                interval_name(&snapshot)
            )),
            Err(e) => Self::error(e),
        }
    }

    pub async fn handle_restart(&self) -> HandlerResult {
        match self.controller.restart(self.group()).await {
            Ok(snapshot) => HandlerResult::Reply(format!(
                "Restarted, {} left {}.",
                format_duration(snapshot.remaining),
                interval_name(&snapshot)
            )),
            Err(e) => Self::error(e),
        }
    }

    pub async fn handle_skip(&self) -> HandlerResult {
        match self.controller.skip(self.group()).await {
            Ok(transition) => HandlerResult::Reply(match transition.to {
                SessionState::Focus => "Break skipped, back to focus.".to_string(),
                to => format!("Skipped ahead to the {}.", to),
            }),
            Err(e) => Self::error(e),
        }
    }

    pub async fn handle_edit(
        &self,
        focus: i64,
        short_break: Option<i64>,
        long_break: Option<i64>,
        intervals: Option<i64>,
    ) -> HandlerResult {
        let patch = SettingsPatch {
            focus: Some(focus),
            short_break,
            long_break,
            intervals,
        };
        match self.controller.edit(self.group(), patch).await {
            Ok(snapshot) => {
                let s = snapshot.settings;
                HandlerResult::Reply(format!(
                    "Settings updated: {} min focus, {} min short break, {} min long break every {} intervals. {} left {}.",
                    s.focus_minutes(),
                    s.short_break_minutes(),
                    s.long_break_minutes(),
                    s.intervals(),
                    format_duration(snapshot.remaining),
                    interval_name(&snapshot)
                ))
            }
            Err(e) => Self::error(e),
        }
    }

    pub async fn handle_countdown(&self, minutes: i64, title: Option<String>, mute: bool) -> HandlerResult {
        match self.controller.countdown(self.group(), minutes, title, !mute).await {
            Ok(snapshot) => HandlerResult::Reply(format!(
                "{} started for {} minute{}.",
                snapshot.title.as_deref().unwrap_or("Countdown"),
                snapshot.settings.focus_minutes(),
                plural(snapshot.settings.focus_minutes())
            )),
            Err(e) => Self::error(e),
        }
    }
}

/// "in this focus interval", "on Tea", ...
pub(super) fn interval_name(snapshot: &SessionSnapshot) -> String {
    match (snapshot.state, snapshot.title.as_deref()) {
        (SessionState::Countdown, Some(title)) => format!("on {}", title),
        (SessionState::Countdown, None) => "on the countdown".into(),
        (state, _) if state.is_break() => format!("in this {}", state),
        (state, _) => format!("in this {} interval", state),
    }
}

pub(super) fn plural(count: u32) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::{HandlerContext, HandlerResult, Invocation};
    use crate::testing::harness;
    use crate::types::{GroupId, MemberId};
    use std::time::Duration;

    fn invocation() -> Invocation {
        Invocation {
            group: GroupId::new(5),
            member: MemberId::new(50),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_rejects_out_of_range() {
        let h = harness();
        let ctx = HandlerContext::new(h.controller.clone(), invocation());
        let result = ctx.handle_start(Some(500), None, None, None).await;
        assert!(result.text().unwrap().contains("focus must be between 1 and 180"));
        assert_eq!(h.controller.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_reports_stats() {
        let h = harness();
        let ctx = HandlerContext::new(h.controller.clone(), invocation());
        ctx.handle_start(Some(1), Some(1), Some(1), Some(2)).await;
        tokio::time::sleep(Duration::from_secs(61)).await;

        let result = ctx.handle_stop().await;
        assert_eq!(
            result,
            HandlerResult::Reply("Nice work! You completed 1 focus interval (1 minute).".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_replies_with_title() {
        let h = harness();
        let ctx = HandlerContext::new(h.controller.clone(), invocation());
        let result = ctx.handle_countdown(15, Some("Pizza".into()), true).await;
        assert_eq!(result, HandlerResult::Reply("Pizza started for 15 minutes.".into()));

        assert!(ctx.handle_skip().await.text().unwrap().contains("cannot be skipped"));
        assert!(ctx.handle_edit(10, None, None, None).await.text().unwrap().contains("cannot be edited"));

        let paused = ctx.handle_pause().await;
        assert_eq!(paused, HandlerResult::Reply("Paused with 15:00 left on Pizza.".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_out_of_range() {
        let h = harness();
        let ctx = HandlerContext::new(h.controller.clone(), invocation());
        let result = ctx.handle_countdown(0, None, false).await;
        assert!(result.is_error());
        assert_eq!(h.controller.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_reply_names_next_interval() {
        let h = harness();
        let ctx = HandlerContext::new(h.controller.clone(), invocation());
        ctx.handle_start(None, None, None, None).await;
        assert_eq!(
            ctx.handle_skip().await,
            HandlerResult::Reply("Skipped ahead to the short break.".into())
        );
        assert_eq!(
            ctx.handle_skip().await,
            HandlerResult::Reply("Break skipped, back to focus.".into())
        );
    }
}
