//! Session Controller
//!
//! Public operations over the registry. Every mutation happens under the
//! session's lock and completes before any collaborator is called; the
//! collaborator calls that follow are best effort.
//!
//! Each registered session owns two background tasks, the interval
//! [`runner`](crate::runner) and the idle [`supervisor`](crate::supervisor),
//! both stopped through the entry's cancellation token.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info};

use pomo_utils::{PomoError, Result};

use crate::config::AppConfig;
use crate::registry::{SessionEntry, SessionRegistry};
use crate::services::{AlertKind, EndReason, MuteTarget, Notice, Services};
use crate::session::{
    Session, SessionSnapshot, SessionState, Settings, SettingsPatch, Stats, Transition, Trigger,
};
use crate::types::{GroupId, MemberId};
use crate::{runner, supervisor};

/// What was left of a session when it ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndedSession {
    pub group_id: GroupId,
    pub state: SessionState,
    /// `None` for countdowns
    pub stats: Option<Stats>,
    pub reason: EndReason,
}

/// Side effects of an interval change, gathered under the lock
struct IntervalChange {
    transition: Transition,
    stats: Stats,
    unmute: Option<MuteTarget>,
    mute: Option<MuteTarget>,
    direct: Vec<MemberId>,
}

/// A session already removed and cancelled, waiting to be reported
struct Teardown {
    ended: EndedSession,
    unmute: Option<MuteTarget>,
    /// Countdown title
    title: Option<String>,
}

/// What the runner found when its deadline fired
enum Elapsed {
    /// Timer was changed concurrently; nothing to do
    NotYet,
    Countdown { teardown: Teardown, audio_alert: bool },
    Interval(IntervalChange),
}

/// Entry point for every session operation
#[derive(Clone)]
pub struct SessionController {
    registry: Arc<SessionRegistry>,
    services: Services,
    config: Arc<AppConfig>,
}

impl SessionController {
    pub fn new(registry: Arc<SessionRegistry>, services: Services, config: Arc<AppConfig>) -> Self {
        Self {
            registry,
            services,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Start a pomodoro session in FOCUS
    ///
    /// Fails with `SessionAlreadyActive` if the group already has a session,
    /// leaving that session untouched.
    pub async fn start(&self, group: GroupId, settings: Settings) -> Result<SessionSnapshot> {
        let now = Instant::now();
        let mut session = Session::pomodoro(group, settings, now + self.config.idle.running_grace());
        session.start_timer(now);

        let entry = self.registry.insert(session)?;
        let snapshot = entry.lock().snapshot(now);
        self.spawn_tasks(&entry);

        info!(group_id = %group, focus = settings.focus_minutes(), intervals = settings.intervals(), "Pomodoro started");
        self.services.notify(group, Notice::SessionStarted { settings }).await;
        self.services.alert(group, AlertKind::Focus).await;
        Ok(snapshot)
    }

    /// Start a countdown of `minutes`
    ///
    /// Rejected with `SessionAlreadyActive` while any session is live.
    pub async fn countdown(
        &self,
        group: GroupId,
        minutes: i64,
        title: Option<String>,
        audio_alert: bool,
    ) -> Result<SessionSnapshot> {
        let settings = Settings::countdown(minutes, self.config.countdown.max_minutes)?;
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| self.config.countdown.default_title.clone());

        let now = Instant::now();
        let mut session = Session::countdown(
            group,
            settings,
            title.clone(),
            audio_alert,
            now + self.config.idle.running_grace(),
        );
        session.start_timer(now);

        let entry = self.registry.insert(session)?;
        let snapshot = entry.lock().snapshot(now);
        self.spawn_tasks(&entry);
        info!(group_id = %group, minutes, title = %title, "Countdown started");

        match self
            .services
            .messenger
            .post_countdown(group, &title, snapshot.remaining)
            .await
        {
            Ok(handle) => entry.lock().set_countdown_display(handle),
            Err(e) => tracing::warn!(group_id = %group, error = %e, "Failed to post countdown display"),
        }
        Ok(snapshot)
    }

    /// End the group's session, if any
    ///
    /// Idempotent: returns `None` when there was nothing to end.
    pub async fn end(&self, group: GroupId, reason: EndReason) -> Option<EndedSession> {
        let entry = self.registry.get(group)?;
        self.end_entry(&entry, reason).await
    }

    /// End a specific registered session
    ///
    /// Only the task that removes the entry from the registry reports the
    /// end; everyone else gets `None`.
    pub(crate) async fn end_entry(&self, entry: &SessionEntry, reason: EndReason) -> Option<EndedSession> {
        let _effects = entry.sequence().await;
        let teardown = {
            let session = entry.lock();
            self.teardown(entry, &session, reason)?
        };
        Some(self.report_end(teardown).await)
    }

    /// Pause the timer and extend the idle deadline by the pause grace
    pub async fn pause(&self, group: GroupId) -> Result<SessionSnapshot> {
        let paused_grace = self.config.idle.paused_grace();
        let entry = self.registry.require(group)?;
        let _effects = entry.sequence().await;
        let (snapshot, unmute) = Self::mutate_entry(&entry, |session, now| {
            let unmute = session.active_mute_target();
            session.pause(now, paused_grace)?;
            Ok((session.snapshot(now), unmute))
        })?;
        entry.wake();

        debug!(group_id = %group, remaining = ?snapshot.remaining, "Timer paused");
        if let Some(target) = unmute {
            self.services.set_muted(group, &target, false).await;
        }
        Ok(snapshot)
    }

    /// Resume the timer and restore the running idle grace
    pub async fn resume(&self, group: GroupId) -> Result<SessionSnapshot> {
        let running_grace = self.config.idle.running_grace();
        let entry = self.registry.require(group)?;
        let _effects = entry.sequence().await;
        let (snapshot, mute) = Self::mutate_entry(&entry, |session, now| {
            session.resume(now, running_grace)?;
            Ok((session.snapshot(now), session.active_mute_target()))
        })?;
        entry.wake();

        debug!(group_id = %group, remaining = ?snapshot.remaining, "Timer resumed");
        if let Some(target) = mute {
            self.services.set_muted(group, &target, true).await;
        }
        Ok(snapshot)
    }

    /// Replace the settings, keeping the elapsed fraction of the current
    /// interval
    pub async fn edit(&self, group: GroupId, patch: SettingsPatch) -> Result<SessionSnapshot> {
        let limits = self.config.session.limits();
        let (entry, snapshot) = self.mutate(group, |session, now| {
            if session.is_countdown() {
                return Err(PomoError::NotEditable);
            }
            let settings = session.settings().patched(&patch, &limits)?;
            session.replace_settings(settings, now)?;
            Ok(session.snapshot(now))
        })?;
        entry.wake();

        info!(group_id = %group, focus = snapshot.settings.focus_minutes(), "Settings edited");
        Ok(snapshot)
    }

    /// Reset the current interval to its full length
    pub async fn restart(&self, group: GroupId) -> Result<SessionSnapshot> {
        let (entry, snapshot) = self.mutate(group, |session, now| {
            session.restart(now);
            Ok(session.snapshot(now))
        })?;
        entry.wake();

        debug!(group_id = %group, state = %snapshot.state, "Interval restarted");
        Ok(snapshot)
    }

    /// Move to the next interval immediately
    ///
    /// The new interval always starts running, even if the skipped one was
    /// paused.
    pub async fn skip(&self, group: GroupId) -> Result<Transition> {
        let running_grace = self.config.idle.running_grace();
        let entry = self.registry.require(group)?;
        let _effects = entry.sequence().await;
        let change = Self::mutate_entry(&entry, |session, now| {
            if session.is_countdown() {
                return Err(PomoError::NotSkippable);
            }
            let unmute = session.active_mute_target();
            let transition = session
                .advance(Trigger::Skip, now)
                .ok_or(PomoError::NotSkippable)?;
            if !session.timer().is_running() {
                session.start_timer(now);
            }
            session.extend_idle_deadline(now, running_grace);
            Ok(IntervalChange {
                transition,
                stats: *session.stats(),
                unmute,
                mute: session.active_mute_target(),
                direct: session.subscribers().notify_members(),
            })
        })?;
        entry.wake();

        let transition = change.transition;
        info!(group_id = %group, from = %transition.from, to = %transition.to, "Interval skipped");
        self.announce(group, change).await;
        Ok(transition)
    }

    pub fn snapshot(&self, group: GroupId) -> Result<SessionSnapshot> {
        let entry = self.registry.require(group)?;
        let snapshot = entry.lock().snapshot(Instant::now());
        Ok(snapshot)
    }

    /// Toggle direct notifications for `member`, returning the new state
    pub fn toggle_notify(&self, group: GroupId, member: MemberId) -> Result<bool> {
        let (_, enabled) = self.mutate(group, |session, _| {
            Ok(session.subscribers_mut().toggle_notify(member))
        })?;
        Ok(enabled)
    }

    /// Toggle auto-mute for `member`, or for everyone when `None`
    ///
    /// Takes effect immediately while a focus interval is running.
    pub async fn toggle_auto_mute(&self, group: GroupId, member: Option<MemberId>) -> Result<bool> {
        let entry = self.registry.require(group)?;
        let _effects = entry.sequence().await;
        let (enabled, focusing) = Self::mutate_entry(&entry, |session, _| {
            let enabled = match member {
                Some(member) => session.subscribers_mut().toggle_auto_mute(member),
                None => session.subscribers_mut().toggle_auto_mute_everyone(),
            };
            let focusing = session.state() == SessionState::Focus && session.timer().is_running();
            Ok((enabled, focusing))
        })?;

        if focusing {
            let target = match member {
                Some(member) => MuteTarget::Members(vec![member]),
                None => MuteTarget::Everyone,
            };
            self.services.set_muted(group, &target, enabled).await;
        }
        Ok(enabled)
    }

    /// Number of live sessions across all groups
    pub fn active_sessions(&self) -> usize {
        self.registry.len()
    }

    /// End every live session
    pub async fn shutdown(&self) {
        if self.registry.is_empty() {
            return;
        }
        let entries = self.registry.entries();
        info!(count = entries.len(), "Ending all sessions");
        for entry in entries {
            self.end_entry(&entry, EndReason::Shutdown).await;
        }
    }

    /// Called by the runner once the timer's deadline passes
    pub(crate) async fn on_interval_elapsed(&self, entry: &SessionEntry) {
        let group = entry.group_id();
        let _effects = entry.sequence().await;
        let outcome = {
            let now = Instant::now();
            let mut session = entry.lock();
            if entry.is_cancelled() || !session.timer().has_elapsed(now) {
                Elapsed::NotYet
            } else if session.is_countdown() {
                // claimed under the lock so no command can act on it afterwards
                let audio_alert = session.countdown_info().map(|info| info.audio_alert).unwrap_or(false);
                match self.teardown(entry, &session, EndReason::CountdownFinished) {
                    Some(teardown) => Elapsed::Countdown { teardown, audio_alert },
                    None => Elapsed::NotYet,
                }
            } else {
                let unmute = session.active_mute_target();
                match session.advance(Trigger::Elapsed, now) {
                    Some(transition) => Elapsed::Interval(IntervalChange {
                        transition,
                        stats: *session.stats(),
                        unmute,
                        mute: session.active_mute_target(),
                        direct: session.subscribers().notify_members(),
                    }),
                    None => Elapsed::NotYet,
                }
            }
        };

        match outcome {
            Elapsed::NotYet => {}
            Elapsed::Countdown { teardown, audio_alert } => {
                self.report_end(teardown).await;
                if audio_alert {
                    self.services.alert(group, AlertKind::CountdownEnd).await;
                }
            }
            Elapsed::Interval(change) => {
                info!(
                    group_id = %group,
                    from = %change.transition.from,
                    to = %change.transition.to,
                    completed = change.stats.completed_focus_intervals(),
                    "Interval elapsed"
                );
                self.announce(group, change).await;
            }
        }
    }

    /// Push the latest remaining time to the pinned countdown display
    pub(crate) async fn refresh_countdown(&self, entry: &SessionEntry) {
        let update = {
            let session = entry.lock();
            let remaining = session.timer().time_remaining(Instant::now());
            session.countdown_info().and_then(|info| info.display).map(|handle| (handle, remaining))
        };
        if let Some((handle, remaining)) = update {
            if let Err(e) = self.services.messenger.update_countdown(handle, remaining).await {
                tracing::warn!(group_id = %entry.group_id(), error = %e, "Failed to refresh countdown display");
            }
        }
    }

    /// Reset the idle deadline after an acknowledged liveness check
    ///
    /// Returns false if the session already ended.
    pub(crate) fn extend_idle(&self, entry: &SessionEntry) -> bool {
        let mut session = entry.lock();
        if entry.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        let grace = self.config.idle.grace_for(session.timer().is_running());
        session.extend_idle_deadline(now, grace);
        debug!(group_id = %entry.group_id(), grace = ?grace, "Idle deadline extended");
        true
    }

    /// Run `f` on the group's live session under its lock
    fn mutate<T>(
        &self,
        group: GroupId,
        f: impl FnOnce(&mut Session, Instant) -> Result<T>,
    ) -> Result<(SessionEntry, T)> {
        let entry = self.registry.require(group)?;
        let value = Self::mutate_entry(&entry, f)?;
        Ok((entry, value))
    }

    fn mutate_entry<T>(entry: &SessionEntry, f: impl FnOnce(&mut Session, Instant) -> Result<T>) -> Result<T> {
        let mut session = entry.lock();
        // ended between lookup and lock
        if entry.is_cancelled() {
            return Err(PomoError::NoActiveSession(entry.group_id().value()));
        }
        f(&mut session, Instant::now())
    }

    /// Remove and cancel `entry` while its session lock is held
    ///
    /// `None` if the entry was already ended by someone else.
    fn teardown(&self, entry: &SessionEntry, session: &Session, reason: EndReason) -> Option<Teardown> {
        self.registry.remove(entry.group_id(), entry.id())?;
        entry.cancel_token().cancel();
        Some(Teardown {
            ended: EndedSession {
                group_id: entry.group_id(),
                state: session.state(),
                stats: (!session.is_countdown()).then(|| *session.stats()),
                reason,
            },
            unmute: session.active_mute_target(),
            title: session.countdown_info().map(|info| info.title.clone()),
        })
    }

    async fn report_end(&self, teardown: Teardown) -> EndedSession {
        let Teardown { ended, unmute, title } = teardown;
        let group = ended.group_id;
        info!(group_id = %group, reason = ?ended.reason, "Session ended");
        if let Some(target) = unmute {
            self.services.set_muted(group, &target, false).await;
        }

        let notice = match (ended.reason, title) {
            (EndReason::CountdownFinished, Some(title)) => Notice::CountdownFinished { title },
            (reason, _) => Notice::SessionEnded {
                reason,
                stats: ended.stats,
            },
        };
        self.services.notify(group, notice).await;
        ended
    }

    fn spawn_tasks(&self, entry: &SessionEntry) {
        tokio::spawn(runner::run(self.clone(), entry.clone()));
        tokio::spawn(supervisor::run(self.clone(), entry.clone()));
    }

    async fn announce(&self, group: GroupId, change: IntervalChange) {
        if let Some(target) = change.unmute {
            self.services.set_muted(group, &target, false).await;
        }

        let to = change.transition.to;
        let notice = Notice::IntervalStarted {
            state: to,
            minutes: (change.transition.duration.as_secs() / 60) as u32,
            stats: change.stats,
        };
        self.services.notify(group, notice.clone()).await;
        self.services.notify_members(group, &change.direct, &notice).await;
        self.services.alert(group, AlertKind::from(to)).await;

        if let Some(target) = change.mute {
            self.services.set_muted(group, &target, true).await;
        }
    }
}
