//! Idle/timeout supervisor
//!
//! One task per session, ticking every `idle.poll_interval_secs`. Each tick:
//!
//! 1. An empty room ends the session immediately.
//! 2. Before the idle deadline nothing happens.
//! 3. Past it, the group is challenged and has `challenge_timeout_secs` to
//!    acknowledge. An acknowledgment pushes the deadline out by the grace
//!    for the timer's current mode; silence ends the session.
//!
//! The challenge wait is raced against the session's cancellation token, so
//! ending the session by other means abandons the wait. A challenge that
//! cannot be delivered is retried on the next tick, up to
//! [`MAX_PROMPT_FAILURES`] times in a row; after that the group is treated
//! as unresponsive.

use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::controller::SessionController;
use crate::registry::SessionEntry;
use crate::services::{EndReason, Notice};

/// Consecutive undeliverable challenges before the session is ended
pub const MAX_PROMPT_FAILURES: u32 = 3;

/// Outcome of one supervisor check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleCheck {
    /// Occupied and before the idle deadline
    Active,
    /// Ended because nobody is left in the room
    EmptyRoom,
    /// Challenge acknowledged; deadline extended
    Acknowledged,
    /// Challenge unanswered; ended
    NoResponse,
    /// The session ended while the check ran
    Cancelled,
    /// The occupancy query failed; retried on the next tick
    Skipped,
    /// The challenge could not be delivered
    PromptFailed,
}

impl IdleCheck {
    /// Whether the supervisor should stop after this outcome
    pub fn is_terminal(&self) -> bool {
        matches!(self, IdleCheck::EmptyRoom | IdleCheck::NoResponse | IdleCheck::Cancelled)
    }
}

/// Per-session supervisor state carried between ticks
pub(crate) struct Supervisor {
    controller: SessionController,
    entry: SessionEntry,
    prompt_failures: u32,
}

impl Supervisor {
    pub(crate) fn new(controller: SessionController, entry: SessionEntry) -> Self {
        Self {
            controller,
            entry,
            prompt_failures: 0,
        }
    }

    /// Run one check, ending the session once challenges keep failing
    pub(crate) async fn tick(&mut self) -> IdleCheck {
        let outcome = check(&self.controller, &self.entry).await;
        if outcome != IdleCheck::PromptFailed {
            self.prompt_failures = 0;
            return outcome;
        }

        self.prompt_failures += 1;
        if self.prompt_failures < MAX_PROMPT_FAILURES {
            return outcome;
        }
        warn!(
            group_id = %self.entry.group_id(),
            failures = self.prompt_failures,
            "Liveness challenge keeps failing, ending session"
        );
        match self.controller.end_entry(&self.entry, EndReason::NoResponse).await {
            Some(_) => IdleCheck::NoResponse,
            None => IdleCheck::Cancelled,
        }
    }
}

pub(crate) async fn run(controller: SessionController, entry: SessionEntry) {
    let poll = controller.config().idle.poll_interval();
    let mut ticker = interval_at(Instant::now() + poll, poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(group_id = %entry.group_id(), entry_id = %entry.id(), "Idle supervisor started");

    let cancel = entry.cancel_token().clone();
    let mut supervisor = Supervisor::new(controller, entry);
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = ticker.tick() => {
                if supervisor.tick().await.is_terminal() {
                    break;
                }
            }
        }
    }

    debug!(group_id = %supervisor.entry.group_id(), entry_id = %supervisor.entry.id(), "Idle supervisor stopped");
}

/// Run one supervisor check against `entry`
pub async fn check(controller: &SessionController, entry: &SessionEntry) -> IdleCheck {
    if entry.is_cancelled() {
        return IdleCheck::Cancelled;
    }
    let group = entry.group_id();
    let services = controller.services();

    match services.room.occupant_count(group).await {
        Ok(0) => {
            info!(group_id = %group, "Room is empty, ending session");
            return match controller.end_entry(entry, EndReason::EmptyRoom).await {
                Some(_) => IdleCheck::EmptyRoom,
                None => IdleCheck::Cancelled,
            };
        }
        Ok(_) => {}
        Err(e) => {
            warn!(group_id = %group, error = %e, "Failed to query room occupancy");
            return IdleCheck::Skipped;
        }
    }

    let idle = entry.lock().is_idle(Instant::now());
    if !idle {
        return IdleCheck::Active;
    }

    let config = &controller.config().idle;
    info!(group_id = %group, "Session idle, issuing liveness challenge");
    let challenge = timeout(
        config.challenge_timeout(),
        services
            .messenger
            .prompt_and_await_ack(group, &config.challenge_prompt, config.challenge_timeout()),
    );

    let acknowledged = tokio::select! {
        biased;

        _ = entry.cancel_token().cancelled() => return IdleCheck::Cancelled,

        result = challenge => match result {
            Ok(Ok(acknowledged)) => acknowledged,
            Ok(Err(e)) => {
                warn!(group_id = %group, error = %e, "Liveness challenge failed");
                return IdleCheck::PromptFailed;
            }
            // collaborator overran its own timeout
            Err(_) => false,
        },
    };

    if acknowledged {
        if !controller.extend_idle(entry) {
            return IdleCheck::Cancelled;
        }
        services.notify(group, Notice::StillThere).await;
        IdleCheck::Acknowledged
    } else {
        info!(group_id = %group, "Liveness challenge unanswered, ending session");
        match controller.end_entry(entry, EndReason::NoResponse).await {
            Some(_) => IdleCheck::NoResponse,
            None => IdleCheck::Cancelled,
        }
    }
}
