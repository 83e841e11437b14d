//! Interval runner
//!
//! One task per session. Sleeps until the running timer's deadline and hands
//! the elapse to the controller. Any operation that changes the timer wakes
//! the task through the entry's `Notify` so the deadline is re-read; a paused
//! timer has no deadline and the task just waits to be woken.
//!
//! Countdowns additionally refresh their pinned display on a fixed period.

use tokio::time::{sleep, sleep_until, Instant};
use tracing::debug;

use crate::controller::SessionController;
use crate::registry::SessionEntry;

pub(crate) async fn run(controller: SessionController, entry: SessionEntry) {
    let group = entry.group_id();
    let refresh = controller.config().countdown.refresh_interval();
    let countdown = entry.lock().is_countdown();
    debug!(group_id = %group, entry_id = %entry.id(), "Interval runner started");

    loop {
        let deadline = entry.lock().timer().ends_at();

        tokio::select! {
            biased;

            _ = entry.cancel_token().cancelled() => break,

            // Timer changed; re-read the deadline
            _ = entry.wake_signal().notified() => continue,

            _ = sleep_until_deadline(deadline) => {
                controller.on_interval_elapsed(&entry).await;
            }

            _ = sleep(refresh), if countdown => {
                controller.refresh_countdown(&entry).await;
            }
        }
    }

    debug!(group_id = %group, entry_id = %entry.id(), "Interval runner stopped");
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
