//! Session Registry
//!
//! Process-wide mapping from group to its single live session. Lookup,
//! insert and remove are atomic per key (DashMap shard locks); insertion is a
//! check-and-insert through the entry API, so two racing `start`s for one
//! group can never both succeed.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard, Notify};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use pomo_utils::{PomoError, Result};

use crate::session::Session;
use crate::types::GroupId;

/// Handle to a registered session
///
/// Cloning is cheap; all clones share the session, its cancellation token
/// and its wake-up signal. The entry id distinguishes this session from any
/// later session of the same group.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    id: Uuid,
    group_id: GroupId,
    session: Arc<Mutex<Session>>,
    /// Cancelled when the session ends; stops its runner and supervisor
    cancel_token: CancellationToken,
    /// Signalled whenever the timer changes outside the runner
    wake: Arc<Notify>,
    /// Held from a mute-affecting mutation until its room calls finish
    effects: Arc<AsyncMutex<()>>,
}

impl SessionEntry {
    fn new(session: Session) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id: session.group_id(),
            session: Arc::new(Mutex::new(session)),
            cancel_token: CancellationToken::new(),
            wake: Arc::new(Notify::new()),
            effects: Arc::new(AsyncMutex::new(())),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    /// Lock the session
    ///
    /// The guard must not be held across an `.await`.
    pub fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Tell the interval runner the timer changed
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    pub(crate) fn wake_signal(&self) -> &Notify {
        &self.wake
    }

    /// Serialize side effects of this session
    ///
    /// Taken before the session lock and held until the collaborator calls
    /// of the mutation are done, so mutes and unmutes reach the room in the
    /// order the mutations happened.
    pub async fn sequence(&self) -> AsyncMutexGuard<'_, ()> {
        self.effects.lock().await
    }
}

/// Registry of live sessions, one per group
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<GroupId, SessionEntry>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session unless its group already has one
    pub fn insert(&self, session: Session) -> Result<SessionEntry> {
        let group_id = session.group_id();
        match self.sessions.entry(group_id) {
            Entry::Occupied(_) => Err(PomoError::SessionAlreadyActive(group_id.value())),
            Entry::Vacant(vacant) => {
                let entry = SessionEntry::new(session);
                vacant.insert(entry.clone());
                debug!(group_id = %group_id, entry_id = %entry.id, "Registered session");
                Ok(entry)
            }
        }
    }

    pub fn get(&self, group_id: GroupId) -> Option<SessionEntry> {
        self.sessions.get(&group_id).map(|entry| entry.value().clone())
    }

    /// Like [`get`](Self::get) but a missing session is an error
    pub fn require(&self, group_id: GroupId) -> Result<SessionEntry> {
        self.get(group_id)
            .ok_or(PomoError::NoActiveSession(group_id.value()))
    }

    /// Remove the session of `group_id` if it is still the one with `entry_id`
    pub fn remove(&self, group_id: GroupId, entry_id: Uuid) -> Option<SessionEntry> {
        let removed = self
            .sessions
            .remove_if(&group_id, |_, entry| entry.id == entry_id)
            .map(|(_, entry)| entry);
        if removed.is_some() {
            debug!(group_id = %group_id, entry_id = %entry_id, "Removed session");
        }
        removed
    }

    /// Whether `entry` is still the registered session of its group
    #[cfg(test)]
    pub fn is_current(&self, entry: &SessionEntry) -> bool {
        self.sessions
            .get(&entry.group_id)
            .map(|current| current.id == entry.id)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Snapshot of every registered entry
    pub fn entries(&self) -> Vec<SessionEntry> {
        self.sessions.iter().map(|entry| entry.value().clone()).collect()
    }
}
