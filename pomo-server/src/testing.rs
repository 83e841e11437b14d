//! Recording collaborators for tests

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use pomo_utils::{PomoError, Result};

use crate::config::AppConfig;
use crate::controller::SessionController;
use crate::registry::SessionRegistry;
use crate::services::{AlertKind, AudioAlert, DisplayHandle, Messenger, MuteTarget, Notice, Room, Services};
use crate::types::{GroupId, MemberId};

/// Something the messenger was asked to deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Notice(GroupId, Notice),
    Direct(MemberId, Notice),
}

/// How the fake group answers liveness prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckBehavior {
    Accept,
    Decline,
    /// Stay silent until the prompt times out
    Never,
}

pub struct RecordingMessenger {
    sent: Mutex<Vec<Recorded>>,
    prompts: Mutex<Vec<(GroupId, String)>>,
    updates: Mutex<Vec<Duration>>,
    ack: Mutex<AckBehavior>,
    fail_prompts: AtomicBool,
    next_handle: AtomicU64,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            ack: Mutex::new(AckBehavior::Accept),
            fail_prompts: AtomicBool::new(false),
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn set_ack(&self, behavior: AckBehavior) {
        *self.ack.lock() = behavior;
    }

    /// Make every prompt fail after it is recorded
    pub fn fail_prompts(&self, fail: bool) {
        self.fail_prompts.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Recorded> {
        self.sent.lock().clone()
    }

    pub fn prompts(&self) -> Vec<(GroupId, String)> {
        self.prompts.lock().clone()
    }

    pub fn countdown_updates(&self) -> Vec<Duration> {
        self.updates.lock().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, group: GroupId, notice: Notice) -> Result<()> {
        self.sent.lock().push(Recorded::Notice(group, notice));
        Ok(())
    }

    async fn send_direct(&self, member: MemberId, _group: GroupId, notice: Notice) -> Result<()> {
        self.sent.lock().push(Recorded::Direct(member, notice));
        Ok(())
    }

    async fn post_countdown(&self, _group: GroupId, _title: &str, _remaining: Duration) -> Result<DisplayHandle> {
        Ok(DisplayHandle(self.next_handle.fetch_add(1, Ordering::SeqCst)))
    }

    async fn update_countdown(&self, _handle: DisplayHandle, remaining: Duration) -> Result<()> {
        self.updates.lock().push(remaining);
        Ok(())
    }

    async fn prompt_and_await_ack(&self, group: GroupId, prompt: &str, timeout: Duration) -> Result<bool> {
        self.prompts.lock().push((group, prompt.to_string()));
        if self.fail_prompts.load(Ordering::SeqCst) {
            return Err(PomoError::messaging("prompt rejected"));
        }
        let behavior = *self.ack.lock();
        match behavior {
            AckBehavior::Accept => Ok(true),
            AckBehavior::Decline => Ok(false),
            AckBehavior::Never => {
                tokio::time::sleep(timeout).await;
                Ok(false)
            }
        }
    }
}

/// Room with settable occupancy; every group starts with one occupant
pub struct FakeRoom {
    occupants: DashMap<GroupId, usize>,
    fail: AtomicBool,
    mutes: Mutex<Vec<(MuteTarget, bool)>>,
    mute_delay: Mutex<Option<Duration>>,
}

impl FakeRoom {
    pub fn new() -> Self {
        Self {
            occupants: DashMap::new(),
            fail: AtomicBool::new(false),
            mutes: Mutex::new(Vec::new()),
            mute_delay: Mutex::new(None),
        }
    }

    /// Delay muting (not unmuting) by `delay`; recorded once it completes
    pub fn set_mute_delay(&self, delay: Duration) {
        *self.mute_delay.lock() = Some(delay);
    }

    pub fn set_occupants(&self, group: GroupId, count: usize) {
        self.occupants.insert(group, count);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn mutes(&self) -> Vec<(MuteTarget, bool)> {
        self.mutes.lock().clone()
    }
}

#[async_trait]
impl Room for FakeRoom {
    async fn occupant_count(&self, group: GroupId) -> Result<usize> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PomoError::room("room unavailable"));
        }
        Ok(self.occupants.get(&group).map(|count| *count).unwrap_or(1))
    }

    async fn set_muted(&self, _group: GroupId, target: &MuteTarget, muted: bool) -> Result<()> {
        let delay = *self.mute_delay.lock();
        if let (true, Some(delay)) = (muted, delay) {
            tokio::time::sleep(delay).await;
        }
        self.mutes.lock().push((target.clone(), muted));
        Ok(())
    }
}

pub struct RecordingAudio {
    played: Mutex<Vec<(GroupId, AlertKind)>>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self {
            played: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
        }
    }

    /// Keep each alert "playing" for `delay` after it is recorded
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn played(&self) -> Vec<(GroupId, AlertKind)> {
        self.played.lock().clone()
    }

    pub fn count(&self, kind: AlertKind) -> usize {
        self.played.lock().iter().filter(|(_, k)| *k == kind).count()
    }
}

#[async_trait]
impl AudioAlert for RecordingAudio {
    async fn play(&self, group: GroupId, kind: AlertKind) -> Result<()> {
        self.played.lock().push((group, kind));
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

pub struct Harness {
    pub controller: SessionController,
    pub messenger: Arc<RecordingMessenger>,
    pub room: Arc<FakeRoom>,
    pub audio: Arc<RecordingAudio>,
}

pub fn harness() -> Harness {
    harness_with(AppConfig::default())
}

pub fn harness_with(config: AppConfig) -> Harness {
    let messenger = Arc::new(RecordingMessenger::new());
    let room = Arc::new(FakeRoom::new());
    let audio = Arc::new(RecordingAudio::new());
    let services = Services::new(messenger.clone(), room.clone(), audio.clone());
    let controller = SessionController::new(Arc::new(SessionRegistry::new()), services, Arc::new(config));
    Harness {
        controller,
        messenger,
        room,
        audio,
    }
}
