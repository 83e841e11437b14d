//! Console host
//!
//! Drives the core from a line-oriented stream (stdin in production) and
//! implements the collaborator traits on top of stdout. Each input line is
//!
//! ```text
//! <group> <member> <command> [args..]
//! ```
//!
//! where `<command>` is a member command (`start 25`, `countdown 10 "Tea"`)
//! or one of the host words standing in for the chat platform:
//!
//! - `join` / `leave`: the member enters or leaves the group's room
//! - `ack`: the member answers the pending liveness prompt

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use pomo_utils::{PomoError, Result};

use crate::controller::SessionController;
use crate::handlers::{format_duration, HandlerContext, HandlerResult, Invocation};
use crate::services::{AlertKind, AudioAlert, DisplayHandle, Messenger, MuteTarget, Notice, Room, Services};
use crate::types::{GroupId, MemberId};

/// Line sink shared by the console collaborators
#[derive(Debug, Clone)]
pub struct Output {
    tx: mpsc::UnboundedSender<String>,
}

impl Output {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn line(&self, text: impl Into<String>) -> Result<()> {
        self.tx
            .send(text.into())
            .map_err(|_| PomoError::messaging("console output closed"))
    }
}

/// Write every output line to stdout until all senders are gone
pub async fn print_output(mut rx: mpsc::UnboundedReceiver<String>) {
    let mut stdout = tokio::io::stdout();
    while let Some(line) = rx.recv().await {
        let written = async {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await
        };
        if let Err(e) = written.await {
            warn!(error = %e, "Failed to write console output");
            break;
        }
    }
}

/// Pending liveness prompt of one group
struct PendingAck {
    id: Uuid,
    tx: oneshot::Sender<()>,
}

/// [`Messenger`] printing to the console
pub struct ConsoleMessenger {
    out: Output,
    pending: DashMap<GroupId, PendingAck>,
    displays: DashMap<DisplayHandle, (GroupId, String)>,
    next_handle: AtomicU64,
}

impl ConsoleMessenger {
    pub fn new(out: Output) -> Self {
        Self {
            out,
            pending: DashMap::new(),
            displays: DashMap::new(),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Answer the group's pending prompt
    ///
    /// Returns false when nothing is waiting, including prompts that already
    /// timed out or whose session ended.
    pub fn acknowledge(&self, group: GroupId) -> bool {
        match self.pending.remove(&group) {
            Some((_, pending)) => pending.tx.send(()).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl Messenger for ConsoleMessenger {
    async fn send(&self, group: GroupId, notice: Notice) -> Result<()> {
        self.out.line(format!("[{}] {}", group, notice))
    }

    async fn send_direct(&self, member: MemberId, group: GroupId, notice: Notice) -> Result<()> {
        self.out.line(format!("[{} -> @{}] {}", group, member, notice))
    }

    async fn post_countdown(&self, group: GroupId, title: &str, remaining: Duration) -> Result<DisplayHandle> {
        let handle = DisplayHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.displays.insert(handle, (group, title.to_string()));
        self.out
            .line(format!("[{}] {}: {} left", group, title, format_duration(remaining)))?;
        Ok(handle)
    }

    async fn update_countdown(&self, handle: DisplayHandle, remaining: Duration) -> Result<()> {
        let (group, title) = self
            .displays
            .get(&handle)
            .map(|display| display.value().clone())
            .ok_or_else(|| PomoError::messaging(format!("unknown display {}", handle.0)))?;
        self.out
            .line(format!("[{}] {}: {} left", group, title, format_duration(remaining)))
    }

    async fn prompt_and_await_ack(&self, group: GroupId, prompt: &str, timeout: Duration) -> Result<bool> {
        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        // a newer prompt replaces an abandoned one
        self.pending.insert(group, PendingAck { id, tx });
        self.out
            .line(format!("[{}] {} (reply '{} <member> ack')", group, prompt, group))?;

        let acknowledged = matches!(tokio::time::timeout(timeout, rx).await, Ok(Ok(())));
        self.pending.remove_if(&group, |_, pending| pending.id == id);
        debug!(group_id = %group, acknowledged, "Liveness prompt settled");
        Ok(acknowledged)
    }
}

/// [`Room`] tracking console members who `join`ed
pub struct ConsoleRoom {
    out: Output,
    occupants: DashMap<GroupId, BTreeSet<MemberId>>,
}

impl ConsoleRoom {
    pub fn new(out: Output) -> Self {
        Self {
            out,
            occupants: DashMap::new(),
        }
    }

    /// Returns false if the member was already in the room
    pub fn join(&self, group: GroupId, member: MemberId) -> bool {
        self.occupants.entry(group).or_default().insert(member)
    }

    /// Returns false if the member was not in the room
    pub fn leave(&self, group: GroupId, member: MemberId) -> bool {
        let removed = self
            .occupants
            .get_mut(&group)
            .map(|mut members| members.remove(&member))
            .unwrap_or(false);
        self.occupants.remove_if(&group, |_, members| members.is_empty());
        removed
    }
}

#[async_trait]
impl Room for ConsoleRoom {
    async fn occupant_count(&self, group: GroupId) -> Result<usize> {
        Ok(self.occupants.get(&group).map(|members| members.len()).unwrap_or(0))
    }

    async fn set_muted(&self, group: GroupId, target: &MuteTarget, muted: bool) -> Result<()> {
        let who = match target {
            MuteTarget::Everyone => "everyone".to_string(),
            MuteTarget::Members(members) => members
                .iter()
                .map(|m| format!("@{}", m))
                .collect::<Vec<_>>()
                .join(" "),
        };
        let action = if muted { "muted" } else { "unmuted" };
        self.out.line(format!("[{}] ({} {})", group, action, who))
    }
}

/// [`AudioAlert`] that prints the alert it would play
pub struct ConsoleAudio {
    out: Output,
}

impl ConsoleAudio {
    pub fn new(out: Output) -> Self {
        Self { out }
    }
}

#[async_trait]
impl AudioAlert for ConsoleAudio {
    async fn play(&self, group: GroupId, kind: AlertKind) -> Result<()> {
        let sound = match kind {
            AlertKind::Focus => "focus chime",
            AlertKind::ShortBreak => "short break chime",
            AlertKind::LongBreak => "long break chime",
            AlertKind::CountdownEnd => "countdown alarm",
        };
        self.out.line(format!("[{}] *{}*", group, sound))
    }
}

/// Console collaborators sharing one output
pub struct ConsoleServices {
    pub messenger: Arc<ConsoleMessenger>,
    pub room: Arc<ConsoleRoom>,
    pub audio: Arc<ConsoleAudio>,
}

impl ConsoleServices {
    pub fn new(out: &Output) -> Self {
        Self {
            messenger: Arc::new(ConsoleMessenger::new(out.clone())),
            room: Arc::new(ConsoleRoom::new(out.clone())),
            audio: Arc::new(ConsoleAudio::new(out.clone())),
        }
    }

    pub fn services(&self) -> Services {
        Services::new(self.messenger.clone(), self.room.clone(), self.audio.clone())
    }
}

/// Reads command lines and dispatches them
pub struct ConsoleHost {
    controller: SessionController,
    console: ConsoleServices,
    out: Output,
}

impl ConsoleHost {
    pub fn new(controller: SessionController, console: ConsoleServices, out: Output) -> Self {
        Self {
            controller,
            console,
            out,
        }
    }

    /// Handle lines until the reader is exhausted
    pub async fn run<R>(&self, reader: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(reply) = self.handle_line(&line).await {
                self.out.line(reply)?;
            }
        }
        info!("Console input closed");
        Ok(())
    }

    /// Handle one input line, returning the text to show its author
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let mut parts = line.splitn(3, char::is_whitespace);
        let (group, member) = match (parse_id(parts.next()), parse_id(parts.next())) {
            (Some(group), Some(member)) => (GroupId::new(group), MemberId::new(member)),
            _ => return Some("usage: <group> <member> <command> [args..]".into()),
        };
        let rest = parts.next().unwrap_or("").trim();
        let prefix = self.controller.config().general.command_prefix.as_str();
        let command = rest.strip_prefix(prefix).unwrap_or(rest);

        match command {
            "join" => {
                self.console.room.join(group, member);
                Some(format!("@{} joined room {}", member, group))
            }
            "leave" => {
                self.console.room.leave(group, member);
                Some(format!("@{} left room {}", member, group))
            }
            "ack" => {
                if self.console.messenger.acknowledge(group) {
                    None
                } else {
                    Some("Nothing to acknowledge.".into())
                }
            }
            _ => {
                let ctx = HandlerContext::new(self.controller.clone(), Invocation { group, member });
                match ctx.handle_line(command).await {
                    HandlerResult::Reply(text) => Some(format!("[{} -> @{}] {}", group, member, text)),
                    HandlerResult::Error(text) => Some(format!("[{} -> @{}] error: {}", group, member, text)),
                    HandlerResult::NoResponse => None,
                }
            }
        }
    }
}

fn parse_id(word: Option<&str>) -> Option<u64> {
    word.and_then(|w| w.parse().ok())
}
