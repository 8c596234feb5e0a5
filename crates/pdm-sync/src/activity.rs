//! Audit trail of user-visible operations.
//!
//! Recording is fire-and-forget: a sink never fails the operation it
//! describes. Sinks that can fail log the failure and drop the event.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pdm_types::{FileId, UserId, VersionNumber};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::warn;

use crate::types::Direction;

/// Classification of activity events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityKind {
    Rollback,
    RollForward,
    /// The active version was re-materialized over a modified copy.
    Reapply,
    CheckIn,
    Checkout,
    Release,
    /// Lifecycle state or metadata changed.
    StateChanged,
}

impl From<Direction> for ActivityKind {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Rollback => Self::Rollback,
            Direction::RollForward => Self::RollForward,
            Direction::Reapply => Self::Reapply,
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Rollback => "rollback",
            Self::RollForward => "roll-forward",
            Self::Reapply => "reapply",
            Self::CheckIn => "check-in",
            Self::Checkout => "checkout",
            Self::Release => "release",
            Self::StateChanged => "state-changed",
        };
        f.write_str(s)
    }
}

/// One entry of the activity log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub kind: ActivityKind,
    pub file_id: FileId,
    pub actor: UserId,
    /// Version before the operation, when it moved the working copy.
    pub from_version: Option<VersionNumber>,
    /// Version after the operation.
    pub version: Option<VersionNumber>,
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(kind: ActivityKind, file_id: FileId, actor: UserId) -> Self {
        Self {
            kind,
            file_id,
            actor,
            from_version: None,
            version: None,
            detail: None,
            at: Utc::now(),
        }
    }

    pub fn with_versions(mut self, from: Option<VersionNumber>, to: VersionNumber) -> Self {
        self.from_version = from;
        self.version = Some(to);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for ActivityEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.at.format("%Y-%m-%d %H:%M:%S"), self.actor, self.kind)?;
        match (self.from_version, self.version) {
            (Some(from), Some(to)) => write!(f, " {from} -> {to}")?,
            (None, Some(to)) => write!(f, " {to}")?,
            _ => {}
        }
        write!(f, " [{}]", self.file_id.short())?;
        if let Some(detail) = &self.detail {
            write!(f, " {detail}")?;
        }
        Ok(())
    }
}

/// Destination for activity events.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    fn record(&self, event: ActivityEvent);

    /// Wait until every event recorded so far has reached its destination.
    async fn flush(&self) {}
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullActivitySink;

impl ActivitySink for NullActivitySink {
    fn record(&self, _event: ActivityEvent) {}
}

/// Keeps events in memory, in recording order.
#[derive(Debug, Default)]
pub struct MemoryActivityLog {
    events: Mutex<Vec<ActivityEvent>>,
}

impl MemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ActivityEvent> {
        self.events.lock().expect("lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ActivitySink for MemoryActivityLog {
    fn record(&self, event: ActivityEvent) {
        self.events.lock().expect("lock poisoned").push(event);
    }
}

/// A broadcast channel receiver for activity events.
pub type ActivityStream = broadcast::Receiver<ActivityEvent>;

/// Fans events out to live subscribers. Events recorded while nobody is
/// subscribed are dropped.
#[derive(Debug)]
pub struct BroadcastActivityLog {
    sender: broadcast::Sender<ActivityEvent>,
}

impl BroadcastActivityLog {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> ActivityStream {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastActivityLog {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ActivitySink for BroadcastActivityLog {
    fn record(&self, event: ActivityEvent) {
        // Err only means there are no receivers.
        let _ = self.sender.send(event);
    }
}

/// Appends one JSON object per line to a file.
///
/// Inside a Tokio runtime `record` only queues the event. A background task
/// writes queued events in order on the blocking pool, and
/// [`ActivitySink::flush`] waits for it to catch up. Outside a runtime the
/// event is written before `record` returns.
#[derive(Debug)]
pub struct JsonlActivityLog {
    file: Arc<JsonlFile>,
    queue: Mutex<Option<mpsc::UnboundedSender<Queued>>>,
}

#[derive(Debug)]
struct JsonlFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

#[derive(Debug)]
enum Queued {
    Event(ActivityEvent),
    Flush(oneshot::Sender<()>),
}

impl JsonlActivityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Arc::new(JsonlFile {
                path: path.into(),
                write_lock: Mutex::new(()),
            }),
            queue: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }

    /// Read every event back. Lines that do not parse are skipped.
    pub fn read_all(&self) -> std::io::Result<Vec<ActivityEvent>> {
        let text = match std::fs::read_to_string(self.path()) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        Ok(text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }

    /// The writer queue for `runtime`, starting the writer task if the
    /// previous one is gone.
    fn sender(&self, runtime: &Handle) -> mpsc::UnboundedSender<Queued> {
        let mut queue = self.queue.lock().expect("lock poisoned");
        if let Some(tx) = queue.as_ref().filter(|tx| !tx.is_closed()) {
            return tx.clone();
        }
        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(write_queued(Arc::clone(&self.file), rx));
        *queue = Some(tx.clone());
        tx
    }

    fn current_sender(&self) -> Option<mpsc::UnboundedSender<Queued>> {
        self.queue.lock().expect("lock poisoned").clone()
    }
}

impl JsonlFile {
    fn append(&self, event: &ActivityEvent) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        let _guard = self.write_lock.lock().expect("lock poisoned");
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(&line)
    }

    fn append_or_warn(&self, event: &ActivityEvent) {
        if let Err(e) = self.append(event) {
            warn!(path = %self.path.display(), kind = %event.kind, error = %e, "failed to record activity");
        }
    }
}

async fn write_queued(file: Arc<JsonlFile>, mut rx: mpsc::UnboundedReceiver<Queued>) {
    while let Some(item) = rx.recv().await {
        match item {
            Queued::Event(event) => {
                let file = Arc::clone(&file);
                let written = tokio::task::spawn_blocking(move || file.append_or_warn(&event));
                if let Err(e) = written.await {
                    warn!(error = %e, "activity write task failed");
                }
            }
            Queued::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

#[async_trait]
impl ActivitySink for JsonlActivityLog {
    fn record(&self, event: ActivityEvent) {
        let Ok(runtime) = Handle::try_current() else {
            self.file.append_or_warn(&event);
            return;
        };
        // The writer is gone only if its runtime shut down.
        if let Err(mpsc::error::SendError(Queued::Event(event))) =
            self.sender(&runtime).send(Queued::Event(event))
        {
            self.file.append_or_warn(&event);
        }
    }

    async fn flush(&self) {
        let Some(tx) = self.current_sender() else {
            return;
        };
        let (done, written) = oneshot::channel();
        if tx.send(Queued::Flush(done)).is_ok() {
            let _ = written.await;
        }
    }
}
