//! # Editing Session
//!
//! One task owns a document for as long as it is being edited: its content,
//! its version history and its autosave scheduler. Everything else talks to
//! that task through a cloneable [`SessionHandle`].
//!
//! ```text
//!  SessionHandle ──mpsc──▶ ┌──────────── session task ────────────┐
//!  (UI callbacks,          │ select! {                            │
//!   buttons, adapters)     │   command      → apply / reply       │
//!        ▲                 │   persist done → settle, version     │
//!        │                 │   deadline     → start autosave      │
//!        └──watch status── │ }                                    │
//!                          └──────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - Edits apply in the order they were sent
//! - At most one write per document is running; the deadline is not polled
//!   while one is, and manual saves queue behind it
//! - A running write is never cancelled
//! - Failures never escape the task: they become a notification and a
//!   status update

use crate::autosave::{AutosaveScheduler, SaveOutcome, SaveState, SaveTrigger};
use crate::collaborators::{ContentStore, HistoryArchive, Notifier, NotifyKind, TracingNotifier};
use crate::config::EditorConfig;
use crate::document::Document;
use crate::errors::{EditorError, PersistError};
use crate::surface::{EditableSurface, SurfaceAdapter};
use crate::version_store::{VersionEntry, VersionOrigin, VersionStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, instrument, warn};

type PersistFuture = Pin<Box<dyn Future<Output = Result<(), PersistError>> + Send>>;
type SaveReply = oneshot::Sender<Result<SaveReport, EditorError>>;

/// Called after every successful manual save
pub type SavedCallback = Arc<dyn Fn(&SaveReport) + Send + Sync>;

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Loading,
    Clean,
    Dirty,
    Saving,
    Closed,
}

/// Snapshot of session state for the UI
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub document_id: String,
    pub phase: SessionPhase,
    pub dirty: bool,
    pub saving: bool,
    pub revision: u64,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub save_state: SaveState,
    pub version_count: usize,
}

impl SessionStatus {
    fn loading(document_id: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            phase: SessionPhase::Loading,
            dirty: false,
            saving: false,
            revision: 0,
            last_saved_at: None,
            last_error: None,
            save_state: SaveState::Idle,
            version_count: 0,
        }
    }
}

/// Result of a save request
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub trigger: SaveTrigger,
    /// False when there was nothing left to write
    pub written: bool,
    pub saved_at: Option<DateTime<Utc>>,
    /// Entry recorded for this write
    pub version: Option<VersionEntry>,
}

/// What happened to unsaved changes on close
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalWrite {
    NotNeeded,
    Saved,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReport {
    pub final_write: FinalWrite,
    pub archived: bool,
    /// Entries dropped with the in-memory history
    pub discarded_versions: usize,
}

enum SessionCommand {
    Edit(String),
    ManualSave(SaveReply),
    Load {
        content: String,
        reply: oneshot::Sender<()>,
    },
    Restore {
        version_id: String,
        reply: oneshot::Sender<Result<String, EditorError>>,
    },
    ListVersions(oneshot::Sender<Vec<VersionEntry>>),
    Preview {
        version_id: String,
        reply: oneshot::Sender<Result<VersionEntry, EditorError>>,
    },
    Content(oneshot::Sender<String>),
    Close(oneshot::Sender<CloseReport>),
}

/// Configures and starts a session
pub struct SessionBuilder {
    document_id: String,
    config: EditorConfig,
    store: Arc<dyn ContentStore>,
    notifier: Arc<dyn Notifier>,
    archive: Option<Arc<dyn HistoryArchive>>,
    on_saved: Option<SavedCallback>,
}

impl SessionBuilder {
    pub fn new(document_id: impl Into<String>, store: Arc<dyn ContentStore>) -> Self {
        Self {
            document_id: document_id.into(),
            config: EditorConfig::default(),
            store,
            notifier: Arc::new(TracingNotifier),
            archive: None,
            on_saved: None,
        }
    }

    pub fn config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn archive(mut self, archive: Arc<dyn HistoryArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn on_saved(mut self, callback: impl Fn(&SaveReport) + Send + Sync + 'static) -> Self {
        self.on_saved = Some(Arc::new(callback));
        self
    }

    /// Start editing `initial_content`. Must be called within a tokio
    /// runtime.
    #[instrument(skip(self, initial_content), fields(document_id = %self.document_id))]
    pub async fn open(self, initial_content: impl Into<String>) -> SessionHandle {
        let content = initial_content.into();

        let mut versions = VersionStore::with_capacity(self.config.version_capacity);
        if let Some(archive) = &self.archive {
            match archive.load_history(&self.document_id).await {
                Ok(entries) => {
                    debug!(entries = entries.len(), "loaded archived history");
                    versions.replace_all(entries);
                }
                Err(e) => warn!(error = %e, "could not load archived history"),
            }
        }
        versions.seed_initial(&content);

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SessionStatus::loading(&self.document_id));

        let actor = SessionActor {
            document: Document::load(self.document_id.clone(), content),
            scheduler: AutosaveScheduler::new(self.config.quiet_period()),
            versions,
            config: self.config,
            store: self.store,
            notifier: self.notifier,
            archive: self.archive,
            on_saved: self.on_saved,
            commands: commands_rx,
            commands_open: true,
            status: status_tx,
            flight: None,
            queued_saves: Vec::new(),
            generation: 0,
            restored_from: None,
            last_error: None,
            archive_task: None,
            closing: None,
        };
        info!(revision = 0, "session opened");
        tokio::spawn(actor.run());

        SessionHandle {
            document_id: Arc::from(self.document_id.as_str()),
            commands: commands_tx,
            status: status_rx,
        }
    }

    /// Start editing whatever the content store holds for the document
    pub async fn open_from_store(self) -> Result<SessionHandle, EditorError> {
        let content = self
            .store
            .load_document_content(&self.document_id)
            .await?
            .unwrap_or_default();
        Ok(self.open(content).await)
    }
}

/// Cloneable handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    document_id: Arc<str>,
    commands: mpsc::UnboundedSender<SessionCommand>,
    status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// New content from the editor. Safe to call from synchronous UI
    /// callbacks.
    pub fn on_editor_change(&self, new_content: &str) -> Result<(), EditorError> {
        self.commands
            .send(SessionCommand::Edit(new_content.to_string()))
            .map_err(|_| EditorError::SessionClosed)
    }

    /// Write now, bypassing the quiet period
    #[instrument(skip(self), fields(document_id = %self.document_id))]
    pub async fn manual_save(&self) -> Result<SaveReport, EditorError> {
        self.request(SessionCommand::ManualSave).await?
    }

    /// Replace the document with freshly loaded content
    pub async fn load(&self, content: impl Into<String>) -> Result<(), EditorError> {
        let content = content.into();
        self.request(|reply| SessionCommand::Load { content, reply }).await
    }

    /// Bring back a snapshot. The returned content should be pushed into
    /// the surface with `set_content`.
    #[instrument(skip(self), fields(document_id = %self.document_id))]
    pub async fn restore(&self, version_id: &str) -> Result<String, EditorError> {
        let version_id = version_id.to_string();
        self.request(|reply| SessionCommand::Restore { version_id, reply }).await?
    }

    /// History, newest first
    pub async fn versions(&self) -> Result<Vec<VersionEntry>, EditorError> {
        self.request(SessionCommand::ListVersions).await
    }

    pub async fn preview(&self, version_id: &str) -> Result<VersionEntry, EditorError> {
        let version_id = version_id.to_string();
        self.request(|reply| SessionCommand::Preview { version_id, reply }).await?
    }

    /// Current in-memory content
    pub async fn content(&self) -> Result<String, EditorError> {
        self.request(SessionCommand::Content).await
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Route the adapter's change events into this session
    pub fn attach<S: EditableSurface>(&self, adapter: &mut SurfaceAdapter<S>) {
        let handle = self.clone();
        adapter.on_change(move |content| {
            if let Err(e) = handle.on_editor_change(content) {
                debug!(error = %e, "change dropped");
            }
        });
    }

    /// Finish editing: wait for a running write, write unsaved changes one
    /// last time, archive history. Later calls on any handle fail with
    /// [`EditorError::SessionClosed`].
    #[instrument(skip(self), fields(document_id = %self.document_id))]
    pub async fn close(&self) -> Result<CloseReport, EditorError> {
        self.request(SessionCommand::Close).await
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand) -> Result<T, EditorError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| EditorError::SessionClosed)?;
        response.await.map_err(|_| EditorError::SessionClosed)
    }
}

/// The running write
struct Flight {
    generation: u64,
    trigger: SaveTrigger,
    origin: VersionOrigin,
    snapshot: String,
    revision: u64,
    waiters: Vec<SaveReply>,
    future: PersistFuture,
}

struct Closing {
    reply: Option<oneshot::Sender<CloseReport>>,
    final_attempted: bool,
    final_write: FinalWrite,
}

enum Flow {
    Continue,
    Stop,
}

struct SessionActor {
    document: Document,
    versions: VersionStore,
    scheduler: AutosaveScheduler,
    config: EditorConfig,
    store: Arc<dyn ContentStore>,
    notifier: Arc<dyn Notifier>,
    archive: Option<Arc<dyn HistoryArchive>>,
    on_saved: Option<SavedCallback>,

    commands: mpsc::UnboundedReceiver<SessionCommand>,
    /// False once every handle is gone
    commands_open: bool,
    status: watch::Sender<SessionStatus>,

    flight: Option<Flight>,
    /// Manual saves waiting for the running write to settle
    queued_saves: Vec<SaveReply>,
    /// Bumped on every load; writes started before a load are stale
    generation: u64,
    /// Snapshot time of the last restore not yet covered by a save
    restored_from: Option<DateTime<Utc>>,
    last_error: Option<String>,
    archive_task: Option<JoinHandle<()>>,
    closing: Option<Closing>,
}

impl SessionActor {
    async fn run(mut self) {
        self.publish();

        loop {
            let deadline = self.scheduler.deadline();
            let timer_enabled = deadline.is_some() && self.flight.is_none() && self.closing.is_none();

            tokio::select! {
                biased;

                command = self.commands.recv(), if self.commands_open => match command {
                    Some(command) => self.handle(command),
                    None => {
                        self.commands_open = false;
                        if self.closing.is_none() {
                            debug!(document_id = %self.document.id(), "all handles dropped");
                            self.begin_close(None);
                        }
                    }
                },

                result = in_flight(&mut self.flight) => self.settle(result),

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if timer_enabled => self.on_deadline(),

                else => break,
            }

            if let Flow::Stop = self.advance_close() {
                break;
            }
            self.publish();
        }

        self.finish().await;
    }

    fn handle(&mut self, command: SessionCommand) {
        if self.closing.is_some() {
            // Dropping the reply reports SessionClosed to the caller
            debug!(document_id = %self.document.id(), "command after close ignored");
            return;
        }

        match command {
            SessionCommand::Edit(content) => self.on_edit(&content),
            SessionCommand::ManualSave(reply) => self.manual_save(reply),
            SessionCommand::Load { content, reply } => {
                self.load(content);
                let _ = reply.send(());
            }
            SessionCommand::Restore { version_id, reply } => {
                let _ = reply.send(self.restore(&version_id));
            }
            SessionCommand::ListVersions(reply) => {
                let _ = reply.send(self.versions.list());
            }
            SessionCommand::Preview { version_id, reply } => {
                let entry = self
                    .versions
                    .get(&version_id)
                    .cloned()
                    .ok_or(EditorError::VersionNotFound(version_id));
                let _ = reply.send(entry);
            }
            SessionCommand::Content(reply) => {
                let _ = reply.send(self.document.content().to_string());
            }
            SessionCommand::Close(reply) => self.begin_close(Some(reply)),
        }
    }

    fn on_edit(&mut self, content: &str) {
        if !self.document.apply_edit(content) {
            return;
        }
        if self.document.is_dirty() || self.scheduler.is_in_flight() {
            self.scheduler.on_edit(Instant::now());
        }
        debug!(
            document_id = %self.document.id(),
            revision = self.document.revision(),
            dirty = self.document.is_dirty(),
            "edit applied"
        );
    }

    fn manual_save(&mut self, reply: SaveReply) {
        if self.flight.is_some() {
            debug!(document_id = %self.document.id(), "manual save queued behind running write");
            self.queued_saves.push(reply);
            return;
        }

        if self.document.is_dirty() && self.scheduler.begin(SaveTrigger::Manual) {
            self.start_flight(SaveTrigger::Manual, vec![reply]);
        } else {
            self.resolve_without_write(vec![reply]);
        }
    }

    fn load(&mut self, content: String) {
        self.generation += 1;
        self.document.reload(content);
        self.versions.clear();
        self.versions.seed_initial(self.document.content());
        self.scheduler.reset();
        self.restored_from = None;
        self.last_error = None;
        info!(document_id = %self.document.id(), generation = self.generation, "document loaded");
    }

    fn restore(&mut self, version_id: &str) -> Result<String, EditorError> {
        let Some(entry) = self.versions.get(version_id).cloned() else {
            warn!(document_id = %self.document.id(), version_id, "version unavailable");
            self.notifier.notify(
                NotifyKind::Error,
                "Version unavailable",
                "That version is no longer in the history.",
            );
            return Err(EditorError::VersionNotFound(version_id.to_string()));
        };

        if self.document.apply_edit(&entry.content) {
            self.restored_from = Some(entry.created_at);
            if self.document.is_dirty() || self.scheduler.is_in_flight() {
                self.scheduler.on_edit(Instant::now());
            }
        }
        info!(
            document_id = %self.document.id(),
            version_id,
            created_at = %entry.created_at,
            "version restored"
        );
        Ok(entry.content)
    }

    fn on_deadline(&mut self) {
        if !self.scheduler.fire(Instant::now()) {
            return;
        }
        if self.document.is_dirty() {
            self.start_flight(SaveTrigger::Autosave, Vec::new());
        } else {
            // Edited back to the saved content
            self.scheduler
                .settle(SaveOutcome::Succeeded { still_dirty: false }, Instant::now());
        }
    }

    /// The scheduler must already be in flight for `trigger`
    fn start_flight(&mut self, trigger: SaveTrigger, waiters: Vec<SaveReply>) {
        let origin = match (self.restored_from, trigger) {
            (Some(from), _) => VersionOrigin::Restore { from },
            (None, SaveTrigger::Autosave) => VersionOrigin::Autosave,
            (None, SaveTrigger::Manual) => VersionOrigin::Manual,
            (None, SaveTrigger::Close) => VersionOrigin::Close,
        };
        let snapshot = self.document.content().to_string();
        let revision = self.document.revision();

        let store = self.store.clone();
        let document_id = self.document.id().to_string();
        let content = snapshot.clone();
        let future: PersistFuture =
            Box::pin(async move { store.save_document_content(&document_id, &content).await });

        debug!(
            document_id = %self.document.id(),
            revision,
            ?trigger,
            origin = %origin.change_note(),
            "persist started"
        );
        self.flight = Some(Flight {
            generation: self.generation,
            trigger,
            origin,
            snapshot,
            revision,
            waiters,
            future,
        });
    }

    fn settle(&mut self, result: Result<(), PersistError>) {
        let Some(flight) = self.flight.take() else {
            return;
        };
        let now = Instant::now();

        if flight.generation != self.generation {
            // The store holds pre-load content now
            let saved_at = match &result {
                Ok(()) => {
                    let saved_at = Utc::now();
                    self.document.mark_persisted(&flight.snapshot, saved_at);
                    Some(saved_at)
                }
                Err(_) => None,
            };
            debug!(
                document_id = %self.document.id(),
                dirty = self.document.is_dirty(),
                "write from before the last load settled"
            );
            self.scheduler.settle(
                SaveOutcome::Succeeded {
                    still_dirty: self.document.is_dirty(),
                },
                now,
            );
            for waiter in flight.waiters {
                let outcome = match &result {
                    Ok(()) => Ok(SaveReport {
                        trigger: flight.trigger,
                        written: true,
                        saved_at,
                        version: None,
                    }),
                    Err(e) => Err(EditorError::Persist(e.clone())),
                };
                let _ = waiter.send(outcome);
            }
            self.drain_queued_saves();
            return;
        }

        match result {
            Ok(()) => {
                let saved_at = Utc::now();
                let still_dirty = self.document.mark_persisted(&flight.snapshot, saved_at);
                let entry = self.versions.push(flight.snapshot.as_str(), flight.origin.clone());
                if let VersionOrigin::Restore { from } = flight.origin {
                    if self.restored_from == Some(from) {
                        self.restored_from = None;
                    }
                }
                self.last_error = None;
                self.scheduler.settle(SaveOutcome::Succeeded { still_dirty }, now);

                info!(
                    document_id = %self.document.id(),
                    revision = flight.revision,
                    origin = %entry.change_note,
                    still_dirty,
                    "document saved"
                );

                let report = SaveReport {
                    trigger: flight.trigger,
                    written: true,
                    saved_at: Some(saved_at),
                    version: Some(entry),
                };
                if let Some(closing) = self.closing.as_mut() {
                    if flight.trigger == SaveTrigger::Close {
                        closing.final_write = FinalWrite::Saved;
                    }
                }
                if flight.trigger == SaveTrigger::Manual
                    || (flight.trigger == SaveTrigger::Autosave && self.config.notify_on_autosave)
                {
                    self.notifier
                        .notify(NotifyKind::Success, "Saved", "Your changes have been saved.");
                }
                if flight.trigger == SaveTrigger::Manual {
                    self.saved_callback(&report);
                }
                for waiter in flight.waiters {
                    let _ = waiter.send(Ok(report.clone()));
                }
                self.archive_in_background();
            }
            Err(e) => {
                warn!(
                    document_id = %self.document.id(),
                    revision = flight.revision,
                    trigger = ?flight.trigger,
                    error = %e,
                    "save failed"
                );
                self.last_error = Some(e.to_string());
                self.scheduler.settle(SaveOutcome::Failed, now);
                self.notifier.notify(
                    NotifyKind::Error,
                    "Save failed",
                    &format!("{}. Your changes are kept and will be saved again.", e),
                );
                if let Some(closing) = self.closing.as_mut() {
                    if flight.trigger == SaveTrigger::Close {
                        closing.final_write = FinalWrite::Failed(e.to_string());
                    }
                }
                for waiter in flight.waiters {
                    let _ = waiter.send(Err(EditorError::Persist(e.clone())));
                }
            }
        }

        self.drain_queued_saves();
    }

    /// Serve manual saves that waited for the write that just settled
    fn drain_queued_saves(&mut self) {
        if self.queued_saves.is_empty() {
            return;
        }
        let waiters = std::mem::take(&mut self.queued_saves);
        if self.document.is_dirty() && self.scheduler.begin(SaveTrigger::Manual) {
            self.start_flight(SaveTrigger::Manual, waiters);
        } else {
            self.resolve_without_write(waiters);
        }
    }

    /// Manual save with nothing left to write
    fn resolve_without_write(&mut self, waiters: Vec<SaveReply>) {
        let report = SaveReport {
            trigger: SaveTrigger::Manual,
            written: false,
            saved_at: self.document.last_saved_at(),
            version: None,
        };
        debug!(document_id = %self.document.id(), "manual save: already up to date");
        self.notifier
            .notify(NotifyKind::Success, "Saved", "Your changes have been saved.");
        self.saved_callback(&report);
        for waiter in waiters {
            let _ = waiter.send(Ok(report.clone()));
        }
    }

    fn saved_callback(&self, report: &SaveReport) {
        if let Some(callback) = &self.on_saved {
            callback(report);
        }
    }

    /// Store the history without holding up the session. Stores run one
    /// after another so the archive ends with the latest list.
    fn archive_in_background(&mut self) {
        let Some(archive) = self.archive.clone() else {
            return;
        };
        let document_id = self.document.id().to_string();
        let entries = self.versions.list();
        let previous = self.archive_task.take();

        self.archive_task = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            if let Err(e) = archive.store_history(&document_id, &entries).await {
                warn!(document_id = %document_id, error = %e, "could not archive history");
            }
        }));
    }

    fn begin_close(&mut self, reply: Option<oneshot::Sender<CloseReport>>) {
        info!(document_id = %self.document.id(), dirty = self.document.is_dirty(), "closing session");
        self.closing = Some(Closing {
            reply,
            final_attempted: false,
            final_write: FinalWrite::NotNeeded,
        });
        self.commands.close();
    }

    fn advance_close(&mut self) -> Flow {
        if self.flight.is_some() {
            return Flow::Continue;
        }
        let Some(closing) = self.closing.as_mut() else {
            return Flow::Continue;
        };

        if !closing.final_attempted && self.document.is_dirty() {
            closing.final_attempted = true;
            // Nothing is running, so the scheduler accepts
            if self.scheduler.begin(SaveTrigger::Close) {
                self.start_flight(SaveTrigger::Close, Vec::new());
                return Flow::Continue;
            }
        }
        Flow::Stop
    }

    async fn finish(mut self) {
        if let Some(task) = self.archive_task.take() {
            let _ = task.await;
        }

        let entries = self.versions.list();
        let archived = match &self.archive {
            Some(archive) => match archive.store_history(self.document.id(), &entries).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(document_id = %self.document.id(), error = %e, "could not archive history");
                    false
                }
            },
            None => false,
        };

        let discarded_versions = self.versions.len();
        self.versions.clear();

        let closing = self.closing.take();
        let report = CloseReport {
            final_write: closing
                .as_ref()
                .map(|closing| closing.final_write.clone())
                .unwrap_or(FinalWrite::NotNeeded),
            archived,
            discarded_versions,
        };

        let mut status = self.current_status();
        status.phase = SessionPhase::Closed;
        self.status.send_replace(status);
        info!(document_id = %self.document.id(), ?report, "session closed");

        if let Some(reply) = closing.and_then(|closing| closing.reply) {
            let _ = reply.send(report);
        }
    }

    fn current_status(&self) -> SessionStatus {
        let saving = self.flight.is_some();
        let dirty = self.document.is_dirty();
        let phase = if saving {
            SessionPhase::Saving
        } else if dirty {
            SessionPhase::Dirty
        } else {
            SessionPhase::Clean
        };
        SessionStatus {
            document_id: self.document.id().to_string(),
            phase,
            dirty,
            saving,
            revision: self.document.revision(),
            last_saved_at: self.document.last_saved_at(),
            last_error: self.last_error.clone(),
            save_state: self.scheduler.state(),
            version_count: self.versions.len(),
        }
    }

    fn publish(&self) {
        let status = self.current_status();
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}

/// Resolves with the running write, or never when there is none
async fn in_flight(flight: &mut Option<Flight>) -> Result<(), PersistError> {
    match flight {
        Some(flight) => (&mut flight.future).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBackend, RecordingNotifier};
    use std::time::Duration;

    const QUIET: Duration = Duration::from_secs(3);

    async fn open(backend: &Arc<MemoryBackend>, content: &str) -> SessionHandle {
        SessionBuilder::new("doc-1", backend.clone())
            .config(EditorConfig::default().with_quiet_period(QUIET))
            .open(content)
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_seeds_initial_version() {
        let backend = Arc::new(MemoryBackend::new());
        let session = open(&backend, "<p>Hello</p>").await;

        let versions = session.versions().await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].change_note, "Initial version");
        assert_eq!(session.status().phase, SessionPhase::Clean);
    }

    #[tokio::test(start_paused = true)]
    async fn test_noop_edit_does_not_arm() {
        let backend = Arc::new(MemoryBackend::new());
        let session = open(&backend, "<p>Hello</p>").await;

        session.on_editor_change("<p>Hello</p>").unwrap();
        session.content().await.unwrap();
        assert!(!session.status().dirty);
        assert_eq!(session.status().save_state, SaveState::Idle);

        tokio::time::sleep(QUIET * 2).await;
        assert_eq!(backend.save_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_is_idempotent() {
        let backend = Arc::new(MemoryBackend::new());
        let session = open(&backend, "<p>a</p>").await;

        session.on_editor_change("<p>b</p>").unwrap();
        session.load("<p>c</p>").await.unwrap();
        session.load("<p>c</p>").await.unwrap();

        let versions = session.versions().await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].content, "<p>c</p>");
        assert!(!session.status().dirty);

        tokio::time::sleep(QUIET * 2).await;
        assert_eq!(backend.save_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preview_missing_version() {
        let backend = Arc::new(MemoryBackend::new());
        let session = open(&backend, "<p>a</p>").await;
        let result = session.preview("0-000000").await;
        assert!(matches!(result, Err(EditorError::VersionNotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_handles_fail_after_close() {
        let backend = Arc::new(MemoryBackend::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let session = SessionBuilder::new("doc-1", backend.clone())
            .notifier(notifier.clone())
            .open("<p>a</p>")
            .await;

        let report = session.close().await.unwrap();
        assert_eq!(report.final_write, FinalWrite::NotNeeded);
        assert!(matches!(session.on_editor_change("<p>b</p>"), Err(EditorError::SessionClosed)));
        assert!(matches!(session.manual_save().await, Err(EditorError::SessionClosed)));
        assert_eq!(session.status().phase, SessionPhase::Closed);
    }
}
