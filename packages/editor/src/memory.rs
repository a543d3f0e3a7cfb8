//! In-memory backend implementing every collaborator trait.
//!
//! Hosts use it for offline editing and previews; the test suite uses its
//! failure injection, artificial latency and concurrency accounting.

use crate::collaborators::{
    CommentEntry, CommentStore, ContentStore, HistoryArchive, MediaStorage, Notifier, NotifyKind,
    TaskItem, TaskStore, UploadedMedia,
};
use crate::errors::PersistError;
use crate::version_store::VersionEntry;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const MEDIA_BASE_URL: &str = "memory://media";

/// One recorded content write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedContent {
    pub document_id: String,
    pub content: String,
}

#[derive(Debug, Default)]
struct BackendState {
    documents: HashMap<String, String>,
    saves: Vec<SavedContent>,
    comments: Vec<CommentEntry>,
    tasks: Vec<TaskItem>,
    uploads: HashMap<String, Vec<u8>>,
    history: HashMap<String, Vec<VersionEntry>>,
    failures: VecDeque<PersistError>,
    archive_failures: VecDeque<PersistError>,
    latency: Duration,
    next_id: u64,
}

impl BackendState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

/// Shared in-memory store. Wrap it in an `Arc` and hand the same instance
/// to every role.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<BackendState>,
    active_saves: AtomicUsize,
    max_active_saves: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed persisted content for a document
    pub fn with_document(self, document_id: impl Into<String>, content: impl Into<String>) -> Self {
        self.state().documents.insert(document_id.into(), content.into());
        self
    }

    /// Delay every write by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = latency;
    }

    /// Make the next store write (content, comment, task, upload) fail
    /// with `error`. Calls queue up. History archive writes are unaffected.
    pub fn fail_next(&self, error: PersistError) {
        self.state().failures.push_back(error);
    }

    /// Make the next history archive write fail with `error`
    pub fn fail_next_archive(&self, error: PersistError) {
        self.state().archive_failures.push_back(error);
    }

    /// Every successful content write, oldest first
    pub fn saves(&self) -> Vec<SavedContent> {
        self.state().saves.clone()
    }

    pub fn save_count(&self) -> usize {
        self.state().saves.len()
    }

    pub fn document(&self, document_id: &str) -> Option<String> {
        self.state().documents.get(document_id).cloned()
    }

    /// Highest number of content writes observed running at once
    pub fn max_concurrent_saves(&self) -> usize {
        self.max_active_saves.load(Ordering::SeqCst)
    }

    /// Seed a task for a document
    pub fn add_task(&self, document_id: &str, title: &str, author: &str) -> TaskItem {
        let mut state = self.state();
        let item = TaskItem {
            id: state.next_id("task"),
            document_id: document_id.to_string(),
            title: title.to_string(),
            completed: false,
            note: None,
            author: author.to_string(),
            updated_at: Utc::now(),
        };
        state.tasks.push(item.clone());
        item
    }

    /// Bytes stored under an upload path
    pub fn upload(&self, path: &str) -> Option<Vec<u8>> {
        self.state().uploads.get(path).cloned()
    }

    pub fn archived_history(&self, document_id: &str) -> Vec<VersionEntry> {
        self.state().history.get(document_id).cloned().unwrap_or_default()
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait out the configured latency, then consume a queued failure
    async fn write_gate(&self) -> Result<(), PersistError> {
        self.delay().await;
        match self.state().failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn archive_gate(&self) -> Result<(), PersistError> {
        self.delay().await;
        match self.state().archive_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn delay(&self) {
        let latency = self.state().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

/// Keeps the concurrent-save count accurate even if the write is dropped
struct ActiveSave<'a>(&'a AtomicUsize);

impl<'a> ActiveSave<'a> {
    fn enter(active: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now_active = active.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now_active, Ordering::SeqCst);
        Self(active)
    }
}

impl Drop for ActiveSave<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentStore for MemoryBackend {
    async fn save_document_content(&self, document_id: &str, content: &str) -> Result<(), PersistError> {
        let _active = ActiveSave::enter(&self.active_saves, &self.max_active_saves);
        self.write_gate().await?;

        let mut state = self.state();
        state.documents.insert(document_id.to_string(), content.to_string());
        state.saves.push(SavedContent {
            document_id: document_id.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }

    async fn load_document_content(&self, document_id: &str) -> Result<Option<String>, PersistError> {
        Ok(self.document(document_id))
    }
}

#[async_trait]
impl CommentStore for MemoryBackend {
    async fn load_comments(&self, document_id: &str) -> Result<Vec<CommentEntry>, PersistError> {
        Ok(self
            .state()
            .comments
            .iter()
            .filter(|comment| comment.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn add_comment(&self, document_id: &str, author: &str, text: &str) -> Result<CommentEntry, PersistError> {
        self.write_gate().await?;

        let mut state = self.state();
        let entry = CommentEntry {
            id: state.next_id("comment"),
            document_id: document_id.to_string(),
            author: author.to_string(),
            body: text.to_string(),
            created_at: Utc::now(),
        };
        state.comments.push(entry.clone());
        Ok(entry)
    }
}

#[async_trait]
impl TaskStore for MemoryBackend {
    async fn list_tasks(&self, document_id: &str) -> Result<Vec<TaskItem>, PersistError> {
        Ok(self
            .state()
            .tasks
            .iter()
            .filter(|task| task.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn toggle_task(&self, task_id: &str, completed: bool) -> Result<TaskItem, PersistError> {
        self.write_gate().await?;
        self.update_task(task_id, |task| task.completed = completed)
    }

    async fn set_task_note(&self, task_id: &str, note: Option<&str>) -> Result<TaskItem, PersistError> {
        self.write_gate().await?;
        self.update_task(task_id, |task| task.note = note.map(str::to_string))
    }
}

impl MemoryBackend {
    fn update_task(&self, task_id: &str, update: impl FnOnce(&mut TaskItem)) -> Result<TaskItem, PersistError> {
        let mut state = self.state();
        let task = state
            .tasks
            .iter_mut()
            .find(|task| task.id == task_id)
            .ok_or_else(|| PersistError::rejected(format!("unknown task {}", task_id)))?;
        update(task);
        task.updated_at = Utc::now();
        Ok(task.clone())
    }
}

#[async_trait]
impl MediaStorage for MemoryBackend {
    async fn upload_image(&self, bytes: &[u8], path: &str) -> Result<UploadedMedia, PersistError> {
        self.write_gate().await?;
        self.state().uploads.insert(path.to_string(), bytes.to_vec());
        Ok(UploadedMedia {
            public_url: format!("{}/{}", MEDIA_BASE_URL, path),
        })
    }
}

#[async_trait]
impl HistoryArchive for MemoryBackend {
    async fn load_history(&self, document_id: &str) -> Result<Vec<VersionEntry>, PersistError> {
        Ok(self.archived_history(document_id))
    }

    async fn store_history(&self, document_id: &str, entries: &[VersionEntry]) -> Result<(), PersistError> {
        self.archive_gate().await?;
        self.state().history.insert(document_id.to_string(), entries.to_vec());
        Ok(())
    }
}

/// A notification as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotifyKind,
    pub title: String,
    pub description: String,
}

/// Notifier that keeps everything it is given
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    pub fn count(&self, kind: NotifyKind) -> usize {
        self.lock().iter().filter(|n| n.kind == kind).count()
    }

    pub fn last(&self) -> Option<Notification> {
        self.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.notifications.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotifyKind, title: &str, description: &str) {
        self.lock().push(Notification {
            kind,
            title: title.to_string(),
            description: description.to_string(),
        });
    }
}
