//! # Collaborators
//!
//! Everything the engine needs from the outside world. Hosts implement these
//! traits against their backend; [`crate::MemoryBackend`] implements all of
//! them in memory.

use crate::errors::PersistError;
use crate::version_store::VersionEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable storage for document content
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn save_document_content(&self, document_id: &str, content: &str) -> Result<(), PersistError>;

    /// Persisted content, `None` for a document that was never saved
    async fn load_document_content(&self, document_id: &str) -> Result<Option<String>, PersistError>;
}

/// Comment threads keyed by document id
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn load_comments(&self, document_id: &str) -> Result<Vec<CommentEntry>, PersistError>;

    async fn add_comment(&self, document_id: &str, author: &str, text: &str) -> Result<CommentEntry, PersistError>;
}

/// Task checklists keyed by document id
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_tasks(&self, document_id: &str) -> Result<Vec<TaskItem>, PersistError>;

    async fn toggle_task(&self, task_id: &str, completed: bool) -> Result<TaskItem, PersistError>;

    async fn set_task_note(&self, task_id: &str, note: Option<&str>) -> Result<TaskItem, PersistError>;
}

/// Upload target for images too large to embed
#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn upload_image(&self, bytes: &[u8], path: &str) -> Result<UploadedMedia, PersistError>;
}

/// Optional durable home for version history
#[async_trait]
pub trait HistoryArchive: Send + Sync {
    /// Archived entries, newest first
    async fn load_history(&self, document_id: &str) -> Result<Vec<VersionEntry>, PersistError>;

    async fn store_history(&self, document_id: &str, entries: &[VersionEntry]) -> Result<(), PersistError>;
}

/// User-facing notifications (toasts). Fire and forget.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotifyKind, title: &str, description: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotifyKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedMedia {
    pub public_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentEntry {
    pub id: String,
    pub document_id: String,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub id: String,
    pub document_id: String,
    pub title: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub author: String,
    pub updated_at: DateTime<Utc>,
}

/// Notifier that only logs. Used when the host wires none.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NotifyKind, title: &str, description: &str) {
        match kind {
            NotifyKind::Success => tracing::info!(title, description, "notification"),
            NotifyKind::Error => tracing::warn!(title, description, "notification"),
        }
    }
}
