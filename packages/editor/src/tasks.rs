//! Task checklist attached to a document.
//!
//! Items are created elsewhere; here they are only toggled and annotated.
//! Every change is persisted first and then read back.

use crate::collaborators::{TaskItem, TaskStore};
use crate::errors::EditorError;
use std::sync::Arc;
use tracing::instrument;

pub struct TaskChecklist {
    document_id: String,
    store: Arc<dyn TaskStore>,
    tasks: Vec<TaskItem>,
}

impl TaskChecklist {
    pub fn new(document_id: impl Into<String>, store: Arc<dyn TaskStore>) -> Self {
        Self {
            document_id: document_id.into(),
            store,
            tasks: Vec::new(),
        }
    }

    pub fn tasks(&self) -> &[TaskItem] {
        &self.tasks
    }

    /// (completed, total)
    pub fn progress(&self) -> (usize, usize) {
        let done = self.tasks.iter().filter(|task| task.completed).count();
        (done, self.tasks.len())
    }

    #[instrument(skip(self), fields(document_id = %self.document_id))]
    pub async fn refresh(&mut self) -> Result<&[TaskItem], EditorError> {
        self.tasks = self.store.list_tasks(&self.document_id).await?;
        Ok(&self.tasks)
    }

    #[instrument(skip(self), fields(document_id = %self.document_id))]
    pub async fn toggle(&mut self, task_id: &str, completed: bool) -> Result<TaskItem, EditorError> {
        let item = self.store.toggle_task(task_id, completed).await?;
        self.refresh().await?;
        Ok(item)
    }

    /// Attach or clear (with `None` or blank text) a note
    #[instrument(skip(self, note), fields(document_id = %self.document_id))]
    pub async fn set_note(&mut self, task_id: &str, note: Option<&str>) -> Result<TaskItem, EditorError> {
        let note = note.map(str::trim).filter(|note| !note.is_empty());
        let item = self.store.set_task_note(task_id, note).await?;
        self.refresh().await?;
        Ok(item)
    }
}
