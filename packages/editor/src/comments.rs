//! Comment thread attached to a document.
//!
//! Append-only. The local view only ever holds what the store returned, so
//! a comment is visible once it has been persisted and read back.

use crate::collaborators::{CommentEntry, CommentStore};
use crate::errors::{EditorError, ValidationError};
use std::sync::Arc;
use tracing::instrument;

pub struct CommentThread {
    document_id: String,
    store: Arc<dyn CommentStore>,
    comments: Vec<CommentEntry>,
}

impl CommentThread {
    pub fn new(document_id: impl Into<String>, store: Arc<dyn CommentStore>) -> Self {
        Self {
            document_id: document_id.into(),
            store,
            comments: Vec::new(),
        }
    }

    /// Comments as of the last refresh, oldest first
    pub fn comments(&self) -> &[CommentEntry] {
        &self.comments
    }

    #[instrument(skip(self), fields(document_id = %self.document_id))]
    pub async fn refresh(&mut self) -> Result<&[CommentEntry], EditorError> {
        let mut comments = self.store.load_comments(&self.document_id).await?;
        comments.sort_by_key(|comment| comment.created_at);
        self.comments = comments;
        Ok(&self.comments)
    }

    /// Persist a comment, then reload the thread
    #[instrument(skip(self, text), fields(document_id = %self.document_id))]
    pub async fn post(&mut self, author: &str, text: &str) -> Result<CommentEntry, EditorError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyField("Comment").into());
        }

        let entry = self.store.add_comment(&self.document_id, author, text).await?;
        tracing::info!(comment_id = %entry.id, "comment posted");
        self.refresh().await?;
        Ok(entry)
    }
}
