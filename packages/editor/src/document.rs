//! # Document Handle
//!
//! The mutable unit being edited: current content plus the bookkeeping
//! needed to know whether it still has to be written.
//!
//! ## Lifecycle
//!
//! ```text
//! load ──▶ clean ──edit──▶ dirty ──persist ok──▶ clean
//!                            ▲          │
//!                            └─ failed ─┘
//! ```

use chrono::{DateTime, Utc};
use folio_markup::Fragment;

/// Editable document
#[derive(Debug, Clone)]
pub struct Document {
    id: String,

    /// Serialized rich content, exactly as the editable surface reports it
    content: String,

    /// Content of the last successful persist (or of the load)
    persisted: String,

    dirty: bool,

    last_saved_at: Option<DateTime<Utc>>,

    /// Increments on each content-changing edit
    revision: u64,
}

impl Document {
    /// Create a document from its persisted content
    pub fn load(id: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: id.into(),
            persisted: content.clone(),
            content,
            dirty: false,
            last_saved_at: None,
            revision: 0,
        }
    }

    /// Replace all state with freshly loaded content
    pub fn reload(&mut self, content: impl Into<String>) {
        let content = content.into();
        self.persisted = content.clone();
        self.content = content;
        self.dirty = false;
        self.last_saved_at = None;
        self.revision = 0;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Parse the current content into a tree
    pub fn fragment(&self) -> Fragment {
        Fragment::parse(&self.content)
    }

    /// Check if document has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply new content from the editor.
    ///
    /// Returns false, leaving the document untouched, when the content is
    /// what the document already holds. Surfaces report on focus and blur
    /// too, and those reports must not count as edits.
    pub fn apply_edit(&mut self, new_content: &str) -> bool {
        if new_content == self.content {
            return false;
        }
        self.content = new_content.to_string();
        self.dirty = self.content != self.persisted;
        self.revision += 1;
        true
    }

    /// Record that `snapshot` was written at `saved_at`.
    ///
    /// The document stays dirty when it moved on while the write was in
    /// flight. Returns the resulting dirty flag.
    pub fn mark_persisted(&mut self, snapshot: &str, saved_at: DateTime<Utc>) -> bool {
        self.persisted = snapshot.to_string();
        self.last_saved_at = Some(saved_at);
        self.dirty = self.content != self.persisted;
        self.dirty
    }

    /// Content as of the last successful persist or load
    pub fn persisted_content(&self) -> &str {
        &self.persisted
    }
}
