//! # Version History
//!
//! Bounded log of persisted snapshots, newest first.
//!
//! ## Design
//!
//! - Each successful persist pushes a full copy of the content (not a diff)
//! - The live unsaved buffer is never stored
//! - Pushing past capacity evicts the oldest entry
//! - Restore hands back a snapshot; recording the restore is left to the
//!   next save, which carries a restore note
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut store = VersionStore::with_capacity(10);
//! let entry = store.push("<p>draft</p>", VersionOrigin::Manual);
//!
//! for version in store.iter() {
//!     println!("{} {}", version.created_at, version.change_note);
//! }
//!
//! let content = store.restore(&entry.id)?;
//! ```

use crate::errors::EditorError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of snapshots kept
pub const DEFAULT_VERSION_CAPACITY: usize = 10;

/// What produced a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum VersionOrigin {
    /// Content the document was loaded with
    Initial,
    Autosave,
    Manual,
    /// First save after restoring the snapshot created at `from`
    Restore { from: DateTime<Utc> },
    /// Final save while closing the session
    Close,
}

impl VersionOrigin {
    /// Human-readable label shown in the history list
    pub fn change_note(&self) -> String {
        match self {
            VersionOrigin::Initial => "Initial version".to_string(),
            VersionOrigin::Autosave => "Auto-saved".to_string(),
            VersionOrigin::Manual => "Manual save".to_string(),
            VersionOrigin::Restore { from } => {
                format!("Restored version from {}", from.format("%Y-%m-%d %H:%M:%S"))
            }
            VersionOrigin::Close => "Saved on close".to_string(),
        }
    }
}

/// Immutable snapshot of document content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub change_note: String,
    pub origin: VersionOrigin,
}

impl VersionEntry {
    pub fn new(content: impl Into<String>, origin: VersionOrigin) -> Self {
        let created_at = Utc::now();
        Self {
            id: generate_version_id(created_at),
            content: content.into(),
            created_at,
            change_note: origin.change_note(),
            origin,
        }
    }
}

/// Millisecond timestamp plus a random suffix
pub fn generate_version_id(created_at: DateTime<Utc>) -> String {
    let suffix = rand::random::<u32>() & 0x00ff_ffff;
    format!("{}-{:06x}", created_at.timestamp_millis(), suffix)
}

/// Version history for one editing session
#[derive(Debug)]
pub struct VersionStore {
    /// Newest first
    entries: VecDeque<VersionEntry>,

    /// Maximum number of entries (0 = unlimited)
    capacity: usize,
}

impl VersionStore {
    /// Create a store with the default capacity (10)
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_VERSION_CAPACITY)
    }

    /// Create a store with a custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    /// Record a snapshot and return it
    pub fn push(&mut self, content: impl Into<String>, origin: VersionOrigin) -> VersionEntry {
        let entry = VersionEntry::new(content, origin);
        self.entries.push_front(entry.clone());
        self.trim();
        entry
    }

    /// Seed the history of a freshly loaded document.
    ///
    /// Only an empty store is seeded, and only with non-empty content, so
    /// calling this again after a reload never duplicates the entry.
    pub fn seed_initial(&mut self, content: &str) -> Option<VersionEntry> {
        if !self.entries.is_empty() || content.trim().is_empty() {
            return None;
        }
        Some(self.push(content, VersionOrigin::Initial))
    }

    /// Snapshots, newest first
    pub fn list(&self) -> Vec<VersionEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VersionEntry> {
        self.entries.iter()
    }

    /// Look up a snapshot for preview
    pub fn get(&self, id: &str) -> Option<&VersionEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Content of the snapshot with the given id
    pub fn restore(&self, id: &str) -> Result<String, EditorError> {
        self.get(id)
            .map(|entry| entry.content.clone())
            .ok_or_else(|| EditorError::VersionNotFound(id.to_string()))
    }

    pub fn latest(&self) -> Option<&VersionEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replace the history, e.g. with entries loaded from an archive.
    /// Entries are expected newest first.
    pub fn replace_all(&mut self, entries: Vec<VersionEntry>) {
        self.entries = entries.into();
        self.trim();
    }

    fn trim(&mut self) {
        if self.capacity > 0 {
            self.entries.truncate(self.capacity);
        }
    }
}

impl Default for VersionStore {
    fn default() -> Self {
        Self::new()
    }
}
