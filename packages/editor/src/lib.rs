//! # Folio Editor
//!
//! Editing core for rich-text documents: one author mutates a document in
//! place, changes are written without loss or redundant writes, and a
//! bounded history of saved states can be previewed and restored.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ surface: editable region + change path      │
//! │  - formatting commands, paste, media resize │
//! │  - importer: sanitize, tables, images       │
//! └─────────────────────────────────────────────┘
//!                     ↓ on_change(content)
//! ┌─────────────────────────────────────────────┐
//! │ session: one task per open document         │
//! │  - Document (content, dirty, revision)      │
//! │  - AutosaveScheduler (debounce)             │
//! │  - VersionStore (newest-first snapshots)    │
//! └─────────────────────────────────────────────┘
//!                     ↓ save / load
//! ┌─────────────────────────────────────────────┐
//! │ collaborators: content, comments, tasks,    │
//! │ media storage, notifier, history archive    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Persisted state is the baseline**: dirty means "differs from the last
//!    successful write", nothing else
//! 2. **One writer**: a document never has two writes running
//! 3. **Only saved states are history**: the live buffer is never a version
//! 4. **Content is a tree**: imports and formatting are tree transforms, not
//!    string surgery
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_editor::{MemoryBackend, MemorySurface, SessionBuilder, SurfaceAdapter};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(MemoryBackend::new());
//! let session = SessionBuilder::new("essay-7", backend.clone())
//!     .open("<p>Hello</p>")
//!     .await;
//!
//! let mut adapter = SurfaceAdapter::mount(MemorySurface::from_markup("<p>Hello</p>"));
//! session.attach(&mut adapter);
//!
//! adapter.apply_command("bold", None);   // autosaved after the quiet period
//! let report = session.manual_save().await?;
//!
//! let versions = session.versions().await?;
//! let content = session.restore(&versions[1].id).await?;
//! adapter.set_content(&content);
//!
//! session.close().await?;
//! ```

mod autosave;
mod collaborators;
mod comments;
mod config;
mod document;
mod errors;
pub mod importer;
mod memory;
mod session;
pub mod surface;
mod tasks;
mod version_store;

pub use autosave::{AutosaveScheduler, SaveOutcome, SaveState, SaveTask, SaveTrigger};
pub use collaborators::{
    CommentEntry, CommentStore, ContentStore, HistoryArchive, MediaStorage, Notifier, NotifyKind,
    TaskItem, TaskStore, TracingNotifier, UploadedMedia,
};
pub use comments::CommentThread;
pub use config::{EditorConfig, MediaFrameSize, DEFAULT_CONFIG_NAME};
pub use document::Document;
pub use errors::{EditorError, PersistError, ValidationError};
pub use importer::{ClipboardPayload, ContentImporter, ImageFile, TableSpec};
pub use memory::{MemoryBackend, Notification, RecordingNotifier, SavedContent};
pub use session::{
    CloseReport, FinalWrite, SaveReport, SavedCallback, SessionBuilder, SessionHandle, SessionPhase,
    SessionStatus,
};
pub use surface::{EditableSurface, FormatCommand, MemorySurface, SurfaceAdapter};
pub use tasks::TaskChecklist;
pub use version_store::{VersionEntry, VersionOrigin, VersionStore, DEFAULT_VERSION_CAPACITY};

// Re-export common types for convenience
pub use folio_markup::{Fragment, Node};
