//! # Editable Surface
//!
//! The editable region itself (a DOM node, a native text view) stays behind
//! [`EditableSurface`]. [`SurfaceAdapter`] wraps one and gives the rest of
//! the engine a single change path:
//!
//! ```text
//! typing ─────────┐
//! commands ───────┤
//! paste/insert ───┼──▶ on_change(content) ──▶ session
//! media resize ───┘
//!
//! set_content (load, restore) ──▶ surface only, no change event
//! ```

mod command;
mod media;
mod memory;

pub use command::{Alignment, BlockFormat, FormatCommand};
pub use media::{FrameSize, MediaRegistry};
pub use memory::MemorySurface;

use crate::errors::ValidationError;
use crate::config::EditorConfig;
use crate::importer::{frame_style, ClipboardPayload, ContentImporter, MAX_TABLE_SIZE};
use folio_markup::Fragment;

/// Capability of an editable region
pub trait EditableSurface: Send {
    /// Serialized content as currently shown
    fn content(&self) -> String;

    /// Replace everything
    fn replace_content(&mut self, content: &str);

    /// Run a formatting command. Returns true when the content changed.
    fn execute(&mut self, command: &FormatCommand) -> bool;

    /// Insert at the caret
    fn insert_fragment(&mut self, fragment: Fragment);
}

pub type ChangeCallback = Box<dyn FnMut(&str) + Send>;

pub struct SurfaceAdapter<S: EditableSurface> {
    surface: S,
    on_change: Option<ChangeCallback>,
    media: MediaRegistry,
    max_table_size: usize,
}

impl<S: EditableSurface> SurfaceAdapter<S> {
    pub fn mount(surface: S) -> Self {
        let media = MediaRegistry::scan(&Fragment::parse(&surface.content()));
        Self {
            surface,
            on_change: None,
            media,
            max_table_size: MAX_TABLE_SIZE,
        }
    }

    /// Apply editor limits to commands run through this adapter
    pub fn with_config(mut self, config: &EditorConfig) -> Self {
        self.max_table_size = config.max_table_size;
        self
    }

    pub fn get_content(&self) -> String {
        self.surface.content()
    }

    pub fn fragment(&self) -> Fragment {
        Fragment::parse(&self.surface.content())
    }

    /// Replace the content without firing a change (load and restore)
    pub fn set_content(&mut self, content: &str) {
        self.surface.replace_content(content);
        self.rescan_media();
    }

    /// Register the change callback, replacing any previous one
    pub fn on_change(&mut self, callback: impl FnMut(&str) + Send + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    /// Run a command by name. Unknown names and malformed values do
    /// nothing. Returns true when the content changed.
    pub fn apply_command(&mut self, name: &str, value: Option<&str>) -> bool {
        match FormatCommand::parse_with_table_limit(name, value, self.max_table_size) {
            Some(command) => self.apply(&command),
            None => {
                tracing::debug!(name, ?value, "ignoring unknown formatting command");
                false
            }
        }
    }

    pub fn apply(&mut self, command: &FormatCommand) -> bool {
        if let FormatCommand::InsertTable(spec) = command {
            if let Err(e) = spec.validate(self.max_table_size) {
                tracing::debug!(error = %e, "table rejected");
                return false;
            }
        }
        if !self.surface.execute(command) {
            return false;
        }
        self.rescan_media();
        self.fire_change();
        true
    }

    /// The user typed into the surface
    pub fn notify_input(&mut self) {
        self.fire_change();
    }

    /// Insert importer output at the caret
    pub fn insert_fragment(&mut self, fragment: Fragment) {
        if fragment.is_empty() {
            return;
        }
        self.surface.insert_fragment(fragment);
        self.rescan_media();
        self.fire_change();
    }

    /// Paste a clipboard payload. Returns false when there was nothing to
    /// insert; on a validation error nothing is inserted.
    pub fn paste(&mut self, payload: &ClipboardPayload, importer: &mut ContentImporter) -> Result<bool, ValidationError> {
        let fragment = importer.paste(payload, &self.fragment())?;
        if fragment.is_empty() {
            return Ok(false);
        }
        self.insert_fragment(fragment);
        Ok(true)
    }

    /// Resize a media frame. Returns false for an unknown id or a zero
    /// dimension.
    pub fn resize_media(&mut self, id: &str, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }

        let mut fragment = self.fragment();
        let Some(frame) = fragment.find_by_id_mut(id).filter(|el| el.is_media_frame()) else {
            return false;
        };
        frame.set_style_property("width", &format!("{}px", width));
        frame.set_style_property("height", &format!("{}px", height));

        self.surface.replace_content(&fragment.to_markup());
        self.media.record(id, FrameSize { width, height });
        tracing::debug!(media_id = id, style = %frame_style(width, height), "media frame resized");
        self.fire_change();
        true
    }

    pub fn media(&self) -> &MediaRegistry {
        &self.media
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Detach: the callback and the media registry go with the adapter
    pub fn unmount(mut self) -> S {
        self.on_change = None;
        self.media.clear();
        self.surface
    }

    fn rescan_media(&mut self) {
        self.media = MediaRegistry::scan(&self.fragment());
    }

    fn fire_change(&mut self) {
        let content = self.surface.content();
        if let Some(callback) = self.on_change.as_mut() {
            callback(&content);
        }
    }
}
