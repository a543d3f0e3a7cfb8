use folio_markup::Fragment;
use std::collections::BTreeMap;

/// Current size of a media frame, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// Media frames of one mounted surface, keyed by element id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaRegistry {
    frames: BTreeMap<String, FrameSize>,
}

impl MediaRegistry {
    /// Collect every media frame carrying an id. Frames without a parsable
    /// inline size are registered as 0x0.
    pub fn scan(fragment: &Fragment) -> Self {
        let mut frames = BTreeMap::new();
        fragment.for_each_element(|element| {
            if !element.is_media_frame() {
                return;
            }
            if let Some(id) = element.id() {
                let size = FrameSize {
                    width: pixels(element.style_property("width")),
                    height: pixels(element.style_property("height")),
                };
                frames.insert(id.to_string(), size);
            }
        });
        Self { frames }
    }

    pub fn get(&self, id: &str) -> Option<FrameSize> {
        self.frames.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.frames.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.frames.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub(crate) fn record(&mut self, id: &str, size: FrameSize) {
        self.frames.insert(id.to_string(), size);
    }

    pub(crate) fn clear(&mut self) {
        self.frames.clear();
    }
}

fn pixels(value: Option<String>) -> u32 {
    value
        .as_deref()
        .map(|v| v.trim().trim_end_matches("px").trim())
        .and_then(|v| v.parse::<f32>().ok())
        .map(|v| v.max(0.0).round() as u32)
        .unwrap_or(0)
}
