use crate::config::MediaFrameSize;
use crate::errors::ValidationError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use folio_markup::{Element, MEDIA_FRAME_CLASS};

const IMAGE_STYLE: &str = "width: 100%; height: 100%; object-fit: contain;";

/// Image picked from disk or found on the clipboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_image(&self) -> bool {
        self.mime.trim().to_ascii_lowercase().starts_with("image/")
    }

    /// Check type and size against `limit` bytes
    pub fn validate(&self, limit: u64) -> Result<(), ValidationError> {
        if !self.is_image() {
            return Err(ValidationError::NotAnImage {
                mime: self.mime.clone(),
            });
        }
        if self.size() > limit {
            return Err(ValidationError::TooLarge {
                size: self.size(),
                limit,
            });
        }
        Ok(())
    }

    /// `data:` URL carrying the bytes
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime.trim(), STANDARD.encode(&self.bytes))
    }

    /// Storage path for an upload: `documents/<id>/<millis>-<name>`
    pub fn upload_path(&self, document_id: &str) -> String {
        format!(
            "documents/{}/{}-{}",
            document_id,
            Utc::now().timestamp_millis(),
            safe_file_name(&self.name)
        )
    }
}

/// Resizable container holding an embedded image
pub fn media_frame(id: &str, src: &str, alt: &str, size: MediaFrameSize) -> Element {
    let image = Element::new("img")
        .with_attr("src", src)
        .with_attr("alt", alt)
        .with_attr("style", IMAGE_STYLE);

    Element::new("div")
        .with_attr("class", MEDIA_FRAME_CLASS)
        .with_attr("id", id)
        .with_attr("contenteditable", "false")
        .with_attr("style", frame_style(size.width, size.height))
        .with_child(image)
}

/// Inline size of a media frame
pub fn frame_style(width: u32, height: u32) -> String {
    format!("width: {}px; height: {}px;", width, height)
}

fn safe_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    if cleaned.trim_matches('_').is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}
