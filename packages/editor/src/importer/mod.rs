//! # Content Importer
//!
//! Turns outside content (clipboard payloads, image files, table requests)
//! into fragments that are safe to insert into a document.
//!
//! ```text
//! ClipboardPayload ──▶ image?  ──▶ inline media frame
//!                  └─▶ markup? ──▶ Sanitizer ──▶ Fragment
//!                  └─▶ text    ──▶ paragraphs
//! ```
//!
//! Every fragment produced here serializes to markup that parses back to
//! the same tree.

mod image;
mod paste;
mod sanitize;
mod table;

pub use image::{frame_style, media_frame, ImageFile};
pub use paste::ClipboardPayload;
pub use sanitize::Sanitizer;
pub use table::{TableSpec, MAX_TABLE_SIZE};

use crate::collaborators::MediaStorage;
use crate::config::EditorConfig;
use crate::errors::{EditorError, ValidationError};
use folio_markup::{Element, Fragment, IDGenerator, Node};
use std::collections::HashSet;

/// Prefix of generated media element ids
pub const MEDIA_ID_PREFIX: &str = "media";

pub struct ContentImporter {
    document_id: String,
    config: EditorConfig,
    ids: IDGenerator,
    sanitizer: Sanitizer,
}

impl ContentImporter {
    pub fn new(document_id: impl Into<String>, config: &EditorConfig) -> Self {
        let document_id = document_id.into();
        Self {
            ids: IDGenerator::new(MEDIA_ID_PREFIX, &document_id),
            document_id,
            config: config.clone(),
            sanitizer: Sanitizer::new(),
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Clean pasted rich markup
    pub fn sanitize_markup(&self, markup: &str) -> Fragment {
        self.sanitizer.sanitize_markup(markup)
    }

    /// One paragraph per line. Blank lines become empty editable paragraphs.
    pub fn plain_text(&self, text: &str) -> Fragment {
        let mut fragment = Fragment::new();
        for line in text.lines() {
            let paragraph = if line.trim().is_empty() {
                Element::new("p").with_child(Element::new("br"))
            } else {
                Element::new("p").with_text(line)
            };
            fragment.push(paragraph);
        }
        fragment
    }

    /// Embed an image as a `data:` URL inside a media frame.
    ///
    /// `existing` is the content the frame goes into; its ids are never
    /// reused.
    pub fn embed_inline(&mut self, file: &ImageFile, existing: &Fragment) -> Result<Fragment, ValidationError> {
        file.validate(self.config.inline_image_max_bytes)?;

        let id = self.ids.next_unused(|candidate| existing.contains_id(candidate));
        let frame = media_frame(&id, &file.data_url(), &file.name, self.config.media_frame);
        tracing::debug!(document_id = %self.document_id, media_id = %id, size = file.size(), "embedding image");
        Ok(Fragment::from_nodes(vec![frame.into()]))
    }

    /// Upload an image and reference it by its public URL.
    ///
    /// Validation happens before any bytes leave the process.
    #[tracing::instrument(skip(self, file, storage), fields(document_id = %self.document_id, name = %file.name))]
    pub async fn upload_image(&self, file: &ImageFile, storage: &dyn MediaStorage) -> Result<Fragment, EditorError> {
        file.validate(self.config.upload_image_max_bytes)?;

        let path = file.upload_path(&self.document_id);
        let uploaded = storage.upload_image(&file.bytes, &path).await?;
        tracing::info!(url = %uploaded.public_url, "image uploaded");

        let image = Element::new("img")
            .with_attr("src", uploaded.public_url)
            .with_attr("alt", file.name.as_str());
        Ok(Fragment::from_nodes(vec![Node::Element(image)]))
    }

    /// Table grid for `spec`, bounded by the configured maximum
    pub fn table(&self, spec: TableSpec) -> Result<Fragment, ValidationError> {
        spec.validate(self.config.max_table_size)?;
        Ok(Fragment::from_nodes(vec![spec.to_element().into()]))
    }

    /// Convert a clipboard payload. An image wins over any text the
    /// clipboard also carries.
    pub fn paste(&mut self, payload: &ClipboardPayload, existing: &Fragment) -> Result<Fragment, ValidationError> {
        if let Some(file) = payload.first_image() {
            return self.embed_inline(file, existing);
        }
        if let Some(markup) = payload.rich_markup() {
            let mut fragment = self.sanitize_markup(markup);
            self.reassign_media_ids(&mut fragment, existing);
            return Ok(fragment);
        }
        Ok(payload
            .text
            .as_deref()
            .map(|text| self.plain_text(text))
            .unwrap_or_default())
    }

    /// Give pasted media frames ids unused in `existing` and in the pasted
    /// fragment itself
    fn reassign_media_ids(&mut self, fragment: &mut Fragment, existing: &Fragment) {
        let mut taken: HashSet<String> = existing.element_ids().into_iter().collect();
        fragment.for_each_element(|el| {
            if let (false, Some(id)) = (el.is_media_frame(), el.id()) {
                taken.insert(id.to_string());
            }
        });

        let ids = &mut self.ids;
        let document_id = &self.document_id;
        fragment.for_each_element_mut(|el| {
            if !el.is_media_frame() {
                return;
            }
            let current = el.id().map(str::to_string);
            match current {
                Some(id) if !taken.contains(&id) => {
                    taken.insert(id);
                }
                previous => {
                    let id = ids.next_unused(|candidate| taken.contains(candidate));
                    tracing::debug!(%document_id, ?previous, media_id = %id, "pasted media frame re-identified");
                    el.set_attr("id", id.as_str());
                    taken.insert(id);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBackend;
    use folio_markup::get_document_seed;

    fn importer() -> ContentImporter {
        ContentImporter::new("doc-42", &EditorConfig::default())
    }

    fn png(size: usize) -> ImageFile {
        ImageFile::new("shot.png", "image/png", vec![7; size])
    }

    #[test]
    fn test_plain_text_paragraphs() {
        let fragment = importer().plain_text("first\n\nthird <b>");
        assert_eq!(fragment.to_markup(), "<p>first</p><p><br></p><p>third &lt;b&gt;</p>");
    }

    #[test]
    fn test_embed_skips_taken_ids() {
        let mut importer = importer();
        let seed = get_document_seed("doc-42");
        let existing = Fragment::parse(&format!(r#"<div class="media-frame" id="media-{}-1"></div>"#, seed));

        let fragment = importer.embed_inline(&png(16), &existing).unwrap();
        let ids = fragment.element_ids();
        assert_eq!(ids, vec![format!("media-{}-2", seed)]);
    }

    #[test]
    fn test_inline_limit_is_ten_mib() {
        let mut importer = importer();
        let err = importer
            .embed_inline(&png(12 * 1024 * 1024), &Fragment::new())
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { .. }));
    }

    #[test]
    fn test_paste_image_short_circuits_text() {
        let mut importer = importer();
        let payload = ClipboardPayload::image(png(8)).with_text("ignored");

        let fragment = importer.paste(&payload, &Fragment::new()).unwrap();
        assert!(!fragment.to_markup().contains("ignored"));
        assert!(fragment.to_markup().contains("data:image/png;base64,"));
    }

    #[test]
    fn test_paste_prefers_markup_over_text() {
        let mut importer = importer();
        let payload = ClipboardPayload::html("<p onclick=\"x()\">rich</p>").with_text("rich");
        let fragment = importer.paste(&payload, &Fragment::new()).unwrap();
        assert_eq!(fragment.to_markup(), "<p>rich</p>");
    }

    #[test]
    fn test_pasted_frames_get_unused_ids() {
        let mut importer = importer();
        let seed = get_document_seed("doc-42");
        let taken = format!("media-{}-1", seed);
        let frame = format!(
            r#"<div class="media-frame" id="{}" style="width: 400px; height: 300px;"><img src="a.png"></div>"#,
            taken
        );
        let existing = Fragment::parse(&format!("<p>a</p>{}", frame));

        let payload = ClipboardPayload::html(format!("{}{}", frame, frame));
        let fragment = importer.paste(&payload, &existing).unwrap();
        let ids = fragment.element_ids();

        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert!(!ids.contains(&taken));
    }

    #[test]
    fn test_pasted_frame_with_free_id_keeps_it() {
        let mut importer = importer();
        let payload = ClipboardPayload::html(r#"<div class="media-frame" id="media-x-9"><img src="a.png"></div>"#);
        let fragment = importer.paste(&payload, &Fragment::new()).unwrap();
        assert_eq!(fragment.element_ids(), vec!["media-x-9".to_string()]);
    }

    #[test]
    fn test_table_uses_configured_limit() {
        let config = EditorConfig {
            max_table_size: 4,
            ..EditorConfig::default()
        };
        let importer = ContentImporter::new("doc-42", &config);
        assert!(importer.table(TableSpec::new(4, 4, true)).is_ok());
        assert!(importer.table(TableSpec::new(5, 2, false)).is_err());
    }

    #[tokio::test]
    async fn test_upload_limit_checked_before_upload() {
        let backend = MemoryBackend::new();
        let result = importer().upload_image(&png(6 * 1024 * 1024), &backend).await;
        assert!(matches!(
            result,
            Err(EditorError::Validation(ValidationError::TooLarge { .. }))
        ));
    }

    #[tokio::test]
    async fn test_upload_references_public_url() {
        let backend = MemoryBackend::new();
        let fragment = importer().upload_image(&png(64), &backend).await.unwrap();
        let markup = fragment.to_markup();

        assert!(markup.starts_with(r#"<img src="memory://media/documents/doc-42/"#));
        assert_eq!(Fragment::parse(&markup).to_markup(), markup);
    }
}
