use super::image::ImageFile;

/// What the clipboard offered for a paste
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub html: Option<String>,
    pub text: Option<String>,
    pub files: Vec<ImageFile>,
}

impl ClipboardPayload {
    pub fn html(markup: impl Into<String>) -> Self {
        Self {
            html: Some(markup.into()),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn image(file: ImageFile) -> Self {
        Self {
            files: vec![file],
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_file(mut self, file: ImageFile) -> Self {
        self.files.push(file);
        self
    }

    /// First file that is an image. Its presence short-circuits the paste.
    pub fn first_image(&self) -> Option<&ImageFile> {
        self.files.iter().find(|file| file.is_image())
    }

    /// Rich markup, if any was offered and it is not blank
    pub fn rich_markup(&self) -> Option<&str> {
        self.html.as_deref().filter(|html| !html.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.first_image().is_none()
            && self.rich_markup().is_none()
            && self.text.as_deref().map_or(true, str::is_empty)
    }
}
