use crate::errors::EditorError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "folio.config.json";

const MIB: u64 = 1024 * 1024;

/// Editor configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Quiet period after the last edit before an autosave fires
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,

    /// Number of snapshots kept in the version history
    #[serde(default = "default_version_capacity")]
    pub version_capacity: usize,

    /// Size ceiling for images embedded directly in the content
    #[serde(default = "default_inline_image_max_bytes")]
    pub inline_image_max_bytes: u64,

    /// Size ceiling for images uploaded to storage
    #[serde(default = "default_upload_image_max_bytes")]
    pub upload_image_max_bytes: u64,

    /// Initial size of the frame around an embedded image
    #[serde(default)]
    pub media_frame: MediaFrameSize,

    /// Largest row or column count accepted for table insertion
    #[serde(default = "default_max_table_size")]
    pub max_table_size: usize,

    /// Show a success notification for background saves too
    #[serde(default)]
    pub notify_on_autosave: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFrameSize {
    pub width: u32,
    pub height: u32,
}

impl Default for MediaFrameSize {
    fn default() -> Self {
        Self {
            width: 400,
            height: 300,
        }
    }
}

fn default_quiet_period_ms() -> u64 {
    3000
}

fn default_version_capacity() -> usize {
    10
}

fn default_inline_image_max_bytes() -> u64 {
    10 * MIB
}

fn default_upload_image_max_bytes() -> u64 {
    5 * MIB
}

fn default_max_table_size() -> usize {
    20
}

impl EditorConfig {
    /// Load config from a directory
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, EditorError> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json(&content)
        } else {
            // Return default config if none exists
            Ok(EditorConfig::default())
        }
    }

    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period_ms = quiet_period.as_millis() as u64;
        self
    }

    pub fn with_version_capacity(mut self, capacity: usize) -> Self {
        self.version_capacity = capacity;
        self
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: default_quiet_period_ms(),
            version_capacity: default_version_capacity(),
            inline_image_max_bytes: default_inline_image_max_bytes(),
            upload_image_max_bytes: default_upload_image_max_bytes(),
            media_frame: MediaFrameSize::default(),
            max_table_size: default_max_table_size(),
            notify_on_autosave: false,
        }
    }
}
