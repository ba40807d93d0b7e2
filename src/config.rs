// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Stored as JSON under `$XDG_CONFIG_HOME/snapcam/config.json`. Missing
//! fields fall back to their defaults so older files keep loading.

use crate::constants::{APP_ID, DEFAULT_SAVE_FOLDER};
use crate::errors::{AppError, AppResult};
use crate::pipelines::photo::TextStamp;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What happens when the user flips to a facing that has no camera
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum NoDevicePolicy {
    /// Switch facing anyway and show a blocking "no device" screen
    #[default]
    Block,
    /// Keep the current facing and report the missing device as an error
    Revert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder under the Pictures directory that receives saved photos
    /// (an absolute path is used as is)
    pub save_folder: String,
    /// Flip behaviour when the requested facing has no device
    pub no_device_policy: NoDevicePolicy,
    /// Ask for an explicit storage-write permission before saving
    pub require_storage_permission: bool,
    /// Watermark stamped before saving (None disables the step)
    pub watermark: Option<TextStamp>,
    /// Device path forced for the back facing (e.g. "/dev/video0")
    pub back_device: Option<String>,
    /// Device path forced for the front facing
    pub front_device: Option<String>,
    /// Mirror the live preview horizontally when the front lens is active
    pub mirror_preview: bool,
    /// JPEG quality used for freshly captured photos (1-100)
    pub jpeg_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            save_folder: DEFAULT_SAVE_FOLDER.to_string(),
            no_device_policy: NoDevicePolicy::default(),
            require_storage_permission: false,
            watermark: Some(TextStamp::default()),
            back_device: None,
            front_device: None,
            mirror_preview: true,
            jpeg_quality: 92,
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_ID).join("config.json"))
    }

    /// Load the config from its default location
    ///
    /// Never fails: a missing file yields defaults, a broken one is logged
    /// and replaced by defaults.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            warn!("No config directory available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// Load the config from a specific file
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Write the config to a specific file, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents =
            serde_json::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Directory that receives saved photos
    pub fn photo_directory(&self) -> PathBuf {
        dirs::picture_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join(&self.save_folder)
    }
}

/// Directory for transient captures and the terminal-mode log file
pub fn cache_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_ID)
}
