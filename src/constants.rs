// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Application identifier used for config and cache directories
pub const APP_ID: &str = "snapcam";

/// Default folder (under the Pictures directory) for saved photos
pub const DEFAULT_SAVE_FOLDER: &str = "Camera";

/// Default watermark stamped onto photos before saving
pub mod watermark {
    /// Stamped text
    pub const TEXT: &str = "text marker";
    /// Left edge of the text in pixels
    pub const X: u32 = 150;
    /// Top edge of the text in pixels
    pub const Y: u32 = 150;
    /// Text colour as `#RRGGBB`
    pub const COLOR: &str = "#FF0000";
    /// Font name, resolved against the system font directories
    pub const FONT_NAME: &str = "DejaVuSans-BoldOblique";
    /// Font size in pixels, before `SCALE` is applied
    pub const FONT_SIZE: f32 = 44.0;
    /// Multiplier applied to the font size
    pub const SCALE: f32 = 1.0;
    /// JPEG quality of the stamped output (1-100)
    pub const QUALITY: u8 = 100;
}

/// Camera timing
pub mod timing {
    use super::Duration;

    /// Frames delivered before this are discarded while the sensor settles
    pub const CAPTURE_WARMUP: Duration = Duration::from_millis(500);
    /// Maximum time to wait for a frame when capturing
    pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);
    /// Poll interval while waiting for the preview's first frame
    pub const FRAME_POLL: Duration = Duration::from_millis(20);
    /// Upper bound on how long a permission prompt may stay unanswered
    pub const PERMISSION_PROMPT_TIMEOUT: Duration = Duration::from_secs(120);
    /// Terminal input poll interval (roughly one frame at 60 Hz)
    pub const TERMINAL_POLL: Duration = Duration::from_millis(16);
}

/// Number of preview frames buffered between the capture thread and the UI
pub const PREVIEW_CHANNEL_CAPACITY: usize = 4;

/// Number of mmap buffers requested from V4L2 drivers
pub const V4L2_BUFFER_COUNT: u32 = 4;

/// Supported still-image file formats
pub mod file_formats {
    /// Image extensions accepted by the file-backed camera and the library
    pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp"];

    /// Check whether an extension (without dot, any case) is a supported image
    pub fn is_image_extension(ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        IMAGE_EXTENSIONS.contains(&ext.as_str())
    }
}
