// SPDX-License-Identifier: MPL-2.0

//! Async photo pipeline
//!
//! ```text
//! Camera Backend → Capture file → (Watermark) → Photo library
//!       ↓
//! Preview continues uninterrupted
//! ```
//!
//! # Pipeline Stages
//!
//! 1. **Capture**: the latest RGBA frame is encoded to a JPEG in the cache
//!    directory and handed to the screen as a `file://` reference
//! 2. **Post-Processing**: an optional [`PostProcessor`] derives a new file
//!    (the text watermark)
//! 3. **Library write**: a [`crate::storage::LibrarySink`] stores the result

pub mod encoding;
pub mod watermark;

pub use encoding::{EncodingFormat, PhotoEncoder};
pub use watermark::{TextStamp, WatermarkProcessor};

use crate::backends::camera::CapturedPhoto;
use crate::backends::camera::types::CameraFrame;
use crate::errors::{CaptureError, SaveError};
use crate::storage::{path_from_uri, to_file_uri};
use async_trait::async_trait;
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Derives a new image from a captured one
#[async_trait]
pub trait PostProcessor: Send + Sync {
    /// Burn `stamp` into the image at `uri`; returns the derived image's URI
    async fn stamp_text(&self, uri: &str, stamp: &TextStamp) -> Result<String, SaveError>;

    /// Delete an image previously returned by [`PostProcessor::stamp_text`]
    async fn release(&self, uri: &str);
}

/// Turns raw frames into capture files
pub struct PhotoPipeline {
    encoder: PhotoEncoder,
    capture_dir: PathBuf,
}

impl PhotoPipeline {
    /// Create a pipeline writing JPEGs of `quality` into `capture_dir`
    pub fn new(capture_dir: PathBuf, quality: u8) -> Self {
        Self {
            encoder: PhotoEncoder::new(quality),
            capture_dir,
        }
    }

    /// Encode `frame` and write it as a capture file
    pub async fn save_frame(
        &self,
        frame: Arc<CameraFrame>,
    ) -> Result<CapturedPhoto, CaptureError> {
        info!(
            width = frame.width,
            height = frame.height,
            "Encoding captured frame"
        );

        let rgb = tokio::task::spawn_blocking(move || {
            let rgba = frame.to_rgba_image().ok_or_else(|| {
                CaptureError::EncodingFailed(format!(
                    "Truncated {}x{} frame",
                    frame.width, frame.height
                ))
            })?;
            Ok::<_, CaptureError>(DynamicImage::ImageRgba8(rgba).to_rgb8())
        })
        .await
        .map_err(|e| CaptureError::EncodingFailed(format!("Capture task error: {}", e)))??;

        let encoded = self
            .encoder
            .encode(rgb)
            .await
            .map_err(CaptureError::EncodingFailed)?;
        let (width, height) = (encoded.width, encoded.height);

        let path = self
            .encoder
            .save(encoded, self.capture_dir.clone(), "capture")
            .await
            .map_err(CaptureError::EncodingFailed)?;

        Ok(CapturedPhoto {
            uri: to_file_uri(&path),
            width: Some(width),
            height: Some(height),
        })
    }

    /// Delete a capture file written by this pipeline
    ///
    /// References outside the capture directory are left alone.
    pub async fn release(&self, uri: &str) {
        let Ok(path) = path_from_uri(uri) else {
            return;
        };
        if !path.starts_with(&self.capture_dir) {
            debug!(path = %path.display(), "Not a capture file, keeping");
            return;
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "Capture file removed"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove capture file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_frame_writes_capture_file() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = PhotoPipeline::new(dir.path().to_path_buf(), 90);
        let frame = Arc::new(CameraFrame::from_rgba(6, 4, vec![128; 6 * 4 * 4]));

        let photo = pipeline.save_frame(frame).await.unwrap();

        assert!(photo.uri.starts_with("file://"));
        assert_eq!((photo.width, photo.height), (Some(6), Some(4)));
        let path = path_from_uri(&photo.uri).unwrap();
        assert!(path.exists());
        assert_eq!(image::open(&path).unwrap().width(), 6);
    }

    #[tokio::test]
    async fn test_release_removes_only_capture_files() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = PhotoPipeline::new(dir.path().join("captures"), 90);
        let frame = Arc::new(CameraFrame::from_rgba(2, 2, vec![0; 16]));
        let photo = pipeline.save_frame(frame).await.unwrap();
        let outside = dir.path().join("keep.jpg");
        std::fs::write(&outside, b"x").unwrap();

        pipeline.release(&photo.uri).await;
        pipeline.release(&to_file_uri(&outside)).await;

        assert!(!path_from_uri(&photo.uri).unwrap().exists());
        assert!(outside.exists());
    }
}
