// SPDX-License-Identifier: GPL-3.0-only

//! File-backed virtual camera
//!
//! Serves still images as camera devices, one file per facing. Useful
//! on machines without a camera and for exercising the capture screen
//! end to end.

use super::types::*;
use super::{CaptureDevice, CapturedPhoto};
use crate::constants::file_formats;
use crate::errors::CaptureError;
use crate::pipelines::photo::PhotoPipeline;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Load an image file as an RGBA frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    if !file_formats::is_image_extension(extension) {
        return Err(BackendError::FormatNotSupported(format!(
            "Unsupported file format: {}",
            path.display()
        )));
    }

    let image = image::open(path)
        .map_err(|e| BackendError::Other(format!("{}: {}", path.display(), e)))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    debug!(path = %path.display(), width, height, "Loaded image frame");
    Ok(CameraFrame::from_rgba(width, height, image.into_raw()))
}

/// Virtual camera serving image files
pub struct FileSourceCamera {
    back: Option<PathBuf>,
    front: Option<PathBuf>,
    pipeline: Arc<PhotoPipeline>,
    // Held so the preview stream stays open after its single frame
    preview_sender: Mutex<Option<FrameSender>>,
}

impl FileSourceCamera {
    pub fn new(back: Option<PathBuf>, front: Option<PathBuf>, pipeline: PhotoPipeline) -> Self {
        Self {
            back,
            front,
            pipeline: Arc::new(pipeline),
            preview_sender: Mutex::new(None),
        }
    }

    fn device_for(facing: LensFacing, path: &Path) -> CameraDevice {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        CameraDevice {
            name: format!("File: {}", name),
            path: path.display().to_string(),
            device_info: None,
            camera_location: Some(facing.to_string()),
        }
    }
}

#[async_trait]
impl CaptureDevice for FileSourceCamera {
    async fn list_devices(&self) -> DeviceMap {
        let mut map = DeviceMap::new();
        for (facing, path) in [
            (LensFacing::Back, &self.back),
            (LensFacing::Front, &self.front),
        ] {
            if let Some(path) = path
                && path.is_file()
            {
                map.insert(facing, Self::device_for(facing, path));
            }
        }
        map
    }

    fn open_preview(&self, device: &CameraDevice) -> BackendResult<FrameReceiver> {
        let frame = load_image_as_frame(Path::new(&device.path))?;
        let (mut sender, receiver) = futures::channel::mpsc::channel(1);
        sender
            .try_send(frame)
            .map_err(|e| BackendError::Other(e.to_string()))?;
        if let Ok(mut held) = self.preview_sender.lock() {
            *held = Some(sender);
        }
        info!(device = %device.name, "File preview bound");
        Ok(receiver)
    }

    fn close_preview(&self) {
        if let Ok(mut held) = self.preview_sender.lock() {
            held.take();
        }
    }

    async fn capture(&self, device: &CameraDevice) -> Result<CapturedPhoto, CaptureError> {
        let path = PathBuf::from(&device.path);
        let frame = tokio::task::spawn_blocking(move || load_image_as_frame(&path))
            .await
            .map_err(|e| CaptureError::DeviceError(format!("Capture task error: {}", e)))??;
        self.pipeline.save_frame(Arc::new(frame)).await
    }

    async fn release_capture(&self, uri: &str) {
        self.pipeline.release(uri).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::path_from_uri;

    fn write_image(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_pixel(8, 6, image::Rgb([40, 80, 120]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_rejects_non_image() {
        assert!(matches!(
            load_image_as_frame(Path::new("/tmp/clip.mp4")),
            Err(BackendError::FormatNotSupported(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_files_are_not_listed() {
        let dir = tempfile::tempdir().unwrap();
        let back = write_image(dir.path(), "back.png");
        let camera = FileSourceCamera::new(
            Some(back),
            Some(dir.path().join("missing.png")),
            PhotoPipeline::new(dir.path().join("captures"), 90),
        );

        let devices = camera.list_devices().await;
        assert!(devices.contains(LensFacing::Back));
        assert!(!devices.contains(LensFacing::Front));
    }

    #[tokio::test]
    async fn test_capture_writes_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let back = write_image(dir.path(), "back.png");
        let camera = FileSourceCamera::new(
            Some(back),
            None,
            PhotoPipeline::new(dir.path().join("captures"), 90),
        );
        let devices = camera.list_devices().await;
        let device = devices.get(LensFacing::Back).unwrap();

        let photo = camera.capture(device).await.unwrap();

        assert_eq!((photo.width, photo.height), (Some(8), Some(6)));
        let path = path_from_uri(&photo.uri).unwrap();
        assert!(path.starts_with(dir.path().join("captures")));
        assert_eq!(path.extension().unwrap(), "jpg");
    }

    #[tokio::test]
    async fn test_preview_yields_frame() {
        use futures::StreamExt;

        let dir = tempfile::tempdir().unwrap();
        let back = write_image(dir.path(), "back.png");
        let camera = FileSourceCamera::new(
            Some(back),
            None,
            PhotoPipeline::new(dir.path().to_path_buf(), 90),
        );
        let devices = camera.list_devices().await;
        let mut receiver = camera
            .open_preview(devices.get(LensFacing::Back).unwrap())
            .unwrap();

        let frame = receiver.next().await.unwrap();
        assert_eq!((frame.width, frame.height), (8, 6));
    }
}
