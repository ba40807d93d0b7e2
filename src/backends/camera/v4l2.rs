// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera backend
//!
//! Enumerates `/dev/video*` capture nodes and streams frames through mmap
//! buffers. Preview runs on its own thread and keeps the latest decoded
//! frame around so a capture never has to reopen a busy device.

use super::format_converters::{SUPPORTED_FOURCCS, decode_to_frame};
use super::types::*;
use super::{CaptureDevice, CapturedPhoto, assign_facings};
use crate::constants::{PREVIEW_CHANNEL_CAPACITY, V4L2_BUFFER_COUNT, timing};
use crate::errors::CaptureError;
use crate::pipelines::photo::PhotoPipeline;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use v4l::FourCC;
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

/// Resolution requested from drivers; they round to the nearest supported size
const REQUESTED_WIDTH: u32 = 1280;
const REQUESTED_HEIGHT: u32 = 720;

/// Latest decoded frame shared between the preview thread and captures
type LatestFrame = Arc<Mutex<Option<Arc<CameraFrame>>>>;

/// Running preview stream
struct PreviewHandle {
    device_path: String,
    stop: Arc<AtomicBool>,
    latest: LatestFrame,
    thread: Option<JoinHandle<()>>,
}

impl PreviewHandle {
    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!(device = %self.device_path, "Preview thread panicked");
        }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Camera backend talking to V4L2 device nodes
pub struct V4l2Camera {
    back_override: Option<String>,
    front_override: Option<String>,
    pipeline: Arc<PhotoPipeline>,
    preview: Mutex<Option<PreviewHandle>>,
}

impl V4l2Camera {
    pub fn new(
        pipeline: PhotoPipeline,
        back_override: Option<String>,
        front_override: Option<String>,
    ) -> Self {
        Self {
            back_override,
            front_override,
            pipeline: Arc::new(pipeline),
            preview: Mutex::new(None),
        }
    }

    /// Frame slot of the running preview, if it is bound to `device_path`
    fn preview_slot(&self, device_path: &str) -> Option<LatestFrame> {
        let preview = self.preview.lock().ok()?;
        let handle = preview.as_ref()?;
        (handle.device_path == device_path).then(|| Arc::clone(&handle.latest))
    }
}

/// Wait until the preview thread has published a frame
///
/// The device is already streaming, so reopening it would fail; a preview
/// that stays silent for `timeout` yields `NoFrameAvailable`.
async fn wait_for_frame(
    latest: LatestFrame,
    timeout: Duration,
) -> Result<Arc<CameraFrame>, CaptureError> {
    let deadline = Instant::now() + timeout;
    loop {
        let frame = latest.lock().ok().and_then(|slot| slot.clone());
        if let Some(frame) = frame {
            return Ok(frame);
        }
        if Instant::now() >= deadline {
            warn!("Preview delivered no frame in time");
            return Err(CaptureError::NoFrameAvailable);
        }
        tokio::time::sleep(timing::FRAME_POLL).await;
    }
}

/// Enumerate all V4L2 nodes that can deliver a decodable capture stream
pub fn enumerate_cameras() -> Vec<CameraDevice> {
    let mut cameras = Vec::new();

    for node in v4l::context::enum_devices() {
        let path = node.path().to_string_lossy().to_string();
        let device = match Device::with_path(&path) {
            Ok(device) => device,
            Err(e) => {
                debug!(path = %path, error = %e, "Skipping unopenable device");
                continue;
            }
        };

        let Ok(caps) = device.query_caps() else {
            continue;
        };
        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            continue;
        }
        if preferred_fourcc(&device).is_none() {
            debug!(path = %path, card = %caps.card, "No supported pixel format, skipping");
            continue;
        }

        let real_path = std::fs::canonicalize(&path)
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|_| path.clone());

        cameras.push(CameraDevice {
            name: caps.card.clone(),
            path: path.clone(),
            device_info: Some(DeviceInfo {
                card: caps.card.clone(),
                driver: caps.driver.clone(),
                path: path.clone(),
                real_path,
            }),
            camera_location: None,
        });
    }

    cameras.sort_by(|a, b| a.path.cmp(&b.path));
    info!(count = cameras.len(), "Enumerated V4L2 cameras");
    cameras
}

/// First supported FourCC the device offers
fn preferred_fourcc(device: &Device) -> Option<&'static str> {
    let formats = device.enum_formats().ok()?;
    SUPPORTED_FOURCCS.iter().copied().find(|code| {
        formats
            .iter()
            .any(|desc| desc.fourcc.str().is_ok_and(|s| s == *code))
    })
}

/// Open a device and configure it for streaming
fn configure(path: &str) -> BackendResult<(Device, CameraFormat)> {
    let device = Device::with_path(path)
        .map_err(|e| BackendError::InitializationFailed(format!("{}: {}", path, e)))?;
    let fourcc = preferred_fourcc(&device)
        .ok_or_else(|| BackendError::FormatNotSupported(path.to_string()))?;

    let mut format = device.format()?;
    format.fourcc = FourCC::new(
        fourcc
            .as_bytes()
            .try_into()
            .map_err(|_| BackendError::FormatNotSupported(fourcc.to_string()))?,
    );
    format.width = REQUESTED_WIDTH;
    format.height = REQUESTED_HEIGHT;
    let format = device.set_format(&format)?;

    let negotiated = CameraFormat {
        width: format.width,
        height: format.height,
        pixel_format: format
            .fourcc
            .str()
            .map(str::to_string)
            .unwrap_or_else(|_| fourcc.to_string()),
        bytes_per_line: format.stride,
    };
    info!(path, format = %negotiated, "Configured V4L2 device");
    Ok((device, negotiated))
}

/// Pull one decoded frame from a running stream
fn next_frame(stream: &mut MmapStream, format: &CameraFormat) -> BackendResult<CameraFrame> {
    let (buf, meta) = CaptureStream::next(stream)?;
    let used = (meta.bytesused as usize).min(buf.len());
    let data = if used == 0 { buf } else { &buf[..used] };
    decode_to_frame(format, data)
}

fn run_preview(
    path: String,
    mut sender: FrameSender,
    stop: Arc<AtomicBool>,
    latest: LatestFrame,
) {
    let (device, format) = match configure(&path) {
        Ok(configured) => configured,
        Err(e) => {
            error!(path = %path, error = %e, "Failed to start preview");
            return;
        }
    };
    let mut stream =
        match MmapStream::with_buffers(&device, Type::VideoCapture, V4L2_BUFFER_COUNT) {
            Ok(stream) => stream,
            Err(e) => {
                error!(path = %path, error = %e, "Failed to create capture stream");
                return;
            }
        };

    while !stop.load(Ordering::Acquire) {
        match next_frame(&mut stream, &format) {
            Ok(frame) => {
                if let Ok(mut slot) = latest.lock() {
                    *slot = Some(Arc::new(frame.clone()));
                }
                // Drop frames the UI has not consumed yet
                let _ = sender.try_send(frame);
            }
            Err(BackendError::FormatNotSupported(msg)) => {
                debug!(error = %msg, "Dropping undecodable frame");
            }
            Err(e) => {
                error!(path = %path, error = %e, "Preview stream failed");
                break;
            }
        }
    }
    debug!(path = %path, "Preview thread exiting");
}

/// Open the device, let it settle, and return one frame
fn grab_single_frame(path: &str) -> BackendResult<CameraFrame> {
    let (device, format) = configure(path)?;
    let mut stream = MmapStream::with_buffers(&device, Type::VideoCapture, V4L2_BUFFER_COUNT)?;

    let start = Instant::now();
    let mut frame = None;
    while start.elapsed() < timing::CAPTURE_TIMEOUT {
        match next_frame(&mut stream, &format) {
            Ok(f) => {
                frame = Some(f);
                if start.elapsed() > timing::CAPTURE_WARMUP {
                    break;
                }
            }
            Err(BackendError::FormatNotSupported(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    frame.ok_or_else(|| BackendError::Other("Timed out waiting for a frame".to_string()))
}

#[async_trait]
impl CaptureDevice for V4l2Camera {
    async fn list_devices(&self) -> DeviceMap {
        let cameras = tokio::task::spawn_blocking(enumerate_cameras)
            .await
            .unwrap_or_default();
        assign_facings(
            cameras,
            self.back_override.as_deref(),
            self.front_override.as_deref(),
        )
    }

    fn open_preview(&self, device: &CameraDevice) -> BackendResult<FrameReceiver> {
        self.close_preview();

        let (sender, receiver) = futures::channel::mpsc::channel(PREVIEW_CHANNEL_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));
        let latest: LatestFrame = Arc::new(Mutex::new(None));

        let thread = std::thread::Builder::new()
            .name("v4l2-preview".to_string())
            .spawn({
                let path = device.path.clone();
                let stop = Arc::clone(&stop);
                let latest = Arc::clone(&latest);
                move || run_preview(path, sender, stop, latest)
            })?;

        info!(device = %device.name, path = %device.path, "Preview bound");
        let mut preview = self
            .preview
            .lock()
            .map_err(|_| BackendError::Other("Preview state poisoned".to_string()))?;
        *preview = Some(PreviewHandle {
            device_path: device.path.clone(),
            stop,
            latest,
            thread: Some(thread),
        });
        Ok(receiver)
    }

    fn close_preview(&self) {
        let handle = match self.preview.lock() {
            Ok(mut preview) => preview.take(),
            Err(_) => None,
        };
        if let Some(mut handle) = handle {
            handle.shutdown();
            debug!(path = %handle.device_path, "Preview closed");
        }
    }

    async fn capture(&self, device: &CameraDevice) -> Result<CapturedPhoto, CaptureError> {
        info!(device = %device.name, "Capturing photo");

        let frame = match self.preview_slot(&device.path) {
            Some(latest) => wait_for_frame(latest, timing::CAPTURE_TIMEOUT).await?,
            None => {
                let path = device.path.clone();
                let frame = tokio::task::spawn_blocking(move || grab_single_frame(&path))
                    .await
                    .map_err(|e| CaptureError::DeviceError(format!("Capture task error: {}", e)))??;
                Arc::new(frame)
            }
        };

        self.pipeline.save_frame(frame).await
    }

    async fn release_capture(&self, uri: &str) {
        self.pipeline.release(uri).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_silent_preview_yields_no_frame() {
        let latest: LatestFrame = Arc::new(Mutex::new(None));
        let result = wait_for_frame(latest, Duration::from_millis(50)).await;
        assert_eq!(result.unwrap_err(), CaptureError::NoFrameAvailable);
    }

    #[tokio::test]
    async fn test_capture_waits_for_first_preview_frame() {
        let latest: LatestFrame = Arc::new(Mutex::new(None));
        let publisher = Arc::clone(&latest);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            *publisher.lock().unwrap() = Some(Arc::new(CameraFrame::from_rgba(1, 1, vec![0; 4])));
        });

        let frame = wait_for_frame(latest, Duration::from_secs(2)).await.unwrap();
        assert_eq!((frame.width, frame.height), (1, 1));
    }
}
