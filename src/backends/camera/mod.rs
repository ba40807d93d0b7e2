// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Capture screen     │  ← reads device(facing, devices)
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ CaptureDevice trait │  ← list / preview / capture
//! └──────────┬──────────┘
//!            │
//!      ┌─────┴──────┐
//!      ▼            ▼
//! ┌────────┐  ┌────────────┐
//! │  V4L2  │  │ File source│
//! └────────┘  └────────────┘
//! ```

pub mod file_source;
pub mod format_converters;
pub mod types;
pub mod v4l2;

pub use file_source::FileSourceCamera;
pub use types::*;
pub use v4l2::V4l2Camera;

use crate::errors::CaptureError;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Where camera frames come from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CameraSource {
    /// Real V4L2 devices
    #[default]
    Devices,
    /// Still images standing in for the back and front lenses
    Files {
        back: Option<PathBuf>,
        front: Option<PathBuf>,
    },
}

impl CameraSource {
    /// File source when any image is given, real devices otherwise
    pub fn from_images(back: Option<PathBuf>, front: Option<PathBuf>) -> Self {
        if back.is_none() && front.is_none() {
            CameraSource::Devices
        } else {
            CameraSource::Files { back, front }
        }
    }
}

/// Result of a successful capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPhoto {
    /// `file://` reference to the captured image
    pub uri: String,
    /// Width in pixels, when the backend reports it
    pub width: Option<u32>,
    /// Height in pixels, when the backend reports it
    pub height: Option<u32>,
}

impl CapturedPhoto {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            width: None,
            height: None,
        }
    }
}

/// Camera capture collaborator
///
/// Implementations own the hardware (or its stand-in); the capture screen
/// only ever asks which devices exist and tells one of them to shoot.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Enumerate cameras, keyed by the facing they serve
    async fn list_devices(&self) -> DeviceMap;

    /// Start streaming preview frames from `device`
    ///
    /// Any previously open preview is closed first.
    fn open_preview(&self, device: &CameraDevice) -> BackendResult<FrameReceiver>;

    /// Stop the preview stream, if one is running
    fn close_preview(&self);

    /// Take a still photo on `device` and write it to a file
    async fn capture(&self, device: &CameraDevice) -> Result<CapturedPhoto, CaptureError>;

    /// Delete the file behind a capture once it is no longer needed
    ///
    /// Only files this device wrote are removed.
    async fn release_capture(&self, uri: &str);
}

/// Device serving `facing`, if any
pub fn device(facing: LensFacing, devices: &DeviceMap) -> Option<CameraDevice> {
    devices.get(facing).cloned()
}

/// Name fragments hinting at a lens direction
const FRONT_HINTS: &[&str] = &["front", "user", "selfie", "integrated"];
const BACK_HINTS: &[&str] = &["rear", "back", "world"];

fn facing_from_name(name: &str) -> Option<LensFacing> {
    let name = name.to_ascii_lowercase();
    if FRONT_HINTS.iter().any(|hint| name.contains(hint)) {
        Some(LensFacing::Front)
    } else if BACK_HINTS.iter().any(|hint| name.contains(hint)) {
        Some(LensFacing::Back)
    } else {
        None
    }
}

/// Bind enumerated cameras to facings
///
/// Priority: explicit device paths, then the reported camera location,
/// then hints in the device name, then enumeration order (first free
/// device goes to the back, the next to the front).
pub fn assign_facings(
    cameras: Vec<CameraDevice>,
    back_override: Option<&str>,
    front_override: Option<&str>,
) -> DeviceMap {
    let mut map = DeviceMap::new();
    let mut remaining = Vec::new();

    for camera in cameras {
        let facing = if back_override == Some(camera.path.as_str()) {
            Some(LensFacing::Back)
        } else if front_override == Some(camera.path.as_str()) {
            Some(LensFacing::Front)
        } else {
            None
        };
        match facing {
            Some(facing) if !map.contains(facing) => map.insert(facing, camera),
            _ => remaining.push(camera),
        }
    }

    let mut unassigned = Vec::new();
    for camera in remaining {
        let hinted = camera
            .camera_location
            .as_deref()
            .and_then(LensFacing::from_location)
            .or_else(|| facing_from_name(&camera.name));
        match hinted {
            Some(facing) if !map.contains(facing) => map.insert(facing, camera),
            _ => unassigned.push(camera),
        }
    }

    for camera in unassigned {
        let slot = [LensFacing::Back, LensFacing::Front]
            .into_iter()
            .find(|facing| !map.contains(*facing));
        match slot {
            Some(facing) => map.insert(facing, camera),
            None => debug!(device = %camera.name, "No free facing for camera"),
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cam(name: &str, path: &str) -> CameraDevice {
        CameraDevice::new(name, path)
    }

    #[test]
    fn test_source_from_images() {
        assert_eq!(CameraSource::from_images(None, None), CameraSource::Devices);
        assert!(matches!(
            CameraSource::from_images(None, Some(PathBuf::from("/tmp/f.png"))),
            CameraSource::Files { back: None, .. }
        ));
    }

    #[test]
    fn test_enumeration_order_fallback() {
        let map = assign_facings(
            vec![cam("USB Cam A", "/dev/video0"), cam("USB Cam B", "/dev/video2")],
            None,
            None,
        );
        assert_eq!(map.get(LensFacing::Back).unwrap().path, "/dev/video0");
        assert_eq!(map.get(LensFacing::Front).unwrap().path, "/dev/video2");
    }

    #[test]
    fn test_single_camera_serves_back_only() {
        let map = assign_facings(vec![cam("USB Cam", "/dev/video0")], None, None);
        assert!(map.contains(LensFacing::Back));
        assert!(device(LensFacing::Front, &map).is_none());
    }

    #[test]
    fn test_name_hint_wins_over_order() {
        let map = assign_facings(
            vec![
                cam("Integrated Camera", "/dev/video0"),
                cam("USB Cam", "/dev/video2"),
            ],
            None,
            None,
        );
        assert_eq!(map.get(LensFacing::Front).unwrap().path, "/dev/video0");
        assert_eq!(map.get(LensFacing::Back).unwrap().path, "/dev/video2");
    }

    #[test]
    fn test_override_wins_over_location() {
        let mut located = cam("Sensor", "/dev/video0");
        located.camera_location = Some("back".into());
        let map = assign_facings(
            vec![located, cam("Other", "/dev/video1")],
            None,
            Some("/dev/video0"),
        );
        assert_eq!(map.get(LensFacing::Front).unwrap().path, "/dev/video0");
        assert_eq!(map.get(LensFacing::Back).unwrap().path, "/dev/video1");
    }

    #[test]
    fn test_extra_cameras_are_ignored() {
        let map = assign_facings(
            vec![cam("A", "/a"), cam("B", "/b"), cam("C", "/c")],
            None,
            None,
        );
        assert_eq!(map.iter().count(), 2);
    }
}
