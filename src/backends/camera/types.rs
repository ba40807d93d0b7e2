// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which physical lens is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LensFacing {
    /// User-facing lens
    Front,
    /// World-facing lens
    #[default]
    Back,
}

impl LensFacing {
    /// The opposite lens
    pub fn flipped(self) -> Self {
        match self {
            LensFacing::Front => LensFacing::Back,
            LensFacing::Back => LensFacing::Front,
        }
    }

    /// Parse a location string as reported by libcamera or udev
    /// ("front", "back", "rear", "user", "world", ...)
    pub fn from_location(location: &str) -> Option<Self> {
        let location = location.trim().to_ascii_lowercase();
        match location.as_str() {
            "front" | "user" | "user-facing" => Some(LensFacing::Front),
            "back" | "rear" | "world" | "world-facing" => Some(LensFacing::Back),
            _ => None,
        }
    }
}

impl std::fmt::Display for LensFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LensFacing::Front => write!(f, "front"),
            LensFacing::Back => write!(f, "back"),
        }
    }
}

impl std::str::FromStr for LensFacing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LensFacing::from_location(s).ok_or_else(|| format!("Unknown facing: {}", s))
    }
}

/// Device information from V4L2 capability
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Name of the device (V4L2 card)
    pub card: String,
    /// Driver name (V4L2 driver)
    pub driver: String,
    /// Device path (e.g., /dev/video0)
    pub path: String,
    /// Real device path (resolved symlinks)
    pub real_path: String,
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub name: String,
    pub path: String,                    // Device node or source file
    pub device_info: Option<DeviceInfo>, // V4L2 device information (card, driver, path, real_path)
    pub camera_location: Option<String>, // Camera location: "front", "back", or "external"
}

impl CameraDevice {
    /// Create a device with just a name and path
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            device_info: None,
            camera_location: None,
        }
    }
}

/// Available devices keyed by facing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceMap {
    back: Option<CameraDevice>,
    front: Option<CameraDevice>,
}

impl DeviceMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, facing: LensFacing, device: CameraDevice) -> Self {
        self.insert(facing, device);
        self
    }

    /// Bind a device to a facing, replacing any previous one
    pub fn insert(&mut self, facing: LensFacing, device: CameraDevice) {
        match facing {
            LensFacing::Back => self.back = Some(device),
            LensFacing::Front => self.front = Some(device),
        }
    }

    /// Device bound to a facing
    pub fn get(&self, facing: LensFacing) -> Option<&CameraDevice> {
        match facing {
            LensFacing::Back => self.back.as_ref(),
            LensFacing::Front => self.front.as_ref(),
        }
    }

    /// Whether a facing has a device
    pub fn contains(&self, facing: LensFacing) -> bool {
        self.get(facing).is_some()
    }

    /// True when no facing has a device
    pub fn is_empty(&self) -> bool {
        self.back.is_none() && self.front.is_none()
    }

    /// All bound devices, back first
    pub fn iter(&self) -> impl Iterator<Item = (LensFacing, &CameraDevice)> {
        [
            (LensFacing::Back, self.back.as_ref()),
            (LensFacing::Front, self.front.as_ref()),
        ]
        .into_iter()
        .filter_map(|(facing, device)| device.map(|d| (facing, d)))
    }
}

/// Resolution, pixel format and frame rate of a capture mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFormat {
    pub width: u32,
    pub height: u32,
    pub pixel_format: String, // FourCC code (e.g., "MJPG", "YUYV")
    /// Bytes per row as negotiated with the driver (0 when unknown)
    pub bytes_per_line: u32,
}

impl std::fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} {}", self.width, self.height, self.pixel_format)
    }
}

/// A single RGBA frame from a camera
///
/// Backends convert driver buffers to RGBA before frames leave the capture
/// thread.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    /// Bytes per row, at least `width * 4`
    pub stride: u32,
}

impl CameraFrame {
    /// Wrap tightly packed RGBA pixels
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            stride: width * 4,
        }
    }

    /// Convert into an `image` buffer
    ///
    /// Rows are repacked when the stride carries padding. `None` when the
    /// data is shorter than the dimensions claim.
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        let row_bytes = (self.width * 4) as usize;
        let stride = self.stride as usize;
        if stride == row_bytes {
            return image::RgbaImage::from_raw(self.width, self.height, self.data.to_vec());
        }
        let mut packed = Vec::with_capacity(row_bytes * self.height as usize);
        for row in self.data.chunks(stride).take(self.height as usize) {
            packed.extend_from_slice(row.get(..row_bytes)?);
        }
        image::RgbaImage::from_raw(self.width, self.height, packed)
    }
}

/// Receiver end of a preview stream
pub type FrameReceiver = futures::channel::mpsc::Receiver<CameraFrame>;

/// Sender end of a preview stream
pub type FrameSender = futures::channel::mpsc::Sender<CameraFrame>;

/// Backend operation result
pub type BackendResult<T> = Result<T, BackendError>;

/// Backend errors
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Failed to initialize backend
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Format not supported
    FormatNotSupported(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}

impl From<BackendError> for crate::errors::CaptureError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::DeviceNotFound(_) => crate::errors::CaptureError::NoDevice,
            other => crate::errors::CaptureError::DeviceError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_flip_round_trip() {
        assert_eq!(LensFacing::Back.flipped(), LensFacing::Front);
        assert_eq!(LensFacing::Back.flipped().flipped(), LensFacing::Back);
    }

    #[test]
    fn test_facing_from_location() {
        assert_eq!(LensFacing::from_location("Rear"), Some(LensFacing::Back));
        assert_eq!(LensFacing::from_location("user"), Some(LensFacing::Front));
        assert_eq!(LensFacing::from_location("external"), None);
    }

    #[test]
    fn test_device_map_lookup() {
        let map = DeviceMap::new().with(LensFacing::Back, CameraDevice::new("cam", "/dev/video0"));
        assert!(map.contains(LensFacing::Back));
        assert!(!map.contains(LensFacing::Front));
        assert_eq!(map.iter().count(), 1);
    }

    #[test]
    fn test_to_rgba_image_strips_padding() {
        // 1x2 image with 8-byte stride (4 bytes padding per row)
        let data = vec![1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8, 0, 0, 0, 0];
        let frame = CameraFrame {
            width: 1,
            height: 2,
            data: Arc::from(data.into_boxed_slice()),
            stride: 8,
        };
        let image = frame.to_rgba_image().unwrap();
        assert_eq!(image.as_raw(), &vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
