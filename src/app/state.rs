// SPDX-License-Identifier: GPL-3.0-only

//! Capture screen state types and messages

use crate::backends::camera::{CapturedPhoto, DeviceMap};
use crate::backends::permission::PermissionStatus;
use crate::errors::{CaptureError, ErrorKind, SaveError};
use std::fmt;
use std::path::PathBuf;

pub use crate::backends::camera::LensFacing;

/// Camera permission as last reported by the gateway
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PermissionState {
    /// Not asked yet, or a request is in flight
    #[default]
    Unknown,
    Granted,
    Denied,
}

impl From<PermissionStatus> for PermissionState {
    fn from(status: PermissionStatus) -> Self {
        match status {
            PermissionStatus::Granted => PermissionState::Granted,
            PermissionStatus::Denied => PermissionState::Denied,
        }
    }
}

/// Most recent captured photo that has not been saved or discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSession {
    pub uri: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl From<CapturedPhoto> for CaptureSession {
    fn from(photo: CapturedPhoto) -> Self {
        Self {
            uri: photo.uri,
            width: photo.width,
            height: photo.height,
        }
    }
}

/// What the screen currently shows
///
/// Never stored: always derived from permission, devices, facing and
/// session (see [`crate::app::CaptureScreen::mode`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenMode {
    /// Camera access not granted (or not yet resolved)
    Unauthorized,
    /// Access granted but the selected facing has no device
    NoDevice,
    /// Live preview of the active device
    LiveCapture,
    /// Reviewing a captured photo
    Preview,
}

impl ScreenMode {
    pub fn label(&self) -> &'static str {
        match self {
            ScreenMode::Unauthorized => "Unauthorized",
            ScreenMode::NoDevice => "No device",
            ScreenMode::LiveCapture => "Live",
            ScreenMode::Preview => "Preview",
        }
    }
}

impl fmt::Display for ScreenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Collaborator call currently in flight
///
/// While one is set, user actions that would start another call are
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Permission request and first device listing
    Mounting,
    /// Re-listing devices
    Refreshing,
    Capturing,
    Saving,
}

impl PendingAction {
    pub fn label(&self) -> &'static str {
        match self {
            PendingAction::Mounting => "Requesting camera access",
            PendingAction::Refreshing => "Looking for cameras",
            PendingAction::Capturing => "Capturing",
            PendingAction::Saving => "Saving",
        }
    }
}

/// Last failure, kept until dismissed or superseded by a success
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ScreenError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&CaptureError> for ScreenError {
    fn from(error: &CaptureError) -> Self {
        Self::new(ErrorKind::from(error), error.to_string())
    }
}

impl From<&SaveError> for ScreenError {
    fn from(error: &SaveError) -> Self {
        Self::new(ErrorKind::from(error), error.to_string())
    }
}

impl fmt::Display for ScreenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Messages driving the capture screen
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // ===== Lifecycle =====
    /// Screen became visible: ask for camera access
    Mount,
    /// Permission gateway answered
    PermissionResolved(PermissionStatus),
    /// Capture device reported its cameras
    DevicesListed(DeviceMap),
    /// Re-list cameras (hot-plug, or recovering from "no device")
    RefreshDevices,

    // ===== Camera =====
    /// Toggle between back and front lens
    Flip,
    /// Take a photo with the active device
    Capture,
    /// Capture device finished
    CaptureFinished(Result<CapturedPhoto, CaptureError>),

    // ===== Preview =====
    /// Drop the captured photo and return to the live view
    Discard,
    /// Stamp and store the captured photo
    Save,
    /// Save pipeline finished
    SaveFinished(Result<PathBuf, SaveError>),

    // ===== Errors =====
    /// Retry whatever the current error blocks
    Retry,
    /// Hide the current error
    DismissError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_from_photo() {
        let photo = CapturedPhoto {
            uri: "file:///tmp/a.jpg".into(),
            width: Some(640),
            height: Some(480),
        };
        let session = CaptureSession::from(photo);
        assert_eq!(session.uri, "file:///tmp/a.jpg");
        assert_eq!((session.width, session.height), (Some(640), Some(480)));
    }

    #[test]
    fn test_screen_error_kind_follows_cause() {
        let error = ScreenError::from(&SaveError::PermissionDenied);
        assert_eq!(error.kind, ErrorKind::PermissionDenied);
        let error = ScreenError::from(&CaptureError::NoFrameAvailable);
        assert_eq!(error.kind, ErrorKind::CaptureFailure);
    }
}
