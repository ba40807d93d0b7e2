// SPDX-License-Identifier: MPL-2.0

//! Error types for the camera application

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Photo capture errors
    Capture(CaptureError),
    /// Post-processing and library write errors
    Save(SaveError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
}

/// Errors raised while taking a photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// No device is bound for the requested facing
    NoDevice,
    /// The device could not be opened or streamed
    DeviceError(String),
    /// No frame arrived from the device in time
    NoFrameAvailable,
    /// The frame could not be encoded to a file
    EncodingFailed(String),
}

/// Errors raised while stamping or saving a photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    /// The storage-write permission was refused
    PermissionDenied,
    /// The watermark step failed
    StampFailed(String),
    /// The photo library write failed
    WriteError(String),
    /// The file reference could not be resolved to a local path
    InvalidUri(String),
}

/// Coarse error classification surfaced by the capture screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Camera or storage permission refused
    PermissionDenied,
    /// No camera for the selected facing
    NoDeviceAvailable,
    /// Taking the photo failed
    CaptureFailure,
    /// Stamping or writing the photo failed
    SaveFailure,
}

impl ErrorKind {
    /// Short label for status lines
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::PermissionDenied => "Permission denied",
            ErrorKind::NoDeviceAvailable => "No device available",
            ErrorKind::CaptureFailure => "Capture failed",
            ErrorKind::SaveFailure => "Save failed",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Save(e) => write!(f, "Save error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NoDevice => write!(f, "No camera device available"),
            CaptureError::DeviceError(msg) => write!(f, "Device error: {}", msg),
            CaptureError::NoFrameAvailable => write!(f, "No frame available for capture"),
            CaptureError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
        }
    }
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::PermissionDenied => write!(f, "Storage permission denied"),
            SaveError::StampFailed(msg) => write!(f, "Watermark failed: {}", msg),
            SaveError::WriteError(msg) => write!(f, "Write failed: {}", msg),
            SaveError::InvalidUri(uri) => write!(f, "Invalid file reference: {}", uri),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for SaveError {}

impl From<&CaptureError> for ErrorKind {
    fn from(err: &CaptureError) -> Self {
        match err {
            CaptureError::NoDevice => ErrorKind::NoDeviceAvailable,
            _ => ErrorKind::CaptureFailure,
        }
    }
}

impl From<&SaveError> for ErrorKind {
    fn from(err: &SaveError) -> Self {
        match err {
            SaveError::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::SaveFailure,
        }
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<SaveError> for AppError {
    fn from(err: SaveError) -> Self {
        AppError::Save(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for SaveError {
    fn from(err: std::io::Error) -> Self {
        SaveError::WriteError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_error_kind() {
        assert_eq!(
            ErrorKind::from(&CaptureError::NoDevice),
            ErrorKind::NoDeviceAvailable
        );
        assert_eq!(
            ErrorKind::from(&CaptureError::NoFrameAvailable),
            ErrorKind::CaptureFailure
        );
    }

    #[test]
    fn test_save_error_kind() {
        assert_eq!(
            ErrorKind::from(&SaveError::PermissionDenied),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            ErrorKind::from(&SaveError::WriteError("disk full".into())),
            ErrorKind::SaveFailure
        );
    }

    #[test]
    fn test_display_includes_detail() {
        let err = AppError::from(SaveError::StampFailed("font missing".into()));
        assert_eq!(err.to_string(), "Save error: Watermark failed: font missing");
    }
}
