// SPDX-License-Identifier: GPL-3.0-only

//! Permission gateway abstraction
//!
//! The capture screen asks for camera access once at mount and, on
//! platforms that gate it, for storage-write access before each save.

pub mod portal;

pub use portal::PortalPermissionGateway;

use async_trait::async_trait;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use tracing::debug;

/// Outcome of a permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

impl From<bool> for PermissionStatus {
    fn from(granted: bool) -> Self {
        if granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }
}

/// OS permission collaborator
#[async_trait]
pub trait PermissionGateway: Send + Sync {
    /// Ask for camera access (may prompt the user)
    async fn request_camera_permission(&self) -> PermissionStatus;

    /// Whether saving needs an explicit storage-write permission
    fn requires_storage_permission(&self) -> bool;

    /// Check the storage-write permission without prompting
    async fn check_storage_permission(&self) -> bool;

    /// Ask for the storage-write permission
    async fn request_storage_permission(&self) -> bool;
}

/// Check `access(2)` for a path with the given mode (`libc::R_OK | libc::W_OK`, ...)
pub fn has_access(path: &Path, mode: libc::c_int) -> bool {
    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    let result = unsafe { libc::access(c_path.as_ptr(), mode) };
    debug!(path = %path.display(), mode, granted = result == 0, "Checked access");
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_bool() {
        assert_eq!(PermissionStatus::from(true), PermissionStatus::Granted);
        assert!(!PermissionStatus::from(false).is_granted());
    }

    #[test]
    fn test_access_on_tempdir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(has_access(dir.path(), libc::W_OK));
        assert!(!has_access(&dir.path().join("missing"), libc::F_OK));
    }
}
