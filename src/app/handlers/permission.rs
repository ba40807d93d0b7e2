// SPDX-License-Identifier: GPL-3.0-only

//! Mount, camera permission and retry handlers

use crate::app::state::{
    LensFacing, Message, PendingAction, PermissionState, ScreenError, ScreenMode,
};
use crate::app::{CaptureScreen, Task};
use crate::backends::camera::DeviceMap;
use crate::backends::permission::PermissionStatus;
use crate::errors::ErrorKind;
use std::sync::Arc;
use tracing::{debug, info, warn};

impl CaptureScreen {
    /// Reset the screen and ask for camera access
    pub(crate) fn handle_mount(&mut self) -> Task {
        if self.is_blocked("mount") {
            return Task::none();
        }

        self.permission = PermissionState::Unknown;
        self.facing = LensFacing::Back;
        self.devices = DeviceMap::new();
        self.session = None;
        self.last_error = None;
        self.pending = Some(PendingAction::Mounting);

        info!("Requesting camera permission");
        let permissions = Arc::clone(&self.collaborators.permissions);
        Task::perform(
            async move { permissions.request_camera_permission().await },
            Message::PermissionResolved,
        )
    }

    pub(crate) fn handle_permission_resolved(&mut self, status: PermissionStatus) -> Task {
        if self.pending != Some(PendingAction::Mounting) {
            debug!(?status, "Ignoring permission answer outside of mount");
            return Task::none();
        }

        self.permission = PermissionState::from(status);
        if status.is_granted() {
            info!("Camera permission granted");
            // Stay in Mounting until the first device listing arrives
            return self.list_devices_task();
        }

        warn!("Camera permission denied");
        self.pending = None;
        self.last_error = Some(ScreenError::new(
            ErrorKind::PermissionDenied,
            "Camera access was denied",
        ));
        Task::none()
    }

    /// Retry whatever currently blocks the screen
    ///
    /// Unauthorized remounts, NoDevice re-lists devices, anything else
    /// just clears the error.
    pub(crate) fn handle_retry(&mut self) -> Task {
        if self.is_blocked("retry") {
            return Task::none();
        }

        match self.mode() {
            ScreenMode::Unauthorized => self.handle_mount(),
            ScreenMode::NoDevice => self.handle_refresh_devices(),
            ScreenMode::LiveCapture | ScreenMode::Preview => {
                self.last_error = None;
                Task::none()
            }
        }
    }
}
