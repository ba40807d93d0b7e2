// SPDX-License-Identifier: GPL-3.0-only

//! Device listing and lens flip handlers

use crate::app::state::{Message, PendingAction, PermissionState, ScreenError, ScreenMode};
use crate::app::{CaptureScreen, Task};
use crate::backends::camera::{DeviceMap, device};
use crate::config::NoDevicePolicy;
use crate::errors::ErrorKind;
use std::sync::Arc;
use tracing::{debug, info, warn};

impl CaptureScreen {
    pub(crate) fn list_devices_task(&self) -> Task {
        let camera = Arc::clone(&self.collaborators.camera);
        Task::perform(
            async move { camera.list_devices().await },
            Message::DevicesListed,
        )
    }

    pub(crate) fn handle_refresh_devices(&mut self) -> Task {
        if self.permission != PermissionState::Granted {
            debug!("Device refresh ignored without camera permission");
            return Task::none();
        }
        if self.is_blocked("refresh") {
            return Task::none();
        }

        self.pending = Some(PendingAction::Refreshing);
        self.list_devices_task()
    }

    pub(crate) fn handle_devices_listed(&mut self, devices: DeviceMap) -> Task {
        let mounting = match self.pending {
            Some(PendingAction::Mounting) => true,
            Some(PendingAction::Refreshing) => false,
            other => {
                debug!(pending = ?other, "Ignoring unexpected device listing");
                return Task::none();
            }
        };
        self.pending = None;

        for (facing, camera) in devices.iter() {
            info!(%facing, device = %camera.name, path = %camera.path, "Camera available");
        }
        self.devices = devices;

        // A machine with a single camera may only have a front-facing one
        let other = self.facing.flipped();
        if mounting && self.active_device().is_none() && device(other, &self.devices).is_some() {
            info!(facing = %other, "Starting on the only available facing");
            self.facing = other;
        }

        if self.active_device().is_some() {
            if self
                .last_error
                .as_ref()
                .is_some_and(|e| e.kind == ErrorKind::NoDeviceAvailable)
            {
                self.last_error = None;
            }
        } else {
            warn!(facing = %self.facing, "No camera for the selected facing");
        }
        Task::none()
    }

    /// Toggle the lens
    ///
    /// Accepted from the live view and from the "no device" screen, where
    /// flipping back is the way out when the other lens does exist.
    pub(crate) fn handle_flip(&mut self) -> Task {
        if !matches!(self.mode(), ScreenMode::LiveCapture | ScreenMode::NoDevice) {
            debug!(mode = %self.mode(), "Flip ignored");
            return Task::none();
        }
        if self.is_blocked("flip") {
            return Task::none();
        }

        let target = self.facing.flipped();
        if device(target, &self.devices).is_some() {
            info!(from = %self.facing, to = %target, "Flipping camera");
            self.facing = target;
            self.last_error = None;
            return Task::none();
        }

        match self.options.no_device_policy {
            NoDevicePolicy::Block => {
                warn!(facing = %target, "Flipped to a facing without a camera");
                self.facing = target;
            }
            NoDevicePolicy::Revert => {
                warn!(facing = %target, "No camera for requested facing, keeping current one");
                self.last_error = Some(ScreenError::new(
                    ErrorKind::NoDeviceAvailable,
                    format!("No {} camera available", target),
                ));
            }
        }
        Task::none()
    }
}
