// SPDX-License-Identifier: GPL-3.0-only

//! Capture screen controller
//!
//! The screen is a small state machine driven by [`Message`]s. Every
//! collaborator call is issued as a [`Task`] whose completion comes back as
//! another message, so `update` itself never blocks and is never
//! re-entered.
//!
//! ```text
//! Unauthorized ──granted──▶ LiveCapture ──capture──▶ Preview
//!      │                     │    ▲                   │
//!      │ granted,            │flip│◀──discard/save────┘
//!      ▼ no device           ▼    │
//!   NoDevice ◀───────────────┘  refresh
//! ```
//!
//! Only permission, facing, devices and the capture session are stored;
//! the mode and the active device are computed on every read.

mod handlers;
pub mod state;
pub mod task;
mod update;

pub use state::{
    CaptureSession, LensFacing, Message, PendingAction, PermissionState, ScreenError, ScreenMode,
};
pub use task::Task;

use crate::backends::camera::{
    CameraDevice, CameraSource, CaptureDevice, DeviceMap, FileSourceCamera, V4l2Camera, device,
};
use crate::backends::permission::{PermissionGateway, PortalPermissionGateway};
use crate::config::{Config, NoDevicePolicy, cache_directory};
use crate::pipelines::photo::{PhotoPipeline, PostProcessor, TextStamp, WatermarkProcessor};
use crate::storage::{LibrarySink, PhotoLibrary};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// External capabilities the screen drives
#[derive(Clone)]
pub struct Collaborators {
    pub permissions: Arc<dyn PermissionGateway>,
    pub camera: Arc<dyn CaptureDevice>,
    pub post_processor: Arc<dyn PostProcessor>,
    pub library: Arc<dyn LibrarySink>,
}

impl Collaborators {
    /// Wire the desktop collaborators described by `config`
    pub fn for_system(config: &Config, source: CameraSource) -> Self {
        let library_dir = config.photo_directory();
        let pipeline = PhotoPipeline::new(cache_directory().join("captures"), config.jpeg_quality);

        let camera: Arc<dyn CaptureDevice> = match source {
            CameraSource::Devices => Arc::new(V4l2Camera::new(
                pipeline,
                config.back_device.clone(),
                config.front_device.clone(),
            )),
            CameraSource::Files { back, front } => {
                Arc::new(FileSourceCamera::new(back, front, pipeline))
            }
        };

        Self {
            permissions: Arc::new(PortalPermissionGateway::new(
                library_dir.clone(),
                config.require_storage_permission,
            )),
            camera,
            post_processor: Arc::new(WatermarkProcessor::new()),
            library: Arc::new(PhotoLibrary::new(library_dir)),
        }
    }
}

/// Screen behaviour knobs taken from the configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenOptions {
    /// Stamp applied before saving; `None` saves the capture as is
    pub watermark: Option<TextStamp>,
    pub no_device_policy: NoDevicePolicy,
}

impl From<&Config> for ScreenOptions {
    fn from(config: &Config) -> Self {
        Self {
            watermark: config.watermark.clone(),
            no_device_policy: config.no_device_policy,
        }
    }
}

/// The single capture screen
pub struct CaptureScreen {
    collaborators: Collaborators,
    options: ScreenOptions,

    permission: PermissionState,
    facing: LensFacing,
    devices: DeviceMap,
    session: Option<CaptureSession>,
    pending: Option<PendingAction>,
    last_error: Option<ScreenError>,
    last_saved: Option<PathBuf>,
}

impl CaptureScreen {
    pub fn new(collaborators: Collaborators, options: ScreenOptions) -> Self {
        Self {
            collaborators,
            options,
            permission: PermissionState::Unknown,
            facing: LensFacing::default(),
            devices: DeviceMap::new(),
            session: None,
            pending: None,
            last_error: None,
            last_saved: None,
        }
    }

    /// Current screen mode, derived from the stored state
    pub fn mode(&self) -> ScreenMode {
        if self.permission != PermissionState::Granted {
            ScreenMode::Unauthorized
        } else if self.session.is_some() {
            ScreenMode::Preview
        } else if self.active_device().is_none() {
            ScreenMode::NoDevice
        } else {
            ScreenMode::LiveCapture
        }
    }

    /// Device serving the selected facing
    pub fn active_device(&self) -> Option<CameraDevice> {
        device(self.facing, &self.devices)
    }

    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    pub fn facing(&self) -> LensFacing {
        self.facing
    }

    pub fn devices(&self) -> &DeviceMap {
        &self.devices
    }

    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    pub fn pending(&self) -> Option<PendingAction> {
        self.pending
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn last_error(&self) -> Option<&ScreenError> {
        self.last_error.as_ref()
    }

    /// Library path of the most recently saved photo
    pub fn last_saved(&self) -> Option<&Path> {
        self.last_saved.as_deref()
    }

    pub fn options(&self) -> &ScreenOptions {
        &self.options
    }

    /// Capture device, for binding the live preview
    pub fn camera(&self) -> &Arc<dyn CaptureDevice> {
        &self.collaborators.camera
    }

    /// Process `message` and every follow-up it triggers, one at a time
    ///
    /// Follow-ups are awaited sequentially, which keeps the screen's
    /// single-context model without a separate event loop. Used by the
    /// headless driver and tests.
    pub async fn dispatch(&mut self, message: Message) {
        let mut queue = std::collections::VecDeque::from([message]);
        while let Some(message) = queue.pop_front() {
            let task = self.update(message);
            for future in task.into_futures() {
                if let Some(next) = future.await {
                    queue.push_back(next);
                }
            }
        }
    }

    /// Drop a user action because another collaborator call is running
    fn is_blocked(&self, action: &str) -> bool {
        match self.pending {
            Some(pending) => {
                debug!(action, ?pending, "Action ignored while another is in flight");
                true
            }
            None => false,
        }
    }
}
