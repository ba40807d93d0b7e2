// SPDX-License-Identifier: GPL-3.0-only

//! Message update handling
//!
//! `update()` only routes; the transitions live in the `handlers`
//! submodules, grouped by concern:
//!
//! - `handlers::permission`: mount, permission answers, retry
//! - `handlers::camera`: device listing and facing changes
//! - `handlers::capture`: capture, discard, save

use super::state::Message;
use super::{CaptureScreen, Task};
use tracing::trace;

impl CaptureScreen {
    /// Apply `message` and return the follow-up work it needs
    pub fn update(&mut self, message: Message) -> Task {
        trace!(?message, mode = %self.mode(), "Update");
        match message {
            // ===== Lifecycle =====
            Message::Mount => self.handle_mount(),
            Message::PermissionResolved(status) => self.handle_permission_resolved(status),
            Message::DevicesListed(devices) => self.handle_devices_listed(devices),
            Message::RefreshDevices => self.handle_refresh_devices(),

            // ===== Camera =====
            Message::Flip => self.handle_flip(),
            Message::Capture => self.handle_capture(),
            Message::CaptureFinished(result) => self.handle_capture_finished(result),

            // ===== Preview =====
            Message::Discard => self.handle_discard(),
            Message::Save => self.handle_save(),
            Message::SaveFinished(result) => self.handle_save_finished(result),

            // ===== Errors =====
            Message::Retry => self.handle_retry(),
            Message::DismissError => {
                self.last_error = None;
                Task::none()
            }
        }
    }
}
