// SPDX-License-Identifier: GPL-3.0-only

//! Capture, discard and save handlers

use crate::app::state::{CaptureSession, Message, PendingAction, ScreenError, ScreenMode};
use crate::app::{CaptureScreen, Collaborators, Task};
use crate::backends::camera::CapturedPhoto;
use crate::errors::{CaptureError, SaveError};
use crate::pipelines::photo::TextStamp;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Check storage access, then hand the photo to the library
async fn store(collaborators: &Collaborators, uri: &str) -> Result<PathBuf, SaveError> {
    let permissions = &collaborators.permissions;
    if permissions.requires_storage_permission()
        && !permissions.check_storage_permission().await
        && !permissions.request_storage_permission().await
    {
        return Err(SaveError::PermissionDenied);
    }

    collaborators.library.save_to_library(uri).await
}

/// Stamp (optional) and store the captured photo
///
/// The stamped copy is always released afterwards; the capture itself only
/// once the library holds it, so a failed save can be retried.
async fn save_photo(
    collaborators: Collaborators,
    watermark: Option<TextStamp>,
    uri: String,
) -> Result<PathBuf, SaveError> {
    let marked = match &watermark {
        Some(stamp) => {
            let marked = collaborators.post_processor.stamp_text(&uri, stamp).await?;
            debug!(source = %uri, marked = %marked, "Watermark applied");
            Some(marked)
        }
        None => None,
    };

    let result = store(&collaborators, marked.as_deref().unwrap_or(&uri)).await;

    if let Some(marked) = &marked {
        collaborators.post_processor.release(marked).await;
    }
    if result.is_ok() {
        collaborators.camera.release_capture(&uri).await;
    }
    result
}

impl CaptureScreen {
    pub(crate) fn handle_capture(&mut self) -> Task {
        if self.mode() != ScreenMode::LiveCapture {
            debug!(mode = %self.mode(), "Capture ignored");
            return Task::none();
        }
        if self.is_blocked("capture") {
            return Task::none();
        }
        let Some(device) = self.active_device() else {
            return Task::none();
        };

        info!(device = %device.name, facing = %self.facing, "Capturing photo");
        self.pending = Some(PendingAction::Capturing);
        let camera = Arc::clone(&self.collaborators.camera);
        Task::perform(
            async move { camera.capture(&device).await },
            Message::CaptureFinished,
        )
    }

    pub(crate) fn handle_capture_finished(
        &mut self,
        result: Result<CapturedPhoto, CaptureError>,
    ) -> Task {
        if self.pending != Some(PendingAction::Capturing) {
            debug!("Ignoring stray capture result");
            return Task::none();
        }
        self.pending = None;

        match result {
            Ok(photo) => {
                info!(
                    uri = %photo.uri,
                    width = ?photo.width,
                    height = ?photo.height,
                    "Photo captured"
                );
                self.session = Some(CaptureSession::from(photo));
                self.last_error = None;
            }
            Err(e) => {
                warn!(error = %e, "Capture failed");
                self.last_error = Some(ScreenError::from(&e));
            }
        }
        Task::none()
    }

    pub(crate) fn handle_discard(&mut self) -> Task {
        if self.mode() != ScreenMode::Preview {
            debug!(mode = %self.mode(), "Discard ignored");
            return Task::none();
        }
        if self.is_blocked("discard") {
            return Task::none();
        }

        self.last_error = None;
        let Some(session) = self.session.take() else {
            return Task::none();
        };
        info!(uri = %session.uri, "Photo discarded");
        let camera = Arc::clone(&self.collaborators.camera);
        Task::future(async move { camera.release_capture(&session.uri).await })
    }

    pub(crate) fn handle_save(&mut self) -> Task {
        if self.mode() != ScreenMode::Preview {
            debug!(mode = %self.mode(), "Save ignored");
            return Task::none();
        }
        if self.is_blocked("save") {
            return Task::none();
        }
        let Some(uri) = self.session.as_ref().map(|session| session.uri.clone()) else {
            return Task::none();
        };

        info!(uri = %uri, watermark = self.options.watermark.is_some(), "Saving photo");
        self.pending = Some(PendingAction::Saving);
        Task::perform(
            save_photo(
                self.collaborators.clone(),
                self.options.watermark.clone(),
                uri,
            ),
            Message::SaveFinished,
        )
    }

    pub(crate) fn handle_save_finished(&mut self, result: Result<PathBuf, SaveError>) -> Task {
        if self.pending != Some(PendingAction::Saving) {
            debug!("Ignoring stray save result");
            return Task::none();
        }
        self.pending = None;

        match result {
            Ok(path) => {
                info!(path = %path.display(), "Photo stored in library");
                self.session = None;
                self.last_error = None;
                self.last_saved = Some(path);
            }
            Err(e) => {
                warn!(error = %e, "Save failed, keeping photo in preview");
                self.last_error = Some(ScreenError::from(&e));
            }
        }
        Task::none()
    }
}
