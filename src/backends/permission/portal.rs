// SPDX-License-Identifier: GPL-3.0-only

//! XDG desktop portal permission gateway
//!
//! Camera access goes through `org.freedesktop.portal.Camera` on the
//! session bus, which shows the sandbox permission dialog. Outside a
//! sandbox, or when no portal answers, access is decided by whether the
//! current user can open the `/dev/video*` nodes.

use super::{PermissionGateway, PermissionStatus, has_access};
use crate::constants::timing;
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};

const PORTAL_DESTINATION: &str = "org.freedesktop.portal.Desktop";
const PORTAL_PATH: &str = "/org/freedesktop/portal/desktop";
const CAMERA_INTERFACE: &str = "org.freedesktop.portal.Camera";
const REQUEST_INTERFACE: &str = "org.freedesktop.portal.Request";

/// Portal response code for "user granted"
const RESPONSE_SUCCESS: u32 = 0;

/// Permission gateway backed by the XDG camera portal
pub struct PortalPermissionGateway {
    library_dir: PathBuf,
    require_storage_permission: bool,
}

impl PortalPermissionGateway {
    /// `library_dir` is where saved photos land; storage permission means
    /// being able to write there
    pub fn new(library_dir: PathBuf, require_storage_permission: bool) -> Self {
        Self {
            library_dir,
            require_storage_permission,
        }
    }
}

/// Object path the portal will use for a request with `token`
///
/// Follows the portal convention: the caller's unique bus name without
/// the leading ':' and with '.' replaced by '_'.
pub fn request_path(unique_name: &str, token: &str) -> String {
    let sender = unique_name.trim_start_matches(':').replace('.', "_");
    format!("{}/request/{}/{}", PORTAL_PATH, sender, token)
}

/// Ask the camera portal for access
///
/// Returns `Ok(granted)` when the portal answered, `Err` when it could not
/// be reached.
async fn access_camera_via_portal() -> Result<bool, String> {
    let connection = zbus::Connection::session()
        .await
        .map_err(|e| format!("Failed to connect to session D-Bus: {}", e))?;

    let camera = zbus::Proxy::new(&connection, PORTAL_DESTINATION, PORTAL_PATH, CAMERA_INTERFACE)
        .await
        .map_err(|e| format!("Failed to create camera portal proxy: {}", e))?;

    let present: bool = camera
        .get_property("IsCameraPresent")
        .await
        .map_err(|e| format!("Camera portal unavailable: {}", e))?;
    debug!(present, "Camera portal reachable");

    let unique_name = connection
        .unique_name()
        .map(|name| name.as_str().to_string())
        .ok_or_else(|| "Connection has no unique name".to_string())?;
    let token = format!("snapcam_{}", uuid::Uuid::new_v4().simple());
    let path = request_path(&unique_name, &token);

    // Subscribe before calling so the response cannot be missed
    let request = zbus::Proxy::new(
        &connection,
        PORTAL_DESTINATION,
        path.as_str(),
        REQUEST_INTERFACE,
    )
    .await
    .map_err(|e| format!("Failed to create request proxy: {}", e))?;
    let mut responses = request
        .receive_signal("Response")
        .await
        .map_err(|e| format!("Failed to subscribe to portal response: {}", e))?;

    let mut options: HashMap<&str, Value> = HashMap::new();
    options.insert("handle_token", Value::from(token.as_str()));
    let handle: OwnedObjectPath = camera
        .call("AccessCamera", &(options,))
        .await
        .map_err(|e| format!("AccessCamera failed: {}", e))?;
    debug!(handle = handle.as_str(), "Camera access requested");

    let message = tokio::time::timeout(timing::PERMISSION_PROMPT_TIMEOUT, responses.next())
        .await
        .map_err(|_| "Timed out waiting for the permission dialog".to_string())?
        .ok_or_else(|| "Portal closed the request without answering".to_string())?;

    let body = message.body();
    let (response, _results): (u32, HashMap<String, OwnedValue>) = body
        .deserialize()
        .map_err(|e| format!("Malformed portal response: {}", e))?;

    Ok(response == RESPONSE_SUCCESS)
}

/// Video device nodes present on the system
fn video_nodes() -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir("/dev") else {
        return Vec::new();
    };
    entries
        .flatten()
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("video"))
        .map(|entry| entry.path())
        .collect()
}

#[async_trait]
impl PermissionGateway for PortalPermissionGateway {
    async fn request_camera_permission(&self) -> PermissionStatus {
        match access_camera_via_portal().await {
            Ok(granted) => {
                info!(granted, "Camera portal answered");
                PermissionStatus::from(granted)
            }
            Err(e) => {
                warn!(error = %e, "Camera portal not usable, checking device nodes");
                let nodes = video_nodes();
                let granted = nodes.is_empty()
                    || nodes
                        .iter()
                        .any(|node| has_access(node, libc::R_OK | libc::W_OK));
                PermissionStatus::from(granted)
            }
        }
    }

    fn requires_storage_permission(&self) -> bool {
        self.require_storage_permission
    }

    async fn check_storage_permission(&self) -> bool {
        has_access(&self.library_dir, libc::W_OK)
    }

    async fn request_storage_permission(&self) -> bool {
        if let Err(e) = tokio::fs::create_dir_all(&self.library_dir).await {
            warn!(path = %self.library_dir.display(), error = %e, "Cannot create photo library");
            return false;
        }
        has_access(&self.library_dir, libc::W_OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_path_escapes_sender() {
        assert_eq!(
            request_path(":1.42", "snapcam_abc"),
            "/org/freedesktop/portal/desktop/request/1_42/snapcam_abc"
        );
    }

    #[tokio::test]
    async fn test_storage_request_creates_library() {
        let dir = tempfile::tempdir().unwrap();
        let library = dir.path().join("Pictures").join("Camera");
        let gateway = PortalPermissionGateway::new(library.clone(), true);

        assert!(gateway.requires_storage_permission());
        assert!(!gateway.check_storage_permission().await);
        assert!(gateway.request_storage_permission().await);
        assert!(library.is_dir());
        assert!(gateway.check_storage_permission().await);
    }
}
