// SPDX-License-Identifier: MPL-2.0

//! Photo library storage and file reference helpers

use crate::errors::SaveError;
use crate::pipelines::photo::encoding::unique_timestamped_path;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Persistent store of the user's saved photos
#[async_trait]
pub trait LibrarySink: Send + Sync {
    /// Store the image at `uri`; returns where it ended up
    async fn save_to_library(&self, uri: &str) -> Result<PathBuf, SaveError>;
}

/// Format a local path as a `file://` URI
pub fn to_file_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Resolve a `file://` URI (or a bare absolute path) to a local path
pub fn path_from_uri(uri: &str) -> Result<PathBuf, SaveError> {
    let raw = uri.strip_prefix("file://").unwrap_or(uri);
    let path = PathBuf::from(raw);
    if raw.is_empty() || !path.is_absolute() {
        return Err(SaveError::InvalidUri(uri.to_string()));
    }
    Ok(path)
}

/// Photo library backed by a directory (normally `~/Pictures/<folder>`)
#[derive(Debug, Clone)]
pub struct PhotoLibrary {
    directory: PathBuf,
}

impl PhotoLibrary {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    /// Directory receiving saved photos
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

#[async_trait]
impl LibrarySink for PhotoLibrary {
    async fn save_to_library(&self, uri: &str) -> Result<PathBuf, SaveError> {
        let source = path_from_uri(uri)?;
        let extension = source
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_else(|| "jpg".to_string());

        tokio::fs::create_dir_all(&self.directory).await?;
        let destination = unique_timestamped_path(&self.directory, "IMG", &extension);

        debug!(
            source = %source.display(),
            destination = %destination.display(),
            "Copying photo into library"
        );
        tokio::fs::copy(&source, &destination).await?;

        info!(path = %destination.display(), "Photo saved to library");
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_round_trip() {
        let path = Path::new("/tmp/a.jpg");
        assert_eq!(to_file_uri(path), "file:///tmp/a.jpg");
        assert_eq!(path_from_uri("file:///tmp/a.jpg").unwrap(), path);
        assert_eq!(path_from_uri("/tmp/a.jpg").unwrap(), path);
    }

    #[test]
    fn test_relative_uri_rejected() {
        assert!(matches!(
            path_from_uri("file://a.jpg"),
            Err(SaveError::InvalidUri(_))
        ));
        assert!(path_from_uri("").is_err());
    }

    #[tokio::test]
    async fn test_save_copies_into_library() {
        let source_dir = tempfile::tempdir().unwrap();
        let library_dir = tempfile::tempdir().unwrap();
        let source = source_dir.path().join("capture.png");
        std::fs::write(&source, b"png bytes").unwrap();

        let library = PhotoLibrary::new(library_dir.path().join("Camera"));
        let saved = library.save_to_library(&to_file_uri(&source)).await.unwrap();

        assert!(saved.starts_with(library.directory()));
        assert_eq!(saved.extension().unwrap(), "png");
        assert_eq!(std::fs::read(&saved).unwrap(), b"png bytes");
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_save_missing_source_is_write_error() {
        let library_dir = tempfile::tempdir().unwrap();
        let library = PhotoLibrary::new(library_dir.path().to_path_buf());
        let result = library.save_to_library("file:///nonexistent/x.jpg").await;
        assert!(matches!(result, Err(SaveError::WriteError(_))));
    }
}
