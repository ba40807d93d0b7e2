// SPDX-License-Identifier: GPL-3.0-only

//! Async photo encoding
//!
//! This module handles encoding images to:
//! - JPEG (with quality control)
//! - PNG (lossless)
//!
//! All encoding operations run on the blocking pool to keep the UI
//! context free.

use image::{ImageFormat, RgbImage};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Supported encoding formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingFormat {
    /// JPEG format (lossy compression)
    Jpeg,
    /// PNG format (lossless compression)
    Png,
}

impl EncodingFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            EncodingFormat::Jpeg => "jpg",
            EncodingFormat::Png => "png",
        }
    }

    /// Pick the format matching a file path's extension (JPEG otherwise)
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("png") => EncodingFormat::Png,
            _ => EncodingFormat::Jpeg,
        }
    }
}

/// Encoded image data ready for saving
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: EncodingFormat,
    pub width: u32,
    pub height: u32,
}

/// Photo encoder
#[derive(Debug, Clone, Copy)]
pub struct PhotoEncoder {
    format: EncodingFormat,
    quality: u8,
}

impl PhotoEncoder {
    /// Create a new encoder with JPEG format and the given quality (1-100)
    pub fn new(quality: u8) -> Self {
        Self {
            format: EncodingFormat::Jpeg,
            quality: quality.clamp(1, 100),
        }
    }

    /// Set encoding format
    pub fn set_format(&mut self, format: EncodingFormat) {
        self.format = format;
    }

    /// Encode an image on the blocking pool
    pub async fn encode(&self, image: RgbImage) -> Result<EncodedImage, String> {
        info!(
            width = image.width(),
            height = image.height(),
            format = ?self.format,
            "Starting encoding"
        );

        let encoder = *self;
        tokio::task::spawn_blocking(move || encoder.encode_blocking(image))
            .await
            .map_err(|e| format!("Encoding task error: {}", e))?
    }

    /// Encode an image on the current thread
    pub fn encode_blocking(&self, image: RgbImage) -> Result<EncodedImage, String> {
        let (width, height) = image.dimensions();
        let data = match self.format {
            EncodingFormat::Jpeg => Self::encode_jpeg(&image, self.quality)?,
            EncodingFormat::Png => Self::encode_png(&image)?,
        };

        debug!(size = data.len(), "Encoding complete");

        Ok(EncodedImage {
            data,
            format: self.format,
            width,
            height,
        })
    }

    /// Write encoded data to a timestamped file in `output_dir`
    ///
    /// The name follows `<prefix>_<YYYYmmdd_HHMMSS>.<ext>`; a counter is
    /// appended when that name already exists.
    pub async fn save(
        &self,
        encoded: EncodedImage,
        output_dir: PathBuf,
        prefix: &str,
    ) -> Result<PathBuf, String> {
        let filepath = unique_timestamped_path(&output_dir, prefix, encoded.format.extension());

        info!(path = %filepath.display(), "Saving photo");

        let filepath_clone = filepath.clone();
        tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&output_dir)
                .map_err(|e| format!("Failed to create {}: {}", output_dir.display(), e))?;
            std::fs::write(&filepath_clone, &encoded.data)
                .map_err(|e| format!("Failed to save photo: {}", e))?;
            Ok::<_, String>(())
        })
        .await
        .map_err(|e| format!("Save task error: {}", e))??;

        info!(path = %filepath.display(), "Photo saved successfully");
        Ok(filepath)
    }

    /// Encode image as JPEG
    fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, String> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);

        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);

        encoder
            .encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| format!("JPEG encoding failed: {}", e))?;

        Ok(buffer)
    }

    /// Encode image as PNG
    fn encode_png(image: &RgbImage) -> Result<Vec<u8>, String> {
        let mut buffer = Vec::new();

        image
            .write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| format!("PNG encoding failed: {}", e))?;

        Ok(buffer)
    }
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new(92)
    }
}

/// Build `<dir>/<prefix>_<timestamp>.<ext>`, adding `_N` until the name is free
pub fn unique_timestamped_path(dir: &Path, prefix: &str, extension: &str) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let base = format!("{}_{}", prefix, timestamp);
    let mut candidate = dir.join(format!("{}.{}", base, extension));
    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}_{}.{}", base, counter, extension));
        counter += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_extensions() {
        assert_eq!(EncodingFormat::Jpeg.extension(), "jpg");
        assert_eq!(EncodingFormat::Png.extension(), "png");
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            EncodingFormat::from_path(Path::new("/tmp/a.PNG")),
            EncodingFormat::Png
        );
        assert_eq!(
            EncodingFormat::from_path(Path::new("/tmp/a.jpeg")),
            EncodingFormat::Jpeg
        );
    }

    #[test]
    fn test_quality_is_clamped() {
        let encoder = PhotoEncoder::new(0);
        assert_eq!(encoder.quality, 1);
    }

    #[test]
    fn test_encode_jpeg_produces_jpeg_magic() {
        let img = RgbImage::from_pixel(8, 8, image::Rgb([200, 10, 10]));
        let encoded = PhotoEncoder::new(90).encode_blocking(img).unwrap();
        assert_eq!(&encoded.data[..2], &[0xFF, 0xD8]);
        assert_eq!((encoded.width, encoded.height), (8, 8));
    }

    #[test]
    fn test_unique_path_avoids_collision() {
        let dir = tempfile::tempdir().unwrap();
        let first = unique_timestamped_path(dir.path(), "IMG", "jpg");
        std::fs::write(&first, b"x").unwrap();
        let second = unique_timestamped_path(dir.path(), "IMG", "jpg");
        assert_ne!(first, second);
    }
}
