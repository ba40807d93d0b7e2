// SPDX-License-Identifier: GPL-3.0-only

//! Text watermark post-processing
//!
//! Burns a fixed line of text into a captured photo before it is written
//! to the library. The stamped copy is written next to the source as
//! `<stem>_marked.<ext>`; the source file is left untouched.

use super::PostProcessor;
use super::encoding::{EncodingFormat, PhotoEncoder};
use crate::constants::watermark as defaults;
use crate::errors::SaveError;
use crate::storage::{path_from_uri, to_file_uri};
use ab_glyph::{FontVec, PxScale};
use async_trait::async_trait;
use image::Rgb;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Font file extensions considered during font lookup
const FONT_EXTENSIONS: &[&str] = &["ttf", "otf"];

/// Maximum directory depth searched below each font root
const FONT_SEARCH_DEPTH: usize = 4;

/// Watermark parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStamp {
    /// Text to burn into the image
    pub text: String,
    /// Left edge in pixels
    pub x: u32,
    /// Top edge in pixels
    pub y: u32,
    /// Colour as `#RRGGBB`
    pub color: String,
    /// Font name (file stem) looked up in the system font directories;
    /// any installed font is used when it is missing
    pub font_name: String,
    /// Explicit font file, takes precedence over `font_name`
    pub font_path: Option<PathBuf>,
    /// Font size in pixels
    pub font_size: f32,
    /// Multiplier applied to `font_size`
    pub scale: f32,
    /// JPEG quality of the stamped output (1-100)
    pub quality: u8,
}

impl Default for TextStamp {
    fn default() -> Self {
        Self {
            text: defaults::TEXT.to_string(),
            x: defaults::X,
            y: defaults::Y,
            color: defaults::COLOR.to_string(),
            font_name: defaults::FONT_NAME.to_string(),
            font_path: None,
            font_size: defaults::FONT_SIZE,
            scale: defaults::SCALE,
            quality: defaults::QUALITY,
        }
    }
}

impl TextStamp {
    /// Effective pixel height of the text
    pub fn pixel_size(&self) -> f32 {
        (self.font_size * self.scale).max(1.0)
    }
}

/// Parse `#RRGGBB` (the leading `#` is optional)
pub fn parse_color(color: &str) -> Result<Rgb<u8>, String> {
    let hex = color.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("Invalid colour: {}", color));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("Invalid colour: {}", e))
    };
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

/// Directories searched for fonts, most specific first
pub fn font_search_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Some(data) = dirs::data_dir() {
        roots.push(data.join("fonts"));
    }
    if let Some(home) = dirs::home_dir() {
        roots.push(home.join(".fonts"));
    }
    roots.push(PathBuf::from("/usr/local/share/fonts"));
    roots.push(PathBuf::from("/usr/share/fonts"));
    roots
}

/// Find a font file whose stem matches `name` (case-insensitive)
pub fn find_font(name: &str, roots: &[PathBuf]) -> Option<PathBuf> {
    let stem_matches = |path: &Path| {
        path.file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.eq_ignore_ascii_case(name))
    };
    roots
        .iter()
        .find_map(|root| find_font_in(root, &stem_matches, FONT_SEARCH_DEPTH))
}

/// First font file below the roots, in path order
pub fn find_any_font(roots: &[PathBuf]) -> Option<PathBuf> {
    roots
        .iter()
        .find_map(|root| find_font_in(root, &|_: &Path| true, FONT_SEARCH_DEPTH))
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| FONT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

fn find_font_in(dir: &Path, matches: &dyn Fn(&Path) -> bool, depth: usize) -> Option<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .collect();
    entries.sort();

    let (subdirs, files): (Vec<_>, Vec<_>) = entries.into_iter().partition(|path| path.is_dir());
    if let Some(font) = files
        .into_iter()
        .find(|path| is_font_file(path) && matches(path.as_path()))
    {
        return Some(font);
    }

    if depth == 0 {
        return None;
    }
    subdirs
        .iter()
        .find_map(|sub| find_font_in(sub, matches, depth - 1))
}

/// Suffix appended to the stem of stamped copies
const MARKED_SUFFIX: &str = "_marked";

/// Path of the stamped copy for a source image
pub fn marked_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "photo".to_string());
    let ext = source
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "jpg".to_string());
    source.with_file_name(format!("{}{}.{}", stem, MARKED_SUFFIX, ext))
}

/// Post-processor that stamps text using `imageproc`
pub struct WatermarkProcessor {
    font_roots: Vec<PathBuf>,
}

impl WatermarkProcessor {
    /// Create a processor that searches the system font directories
    pub fn new() -> Self {
        Self {
            font_roots: font_search_roots(),
        }
    }

    /// Create a processor that searches only the given font directories
    pub fn with_font_roots(font_roots: Vec<PathBuf>) -> Self {
        Self { font_roots }
    }

    /// Font file for `stamp`
    ///
    /// An explicit `font_path` is used as is. A `font_name` that is not
    /// installed falls back to the first font found, so saving does not
    /// depend on one particular font package.
    pub fn resolve_font(&self, stamp: &TextStamp) -> Result<PathBuf, SaveError> {
        if let Some(path) = &stamp.font_path {
            return Ok(path.clone());
        }
        if let Some(path) = find_font(&stamp.font_name, &self.font_roots) {
            return Ok(path);
        }
        let fallback = find_any_font(&self.font_roots).ok_or_else(|| {
            SaveError::StampFailed(format!("No font installed (wanted {})", stamp.font_name))
        })?;
        warn!(
            wanted = %stamp.font_name,
            using = %fallback.display(),
            "Watermark font not installed, using fallback"
        );
        Ok(fallback)
    }

    fn load_font(&self, stamp: &TextStamp) -> Result<FontVec, SaveError> {
        let path = self.resolve_font(stamp)?;
        debug!(font = %path.display(), "Loading watermark font");
        let bytes = std::fs::read(&path)
            .map_err(|e| SaveError::StampFailed(format!("{}: {}", path.display(), e)))?;
        FontVec::try_from_vec(bytes)
            .map_err(|e| SaveError::StampFailed(format!("{}: {}", path.display(), e)))
    }

    /// Stamp `source` and write the result; runs on the current thread
    pub fn stamp_blocking(&self, source: &Path, stamp: &TextStamp) -> Result<PathBuf, SaveError> {
        let color = parse_color(&stamp.color).map_err(SaveError::StampFailed)?;
        let font = self.load_font(stamp)?;

        let mut image = image::open(source)
            .map_err(|e| SaveError::StampFailed(format!("{}: {}", source.display(), e)))?
            .to_rgb8();

        imageproc::drawing::draw_text_mut(
            &mut image,
            color,
            stamp.x as i32,
            stamp.y as i32,
            PxScale::from(stamp.pixel_size()),
            &font,
            &stamp.text,
        );

        let output = marked_path(source);
        let mut encoder = PhotoEncoder::new(stamp.quality);
        encoder.set_format(EncodingFormat::from_path(&output));
        let encoded = encoder
            .encode_blocking(image)
            .map_err(SaveError::StampFailed)?;
        std::fs::write(&output, &encoded.data)?;

        info!(
            source = %source.display(),
            output = %output.display(),
            text = %stamp.text,
            "Watermark applied"
        );
        Ok(output)
    }
}

impl Default for WatermarkProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PostProcessor for WatermarkProcessor {
    async fn stamp_text(&self, uri: &str, stamp: &TextStamp) -> Result<String, SaveError> {
        let source = path_from_uri(uri)?;
        let stamp = stamp.clone();
        let processor = Self::with_font_roots(self.font_roots.clone());

        let output = tokio::task::spawn_blocking(move || processor.stamp_blocking(&source, &stamp))
            .await
            .map_err(|e| SaveError::StampFailed(format!("Watermark task error: {}", e)))??;

        Ok(to_file_uri(&output))
    }

    async fn release(&self, uri: &str) {
        let Ok(path) = path_from_uri(uri) else {
            return;
        };
        let is_marked = path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.ends_with(MARKED_SUFFIX));
        if !is_marked {
            return;
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "Stamped copy removed"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove stamped copy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stamp_matches_constants() {
        let stamp = TextStamp::default();
        assert_eq!(stamp.text, "text marker");
        assert_eq!((stamp.x, stamp.y), (150, 150));
        assert_eq!(stamp.pixel_size(), 44.0);
        assert_eq!(stamp.quality, 100);
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#FF0000").unwrap(), Rgb([255, 0, 0]));
        assert_eq!(parse_color("00ff7f").unwrap(), Rgb([0, 255, 127]));
        assert!(parse_color("#F00").is_err());
        assert!(parse_color("#GG0000").is_err());
    }

    #[test]
    fn test_marked_path_keeps_extension() {
        assert_eq!(
            marked_path(Path::new("/tmp/a.jpg")),
            PathBuf::from("/tmp/a_marked.jpg")
        );
    }

    #[test]
    fn test_find_font_nested_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("truetype").join("dejavu");
        std::fs::create_dir_all(&nested).unwrap();
        let font = nested.join("DejaVuSans-BoldOblique.ttf");
        std::fs::write(&font, b"not really a font").unwrap();

        let roots = vec![dir.path().to_path_buf()];
        assert_eq!(find_font("dejavusans-boldoblique", &roots), Some(font));
        assert_eq!(find_font("Missing", &roots), None);
    }

    #[test]
    fn test_missing_font_name_falls_back_to_installed_font() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("truetype").join("dejavu");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("README"), b"not a font").unwrap();
        let serif = nested.join("DejaVuSerif.ttf");
        std::fs::write(&serif, b"font bytes").unwrap();

        let processor = WatermarkProcessor::with_font_roots(vec![dir.path().to_path_buf()]);
        assert_eq!(processor.resolve_font(&TextStamp::default()).unwrap(), serif);
    }

    #[test]
    fn test_explicit_font_path_wins() {
        let stamp = TextStamp {
            font_path: Some(PathBuf::from("/opt/fonts/Custom.otf")),
            ..TextStamp::default()
        };
        let processor = WatermarkProcessor::with_font_roots(Vec::new());
        assert_eq!(
            processor.resolve_font(&stamp).unwrap(),
            PathBuf::from("/opt/fonts/Custom.otf")
        );
    }

    #[tokio::test]
    async fn test_stamp_with_substitute_font() {
        // Needs one real font on the machine to render with
        let Some(system_font) = find_any_font(&font_search_roots()) else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let fonts = dir.path().join("fonts");
        std::fs::create_dir_all(&fonts).unwrap();
        let extension = system_font.extension().unwrap();
        std::fs::copy(&system_font, fonts.join("Substitute").with_extension(extension)).unwrap();

        let source = dir.path().join("a.jpg");
        image::RgbImage::from_pixel(400, 300, Rgb([0, 0, 0]))
            .save(&source)
            .unwrap();

        let processor = WatermarkProcessor::with_font_roots(vec![fonts]);
        let marked = processor
            .stamp_text(&to_file_uri(&source), &TextStamp::default())
            .await
            .unwrap();

        assert_eq!(path_from_uri(&marked).unwrap(), marked_path(&source));
        assert!(marked_path(&source).exists());

        processor.release(&marked).await;
        assert!(!marked_path(&source).exists());
    }

    #[tokio::test]
    async fn test_release_ignores_unstamped_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.jpg");
        std::fs::write(&source, b"x").unwrap();

        WatermarkProcessor::with_font_roots(Vec::new())
            .release(&to_file_uri(&source))
            .await;

        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_missing_font_is_stamp_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.jpg");
        image::RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]))
            .save(&source)
            .unwrap();

        let processor = WatermarkProcessor::with_font_roots(vec![dir.path().to_path_buf()]);
        let result = processor
            .stamp_text(&to_file_uri(&source), &TextStamp::default())
            .await;

        assert!(matches!(result, Err(SaveError::StampFailed(_))));
        assert!(!marked_path(&source).exists());
    }
}
