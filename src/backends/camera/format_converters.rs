// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion utilities
//!
//! Every backend hands RGBA frames to the rest of the application; these
//! helpers turn raw driver buffers into that layout.

use super::types::{BackendError, BackendResult, CameraFormat, CameraFrame};

/// Split a driver buffer into rows of `row_bytes` visible bytes
///
/// `stride` is the negotiated bytes-per-line; 0 means tightly packed.
/// Rows missing from a short buffer come back empty.
fn rows(
    data: &[u8],
    stride: usize,
    row_bytes: usize,
    height: u32,
) -> impl Iterator<Item = &[u8]> {
    let stride = if stride == 0 { row_bytes } else { stride.max(row_bytes) };
    (0..height as usize).map(move |row| {
        let start = row * stride;
        let end = (start + row_bytes).min(data.len());
        data.get(start..end).unwrap_or_default()
    })
}

/// Convert YUYV (YUV 4:2:2) to RGBA
///
/// YUYV format: Y0 U0 Y1 V0 - each 4-byte group encodes 2 pixels.
/// Uses BT.601 coefficients for YUV to RGB conversion.
pub fn yuyv_to_rgba(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    let row_pixels = width as usize;
    let mut rgba = Vec::with_capacity(row_pixels * height as usize * 4);

    for line in rows(data, stride as usize, row_pixels * 2, height) {
        let row_start = rgba.len();
        for chunk in line.chunks_exact(4) {
            let y0 = chunk[0] as f32;
            let u = chunk[1] as f32 - 128.0;
            let y1 = chunk[2] as f32;
            let v = chunk[3] as f32 - 128.0;

            for y in [y0, y1] {
                let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
                let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
                let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
                rgba.extend_from_slice(&[r, g, b, 255]);
            }
        }
        rgba.resize(row_start + row_pixels * 4, 0);
    }
    rgba
}

/// Expand packed RGB24 to RGBA with an opaque alpha channel
pub fn rgb24_to_rgba(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    let row_pixels = width as usize;
    let mut rgba = Vec::with_capacity(row_pixels * height as usize * 4);
    for line in rows(data, stride as usize, row_pixels * 3, height) {
        let row_start = rgba.len();
        for px in line.chunks_exact(3) {
            rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }
        rgba.resize(row_start + row_pixels * 4, 0);
    }
    rgba
}

/// Expand 8-bit grayscale to RGBA
pub fn gray8_to_rgba(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    let row_pixels = width as usize;
    let mut rgba = Vec::with_capacity(row_pixels * height as usize * 4);
    for line in rows(data, stride as usize, row_pixels, height) {
        let row_start = rgba.len();
        for &v in line {
            rgba.extend_from_slice(&[v, v, v, 255]);
        }
        rgba.resize(row_start + row_pixels * 4, 0);
    }
    rgba
}

/// Decode a raw driver buffer into an RGBA frame
///
/// `format` carries the FourCC, the dimensions and the negotiated
/// bytes-per-line of the stream.
pub fn decode_to_frame(format: &CameraFormat, data: &[u8]) -> BackendResult<CameraFrame> {
    let CameraFormat {
        width,
        height,
        bytes_per_line: stride,
        ..
    } = *format;
    match format.pixel_format.as_str() {
        "MJPG" | "JPEG" => {
            let decoded =
                image::load_from_memory_with_format(data, image::ImageFormat::Jpeg).map_err(|e| {
                    BackendError::FormatNotSupported(format!("MJPEG decode failed: {}", e))
                })?;
            let rgba = decoded.to_rgba8();
            let (w, h) = rgba.dimensions();
            Ok(CameraFrame::from_rgba(w, h, rgba.into_raw()))
        }
        "YUYV" => Ok(CameraFrame::from_rgba(
            width,
            height,
            yuyv_to_rgba(data, width, height, stride),
        )),
        "RGB3" => Ok(CameraFrame::from_rgba(
            width,
            height,
            rgb24_to_rgba(data, width, height, stride),
        )),
        "GREY" => Ok(CameraFrame::from_rgba(
            width,
            height,
            gray8_to_rgba(data, width, height, stride),
        )),
        other => Err(BackendError::FormatNotSupported(other.to_string())),
    }
}

/// FourCC codes the decoder understands, in order of preference
pub const SUPPORTED_FOURCCS: &[&str] = &["MJPG", "YUYV", "RGB3", "GREY"];

#[cfg(test)]
mod tests {
    use super::*;

    fn format(fourcc: &str, width: u32, height: u32, bytes_per_line: u32) -> CameraFormat {
        CameraFormat {
            width,
            height,
            pixel_format: fourcc.to_string(),
            bytes_per_line,
        }
    }

    #[test]
    fn test_yuyv_neutral_chroma_is_gray() {
        // Two pixels with luma 100/200 and neutral chroma
        let rgba = yuyv_to_rgba(&[100, 128, 200, 128], 2, 1, 0);
        assert_eq!(rgba, vec![100, 100, 100, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn test_yuyv_short_buffer_is_padded() {
        let rgba = yuyv_to_rgba(&[100, 128, 200, 128], 4, 1, 0);
        assert_eq!(rgba.len(), 16);
    }

    #[test]
    fn test_yuyv_skips_row_padding() {
        // 2x2 frame, 4 visible bytes per row padded to 8
        let data = [
            10, 128, 20, 128, 0xEE, 0xEE, 0xEE, 0xEE, //
            30, 128, 40, 128, 0xEE, 0xEE, 0xEE, 0xEE,
        ];
        let rgba = yuyv_to_rgba(&data, 2, 2, 8);
        let luma: Vec<u8> = rgba.chunks_exact(4).map(|px| px[0]).collect();
        assert_eq!(luma, vec![10, 20, 30, 40]);
    }

    #[test]
    fn test_gray8_expands() {
        assert_eq!(gray8_to_rgba(&[7], 1, 1, 0), vec![7, 7, 7, 255]);
    }

    #[test]
    fn test_padded_rgb24_rows() {
        let data = [1, 2, 3, 0, 4, 5, 6, 0];
        let rgba = rgb24_to_rgba(&data, 1, 2, 4);
        assert_eq!(rgba, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn test_unknown_fourcc_rejected() {
        assert!(decode_to_frame(&format("H264", 1, 1, 0), &[]).is_err());
    }

    #[test]
    fn test_mjpeg_decodes() {
        let img = image::RgbImage::from_pixel(4, 2, image::Rgb([10, 20, 30]));
        let mut jpeg = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();
        let frame = decode_to_frame(&format("MJPG", 0, 0, 0), &jpeg).unwrap();
        assert_eq!((frame.width, frame.height), (4, 2));
        assert_eq!(frame.data.len(), 4 * 2 * 4);
    }
}
