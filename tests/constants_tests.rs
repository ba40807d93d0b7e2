// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use snapcam::constants::{file_formats, timing};

#[test]
fn test_image_extensions() {
    assert!(file_formats::is_image_extension("jpg"));
    assert!(file_formats::is_image_extension("PNG"));
    assert!(!file_formats::is_image_extension("mp4"));
}

#[test]
fn test_capture_timing() {
    // Warm-up must leave room for at least one frame before the timeout
    assert!(timing::CAPTURE_WARMUP < timing::CAPTURE_TIMEOUT);
    assert!(timing::FRAME_POLL < timing::CAPTURE_TIMEOUT);
    assert!(timing::TERMINAL_POLL < timing::CAPTURE_WARMUP);
}
