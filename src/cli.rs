// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras and the lens they serve
//! - Taking a photo headlessly through the capture screen

use snapcam::app::{CaptureScreen, Collaborators, LensFacing, Message, ScreenMode, ScreenOptions};
use snapcam::backends::camera::CameraSource;
use snapcam::config::Config;
use std::path::PathBuf;

/// List all available cameras
pub fn list_cameras(
    config: &Config,
    source: CameraSource,
) -> Result<(), Box<dyn std::error::Error>> {
    let collaborators = Collaborators::for_system(config, source);
    let rt = tokio::runtime::Runtime::new()?;
    let devices = rt.block_on(collaborators.camera.list_devices());

    if devices.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (facing, camera) in devices.iter() {
        println!("  [{}] {}", facing, camera.name);
        println!("      Path: {}", camera.path);
        if let Some(info) = &camera.device_info {
            println!("      Driver: {}", info.driver);
            if info.real_path != info.path {
                println!("      Device: {}", info.real_path);
            }
        }
        println!();
    }

    Ok(())
}

/// Options for a headless capture
pub struct PhotoOptions {
    pub facing: LensFacing,
    pub watermark: bool,
    pub output: Option<PathBuf>,
}

/// Mount the capture screen, take one photo and save it
pub fn take_photo(
    mut config: Config,
    source: CameraSource,
    options: PhotoOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if !options.watermark {
        config.watermark = None;
    }
    if let Some(output) = &options.output {
        std::fs::create_dir_all(output)?;
        config.save_folder = std::fs::canonicalize(output)?.display().to_string();
    }
    let library_dir = config.photo_directory();
    let collaborators = Collaborators::for_system(&config, source);
    let mut screen = CaptureScreen::new(collaborators, ScreenOptions::from(&config));

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        screen.dispatch(Message::Mount).await;
        if screen.facing() != options.facing {
            screen.dispatch(Message::Flip).await;
        }
        expect_mode(&screen, ScreenMode::LiveCapture)?;

        let device = screen
            .active_device()
            .map(|device| device.name)
            .unwrap_or_default();
        println!("Using camera: {} ({})", device, screen.facing());
        println!("Capturing...");
        screen.dispatch(Message::Capture).await;
        expect_mode(&screen, ScreenMode::Preview)?;

        if let Some(session) = screen.session()
            && let (Some(width), Some(height)) = (session.width, session.height)
        {
            println!("Captured {}x{}", width, height);
        }

        screen.dispatch(Message::Save).await;
        expect_mode(&screen, ScreenMode::LiveCapture)
    })?;

    match screen.last_saved() {
        Some(path) => println!("Photo saved: {}", path.display()),
        None => println!("Photo saved to {}", library_dir.display()),
    }
    Ok(())
}

/// Fail with the screen's last error unless it reached `expected`
fn expect_mode(
    screen: &CaptureScreen,
    expected: ScreenMode,
) -> Result<(), Box<dyn std::error::Error>> {
    let mode = screen.mode();
    if mode == expected {
        return Ok(());
    }
    match (screen.last_error(), mode) {
        (Some(error), _) => Err(error.to_string().into()),
        (None, ScreenMode::NoDevice) => {
            Err(format!("No {} camera available", screen.facing()).into())
        }
        (None, _) => Err(format!("Camera is in {} state, expected {}", mode, expected).into()),
    }
}
