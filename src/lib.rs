// SPDX-License-Identifier: MPL-2.0

//! snapcam - a single-screen camera
//!
//! Open a camera, flip between the back and front lens, take a photo,
//! review it, optionally stamp a text watermark on it and store it in the
//! photo library.
//!
//! # Architecture
//!
//! - [`app`]: the capture screen state machine
//! - [`backends`]: permission gateway and camera devices
//! - [`pipelines`]: capture encoding and watermarking
//! - [`storage`]: photo library
//! - [`config`]: user configuration
//! - [`terminal`]: interactive terminal front end

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipelines;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use app::{CaptureScreen, Collaborators, Message, ScreenMode, ScreenOptions};
pub use config::Config;
pub use errors::{AppError, AppResult, ErrorKind};
