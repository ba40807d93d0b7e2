// SPDX-License-Identifier: GPL-3.0-only

//! Message handler modules
//!
//! Each module adds `handle_*` methods to [`crate::app::CaptureScreen`]
//! for one functional area.

pub mod camera;
pub mod capture;
pub mod permission;
