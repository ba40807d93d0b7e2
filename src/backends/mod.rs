// SPDX-License-Identifier: GPL-3.0-only

//! Platform collaborators for the capture screen

pub mod camera;
pub mod permission;
