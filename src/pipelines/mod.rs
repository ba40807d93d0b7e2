// SPDX-License-Identifier: GPL-3.0-only

//! Processing pipelines

pub mod photo;
