// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shaver: core types, configuration and error definitions shared across all crates.

pub mod bitmap;
pub mod config;
pub mod error;
pub mod types;

pub use bitmap::Bitmap;
pub use config::ShaverConfig;
pub use error::{ConfigurationError, LoadError, RenderError, ShaverError};
pub use types::*;
