// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rendering configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, Result};
use crate::types::SaveOptions;

/// Settings shared by every render in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaverConfig {
    /// JPEG quality (1-100) for `.jpg` output.
    pub jpeg_quality: u8,
    /// Upper bound on width x height of a single render.
    pub max_pixels: u64,
}

impl Default for ShaverConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            max_pixels: 100_000_000,
        }
    }
}

impl ShaverConfig {
    /// Load and validate a JSON configuration file. Missing keys take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigurationError::InvalidConfig(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        if self.max_pixels == 0 {
            return Err(ConfigurationError::InvalidConfig(
                "max_pixels must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn save_options(&self) -> SaveOptions {
        SaveOptions {
            jpeg_quality: self.jpeg_quality,
        }
    }
}
