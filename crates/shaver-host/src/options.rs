// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Render options as supplied by a host, decoded from loosely typed JSON.

use serde_json::Value;
use shaver_core::error::ConfigurationError;
use shaver_document::RenderSize;

/// Requested output size. Missing dimensions are inferred from the page's
/// aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    /// Decode `{"width": .., "height": ..}`. Both keys are optional and
    /// `null` counts as absent; any other non-integer value is rejected.
    /// Unknown keys are ignored.
    pub fn from_value(value: &Value) -> Result<Self, ConfigurationError> {
        let map = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            other => {
                return Err(ConfigurationError::InvalidOption(format!(
                    "render options must be an object, got {other}"
                )));
            }
        };
        Ok(Self {
            width: dimension(map.get("width"), "width")?,
            height: dimension(map.get("height"), "height")?,
        })
    }

    pub fn size(&self) -> RenderSize {
        RenderSize::new(self.width.unwrap_or(0), self.height.unwrap_or(0))
    }
}

fn dimension(value: Option<&Value>, name: &str) -> Result<Option<u32>, ConfigurationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| {
                ConfigurationError::InvalidOption(format!("{name} must be an integer, got {value}"))
            }),
    }
}
