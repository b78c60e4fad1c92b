// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output size inference. A zero dimension means "not requested".

use shaver_core::error::RenderError;
use shaver_core::types::PageSize;

/// Requested output size in pixels; zero leaves that dimension to inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

impl RenderSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Render at the page's natural size.
    pub fn natural() -> Self {
        Self::default()
    }

    pub fn width(width: u32) -> Self {
        Self { width, height: 0 }
    }

    pub fn height(height: u32) -> Self {
        Self { width: 0, height }
    }

    /// Resolve against the page's natural size, preserving its aspect ratio
    /// for whichever dimension was not given. Fractions are truncated.
    pub fn resolve(self, natural: PageSize) -> Result<(u32, u32), RenderError> {
        let aspect = natural.aspect();
        let (width, height) = match (self.width, self.height) {
            (0, 0) => (truncate(natural.width), truncate(natural.height)),
            (w, 0) => (u64::from(w), truncate(f64::from(w) / aspect)),
            (0, h) => (truncate(f64::from(h) * aspect), u64::from(h)),
            (w, h) => (u64::from(w), u64::from(h)),
        };

        match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok((w, h)),
            _ => Err(RenderError::InvalidDimensions { width, height }),
        }
    }
}

/// Truncate toward zero; NaN and negatives become zero, huge values saturate.
fn truncate(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}
