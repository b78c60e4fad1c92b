// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Offscreen RGBA bitmap that document engines rasterize pages into.

use crate::error::RenderError;
use crate::types::ChannelMasks;

/// Bytes per pixel of every bitmap (8 bits per channel, four channels).
pub const BYTES_PER_PIXEL: usize = 4;

/// An owned, top-down, 32 bits-per-pixel RGBA pixel buffer.
///
/// `stride` is kept as a signed value because engines report it that way and
/// the render pipeline validates it before anything downstream trusts it.
#[derive(Debug, Clone)]
pub struct Bitmap {
    width: u32,
    height: u32,
    stride: i32,
    data: Vec<u8>,
}

impl Bitmap {
    /// Allocate a zeroed bitmap. Allocation failure is reported, not aborted on.
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        let invalid = || RenderError::InvalidDimensions {
            width: u64::from(width),
            height: u64::from(height),
        };
        if width == 0 || height == 0 {
            return Err(invalid());
        }

        let row_bytes = (width as usize)
            .checked_mul(BYTES_PER_PIXEL)
            .ok_or_else(invalid)?;
        let stride = i32::try_from(row_bytes).map_err(|_| invalid())?;
        let len = row_bytes.checked_mul(height as usize).ok_or_else(invalid)?;

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| RenderError::Allocation { width, height })?;
        data.resize(len, 0);

        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// Assemble a bitmap from parts supplied by an engine.
    ///
    /// No geometry checks happen here.
    pub fn from_raw_parts(width: u32, height: u32, stride: i32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Length of one row in bytes.
    pub fn stride(&self) -> i32 {
        self.stride
    }

    /// Channel layout of each pixel.
    pub fn masks(&self) -> ChannelMasks {
        ChannelMasks::RGBA
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Whether rows are tightly packed (stride equals width in bytes).
    pub fn is_packed(&self) -> bool {
        usize::try_from(self.stride).ok()
            == (self.width as usize).checked_mul(BYTES_PER_PIXEL)
            && self.data.len() >= self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }

    /// Fill every pixel with `rgba`.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        let Ok(stride) = usize::try_from(self.stride) else {
            return;
        };
        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        if stride == 0 {
            return;
        }
        for row in self.data.chunks_mut(stride).take(self.height as usize) {
            let end = row_bytes.min(row.len());
            for pixel in row[..end].chunks_exact_mut(BYTES_PER_PIXEL) {
                pixel.copy_from_slice(&rgba);
            }
        }
    }

    /// Read one pixel as RGBA, or `None` outside the bitmap.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let stride = usize::try_from(self.stride).ok()?;
        let offset = y as usize * stride + x as usize * BYTES_PER_PIXEL;
        let bytes = self.data.get(offset..offset + BYTES_PER_PIXEL)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}
