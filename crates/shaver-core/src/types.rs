// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: engine handles, render flags, page geometry and output formats.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Opaque handle to a parsed document owned by a document engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

/// Opaque handle to a loaded page owned by a document engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageHandle(u64);

/// Opaque handle to a page's text layer owned by a document engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextPageHandle(u64);

macro_rules! raw_handle {
    ($name:ident) => {
        impl $name {
            pub fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            pub fn raw(self) -> u64 {
                self.0
            }
        }
    };
}

raw_handle!(DocumentHandle);
raw_handle!(PageHandle);
raw_handle!(TextPageHandle);

/// Why an engine refused to open a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// File missing or unreadable.
    File,
    /// Not a document the engine understands.
    Format,
    /// Encrypted and no usable password.
    Password,
    /// Unsupported security handler.
    Security,
    /// Content requires a handler the engine lacks.
    Handler,
    Unknown,
}

/// Rasterization flags passed to the engine's page renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderFlags(u32);

impl RenderFlags {
    /// Render as for printing, without annotation appearances.
    pub const PRINTING: Self = Self(0x800);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Natural size of a page in points, as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Width divided by height.
    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }
}

/// Bit positions of the colour channels inside one 32-bit pixel read as a
/// little-endian word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMasks {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
}

impl ChannelMasks {
    /// Bytes laid out R, G, B, A.
    pub const RGBA: Self = Self {
        red: 0x0000_00FF,
        green: 0x0000_FF00,
        blue: 0x00FF_0000,
    };

    /// Bytes laid out B, G, R, A.
    pub const BGRA: Self = Self {
        red: 0x00FF_0000,
        green: 0x0000_FF00,
        blue: 0x0000_00FF,
    };
}

/// Encoded image formats a rendered page can be written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    Tga,
    WebP,
    Pnm,
    Ico,
}

impl OutputFormat {
    /// Infer the output format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" | "jpe" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            "tga" => Some(Self::Tga),
            "webp" => Some(Self::WebP),
            "pnm" | "ppm" => Some(Self::Pnm),
            "ico" => Some(Self::Ico),
            _ => None,
        }
    }

    /// Infer the output format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Indexed-colour formats must be quantized before saving.
    pub fn requires_palette(&self) -> bool {
        matches!(self, Self::Gif)
    }
}

/// Encoder options handed to the codec's save call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// JPEG quality, 1-100. Ignored by other formats.
    pub jpeg_quality: u8,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self { jpeg_quality: 90 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension_ignores_case() {
        assert_eq!(
            OutputFormat::from_path(Path::new("out.PNG")),
            Some(OutputFormat::Png)
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("scan.jpeg")),
            Some(OutputFormat::Jpeg)
        );
    }

    #[test]
    fn unknown_or_missing_extension_is_none() {
        assert_eq!(OutputFormat::from_path(Path::new("out.xyz")), None);
        assert_eq!(OutputFormat::from_path(Path::new("out")), None);
        assert_eq!(OutputFormat::from_path(Path::new(".png")), None);
    }

    #[test]
    fn only_gif_needs_a_palette() {
        assert!(OutputFormat::Gif.requires_palette());
        assert!(!OutputFormat::Png.requires_palette());
        assert!(!OutputFormat::Jpeg.requires_palette());
    }

    #[test]
    fn empty_flags_do_not_print() {
        assert!(RenderFlags::PRINTING.contains(RenderFlags::PRINTING));
        assert!(!RenderFlags::default().contains(RenderFlags::PRINTING));
    }

    #[test]
    fn aspect_is_width_over_height() {
        assert_eq!(PageSize::new(200.0, 100.0).aspect(), 2.0);
    }
}
