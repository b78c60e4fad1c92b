// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page render pipeline. Loads a page, rasterizes it into an offscreen bitmap
// on a white background, validates the bitmap geometry, hands the pixels to
// the codec and writes the encoded file.
//
// Every intermediate (bitmap, wrapped image, converted image, quantized image)
// is an owned value, so each one is released on every exit path.

use std::path::Path;

use shaver_core::config::ShaverConfig;
use shaver_core::error::{ConfigurationError, RenderError, Result};
use shaver_core::types::{OutputFormat, RenderFlags};
use tracing::{debug, info, instrument, warn};

use super::dimensions::RenderSize;
use crate::lifecycle::{PageId, Registry};
use crate::traits::{DocumentEngine, ImageCodec};

/// Bits per pixel of the engine bitmap handed to the codec.
const SOURCE_BPP: u32 = 32;
/// Bits per pixel of the image that gets encoded (alpha is not exported).
const OUTPUT_BPP: u32 = 24;
/// Opaque white, painted before page content.
const BACKGROUND: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

/// Reject bitmap geometry that could overflow 32-bit arithmetic downstream.
///
/// Requires a non-negative stride, `width <= i32::MAX / height` and
/// `stride * height <= i32::MAX / 3`.
pub fn validate_geometry(
    width: i64,
    height: i64,
    stride: i64,
) -> std::result::Result<(), RenderError> {
    let limit = i64::from(i32::MAX);
    let valid = stride >= 0
        && width > 0
        && height > 0
        && width <= limit
        && height <= limit
        && width <= limit / height
        && stride.checked_mul(height).is_some_and(|bytes| bytes <= limit / 3);
    if valid {
        Ok(())
    } else {
        Err(RenderError::GeometryOverflow {
            width,
            height,
            stride,
        })
    }
}

/// Renders pages to encoded image files.
pub struct Renderer<C: ImageCodec> {
    codec: C,
    config: ShaverConfig,
}

impl<C: ImageCodec> Renderer<C> {
    pub fn new(codec: C, config: ShaverConfig) -> Self {
        Self { codec, config }
    }

    pub fn config(&self) -> &ShaverConfig {
        &self.config
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Output format for `path`, or a configuration error when the extension
    /// is missing or unsupported.
    pub fn output_format(
        &self,
        path: &Path,
    ) -> std::result::Result<OutputFormat, ConfigurationError> {
        self.codec
            .detect_format(path)
            .ok_or_else(|| ConfigurationError::UnsupportedFormat(path.display().to_string()))
    }

    /// Render `page` into `output`.
    ///
    /// The page is loaded if needed and returned to its previous load state
    /// before this returns, whether rendering succeeded or not.
    #[instrument(
        skip(self, registry, output),
        fields(page = %page, output = %output.as_ref().display())
    )]
    pub fn render<E: DocumentEngine>(
        &self,
        registry: &mut Registry<E>,
        page: PageId,
        output: impl AsRef<Path>,
        size: RenderSize,
    ) -> Result<()> {
        let output = output.as_ref();
        let format = self.output_format(output)?;

        let was_loaded = registry.is_page_loaded(page)?;
        if !was_loaded {
            registry.load_page(page)?;
        }

        let outcome = self.render_loaded(registry, page, output, format, size);

        if !was_loaded {
            registry.unload_page(page);
        }
        match &outcome {
            Ok(()) => info!(?format, "Page rendered"),
            Err(err) => warn!(%err, "Page render failed"),
        }
        outcome
    }

    fn render_loaded<E: DocumentEngine>(
        &self,
        registry: &Registry<E>,
        page: PageId,
        output: &Path,
        format: OutputFormat,
        size: RenderSize,
    ) -> Result<()> {
        let natural = registry.page_size(page)?;
        let (width, height) = size.resolve(natural)?;
        if u64::from(width) * u64::from(height) > self.config.max_pixels {
            return Err(RenderError::InvalidDimensions {
                width: u64::from(width),
                height: u64::from(height),
            }
            .into());
        }
        debug!(
            width,
            height,
            natural_width = natural.width,
            natural_height = natural.height,
            "Resolved output size"
        );

        let (engine, handle) = registry.loaded_page(page)?;
        let mut bitmap = engine
            .create_bitmap(width, height)
            .ok_or(RenderError::Allocation { width, height })?;
        bitmap.fill(BACKGROUND);
        engine.render_page(handle, &mut bitmap, RenderFlags::PRINTING);

        if let Err(err) = validate_geometry(
            i64::from(bitmap.width()),
            i64::from(bitmap.height()),
            i64::from(bitmap.stride()),
        ) {
            warn!(%err, "Rejecting rendered bitmap");
            return Err(err.into());
        }

        let raw = self.codec.wrap_raw_buffer(
            bitmap.data(),
            bitmap.width(),
            bitmap.height(),
            bitmap.stride(),
            SOURCE_BPP,
            bitmap.masks(),
            true,
        )?;
        drop(bitmap);

        let image = self.codec.convert_depth(&raw, OUTPUT_BPP)?;
        drop(raw);

        let options = self.config.save_options();
        if format.requires_palette() {
            let indexed = self.codec.quantize(&image)?;
            drop(image);
            self.codec.save(format, &indexed, output, &options)?;
        } else {
            self.codec.save(format, &image, output, &options)?;
        }
        Ok(())
    }
}
