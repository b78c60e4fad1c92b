// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster codec. Turns raw engine bitmaps into encoded image files using the
// `image` crate.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use shaver_core::error::RenderError;
use shaver_core::types::{ChannelMasks, OutputFormat, SaveOptions};
use tracing::{debug, instrument, warn};

use super::quantize::Palette;
use crate::traits::ImageCodec;

/// [`ImageCodec`] backed by `image::DynamicImage`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterCodec;

impl RasterCodec {
    pub fn new() -> Self {
        Self
    }
}

/// Byte offset of a channel inside a 32-bit little-endian pixel.
fn channel_offset(mask: u32) -> Option<usize> {
    if mask.count_ones() != 8 || mask.trailing_zeros() % 8 != 0 {
        return None;
    }
    Some((mask.trailing_zeros() / 8) as usize)
}

fn image_format(format: OutputFormat) -> ImageFormat {
    match format {
        OutputFormat::Png => ImageFormat::Png,
        OutputFormat::Jpeg => ImageFormat::Jpeg,
        OutputFormat::Gif => ImageFormat::Gif,
        OutputFormat::Bmp => ImageFormat::Bmp,
        OutputFormat::Tiff => ImageFormat::Tiff,
        OutputFormat::Tga => ImageFormat::Tga,
        OutputFormat::WebP => ImageFormat::WebP,
        OutputFormat::Pnm => ImageFormat::Pnm,
        OutputFormat::Ico => ImageFormat::Ico,
    }
}

impl ImageCodec for RasterCodec {
    type Image = DynamicImage;

    fn wrap_raw_buffer(
        &self,
        bytes: &[u8],
        width: u32,
        height: u32,
        stride: i32,
        bpp: u32,
        masks: ChannelMasks,
        top_down: bool,
    ) -> Result<DynamicImage, RenderError> {
        if bpp != 32 {
            return Err(RenderError::Codec(format!(
                "unsupported source depth {bpp}"
            )));
        }
        let stride = usize::try_from(stride)
            .map_err(|_| RenderError::Codec(format!("negative stride {stride}")))?;
        let row_bytes = width as usize * 4;
        if stride < row_bytes {
            return Err(RenderError::Codec(format!(
                "stride {stride} shorter than a {width} pixel row"
            )));
        }
        let needed = stride * (height as usize).saturating_sub(1) + row_bytes;
        if height == 0 || bytes.len() < needed {
            return Err(RenderError::Codec(format!(
                "buffer of {} bytes too small for {width}x{height}",
                bytes.len()
            )));
        }

        let (Some(r), Some(g), Some(b)) = (
            channel_offset(masks.red),
            channel_offset(masks.green),
            channel_offset(masks.blue),
        ) else {
            return Err(RenderError::Codec(format!("unsupported channel masks {masks:?}")));
        };
        if r == g || g == b || r == b {
            return Err(RenderError::Codec(format!("overlapping channel masks {masks:?}")));
        }
        let a = 6 - r - g - b;

        let mut image = RgbaImage::new(width, height);
        for y in 0..height {
            let source_row = (if top_down { y } else { height - 1 - y }) as usize;
            let start = source_row * stride;
            let row = &bytes[start..start + row_bytes];
            for (x, px) in row.chunks_exact(4).enumerate() {
                image.put_pixel(x as u32, y, Rgba([px[r], px[g], px[b], px[a]]));
            }
        }
        Ok(DynamicImage::ImageRgba8(image))
    }

    fn convert_depth(&self, image: &DynamicImage, bpp: u32) -> Result<DynamicImage, RenderError> {
        match bpp {
            24 => Ok(DynamicImage::ImageRgb8(image.to_rgb8())),
            32 => Ok(DynamicImage::ImageRgba8(image.to_rgba8())),
            other => Err(RenderError::Codec(format!(
                "unsupported target depth {other}"
            ))),
        }
    }

    fn detect_format(&self, path: &Path) -> Option<OutputFormat> {
        OutputFormat::from_path(path)
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn quantize(&self, image: &DynamicImage) -> Result<DynamicImage, RenderError> {
        let mut rgb = image.to_rgb8();
        let palette = Palette::median_cut(&rgb, 256);
        debug!(colors = palette.len(), "Palette built");
        image::imageops::dither(&mut rgb, &palette);
        Ok(DynamicImage::ImageRgb8(rgb))
    }

    #[instrument(skip(self, image, options), fields(path = %path.display()))]
    fn save(
        &self,
        format: OutputFormat,
        image: &DynamicImage,
        path: &Path,
        options: &SaveOptions,
    ) -> Result<(), RenderError> {
        let save_error = |reason: String| RenderError::Save {
            path: path.display().to_string(),
            reason,
        };

        let file = File::create(path).map_err(|err| save_error(err.to_string()))?;
        let mut writer = BufWriter::new(file);

        let encoded = match format {
            OutputFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut writer, options.jpeg_quality);
                image.write_with_encoder(encoder)
            }
            other => image.write_to(&mut writer, image_format(other)),
        };
        let outcome = encoded
            .map_err(|err| save_error(err.to_string()))
            .and_then(|()| writer.flush().map_err(|err| save_error(err.to_string())));

        if let Err(err) = &outcome {
            warn!(%err, "Encoding failed, removing partial output");
            drop(writer);
            let _ = std::fs::remove_file(path);
        }
        outcome
    }
}
