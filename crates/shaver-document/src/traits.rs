// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine-agnostic trait definitions for the two external capabilities the
// renderer sits between: a document engine that parses and rasterizes pages,
// and an image codec that encodes pixel buffers into files.

use std::path::Path;

use shaver_core::bitmap::Bitmap;
use shaver_core::error::RenderError;
use shaver_core::types::{
    ChannelMasks, DocumentHandle, LoadStatus, OutputFormat, PageHandle, RenderFlags, SaveOptions,
    TextPageHandle,
};

/// Parses documents and rasterizes their pages.
///
/// Every handle returned here is owned by the caller until it is passed back
/// to the matching `close_*` call. Handles must never be used after that.
pub trait DocumentEngine {
    /// Open and parse a document.
    fn open_document(&mut self, path: &Path) -> Result<DocumentHandle, LoadStatus>;

    /// Release a document handle. Every page handle opened against it must
    /// already be closed.
    fn close_document(&mut self, document: DocumentHandle);

    /// Number of pages in an open document.
    fn page_count(&self, document: DocumentHandle) -> usize;

    /// Open the page at zero-based `index`. Returns `None` when out of range.
    fn open_page(&mut self, document: DocumentHandle, index: usize) -> Option<PageHandle>;

    fn close_page(&mut self, page: PageHandle);

    /// Open the text layer of a loaded page.
    fn open_text_page(&mut self, page: PageHandle) -> Option<TextPageHandle>;

    fn close_text_page(&mut self, text: TextPageHandle);

    /// Natural page width in points.
    fn page_width(&self, page: PageHandle) -> f64;

    /// Natural page height in points.
    fn page_height(&self, page: PageHandle) -> f64;

    /// Allocate an offscreen bitmap. `None` when allocation fails.
    fn create_bitmap(&self, width: u32, height: u32) -> Option<Bitmap> {
        Bitmap::new(width, height).ok()
    }

    /// Rasterize `page` scaled to fill `bitmap`.
    fn render_page(&self, page: PageHandle, bitmap: &mut Bitmap, flags: RenderFlags);
}

/// Converts raw pixel buffers into encoded image files.
///
/// Images are released by dropping them.
pub trait ImageCodec {
    type Image;

    /// Interpret a raw pixel buffer as an image.
    #[allow(clippy::too_many_arguments)]
    fn wrap_raw_buffer(
        &self,
        bytes: &[u8],
        width: u32,
        height: u32,
        stride: i32,
        bpp: u32,
        masks: ChannelMasks,
        top_down: bool,
    ) -> Result<Self::Image, RenderError>;

    /// Convert to `bpp` bits per pixel (24 drops alpha).
    fn convert_depth(&self, image: &Self::Image, bpp: u32) -> Result<Self::Image, RenderError>;

    /// Output format implied by a file name, if supported.
    fn detect_format(&self, path: &Path) -> Option<OutputFormat>;

    /// Reduce to a palette small enough for indexed-colour formats.
    fn quantize(&self, image: &Self::Image) -> Result<Self::Image, RenderError>;

    fn save(
        &self,
        format: OutputFormat,
        image: &Self::Image,
        path: &Path,
        options: &SaveOptions,
    ) -> Result<(), RenderError>;
}
