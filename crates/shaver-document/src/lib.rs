// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// shaver-document: page rendering for Shaver.
//
// Provides the engine traits that separate document parsing from image
// encoding, a lopdf-backed document engine (plus a PDFium one behind the
// `pdfium` feature), an `image`-backed codec, the registry that owns
// documents and their dependent pages, and the renderer that turns a page
// into an encoded image file.

pub mod image;
pub mod lifecycle;
pub mod pdf;
pub mod render;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the primary structs so callers can use `shaver_document::Registry` etc.
pub use self::image::codec::RasterCodec;
pub use lifecycle::{DocumentId, PageId, Registry};
pub use pdf::engine::LopdfEngine;
#[cfg(feature = "pdfium")]
pub use pdf::pdfium::PdfiumEngine;
pub use render::dimensions::RenderSize;
pub use render::pipeline::Renderer;
pub use traits::{DocumentEngine, ImageCodec};
