// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: a lopdf-backed document engine and its vector rasterizer, plus
// a PDFium-backed engine behind the `pdfium` feature.

pub mod engine;
#[cfg(feature = "pdfium")]
pub mod pdfium;
pub mod raster;

pub use engine::LopdfEngine;
#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumEngine;
