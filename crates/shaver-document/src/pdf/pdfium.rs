// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document engine backed by PDFium through `pdfium-render`. Paints complete
// pages, including text, images, shadings and clipping. Needs the PDFium
// shared library at run time.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use pdfium_render::prelude::*;
use shaver_core::bitmap::{BYTES_PER_PIXEL, Bitmap};
use shaver_core::types::{DocumentHandle, LoadStatus, PageHandle, RenderFlags, TextPageHandle};
use tracing::{debug, info, instrument, warn};

use crate::traits::DocumentEngine;

struct OpenPage {
    document: u64,
    page: PdfPage<'static>,
}

struct TextLayer {
    page: u64,
    chars: usize,
}

/// [`DocumentEngine`] over a bound PDFium library.
pub struct PdfiumEngine {
    // Declared before `documents`: pages drop first.
    pages: HashMap<u64, OpenPage>,
    text_layers: HashMap<u64, TextLayer>,
    documents: HashMap<u64, PdfDocument<'static>>,
    pdfium: &'static Pdfium,
    next_handle: u64,
}

impl PdfiumEngine {
    /// Bind to PDFium in the working directory, then on the system library
    /// path.
    pub fn new() -> Result<Self, PdfiumError> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())?;
        Ok(Self::with_pdfium(Pdfium::new(bindings)))
    }

    /// Engine over an already bound library. The binding stays alive for the
    /// rest of the process.
    pub fn with_pdfium(pdfium: Pdfium) -> Self {
        info!("PDFium bound");
        Self {
            pages: HashMap::new(),
            text_layers: HashMap::new(),
            documents: HashMap::new(),
            pdfium: Box::leak(Box::new(pdfium)),
            next_handle: 1,
        }
    }

    fn allocate(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    /// Characters on the page behind a text layer.
    pub fn text_chars(&self, text: TextPageHandle) -> Option<usize> {
        self.text_layers.get(&text.raw()).map(|layer| layer.chars)
    }

    /// Handles currently held open, as `(documents, pages, text layers)`.
    pub fn open_handles(&self) -> (usize, usize, usize) {
        (
            self.documents.len(),
            self.pages.len(),
            self.text_layers.len(),
        )
    }
}

fn classify(error: &PdfiumError) -> LoadStatus {
    match error {
        PdfiumError::PdfiumLibraryInternalError(internal) => match internal {
            PdfiumInternalError::FileError => LoadStatus::File,
            PdfiumInternalError::FormatError => LoadStatus::Format,
            PdfiumInternalError::PasswordError => LoadStatus::Password,
            PdfiumInternalError::SecurityError => LoadStatus::Security,
            _ => LoadStatus::Unknown,
        },
        _ => LoadStatus::Unknown,
    }
}

/// Copy tightly packed RGBA rows into `bitmap`, honouring its stride. Rows or
/// columns beyond either side's extent are skipped.
fn copy_rgba(source: &[u8], width: u32, height: u32, bitmap: &mut Bitmap) {
    let Ok(stride) = usize::try_from(bitmap.stride()) else {
        warn!(stride = bitmap.stride(), "Negative bitmap stride, skipping copy");
        return;
    };
    let source_row = width as usize * BYTES_PER_PIXEL;
    let row_bytes = source_row.min(bitmap.width() as usize * BYTES_PER_PIXEL);
    if stride == 0 || row_bytes == 0 {
        return;
    }
    let rows = height.min(bitmap.height()) as usize;
    for (source, target) in source
        .chunks_exact(source_row)
        .zip(bitmap.data_mut().chunks_mut(stride))
        .take(rows)
    {
        let end = row_bytes.min(target.len());
        target[..end].copy_from_slice(&source[..end]);
    }
}

impl DocumentEngine for PdfiumEngine {
    #[instrument(skip_all, fields(path = %path.display()))]
    fn open_document(&mut self, path: &Path) -> Result<DocumentHandle, LoadStatus> {
        if path.is_dir() || File::open(path).is_err() {
            warn!("Cannot read document");
            return Err(LoadStatus::File);
        }

        let document = self.pdfium.load_pdf_from_file(path, None).map_err(|err| {
            let status = classify(&err);
            warn!(?err, ?status, "PDFium refused document");
            status
        })?;

        let handle = self.allocate();
        info!(handle, pages = document.pages().len() as usize, "Document opened");
        self.documents.insert(handle, document);
        Ok(DocumentHandle::from_raw(handle))
    }

    fn close_document(&mut self, document: DocumentHandle) {
        if self.documents.remove(&document.raw()).is_none() {
            warn!(handle = document.raw(), "Close of unknown document handle");
            return;
        }
        debug!(handle = document.raw(), "Document closed");
    }

    fn page_count(&self, document: DocumentHandle) -> usize {
        self.documents
            .get(&document.raw())
            .map(|doc| doc.pages().len() as usize)
            .unwrap_or(0)
    }

    #[instrument(skip_all, fields(document = document.raw(), index = index))]
    fn open_page(&mut self, document: DocumentHandle, index: usize) -> Option<PageHandle> {
        let doc = self.documents.get(&document.raw())?;
        let page_index = PdfPageIndex::try_from(index).ok()?;
        let page = match doc.pages().get(page_index) {
            Ok(page) => page,
            Err(err) => {
                debug!(?err, "Page not available");
                return None;
            }
        };

        let handle = self.allocate();
        self.pages.insert(
            handle,
            OpenPage {
                document: document.raw(),
                page,
            },
        );
        Some(PageHandle::from_raw(handle))
    }

    fn close_page(&mut self, page: PageHandle) {
        if self.pages.remove(&page.raw()).is_none() {
            warn!(handle = page.raw(), "Close of unknown page handle");
        }
    }

    fn open_text_page(&mut self, page: PageHandle) -> Option<TextPageHandle> {
        let open = self.pages.get(&page.raw())?;
        let chars = match open.page.text() {
            Ok(text) => text.all().chars().count(),
            Err(err) => {
                warn!(?err, "Text layer unavailable");
                return None;
            }
        };
        debug!(page = page.raw(), document = open.document, chars, "Text layer opened");

        let handle = self.allocate();
        self.text_layers.insert(
            handle,
            TextLayer {
                page: page.raw(),
                chars,
            },
        );
        Some(TextPageHandle::from_raw(handle))
    }

    fn close_text_page(&mut self, text: TextPageHandle) {
        match self.text_layers.remove(&text.raw()) {
            Some(layer) => debug!(page = layer.page, "Text layer closed"),
            None => warn!(handle = text.raw(), "Close of unknown text layer handle"),
        }
    }

    fn page_width(&self, page: PageHandle) -> f64 {
        self.pages
            .get(&page.raw())
            .map(|open| f64::from(open.page.width().value))
            .unwrap_or(0.0)
    }

    fn page_height(&self, page: PageHandle) -> f64 {
        self.pages
            .get(&page.raw())
            .map(|open| f64::from(open.page.height().value))
            .unwrap_or(0.0)
    }

    #[instrument(
        skip_all,
        fields(page = page.raw(), width = bitmap.width(), height = bitmap.height())
    )]
    fn render_page(&self, page: PageHandle, bitmap: &mut Bitmap, flags: RenderFlags) {
        let Some(open) = self.pages.get(&page.raw()) else {
            warn!("Render of unknown page handle");
            return;
        };
        let width = i32::try_from(bitmap.width());
        let height = i32::try_from(bitmap.height());
        let (Ok(width), Ok(height)) = (width, height) else {
            warn!("Bitmap too large for PDFium");
            return;
        };

        let config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_target_height(height)
            .set_clear_color(PdfColor::WHITE)
            .render_annotations(false)
            .render_form_data(false)
            .use_print_quality(flags.contains(RenderFlags::PRINTING));

        let rendered = match open.page.render_with_config(&config) {
            Ok(rendered) => rendered,
            Err(err) => {
                warn!(?err, "PDFium render failed, page left blank");
                return;
            }
        };
        let rgba = rendered.as_image().into_rgba8();
        debug!(
            rendered_width = rgba.width(),
            rendered_height = rgba.height(),
            "Page rasterized"
        );
        copy_rgba(rgba.as_raw(), rgba.width(), rgba.height(), bitmap);
    }
}
