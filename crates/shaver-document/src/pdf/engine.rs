// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document engine backed by `lopdf`. Parsed documents, pages and text layers
// live in handle tables keyed by the opaque handles the engine hands out.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use shaver_core::bitmap::Bitmap;
use shaver_core::types::{DocumentHandle, LoadStatus, PageHandle, RenderFlags, TextPageHandle};
use tracing::{debug, info, instrument, warn};

use super::raster::{self, DEFAULT_MEDIA_BOX, PageGeometry};
use crate::traits::DocumentEngine;

/// Deepest `/Parent` chain followed when resolving inherited page attributes.
const MAX_TREE_DEPTH: usize = 32;

/// Operators that show text.
const TEXT_OPERATORS: [&str; 4] = ["Tj", "TJ", "'", "\""];

struct LoadedPage {
    document: u64,
    geometry: PageGeometry,
    operations: Vec<Operation>,
}

struct TextLayer {
    page: u64,
    runs: usize,
}

/// [`DocumentEngine`] that parses PDFs with `lopdf` and paints page content
/// with the vector rasterizer in [`super::raster`].
///
/// Pure Rust, with no native library needed. Only vector paths are painted:
/// text, images, shadings and clipping paths are skipped, and even-odd fills
/// are filled as nonzero without holes. A text-only page renders blank. The
/// `pdfium` feature provides `PdfiumEngine` for complete pages.
pub struct LopdfEngine {
    documents: HashMap<u64, Document>,
    pages: HashMap<u64, LoadedPage>,
    text_layers: HashMap<u64, TextLayer>,
    next_handle: u64,
}

impl Default for LopdfEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
            pages: HashMap::new(),
            text_layers: HashMap::new(),
            next_handle: 1,
        }
    }

    fn allocate(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    /// Number of text-showing operators on the page behind a text layer.
    pub fn text_runs(&self, text: TextPageHandle) -> Option<usize> {
        self.text_layers.get(&text.raw()).map(|layer| layer.runs)
    }

    /// Handles currently held open, as `(documents, pages, text layers)`.
    pub fn open_handles(&self) -> (usize, usize, usize) {
        (
            self.documents.len(),
            self.pages.len(),
            self.text_layers.len(),
        )
    }

    fn geometry(&self, page: PageHandle) -> Option<&PageGeometry> {
        self.pages.get(&page.raw()).map(|loaded| &loaded.geometry)
    }
}

// -- Loading ------------------------------------------------------------------

/// Map a `lopdf` load failure onto a status code. `lopdf` reports decryption
/// problems through its error text only.
fn classify(error: &lopdf::Error) -> LoadStatus {
    let message = error.to_string().to_ascii_lowercase();
    if ["encrypt", "decrypt", "password"]
        .iter()
        .any(|needle| message.contains(needle))
    {
        LoadStatus::Password
    } else {
        LoadStatus::Format
    }
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => document.get_object(*id).unwrap_or(object),
        other => other,
    }
}

/// Look `key` up on the page dictionary, then on its ancestors.
fn inherited<'a>(document: &'a Document, page: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict: &Dictionary = document.get_dictionary(page).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Some(resolve(document, value));
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = document.get_dictionary(parent).ok()?;
    }
    None
}

fn number(document: &Document, object: &Object) -> Option<f64> {
    match resolve(document, object) {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

fn media_box(document: &Document, page: ObjectId) -> [f64; 4] {
    let Some(Object::Array(values)) = inherited(document, page, b"MediaBox") else {
        return DEFAULT_MEDIA_BOX;
    };
    let numbers: Option<Vec<f64>> = values.iter().map(|v| number(document, v)).collect();
    match numbers.as_deref() {
        Some(&[x0, y0, x1, y1]) if x0 != x1 && y0 != y1 => [x0, y0, x1, y1],
        _ => {
            warn!(?page, "Malformed MediaBox, using US Letter");
            DEFAULT_MEDIA_BOX
        }
    }
}

fn rotation(document: &Document, page: ObjectId) -> i64 {
    inherited(document, page, b"Rotate")
        .and_then(|value| value.as_i64().ok())
        .unwrap_or(0)
}

fn content_operations(document: &Document, page: ObjectId) -> Vec<Operation> {
    let decoded = document
        .get_page_content(page)
        .map_err(|err| err.to_string())
        .and_then(|bytes| Content::decode(&bytes).map_err(|err| err.to_string()));
    match decoded {
        Ok(content) => content.operations,
        Err(reason) => {
            warn!(?page, %reason, "Unreadable content stream, page will render blank");
            Vec::new()
        }
    }
}

// -- DocumentEngine -----------------------------------------------------------

impl DocumentEngine for LopdfEngine {
    #[instrument(skip_all, fields(path = %path.display()))]
    fn open_document(&mut self, path: &Path) -> Result<DocumentHandle, LoadStatus> {
        if let Err(err) = File::open(path) {
            warn!(%err, "Cannot read document");
            return Err(LoadStatus::File);
        }
        if path.is_dir() {
            warn!("Document path is a directory");
            return Err(LoadStatus::File);
        }

        let document = Document::load(path).map_err(|err| {
            let status = classify(&err);
            warn!(%err, ?status, "Failed to parse document");
            status
        })?;

        let handle = self.allocate();
        info!(
            handle,
            pages = document.get_pages().len(),
            "Document opened"
        );
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
            .map(|doc| doc.get_pages().len())
            .unwrap_or(0)
    }

    #[instrument(skip_all, fields(document = document.raw(), index = index))]
    fn open_page(&mut self, document: DocumentHandle, index: usize) -> Option<PageHandle> {
        let doc = self.documents.get(&document.raw())?;
        let page_id = doc.get_pages().values().nth(index).copied()?;

        let geometry = PageGeometry::new(media_box(doc, page_id), rotation(doc, page_id));
        let operations = content_operations(doc, page_id);
        debug!(?page_id, ?geometry, operations = operations.len(), "Page parsed");

        let handle = self.allocate();
        self.pages.insert(
            handle,
            LoadedPage {
                document: document.raw(),
                geometry,
                operations,
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
        let loaded = self.pages.get(&page.raw())?;
        let runs = loaded
            .operations
            .iter()
            .filter(|op| TEXT_OPERATORS.contains(&op.operator.as_str()))
            .count();
        debug!(
            page = page.raw(),
            document = loaded.document,
            runs,
            "Text layer opened"
        );

        let handle = self.allocate();
        self.text_layers.insert(
            handle,
            TextLayer {
                page: page.raw(),
                runs,
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
        self.geometry(page).map(|g| g.natural_size().0).unwrap_or(0.0)
    }

    fn page_height(&self, page: PageHandle) -> f64 {
        self.geometry(page).map(|g| g.natural_size().1).unwrap_or(0.0)
    }

    #[instrument(
        skip_all,
        fields(page = page.raw(), width = bitmap.width(), height = bitmap.height())
    )]
    fn render_page(&self, page: PageHandle, bitmap: &mut Bitmap, flags: RenderFlags) {
        let Some(loaded) = self.pages.get(&page.raw()) else {
            warn!("Render of unknown page handle");
            return;
        };
        debug!(
            flags = flags.bits(),
            operations = loaded.operations.len(),
            "Rasterizing page"
        );
        raster::rasterize(&loaded.geometry, &loaded.operations, bitmap);
    }
}
