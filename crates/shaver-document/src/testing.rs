// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recording test doubles for the engine and codec traits, and a small PDF
// writer for exercising the lopdf engine.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;

use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use shaver_core::bitmap::Bitmap;
use shaver_core::error::RenderError;
use shaver_core::types::{
    ChannelMasks, DocumentHandle, LoadStatus, OutputFormat, PageHandle, RenderFlags, SaveOptions,
    TextPageHandle,
};

use crate::image::codec::RasterCodec;
use crate::traits::{DocumentEngine, ImageCodec};

/// Call counters shared between a [`CountingEngine`] and the test holding it.
#[derive(Default)]
pub(crate) struct EngineLog {
    pub documents_opened: Cell<usize>,
    pub documents_closed: Cell<usize>,
    pub pages_opened: Cell<usize>,
    pub pages_closed: Cell<usize>,
    pub text_opened: Cell<usize>,
    pub text_closed: Cell<usize>,
    pub bitmaps_created: Cell<usize>,
    pub renders: Cell<usize>,
    pub last_flags: Cell<Option<RenderFlags>>,
    pub last_bitmap_size: Cell<Option<(u32, u32)>>,
    /// The single pixel value the bitmap was filled with, if uniform.
    pub background: Cell<Option<[u8; 4]>>,
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

/// In-memory engine whose documents all have `pages` pages of 200x100 points.
///
/// Panics on any use-after-close or out-of-order close, so lifecycle bugs
/// surface as test failures.
pub(crate) struct CountingEngine {
    pages: usize,
    pub page_size: (f64, f64),
    pub fail_text_layer: bool,
    pub forged_stride: Option<i32>,
    pub fail_bitmap: bool,
    log: Rc<EngineLog>,
    live_documents: HashSet<u64>,
    live_pages: HashMap<u64, u64>,
    live_text: HashSet<u64>,
    next: u64,
}

impl CountingEngine {
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            page_size: (200.0, 100.0),
            fail_text_layer: false,
            forged_stride: None,
            fail_bitmap: false,
            log: Rc::new(EngineLog::default()),
            live_documents: HashSet::new(),
            live_pages: HashMap::new(),
            live_text: HashSet::new(),
            next: 1,
        }
    }

    pub fn log(&self) -> Rc<EngineLog> {
        Rc::clone(&self.log)
    }

    fn next_raw(&mut self) -> u64 {
        let raw = self.next;
        self.next += 1;
        raw
    }

    fn assert_page_live(&self, page: PageHandle) {
        assert!(
            self.live_pages.contains_key(&page.raw()),
            "page handle {} used after close",
            page.raw()
        );
    }
}

impl DocumentEngine for CountingEngine {
    fn open_document(&mut self, path: &Path) -> Result<DocumentHandle, LoadStatus> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        match name {
            "missing.pdf" => return Err(LoadStatus::File),
            "garbage.pdf" => return Err(LoadStatus::Format),
            "locked.pdf" => return Err(LoadStatus::Password),
            _ => {}
        }
        let raw = self.next_raw();
        self.live_documents.insert(raw);
        bump(&self.log.documents_opened);
        Ok(DocumentHandle::from_raw(raw))
    }

    fn close_document(&mut self, document: DocumentHandle) {
        assert!(
            self.live_documents.remove(&document.raw()),
            "document handle {} closed twice",
            document.raw()
        );
        assert!(
            !self
                .live_pages
                .values()
                .any(|owner| *owner == document.raw()),
            "document closed while its pages are open"
        );
        bump(&self.log.documents_closed);
    }

    fn page_count(&self, document: DocumentHandle) -> usize {
        assert!(self.live_documents.contains(&document.raw()));
        self.pages
    }

    fn open_page(&mut self, document: DocumentHandle, index: usize) -> Option<PageHandle> {
        assert!(self.live_documents.contains(&document.raw()));
        if index >= self.pages {
            return None;
        }
        let raw = self.next_raw();
        self.live_pages.insert(raw, document.raw());
        bump(&self.log.pages_opened);
        Some(PageHandle::from_raw(raw))
    }

    fn close_page(&mut self, page: PageHandle) {
        assert!(
            self.live_pages.remove(&page.raw()).is_some(),
            "page handle {} closed twice",
            page.raw()
        );
        bump(&self.log.pages_closed);
    }

    fn open_text_page(&mut self, page: PageHandle) -> Option<TextPageHandle> {
        self.assert_page_live(page);
        if self.fail_text_layer {
            return None;
        }
        let raw = self.next_raw();
        self.live_text.insert(raw);
        bump(&self.log.text_opened);
        Some(TextPageHandle::from_raw(raw))
    }

    fn close_text_page(&mut self, text: TextPageHandle) {
        assert!(self.live_text.remove(&text.raw()), "text page closed twice");
        bump(&self.log.text_closed);
    }

    fn page_width(&self, page: PageHandle) -> f64 {
        self.assert_page_live(page);
        self.page_size.0
    }

    fn page_height(&self, page: PageHandle) -> f64 {
        self.assert_page_live(page);
        self.page_size.1
    }

    fn create_bitmap(&self, width: u32, height: u32) -> Option<Bitmap> {
        bump(&self.log.bitmaps_created);
        self.log.last_bitmap_size.set(Some((width, height)));
        if self.fail_bitmap {
            return None;
        }
        let bitmap = Bitmap::new(width, height).ok()?;
        match self.forged_stride {
            Some(stride) => Some(Bitmap::from_raw_parts(
                width,
                height,
                stride,
                bitmap.data().to_vec(),
            )),
            None => Some(bitmap),
        }
    }

    fn render_page(&self, page: PageHandle, bitmap: &mut Bitmap, flags: RenderFlags) {
        self.assert_page_live(page);
        bump(&self.log.renders);
        self.log.last_flags.set(Some(flags));
        let mut seen: Vec<&[u8]> = bitmap.data().chunks(4).collect();
        seen.sort_unstable();
        seen.dedup();
        let uniform = match seen.as_slice() {
            [only] => Some([only[0], only[1], only[2], only[3]]),
            _ => None,
        };
        self.log.background.set(uniform);
        // Black top-left pixel so tests can tell content from background.
        if bitmap.is_packed()
            && let Some(pixel) = bitmap.data_mut().get_mut(0..4)
        {
            pixel.copy_from_slice(&[0, 0, 0, 0xFF]);
        }
    }
}

/// Counters shared between a [`RecordingCodec`] and the test holding it.
#[derive(Default)]
pub(crate) struct CodecLog {
    pub wraps: Cell<usize>,
    pub conversions: Cell<usize>,
    pub quantizations: Cell<usize>,
    pub saves: Cell<usize>,
    pub last_format: Cell<Option<OutputFormat>>,
}

/// [`RasterCodec`] wrapper that records every call.
pub(crate) struct RecordingCodec {
    inner: RasterCodec,
    log: Rc<CodecLog>,
    pub fail_save: bool,
}

impl RecordingCodec {
    pub fn new() -> Self {
        Self {
            inner: RasterCodec::new(),
            log: Rc::new(CodecLog::default()),
            fail_save: false,
        }
    }

    pub fn log(&self) -> Rc<CodecLog> {
        Rc::clone(&self.log)
    }
}

impl ImageCodec for RecordingCodec {
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
        bump(&self.log.wraps);
        self.inner
            .wrap_raw_buffer(bytes, width, height, stride, bpp, masks, top_down)
    }

    fn convert_depth(&self, image: &DynamicImage, bpp: u32) -> Result<DynamicImage, RenderError> {
        bump(&self.log.conversions);
        self.inner.convert_depth(image, bpp)
    }

    fn detect_format(&self, path: &Path) -> Option<OutputFormat> {
        self.inner.detect_format(path)
    }

    fn quantize(&self, image: &DynamicImage) -> Result<DynamicImage, RenderError> {
        bump(&self.log.quantizations);
        self.inner.quantize(image)
    }

    fn save(
        &self,
        format: OutputFormat,
        image: &DynamicImage,
        path: &Path,
        options: &SaveOptions,
    ) -> Result<(), RenderError> {
        bump(&self.log.saves);
        self.log.last_format.set(Some(format));
        if self.fail_save {
            return Err(RenderError::Save {
                path: path.display().to_string(),
                reason: "disk full".into(),
            });
        }
        self.inner.save(format, image, path, options)
    }
}

/// One page of a generated test PDF. Pages without their own MediaBox
/// inherit the 200x100 box set on the page tree root.
#[derive(Debug, Clone, Default)]
pub(crate) struct SamplePage {
    pub media_box: Option<[i64; 4]>,
    pub rotate: Option<i64>,
    pub operations: Vec<Operation>,
}

fn integers(values: [i64; 4]) -> Object {
    Object::Array(values.iter().map(|v| Object::Integer(*v)).collect())
}

/// Write a PDF containing `pages` to `path`.
pub(crate) fn write_pdf(path: &Path, pages: &[SamplePage]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    for spec in pages {
        let content = Content {
            operations: spec.operations.clone(),
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        };
        if let Some(media_box) = spec.media_box {
            page.set("MediaBox", integers(media_box));
        }
        if let Some(rotate) = spec.rotate {
            page.set("Rotate", Object::Integer(rotate));
        }
        kids.push(doc.add_object(page).into());
    }

    let tree = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => Object::Integer(pages.len() as i64),
        "MediaBox" => integers([0, 0, 200, 100]),
    };
    doc.objects.insert(pages_id, Object::Dictionary(tree));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}
