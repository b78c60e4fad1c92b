// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host pages.

use std::cell::Cell;
use std::path::Path;

use shaver_core::error::{LoadError, Result};
use shaver_core::types::PageSize;
use shaver_document::{DocumentEngine, ImageCodec, LopdfEngine, PageId, RasterCodec};
use tracing::{debug, instrument};

use crate::options::RenderOptions;
use crate::session::{Release, Session};

/// One page of a [`crate::Document`].
///
/// Created unloaded. Size queries load the page briefly when needed and
/// cache the result; `render` does the same for the duration of the render.
/// Dropping the page releases it, which may in turn close its document.
pub struct Page<E: DocumentEngine = LopdfEngine, C: ImageCodec = RasterCodec> {
    session: Session<E, C>,
    id: PageId,
    index: usize,
    size: Cell<Option<PageSize>>,
}

impl<E: DocumentEngine, C: ImageCodec> Page<E, C> {
    pub(crate) fn new(session: Session<E, C>, id: PageId, index: usize) -> Self {
        Self {
            session,
            id,
            index,
            size: Cell::new(None),
        }
    }

    /// Zero-based position in the document.
    pub fn index(&self) -> usize {
        self.index
    }

    /// One-based page number.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    /// Acquire native page resources. Idempotent.
    pub fn load(&self) -> std::result::Result<(), LoadError> {
        self.session.with(|shared| shared.registry.load_page(self.id))
    }

    /// Release native page resources. Idempotent.
    pub fn unload(&self) {
        self.session.with(|shared| shared.registry.unload_page(self.id));
    }

    pub fn is_loaded(&self) -> std::result::Result<bool, LoadError> {
        self.session.with(|shared| shared.registry.is_page_loaded(self.id))
    }

    /// Natural size in points. Leaves the load state as it found it.
    pub fn size(&self) -> std::result::Result<PageSize, LoadError> {
        if let Some(size) = self.size.get() {
            return Ok(size);
        }
        let size = self.session.with(|shared| {
            let registry = &mut shared.registry;
            let was_loaded = registry.is_page_loaded(self.id)?;
            if !was_loaded {
                registry.load_page(self.id)?;
            }
            let size = registry.page_size(self.id);
            if !was_loaded {
                registry.unload_page(self.id);
            }
            size
        })?;
        debug!(page = %self.id, width = size.width, height = size.height, "Page size cached");
        self.size.set(Some(size));
        Ok(size)
    }

    /// Width in whole points.
    pub fn width(&self) -> std::result::Result<u32, LoadError> {
        Ok(self.size()?.width as u32)
    }

    /// Height in whole points.
    pub fn height(&self) -> std::result::Result<u32, LoadError> {
        Ok(self.size()?.height as u32)
    }

    /// Width divided by height.
    pub fn aspect(&self) -> std::result::Result<f64, LoadError> {
        Ok(self.size()?.aspect())
    }

    /// Render to `path`; the extension selects the image format.
    #[instrument(skip_all, fields(page = %self.id, path = %path.as_ref().display()))]
    pub fn render(&self, path: impl AsRef<Path>, options: &RenderOptions) -> Result<()> {
        let path = path.as_ref();
        self.session.with(|shared| {
            shared
                .renderer
                .render(&mut shared.registry, self.id, path, options.size())
        })
    }
}

impl<E: DocumentEngine, C: ImageCodec> Drop for Page<E, C> {
    fn drop(&mut self) {
        self.session.release(Release::Page(self.id));
    }
}
