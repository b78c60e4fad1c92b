// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host documents. A `Document` owns its registry id; its pages hold their
// own ids and may outlive it.

use std::ops::{Bound, Range, RangeBounds};
use std::path::{Path, PathBuf};

use shaver_core::error::LoadError;
use shaver_document::{DocumentEngine, DocumentId, ImageCodec, LopdfEngine, RasterCodec};
use tracing::instrument;

use crate::page::Page;
use crate::session::{Release, Session};

/// An open document.
///
/// Dropping it requests release. The native document stays open until the
/// last page taken from it is dropped as well.
pub struct Document<E: DocumentEngine = LopdfEngine, C: ImageCodec = RasterCodec> {
    session: Session<E, C>,
    id: DocumentId,
    len: usize,
    path: PathBuf,
}

impl<E: DocumentEngine, C: ImageCodec> Document<E, C> {
    /// Open the document at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(session: &Session<E, C>, path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let (id, len) = session.with(|shared| {
            let id = shared.registry.open_document(path)?;
            let len = shared.registry.page_count(id)?;
            Ok::<_, LoadError>((id, len))
        })?;
        Ok(Self {
            session: session.clone(),
            id,
            len,
            path: path.to_path_buf(),
        })
    }

    /// Number of pages.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// The page at zero-based `index`. The page is registered but not loaded.
    pub fn page(&self, index: usize) -> Result<Page<E, C>, LoadError> {
        if index >= self.len {
            return Err(LoadError::PageUnavailable { index });
        }
        let id = self
            .session
            .with(|shared| shared.registry.attach_page(self.id, index))?;
        Ok(Page::new(self.session.clone(), id, index))
    }

    /// Pages in `range` (zero-based), clamped to the document length.
    pub fn pages(&self, range: impl RangeBounds<usize>) -> PageSet<'_, E, C> {
        let start = match range.start_bound() {
            Bound::Included(start) => *start,
            Bound::Excluded(start) => start.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(end) => end.saturating_add(1),
            Bound::Excluded(end) => *end,
            Bound::Unbounded => self.len,
        };
        let end = end.min(self.len);
        PageSet {
            document: self,
            indices: start.min(end)..end,
        }
    }
}

impl<E: DocumentEngine, C: ImageCodec> Drop for Document<E, C> {
    fn drop(&mut self) {
        self.session.release(Release::Document(self.id));
    }
}

/// Iterator over a run of a document's pages.
pub struct PageSet<'a, E: DocumentEngine, C: ImageCodec> {
    document: &'a Document<E, C>,
    indices: Range<usize>,
}

impl<E: DocumentEngine, C: ImageCodec> Iterator for PageSet<'_, E, C> {
    type Item = Result<Page<E, C>, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.indices.next().map(|index| self.document.page(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}

impl<E: DocumentEngine, C: ImageCodec> ExactSizeIterator for PageSet<'_, E, C> {}
