// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document/page registry. Owns every native handle handed out by a document
// engine and releases each one exactly once, in dependency order, no matter
// in which order the host lets go of documents and pages.
//
// Documents and pages live in an arena keyed by ids. A document records the
// ids of the pages registered against it; a page records the id of its
// document. Neither side owns the other, so either can be released first.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use shaver_core::error::LoadError;
use shaver_core::types::{DocumentHandle, PageHandle, PageSize, TextPageHandle};
use tracing::{debug, info, instrument, warn};

use crate::traits::DocumentEngine;

/// Identifies a document in a [`Registry`]. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

/// Identifies a page in a [`Registry`]. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page#{}", self.0)
    }
}

struct DocumentEntry {
    /// Present iff the document was opened successfully.
    native: Option<DocumentHandle>,
    release_requested: bool,
    open_pages: BTreeSet<PageId>,
    page_count: usize,
}

impl DocumentEntry {
    fn opened(&self) -> bool {
        self.native.is_some()
    }

    /// Never opened, or opened, released by its owner and without pages.
    fn may_destroy(&self) -> bool {
        !self.opened() || (self.release_requested && self.open_pages.is_empty())
    }
}

struct NativePage {
    page: PageHandle,
    text: TextPageHandle,
}

struct PageEntry {
    document: DocumentId,
    index: usize,
    /// Present iff the page is loaded.
    native: Option<NativePage>,
}

/// Owns documents and pages opened through a [`DocumentEngine`].
///
/// All teardown paths (`request_release`, `release_page`) funnel into a
/// single check that closes a document's native handle at the first moment
/// it is both released by its owner and free of registered pages.
pub struct Registry<E: DocumentEngine> {
    engine: E,
    documents: HashMap<DocumentId, DocumentEntry>,
    pages: HashMap<PageId, PageEntry>,
    next_id: u64,
}

impl<E: DocumentEngine> Registry<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            documents: HashMap::new(),
            pages: HashMap::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // -- Documents ------------------------------------------------------------

    /// Register a new, unopened document.
    pub fn create_document(&mut self) -> DocumentId {
        let id = DocumentId(self.allocate_id());
        self.documents.insert(
            id,
            DocumentEntry {
                native: None,
                release_requested: false,
                open_pages: BTreeSet::new(),
                page_count: 0,
            },
        );
        id
    }

    /// Open the document's native handle and return its page count.
    ///
    /// Loading an already-open document returns the cached page count.
    #[instrument(skip(self, path), fields(document = %id, path = %path.as_ref().display()))]
    pub fn load_document(
        &mut self,
        id: DocumentId,
        path: impl AsRef<Path>,
    ) -> Result<usize, LoadError> {
        let path = path.as_ref();
        let entry = self.documents.get_mut(&id).ok_or(LoadError::Released)?;
        if entry.opened() {
            return Ok(entry.page_count);
        }

        let handle = self.engine.open_document(path).map_err(|status| {
            warn!(?status, "Document failed to open");
            LoadError::from_status(status, path.display().to_string())
        })?;

        entry.page_count = self.engine.page_count(handle);
        entry.native = Some(handle);
        info!(pages = entry.page_count, "Document opened");
        Ok(entry.page_count)
    }

    /// Create and load a document in one step.
    ///
    /// On failure the document is destroyed before the error is returned, so
    /// no half-initialised document stays reachable.
    pub fn open_document(&mut self, path: impl AsRef<Path>) -> Result<DocumentId, LoadError> {
        let id = self.create_document();
        match self.load_document(id, path) {
            Ok(_) => Ok(id),
            Err(err) => {
                self.request_release(id);
                Err(err)
            }
        }
    }

    pub fn page_count(&self, id: DocumentId) -> Result<usize, LoadError> {
        let entry = self.documents.get(&id).ok_or(LoadError::Released)?;
        if !entry.opened() {
            return Err(LoadError::NotOpened);
        }
        Ok(entry.page_count)
    }

    /// The owner no longer needs this document. Idempotent.
    ///
    /// The native handle is closed now if no pages are registered, otherwise
    /// when the last page is released.
    #[instrument(skip(self), fields(document = %id))]
    pub fn request_release(&mut self, id: DocumentId) {
        let Some(entry) = self.documents.get_mut(&id) else {
            debug!("Release requested for a document that is already gone");
            return;
        };
        entry.release_requested = true;
        self.destroy_if_unused(id);
    }

    /// Close and forget the document if nothing keeps it alive. Returns
    /// whether it was destroyed.
    fn destroy_if_unused(&mut self, id: DocumentId) -> bool {
        let Some(entry) = self.documents.get(&id) else {
            return false;
        };
        if !entry.may_destroy() {
            debug!(
                document = %id,
                open_pages = entry.open_pages.len(),
                release_requested = entry.release_requested,
                "Document still in use, deferring destruction"
            );
            return false;
        }

        if let Some(entry) = self.documents.remove(&id)
            && let Some(handle) = entry.native
        {
            self.engine.close_document(handle);
            info!(document = %id, "Document closed");
        }
        true
    }

    pub fn is_document_open(&self, id: DocumentId) -> bool {
        self.documents.get(&id).is_some_and(DocumentEntry::opened)
    }

    /// Whether the document has not been destroyed yet.
    pub fn is_document_live(&self, id: DocumentId) -> bool {
        self.documents.contains_key(&id)
    }

    /// Pages currently registered against a document.
    pub fn open_pages(&self, id: DocumentId) -> Vec<PageId> {
        self.documents
            .get(&id)
            .map(|entry| entry.open_pages.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn live_documents(&self) -> usize {
        self.documents.len()
    }

    // -- Pages ----------------------------------------------------------------

    /// Register a new, unloaded page against `document`.
    #[instrument(skip(self), fields(document = %document))]
    pub fn attach_page(&mut self, document: DocumentId, index: usize) -> Result<PageId, LoadError> {
        let released = self
            .documents
            .get(&document)
            .is_none_or(|entry| entry.release_requested);
        if released {
            return Err(LoadError::Released);
        }

        let id = PageId(self.allocate_id());
        if let Some(entry) = self.documents.get_mut(&document) {
            entry.open_pages.insert(id);
        }
        self.pages.insert(
            id,
            PageEntry {
                document,
                index,
                native: None,
            },
        );
        debug!(page = %id, "Page attached");
        Ok(id)
    }

    /// Acquire the page and text-layer handles. Idempotent.
    #[instrument(skip(self), fields(page = %page))]
    pub fn load_page(&mut self, page: PageId) -> Result<(), LoadError> {
        let entry = self.pages.get(&page).ok_or(LoadError::StalePage)?;
        if entry.native.is_some() {
            return Ok(());
        }
        let index = entry.index;
        let document = self
            .documents
            .get(&entry.document)
            .ok_or(LoadError::Released)?
            .native
            .ok_or(LoadError::NotOpened)?;

        let page_handle = self
            .engine
            .open_page(document, index)
            .ok_or(LoadError::PageUnavailable { index })?;
        let Some(text_handle) = self.engine.open_text_page(page_handle) else {
            self.engine.close_page(page_handle);
            warn!(index, "Text layer unavailable");
            return Err(LoadError::PageUnavailable { index });
        };

        if let Some(entry) = self.pages.get_mut(&page) {
            entry.native = Some(NativePage {
                page: page_handle,
                text: text_handle,
            });
        }
        debug!(index, "Page loaded");
        Ok(())
    }

    /// Release the page's native handles if held. Idempotent.
    pub fn unload_page(&mut self, page: PageId) {
        let Some(native) = self.pages.get_mut(&page).and_then(|entry| entry.native.take()) else {
            return;
        };
        self.engine.close_text_page(native.text);
        self.engine.close_page(native.page);
        debug!(page = %page, "Page unloaded");
    }

    /// Unload, deregister from the document, then give the document a chance
    /// to finish its own deferred destruction. Idempotent.
    #[instrument(skip(self), fields(page = %page))]
    pub fn release_page(&mut self, page: PageId) {
        self.unload_page(page);
        let Some(entry) = self.pages.remove(&page) else {
            debug!("Release requested for a page that is already gone");
            return;
        };
        if let Some(document) = self.documents.get_mut(&entry.document) {
            document.open_pages.remove(&page);
        }
        self.destroy_if_unused(entry.document);
    }

    pub fn is_page_loaded(&self, page: PageId) -> Result<bool, LoadError> {
        self.pages
            .get(&page)
            .map(|entry| entry.native.is_some())
            .ok_or(LoadError::StalePage)
    }

    pub fn page_index(&self, page: PageId) -> Result<usize, LoadError> {
        self.pages
            .get(&page)
            .map(|entry| entry.index)
            .ok_or(LoadError::StalePage)
    }

    /// Natural size of a loaded page.
    pub fn page_size(&self, page: PageId) -> Result<PageSize, LoadError> {
        let (engine, handle) = self.loaded_page(page)?;
        Ok(PageSize::new(
            engine.page_width(handle),
            engine.page_height(handle),
        ))
    }

    pub fn live_pages(&self) -> usize {
        self.pages.len()
    }

    /// The engine together with a loaded page's handle.
    pub(crate) fn loaded_page(&self, page: PageId) -> Result<(&E, PageHandle), LoadError> {
        let entry = self.pages.get(&page).ok_or(LoadError::StalePage)?;
        let native = entry
            .native
            .as_ref()
            .ok_or(LoadError::PageNotLoaded { index: entry.index })?;
        Ok((&self.engine, native.page))
    }
}

impl<E: DocumentEngine> Drop for Registry<E> {
    fn drop(&mut self) {
        let pages: Vec<PageId> = self.pages.keys().copied().collect();
        for page in pages {
            self.unload_page(page);
        }
        for (id, entry) in self.documents.drain() {
            if let Some(handle) = entry.native {
                self.engine.close_document(handle);
                debug!(document = %id, "Document closed at registry teardown");
            }
        }
    }
}
