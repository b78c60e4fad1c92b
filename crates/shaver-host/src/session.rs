// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared session state for host objects.

use std::cell::RefCell;
use std::rc::Rc;

use shaver_core::ShaverConfig;
use shaver_document::{
    DocumentEngine, DocumentId, ImageCodec, LopdfEngine, PageId, RasterCodec, Registry, Renderer,
};
use tracing::debug;

pub(crate) struct Shared<E: DocumentEngine, C: ImageCodec> {
    pub registry: Registry<E>,
    pub renderer: Renderer<C>,
}

/// A release handed in by a dropped host object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Release {
    Page(PageId),
    Document(DocumentId),
}

impl<E: DocumentEngine, C: ImageCodec> Shared<E, C> {
    fn apply(&mut self, release: Release) {
        match release {
            Release::Page(id) => self.registry.release_page(id),
            Release::Document(id) => self.registry.request_release(id),
        }
    }
}

/// A registry and renderer shared by every document and page opened through
/// it. Cloning a session is cheap and yields a handle to the same state.
///
/// Sessions are single-threaded (`!Send`).
pub struct Session<E: DocumentEngine = LopdfEngine, C: ImageCodec = RasterCodec> {
    shared: Rc<RefCell<Shared<E, C>>>,
    /// Releases from objects dropped while `shared` was borrowed. Applied at
    /// the start of the next [`Session::with`].
    deferred: Rc<RefCell<Vec<Release>>>,
}

impl<E: DocumentEngine, C: ImageCodec> Clone for Session<E, C> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            deferred: Rc::clone(&self.deferred),
        }
    }
}

impl Session {
    /// A session over the lopdf engine and the `image` codec.
    pub fn new(config: ShaverConfig) -> Self {
        Self::with_parts(LopdfEngine::new(), RasterCodec::new(), config)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ShaverConfig::default())
    }
}

impl<E: DocumentEngine, C: ImageCodec> Session<E, C> {
    pub fn with_parts(engine: E, codec: C, config: ShaverConfig) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                registry: Registry::new(engine),
                renderer: Renderer::new(codec, config),
            })),
            deferred: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Documents whose native handle is still held.
    pub fn live_documents(&self) -> usize {
        self.with(|shared| shared.registry.live_documents())
    }

    /// Pages registered and not yet released.
    pub fn live_pages(&self) -> usize {
        self.with(|shared| shared.registry.live_pages())
    }

    pub fn config(&self) -> ShaverConfig {
        self.shared.borrow().renderer.config().clone()
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut Shared<E, C>) -> R) -> R {
        let mut shared = self.shared.borrow_mut();
        self.apply_deferred(&mut shared);
        f(&mut shared)
    }

    fn apply_deferred(&self, shared: &mut Shared<E, C>) {
        for release in self.deferred.take() {
            debug!(?release, "Applying deferred release");
            shared.apply(release);
        }
    }

    /// Hand a release to the registry, or queue it when the state is already
    /// borrowed. Used from `Drop`, which must not panic.
    pub(crate) fn release(&self, release: Release) {
        match self.shared.try_borrow_mut() {
            Ok(mut shared) => {
                self.apply_deferred(&mut shared);
                shared.apply(release);
            }
            Err(_) => {
                debug!(?release, "Session busy, release deferred");
                self.deferred.borrow_mut().push(release);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn deferred_releases(&self) -> usize {
        self.deferred.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::fixtures::write_pdf;

    #[test]
    fn releases_during_a_borrow_apply_on_next_use() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        write_pdf(&path, 2);

        let session = Session::default();
        let document = Document::open(&session, &path).unwrap();
        let page = document.page(0).unwrap();
        page.load().unwrap();

        session.with(|_| {
            drop(page);
            drop(document);
        });
        assert_eq!(session.deferred_releases(), 2);

        assert_eq!(session.live_pages(), 0);
        assert_eq!(session.live_documents(), 0);
        assert_eq!(session.deferred_releases(), 0);
    }

    #[test]
    fn clones_share_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        write_pdf(&path, 1);

        let session = Session::default();
        let other = session.clone();
        let document = Document::open(&other, &path).unwrap();
        assert_eq!(session.live_documents(), 1);
        drop(document);
        assert_eq!(session.live_documents(), 0);
    }
}
