// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// shaver-host: the object surface a host program works with.
//
// A `Session` shares one registry and renderer between any number of
// `Document` and `Page` values. Dropping either hands its id back to the
// registry, which decides when native handles can actually be closed, so
// hosts may drop documents and pages in any order.

pub mod document;
pub mod options;
pub mod page;
pub mod session;

#[cfg(test)]
pub(crate) mod fixtures;

pub use document::{Document, PageSet};
pub use options::RenderOptions;
pub use page::Page;
pub use session::Session;
