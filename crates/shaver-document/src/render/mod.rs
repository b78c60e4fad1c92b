// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Render module: output size inference and the page-to-file pipeline.

pub mod dimensions;
pub mod pipeline;

pub use dimensions::RenderSize;
pub use pipeline::{Renderer, validate_geometry};
