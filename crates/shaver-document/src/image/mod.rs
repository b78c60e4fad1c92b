// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: raw buffer wrapping, depth conversion, palette quantization and
// encoding of rendered pages.

pub mod codec;
pub mod quantize;

pub use codec::RasterCodec;
