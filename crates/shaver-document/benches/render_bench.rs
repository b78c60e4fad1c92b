// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the shaver-document crate: rasterizing a page's
// vector content and wrapping the resulting bitmap for encoding.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use lopdf::Object;
use lopdf::content::Operation;

use shaver_core::Bitmap;
use shaver_core::types::ChannelMasks;
use shaver_document::pdf::raster::{self, PageGeometry};
use shaver_document::{ImageCodec, RasterCodec};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn op(operator: &str, operands: &[i64]) -> Operation {
    Operation::new(operator, operands.iter().map(|v| Object::Integer(*v)).collect())
}

/// A grid of filled and stroked squares across a US Letter page.
fn grid() -> Vec<Operation> {
    let mut operations = Vec::new();
    for row in 0..20 {
        for column in 0..15 {
            let (x, y) = (column * 40 + 6, row * 40 + 6);
            operations.push(op("rg", &[row % 2, column % 2, 1]));
            operations.push(op("re", &[x, y, 28, 28]));
            operations.push(op("B", &[]));
        }
    }
    operations
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Rasterize 300 squares onto a Letter page at 150 dpi.
fn bench_rasterize(c: &mut Criterion) {
    let geometry = PageGeometry::new([0.0, 0.0, 612.0, 792.0], 0);
    let operations = grid();

    c.bench_function("rasterize grid (1275x1650)", |b| {
        b.iter(|| {
            let mut bitmap = Bitmap::new(1275, 1650).unwrap();
            bitmap.fill([0xFF; 4]);
            raster::rasterize(&geometry, black_box(&operations), &mut bitmap);
            black_box(bitmap);
        });
    });
}

/// Wrap a raw RGBA bitmap and drop its alpha channel, as the renderer does
/// before every save.
fn bench_wrap_and_convert(c: &mut Criterion) {
    let mut bitmap = Bitmap::new(1275, 1650).unwrap();
    bitmap.fill([0xFF; 4]);
    let codec = RasterCodec::new();

    c.bench_function("wrap + convert_depth(24) (1275x1650)", |b| {
        b.iter(|| {
            let raw = codec
                .wrap_raw_buffer(
                    black_box(bitmap.data()),
                    bitmap.width(),
                    bitmap.height(),
                    bitmap.stride(),
                    32,
                    ChannelMasks::RGBA,
                    true,
                )
                .unwrap();
            black_box(codec.convert_depth(&raw, 24).unwrap());
        });
    });
}

criterion_group!(benches, bench_rasterize, bench_wrap_and_convert);
criterion_main!(benches);
