// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the scanflow-document kernels. Runs every catalog
// filter and a quarter-turn rotation on a small synthetic page.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use scanflow_core::{FilterKind, PageImage, TransformKernel};
use scanflow_document::ImageKernel;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 200x280 "page": off-white paper with dark text-like bars and a coloured
/// stamp in one corner.
fn synthetic_page() -> PageImage {
    let (width, height) = (200u32, 280u32);
    let img = RgbImage::from_fn(width, height, |x, y| {
        if x > 150 && y < 40 {
            Rgb([180, 30, 40])
        } else if y % 14 < 3 && (20..180).contains(&x) {
            Rgb([25, 25, 30])
        } else {
            Rgb([232, 226, 214])
        }
    });
    PageImage::new(DynamicImage::ImageRgb8(img))
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_filters(c: &mut Criterion) {
    let kernel = ImageKernel::new(0.1);
    let page = synthetic_page();

    let mut group = c.benchmark_group("filter (200x280)");
    for filter in FilterKind::CATALOG {
        group.bench_function(filter.keyword(), |b| {
            b.iter(|| black_box(kernel.filter(black_box(&page), filter)));
        });
    }
    group.finish();
}

fn bench_rotate(c: &mut Criterion) {
    let kernel = ImageKernel::new(0.1);
    let page = synthetic_page();

    c.bench_function("rotate 90 (200x280)", |b| {
        b.iter(|| black_box(kernel.rotate(black_box(&page), 90)));
    });
}

criterion_group!(benches, bench_filters, bench_rotate);
criterion_main!(benches);
