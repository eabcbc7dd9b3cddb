// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the folio-document crate: page-tree assembly,
// headless rendering and the deskew estimator.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{Rgba, RgbaImage};

use folio_document::pdf::{Rect, Rgb, ShapeStyle};
use folio_document::raster::estimate_skew;
use folio_document::{
    ContentRenderer, PageRenderer, PdfDocumentHandle, SaveOptions, Surface, parse_ranges,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A document of `pages` A4 pages, each carrying one filled rectangle.
fn sample_document(pages: usize) -> Vec<u8> {
    let mut handle = PdfDocumentHandle::create();
    for index in 0..pages {
        handle.add_page((595.28, 841.89)).unwrap();
        handle
            .draw_rectangle(
                index,
                Rect::new(50.0, 50.0, 200.0, 100.0),
                &ShapeStyle::filled(Rgb::GRAY),
            )
            .unwrap();
    }
    handle.save(&SaveOptions::default()).unwrap()
}

/// Dark horizontal rules on white, like lines of text.
fn ruled_surface() -> Surface {
    let mut image = RgbaImage::from_pixel(300, 300, Rgba([255, 255, 255, 255]));
    for y in (20..280).step_by(16) {
        for x in 20..280 {
            for dy in 0..3 {
                image.put_pixel(x, y + dy, Rgba([0, 0, 0, 255]));
            }
        }
    }
    Surface::from_rgba(image)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Merge two 20-page documents page by page into a fresh handle.
fn bench_merge(c: &mut Criterion) {
    let left = PdfDocumentHandle::load(&sample_document(20), None).unwrap();
    let right = PdfDocumentHandle::load(&sample_document(20), None).unwrap();
    let all: Vec<usize> = (0..20).collect();

    c.bench_function("merge (20 + 20 pages)", |b| {
        b.iter(|| {
            let mut merged = PdfDocumentHandle::create();
            merged.copy_pages(black_box(&left), &all).unwrap();
            merged.copy_pages(black_box(&right), &all).unwrap();
            black_box(merged.save(&SaveOptions::default()).unwrap());
        });
    });
}

/// Render one A4 page at the low quality tier.
fn bench_render(c: &mut Criterion) {
    let doc = PdfDocumentHandle::load(&sample_document(1), None).unwrap();

    c.bench_function("render A4 page (scale 1.5)", |b| {
        b.iter(|| black_box(ContentRenderer.render(&doc, 0, black_box(1.5)).unwrap()));
    });
}

fn bench_estimate_skew(c: &mut Criterion) {
    let surface = ruled_surface();

    c.bench_function("estimate_skew (300x300)", |b| {
        b.iter(|| black_box(estimate_skew(black_box(&surface))));
    });
}

fn bench_parse_ranges(c: &mut Criterion) {
    c.bench_function("parse_ranges", |b| {
        b.iter(|| black_box(parse_ranges(black_box("1,3-5,8,10-200,abc,0"), 150)));
    });
}

criterion_group!(
    benches,
    bench_merge,
    bench_render,
    bench_estimate_skew,
    bench_parse_ranges
);
criterion_main!(benches);
