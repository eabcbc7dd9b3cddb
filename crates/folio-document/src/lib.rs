// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-document: document processing for Folio.
//
// Provides the PDF assembly engine (load, create, copy, reorder, rotate, draw,
// metadata, save), page rasterisation and pixel transforms, text extraction
// from Office and markup sources, and minimal OOXML packaging.

pub mod extract;
pub mod ooxml;
pub mod page_range;
pub mod pdf;
pub mod raster;

// Re-export the primary types so callers can use `folio_document::PdfDocumentHandle` etc.
pub use page_range::{parse_ranges, to_range_string};
pub use pdf::{PdfDocumentHandle, PdfWriter, RepairPolicy, SaveOptions};
pub use raster::{ContentRenderer, PageRenderer, PdfiumRenderer, RasterFormat, Surface};
