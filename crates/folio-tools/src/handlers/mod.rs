// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tool handlers, one module per catalog category, plus the helpers they
// share for loading inputs, naming outputs and rebuilding rasterised pages.

pub(crate) mod advanced;
pub(crate) mod convert;
pub(crate) mod edit;
pub(crate) mod export;
pub(crate) mod organize;
pub(crate) mod security;

use folio_core::error::{FolioError, Result};
use folio_core::{InputFile, ResultDescriptor};
use folio_document::pdf::{Placement, SaveOptions};
use folio_document::{PageRenderer, PdfDocumentHandle, RasterFormat, Surface};
use tracing::debug;

pub(crate) type Outputs = Result<Vec<ResultDescriptor>>;

/// Decode an input PDF, tagging failures with the file name.
pub(crate) fn load(file: &InputFile) -> Result<PdfDocumentHandle> {
    PdfDocumentHandle::load(file.data(), None).map_err(|err| err.for_file(file.name()))
}

pub(crate) fn load_with_password(file: &InputFile, password: &str) -> Result<PdfDocumentHandle> {
    let password = (!password.is_empty()).then_some(password);
    PdfDocumentHandle::load(file.data(), password).map_err(|err| err.for_file(file.name()))
}

pub(crate) fn save(handle: PdfDocumentHandle) -> Result<Vec<u8>> {
    handle.save(&SaveOptions::default())
}

/// `<prefix>_<original name>`.
pub(crate) fn prefixed(prefix: &str, file: &InputFile) -> String {
    format!("{prefix}_{}", file.name())
}

/// Single PDF result named `<prefix>_<original name>`.
pub(crate) fn single_pdf(prefix: &str, file: &InputFile, handle: PdfDocumentHandle) -> Outputs {
    Ok(vec![ResultDescriptor::pdf(prefixed(prefix, file), save(handle)?)])
}

pub(crate) fn first(files: &[InputFile]) -> Result<&InputFile> {
    files
        .first()
        .ok_or_else(|| FolioError::Validation("Please select a file.".into()))
}

pub(crate) fn no_pages(file: &InputFile) -> FolioError {
    FolioError::Validation(format!("{} has no pages.", file.name()))
}

/// A new document holding copies of `indices` from `source`.
pub(crate) fn extract(source: &PdfDocumentHandle, indices: &[usize]) -> Result<PdfDocumentHandle> {
    let mut out = PdfDocumentHandle::create();
    out.copy_pages(source, indices)?;
    Ok(out)
}

/// Render `pages` in order, naming the file on failure.
pub(crate) fn render_pages(
    renderer: &dyn PageRenderer,
    file: &InputFile,
    doc: &PdfDocumentHandle,
    pages: &[usize],
    scale: f32,
) -> Result<Vec<Surface>> {
    renderer
        .render_pages(doc, pages, scale)
        .map_err(|err| match err {
            FolioError::Render(msg) => FolioError::Render(format!("{}: {msg}", file.name())),
            other => other.for_file(file.name()),
        })
}

/// A page image together with the page size it is drawn at.
pub(crate) struct RasterPage {
    pub surface: Surface,
    pub size: (f32, f32),
}

/// Build a PDF with one full-bleed JPEG per page.
pub(crate) fn rebuild_from_rasters(pages: &[RasterPage], jpeg_quality: f32) -> Result<Vec<u8>> {
    let mut out = PdfDocumentHandle::create();
    for page in pages {
        let (width, height) = page.size;
        let index = out.add_page(page.size)?;
        let encoded = page.surface.encode(RasterFormat::Jpeg, jpeg_quality)?;
        let image = out.embed_image(&encoded)?;
        out.draw_image(index, &image, &Placement::new(0.0, 0.0, width, height))?;
    }
    debug!(pages = pages.len(), "Rebuilt document from page images");
    save(out)
}

/// Render every page, map each surface through `transform` and rebuild.
pub(crate) fn rerender(
    renderer: &dyn PageRenderer,
    file: &InputFile,
    scale: f32,
    jpeg_quality: f32,
    mut transform: impl FnMut(usize, Surface) -> Result<Surface>,
) -> Result<Vec<u8>> {
    let doc = load(file)?;
    if doc.page_count() == 0 {
        return Err(no_pages(file));
    }
    let indices: Vec<usize> = (0..doc.page_count()).collect();
    let surfaces = render_pages(renderer, file, &doc, &indices, scale)?;
    let mut pages = Vec::with_capacity(surfaces.len());
    for (index, surface) in surfaces.into_iter().enumerate() {
        let size = doc.page_info(index)?.display_size();
        pages.push(RasterPage {
            surface: transform(index, surface)?,
            size,
        });
    }
    rebuild_from_rasters(&pages, jpeg_quality)
}

/// Scale `(width, height)` uniformly to fit inside `cell`, centred.
pub(crate) fn fit_into(width: f32, height: f32, cell: (f32, f32, f32, f32)) -> Placement {
    let (x, y, cell_w, cell_h) = cell;
    let scale = (cell_w / width).min(cell_h / height);
    let (w, h) = (width * scale, height * scale);
    Placement::new(x + (cell_w - w) / 2.0, y + (cell_h - h) / 2.0, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_keeps_aspect_and_centres() {
        let placed = fit_into(100.0, 200.0, (0.0, 0.0, 100.0, 100.0));
        assert_eq!((placed.width, placed.height), (50.0, 100.0));
        assert_eq!((placed.x, placed.y), (25.0, 0.0));
    }

    #[test]
    fn prefixed_name_keeps_original() {
        let file = InputFile::pdf("report.pdf", Vec::new());
        assert_eq!(prefixed("rotated", &file), "rotated_report.pdf");
    }
}
