// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDFium-backed page rendering.
//
// PDFium is loaded at runtime as a shared library. Binding happens once per
// render call and the document is serialised once per call, so callers that
// need several pages should go through `render_pages`.

use std::path::{Path, PathBuf};

use folio_core::error::{FolioError, Result};
use pdfium_render::prelude::{Pdfium, PdfiumError, PdfRenderConfig};
use tracing::{debug, instrument};

use super::Surface;
use super::renderer::PageRenderer;
use crate::pdf::PdfDocumentHandle;

/// Environment variable naming the PDFium library (file or directory).
pub const PDFIUM_PATH_ENV: &str = "PDFIUM_DYNAMIC_LIB_PATH";

/// Renders pages with PDFium, text and vector paths included.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRenderer {
    library_path: Option<PathBuf>,
}

impl PdfiumRenderer {
    /// `library_path` may point at the library itself or at the directory
    /// holding it. `None` searches the usual places.
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }

    /// Whether a PDFium library can be bound with the current settings.
    pub fn is_available(&self) -> bool {
        self.bind().is_ok()
    }

    fn bind(&self) -> Result<Pdfium> {
        let configured = self
            .library_path
            .clone()
            .or_else(|| std::env::var_os(PDFIUM_PATH_ENV).map(PathBuf::from));

        let bindings = match configured {
            Some(path) => Pdfium::bind_to_library(library_file(&path)).map_err(bind_error)?,
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
                .map_err(bind_error)?,
        };
        Ok(Pdfium::new(bindings))
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render(&self, doc: &PdfDocumentHandle, page_index: usize, scale: f32) -> Result<Surface> {
        self.render_pages(doc, &[page_index], scale)?
            .pop()
            .ok_or_else(|| FolioError::Render(format!("page {} was not rendered", page_index + 1)))
    }

    #[instrument(skip(self, doc), fields(pages = pages.len()))]
    fn render_pages(
        &self,
        doc: &PdfDocumentHandle,
        pages: &[usize],
        scale: f32,
    ) -> Result<Vec<Surface>> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(FolioError::Render(format!("invalid scale {scale}")));
        }
        for &index in pages {
            doc.page_info(index)?;
        }

        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_vec(doc.to_bytes()?, None)
            .map_err(|err| FolioError::Render(format!("PDFium could not open the document: {err}")))?;
        let config = PdfRenderConfig::new().scale_page_by_factor(scale);

        pages
            .iter()
            .map(|&index| {
                let page_number = index + 1;
                let pdfium_index = u16::try_from(index)
                    .map_err(|_| FolioError::Render(format!("page {page_number} is beyond PDFium's range")))?;
                let page = document
                    .pages()
                    .get(pdfium_index)
                    .map_err(|err| FolioError::Render(format!("page {page_number}: {err}")))?;
                let bitmap = page
                    .render_with_config(&config)
                    .map_err(|err| FolioError::Render(format!("page {page_number}: {err}")))?;
                let surface = Surface::from_dynamic(bitmap.as_image());
                debug!(
                    page = page_number,
                    width = surface.width(),
                    height = surface.height(),
                    "Page rendered"
                );
                Ok(surface)
            })
            .collect()
    }
}

/// A directory is resolved to the platform's library file name inside it.
fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    }
}

fn bind_error(err: PdfiumError) -> FolioError {
    FolioError::Render(format!(
        "PDFium library not available ({err}); set {PDFIUM_PATH_ENV} or pdfium_library_path"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::draw::TextRun;
    use crate::pdf::fonts::StandardFont;

    fn text_page() -> PdfDocumentHandle {
        let mut handle = PdfDocumentHandle::create();
        let index = handle.add_page((300.0, 200.0)).unwrap();
        let font = handle.embed_font(StandardFont::HelveticaBold).unwrap();
        handle
            .draw_text(index, &TextRun::new("Hello world", 20.0, 90.0, 36.0, font))
            .unwrap();
        handle
    }

    #[test]
    fn missing_library_is_a_render_error() {
        let renderer = PdfiumRenderer::new(Some(PathBuf::from("/definitely/not/libpdfium.so")));
        assert!(!renderer.is_available());
        let err = renderer.render(&text_page(), 0, 1.0).unwrap_err();
        assert!(matches!(err, FolioError::Render(msg) if msg.contains("PDFium")));
    }

    #[test]
    fn out_of_range_page_is_rejected_before_binding() {
        let renderer = PdfiumRenderer::new(Some(PathBuf::from("/definitely/not/libpdfium.so")));
        let err = renderer.render(&text_page(), 3, 1.0).unwrap_err();
        assert!(matches!(err, FolioError::Validation(_)));
    }

    #[test]
    fn rendered_text_page_has_ink() {
        let renderer = PdfiumRenderer::default();
        if !renderer.is_available() {
            eprintln!("PDFium not installed; skipping text rendering check");
            return;
        }
        let surface = renderer.render(&text_page(), 0, 2.0).unwrap();
        assert_eq!((surface.width(), surface.height()), (600, 400));
        let inked = surface
            .pixels()
            .chunks_exact(4)
            .filter(|px| px[0] < 128 && px[1] < 128 && px[2] < 128)
            .count();
        assert!(inked > 100, "only {inked} dark pixels on a text page");
    }
}
