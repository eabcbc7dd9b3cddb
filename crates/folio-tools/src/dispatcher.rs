// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The dispatcher: resolves a tool id, builds its typed request and runs the
// matching handler.
//
// Every call works on freshly decoded copies of its inputs, so a dispatcher
// holds no per-call state and can be shared across threads. The renderer
// and nonce source are injected capabilities held behind `Arc`.

use std::path::PathBuf;
use std::sync::Arc;

use folio_core::error::{FolioError, Result};
use folio_core::{FolioConfig, InputFile, OptionsBag, ResultDescriptor};
use folio_document::{PageRenderer, PdfiumRenderer};
use folio_security::{ENVELOPE_EXTENSION, NonceSource, SystemNonceSource};
use tracing::{debug, info, instrument};

use crate::catalog::ToolId;
use crate::handlers::{advanced, convert, edit, export, organize, security};
use crate::request::ToolRequest;

/// Runs catalog tools over in-memory files.
#[derive(Clone)]
pub struct Dispatcher {
    pub(crate) config: FolioConfig,
    pub(crate) renderer: Arc<dyn PageRenderer>,
    pub(crate) nonces: Arc<dyn NonceSource>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(FolioConfig::default())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Dispatcher rendering through PDFium, with OS randomness for IVs.
    pub fn new(config: FolioConfig) -> Self {
        let pdfium = PdfiumRenderer::new(config.pdfium_library_path.as_ref().map(PathBuf::from));
        Self {
            config,
            renderer: Arc::new(pdfium),
            nonces: Arc::new(SystemNonceSource::new()),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Replace the IV source used for envelopes. Tests use a seeded source
    /// to get reproducible output.
    pub fn with_nonce_source(mut self, nonces: Arc<dyn NonceSource>) -> Self {
        self.nonces = nonces;
        self
    }

    pub fn config(&self) -> &FolioConfig {
        &self.config
    }

    /// Run the tool named `tool_id`.
    ///
    /// Unknown ids fail with [`FolioError::UnsupportedOperation`]. An
    /// `.aes256` envelope handed to `protect-pdf` is opened instead of being
    /// sealed a second time.
    #[instrument(skip(self, files, options), fields(files = files.len()))]
    pub fn dispatch(
        &self,
        tool_id: &str,
        files: &[InputFile],
        options: &OptionsBag,
    ) -> Result<Vec<ResultDescriptor>> {
        let mut tool: ToolId = tool_id.parse()?;
        if tool == ToolId::ProtectPdf
            && files
                .first()
                .is_some_and(|file| file.has_extension(ENVELOPE_EXTENSION))
        {
            debug!("Envelope input, decrypting instead");
            tool = ToolId::DecryptPdf;
        }
        self.run(tool, files, options)
    }

    /// Run an already resolved tool.
    #[instrument(skip(self, files, options), fields(tool = %tool, files = files.len()))]
    pub fn run(
        &self,
        tool: ToolId,
        files: &[InputFile],
        options: &OptionsBag,
    ) -> Result<Vec<ResultDescriptor>> {
        check_file_count(tool, files)?;
        let request = ToolRequest::build(tool, options)?;
        debug!(?request, "Request built");

        let outputs = self.execute(&request, files, options)?;
        info!(
            outputs = outputs.len(),
            bytes = outputs.iter().map(|out| out.data.len()).sum::<usize>(),
            "Tool finished"
        );
        Ok(outputs)
    }

    fn execute(
        &self,
        request: &ToolRequest,
        files: &[InputFile],
        options: &OptionsBag,
    ) -> Result<Vec<ResultDescriptor>> {
        use ToolRequest as R;

        match request {
            R::Merge => organize::merge(files),
            R::Split(opts) => organize::split(files, opts),
            R::RemovePages(opts) => organize::remove_pages(files, opts),
            R::ExtractPages(opts) => organize::extract_pages(files, opts),
            R::Reorder(opts) => organize::reorder(files, opts),
            R::Rotate(opts) => organize::rotate(files, opts),
            R::AddBlank(opts) => organize::add_blank(files, opts),
            R::Duplicate(opts) => organize::duplicate(files, opts),
            R::Reverse => organize::reverse(files),
            R::Mix => organize::mix(files),
            R::SplitBySize(opts) => organize::split_by_size(files, opts),
            R::NUp(opts) => organize::n_up(files, opts),
            R::Booklet => organize::booklet(files),

            R::ImagesToPdf(layout) => convert::images_to_pdf(files, layout),
            R::TextToPdf(source, opts) => convert::text_to_pdf(&self.config, files, *source, opts),
            R::QrCode(opts) => convert::qr_code(opts),

            R::RenderPages(format, opts) => export::page_images(self, files, *format, opts),
            R::LongImage(opts) => export::long_image(self, files, opts),
            R::ExportText => export::text(files),
            R::ExportHtml(opts) => export::html(self, files, opts),
            R::ExportJson => export::json(files),
            R::ExportXml => export::xml(files),
            R::ExportCsv => export::csv(files),
            R::ExportPowerPoint(opts) => export::powerpoint(self, files, opts),
            R::ExportExcel => export::excel(files),
            R::ExtractImages => export::images(files),

            R::Protect(opts) => security::protect(self, files, opts),
            R::Decrypt(opts) => security::decrypt(files, opts),
            R::Unlock(opts) => security::unlock(files, opts),
            R::ChangePassword(opts) => security::change_password(self, files, opts),
            R::Watermark(opts) => security::watermark(files, opts),
            R::Sanitize => security::sanitize(files),

            R::Compress(opts) => edit::compress(files, opts),
            R::PageNumbers(opts) => edit::page_numbers(files, opts),
            R::HeaderFooter(opts) => edit::header_footer(files, opts),
            R::Crop(opts) => edit::crop(files, opts),
            R::Resize(paper) => edit::resize(files, *paper),
            R::Grayscale(opts) => edit::grayscale(self, files, opts),
            R::Contrast(opts) => edit::contrast(self, files, opts),
            R::Deskew(opts) => edit::deskew(self, files, opts),
            R::Overlay => edit::overlay(files),
            R::DeleteAnnotations => edit::delete_annotations(files),
            R::Annotate(annotations) => edit::annotate(files, annotations),

            R::Repair(opts) => advanced::repair(files, opts),
            R::Ocr(opts) => advanced::ocr(self, files, opts),
            R::Compare(opts) => advanced::compare(self, files, opts),
            R::OptimizeWeb(opts) => advanced::optimize_web(files, opts),
            R::MetaEdit(opts) => advanced::meta_edit(files, opts),
            R::SetViewer(prefs) => advanced::set_viewer(files, prefs),
            R::ExtractFonts => advanced::extract_fonts(files),
            R::Analyze => advanced::analyze(files),
            R::Batch(tool) => advanced::batch(self, *tool, files, options),
            R::PrintReady(print, raster) => advanced::print_ready(self, files, print, raster),

            R::TextFallback => convert::text_fallback(&self.config, files),
            R::Passthrough => convert::passthrough(files),
        }
    }
}

fn check_file_count(tool: ToolId, files: &[InputFile]) -> Result<()> {
    let needed = tool.min_files();
    if files.len() >= needed {
        return Ok(());
    }
    Err(FolioError::Validation(match (tool, needed) {
        (ToolId::MixPdf, _) => "Please select at least 2 files to mix.".into(),
        (_, 1) => "Please select a file.".into(),
        (_, n) => format!("Please select at least {n} files."),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatcher_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Dispatcher>();
    }

    #[test]
    fn unknown_tool_is_unsupported() {
        let err = Dispatcher::default()
            .dispatch("make-coffee", &[], &OptionsBag::new())
            .unwrap_err();
        assert!(matches!(err, FolioError::UnsupportedOperation(id) if id == "make-coffee"));
    }

    #[test]
    fn file_count_is_checked_before_options() {
        let file = InputFile::pdf("a.pdf", Vec::new());
        let err = Dispatcher::default()
            .dispatch("compare-pdf", &[file], &OptionsBag::new())
            .unwrap_err();
        assert!(matches!(err, FolioError::Validation(msg) if msg.contains("at least 2")));
    }

    #[test]
    fn mix_has_its_own_message() {
        let err = check_file_count(ToolId::MixPdf, &[]).unwrap_err();
        assert!(matches!(err, FolioError::Validation(msg) if msg.contains("to mix")));
    }
}
