// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversions into PDF: images, flowing text, QR codes and the single-page
// fallback.

use folio_core::error::{FolioError, Result};
use folio_core::types::PaperSize;
use folio_core::{DocumentType, FolioConfig, InputFile, ResultDescriptor};
use folio_document::extract::{docx_text, html_text, markdown_text, reject_legacy_office, xlsx_text};
use folio_document::pdf::{ImageLayout, Placement, StandardFont, TextLayout, TextRun};
use folio_document::{PdfDocumentHandle, PdfWriter, SaveOptions, Surface};
use image::{DynamicImage, Luma};
use qrcode::QrCode;
use tracing::{info, instrument, warn};

use super::{Outputs, first};
use crate::request::{QrOptions, TextOptions, TextSource};

/// Where the fallback starts drawing, and at what size.
const FALLBACK_ORIGIN: (f32, f32) = (50.0, 800.0);
const FALLBACK_FONT_SIZE: f32 = 10.0;

/// One page per image, in input order.
#[instrument(skip_all, fields(files = files.len()))]
pub(crate) fn images_to_pdf(files: &[InputFile], layout: &ImageLayout) -> Outputs {
    let mut surfaces = Vec::with_capacity(files.len());
    for file in files {
        match file.extension().as_deref().and_then(DocumentType::from_extension) {
            Some(DocumentType::Svg) => {
                return Err(FolioError::UnsupportedFormat(format!(
                    "{}: SVG drawings cannot be rasterised here. Export the drawing as PNG first.",
                    file.name()
                )));
            }
            Some(DocumentType::Heic) => {
                return Err(FolioError::UnsupportedFormat(format!(
                    "{}: HEIC photos cannot be decoded here. Save the photo as JPEG first.",
                    file.name()
                )));
            }
            _ => {}
        }
        let surface = Surface::decode(file.data()).map_err(|err| err.for_file(file.name()))?;
        surfaces.push(surface);
    }
    if surfaces.is_empty() {
        return Err(FolioError::Validation("Please select at least one image.".into()));
    }
    let bytes = PdfWriter::new("Images").image_document(&surfaces, layout)?;
    info!(pages = surfaces.len(), "Images converted");
    Ok(vec![ResultDescriptor::pdf("images_converted.pdf", bytes)])
}

/// QR bitmap edge in pixels, and the edge it is drawn at in points.
const QR_PIXELS: u32 = 500;
const QR_POINTS: f32 = 250.0;
const QR_CAPTION_CHARS: usize = 50;
const QR_CAPTION_SIZE: f32 = 12.0;

/// One A4 page with the encoded text centred as a QR code and captioned
/// underneath. Takes no input files.
#[instrument(skip_all, fields(chars = options.qr_text.chars().count()))]
pub(crate) fn qr_code(options: &QrOptions) -> Outputs {
    let text = options.qr_text.as_str();
    if text.trim().is_empty() {
        return Err(FolioError::Validation(
            "Please enter the text to encode in the QR code.".into(),
        ));
    }
    let code = QrCode::new(text.as_bytes())
        .map_err(|err| FolioError::Validation(format!("Text cannot be encoded as a QR code: {err}")))?;
    let bitmap = code
        .render::<Luma<u8>>()
        .min_dimensions(QR_PIXELS, QR_PIXELS)
        .max_dimensions(QR_PIXELS, QR_PIXELS)
        .build();
    let pixels = DynamicImage::ImageLuma8(bitmap).to_rgba8();

    let (width, height) = PaperSize::A4.dimensions_pt();
    let mut doc = PdfDocumentHandle::create();
    let page = doc.add_page((width, height))?;
    let image = doc.embed_rgba(&pixels)?;
    let x = (width - QR_POINTS) / 2.0;
    let y = (height - QR_POINTS) / 2.0;
    doc.draw_image(page, &image, &Placement::new(x, y, QR_POINTS, QR_POINTS))?;

    let font = doc.embed_font(StandardFont::Helvetica)?;
    doc.draw_text(page, &TextRun::new(qr_caption(text), 50.0, y - 30.0, QR_CAPTION_SIZE, font))?;

    let bytes = doc.save(&SaveOptions::default())?;
    info!(modules = code.width(), "QR code generated");
    Ok(vec![ResultDescriptor::pdf("qrcode.pdf", bytes)])
}

fn qr_caption(text: &str) -> String {
    if text.chars().count() > QR_CAPTION_CHARS {
        let head: String = text.chars().take(QR_CAPTION_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Flow the text content of the first file onto A4 pages.
#[instrument(skip_all, fields(?source))]
pub(crate) fn text_to_pdf(
    config: &FolioConfig,
    files: &[InputFile],
    source: TextSource,
    options: &TextOptions,
) -> Outputs {
    let file = first(files)?;
    reject_legacy_office(file.name())?;
    let text = source_text(file, source)?;

    let font_size = if options.font_size > 0.0 {
        options.font_size
    } else {
        config.text_font_size
    };
    let layout = TextLayout::default()
        .with_font_size(font_size)
        .with_margin(config.text_margin_pt);
    let bytes = PdfWriter::new(file.stem()).text_document(&text, &layout)?;
    Ok(vec![ResultDescriptor::pdf(
        format!("{}_converted.pdf", file.stem()),
        bytes,
    )])
}

fn source_text(file: &InputFile, source: TextSource) -> Result<String> {
    let doc_type = file.extension().as_deref().and_then(DocumentType::from_extension);
    let text = match (source, doc_type) {
        (TextSource::Word, Some(DocumentType::Docx)) => docx_text(file.data())?,
        (TextSource::Spreadsheet, Some(DocumentType::Xlsx)) => xlsx_text(file.data())?,
        (TextSource::Markdown, _) | (_, Some(DocumentType::Markdown)) => {
            markdown_text(&file.text())
        }
        (TextSource::Html, _) | (_, Some(DocumentType::Html)) => html_text(&file.text()),
        _ => file.text(),
    };
    Ok(text)
}

/// A conversion with no real reader: the first characters of the file are
/// drawn as text on a single page.
pub(crate) fn text_fallback(config: &FolioConfig, files: &[InputFile]) -> Outputs {
    let file = first(files)?;
    reject_legacy_office(file.name())?;
    let text: String = file.text().chars().take(config.fallback_char_limit).collect();
    warn!(file = file.name(), chars = text.chars().count(), "No converter, drawing as text");
    let (x, y) = FALLBACK_ORIGIN;
    let bytes = PdfWriter::new(file.stem()).text_block(&text, x, y, FALLBACK_FONT_SIZE)?;
    Ok(vec![ResultDescriptor::pdf("converted_fallback.pdf", bytes)])
}

/// Inputs handed back unchanged under a `processed_` name.
pub(crate) fn passthrough(files: &[InputFile]) -> Outputs {
    first(files)?;
    warn!(files = files.len(), "Tool has no handler, returning inputs");
    Ok(files
        .iter()
        .map(|file| {
            ResultDescriptor::new(
                format!("processed_{}", file.name()),
                file.data().to_vec(),
                file.mime_type(),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_extension_wins_for_plain_tools() {
        let file = InputFile::new("notes.md", "", b"# Title\n\n*hi*".to_vec());
        let text = source_text(&file, TextSource::Plain).unwrap();
        assert!(text.contains("Title"));
        assert!(!text.contains('#'));
    }

    #[test]
    fn fallback_truncates_to_limit() {
        let config = FolioConfig {
            fallback_char_limit: 5,
            ..FolioConfig::default()
        };
        let file = InputFile::new("book.epub", "", b"abcdefghij".to_vec());
        let out = text_fallback(&config, &[file]).unwrap();
        assert_eq!(out[0].name, "converted_fallback.pdf");
        assert!(out[0].data.starts_with(b"%PDF"));
    }

    #[test]
    fn legacy_word_is_rejected() {
        let file = InputFile::new("old.doc", "", vec![0xD0, 0xCF]);
        let err = text_to_pdf(
            &FolioConfig::default(),
            &[file],
            TextSource::Word,
            &TextOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FolioError::UnsupportedFormat(_)));
    }

    #[test]
    fn qr_caption_is_cut_at_fifty_chars() {
        assert_eq!(qr_caption("short"), "short");
        let long = "x".repeat(80);
        let caption = qr_caption(&long);
        assert_eq!(caption.len(), 53);
        assert!(caption.ends_with("..."));
    }

    #[test]
    fn qr_code_is_one_a4_page() {
        let options = QrOptions {
            qr_text: "https://example.org/folio".into(),
        };
        let out = qr_code(&options).unwrap();
        assert_eq!(out[0].name, "qrcode.pdf");
        let doc = PdfDocumentHandle::load(&out[0].data, None).unwrap();
        assert_eq!(doc.page_count(), 1);
        let info = doc.page_info(0).unwrap();
        assert!((info.width - 595.28).abs() < 0.5);
    }

    #[test]
    fn empty_qr_text_is_rejected() {
        let err = qr_code(&QrOptions::default()).unwrap_err();
        assert!(matches!(err, FolioError::Validation(_)));
    }

    #[test]
    fn svg_is_unsupported() {
        let file = InputFile::new("logo.svg", "", b"<svg/>".to_vec());
        let err = images_to_pdf(&[file], &ImageLayout::default()).unwrap_err();
        assert!(matches!(err, FolioError::UnsupportedFormat(_)));
    }

    #[test]
    fn passthrough_keeps_mime() {
        let file = InputFile::new("sig.bin", "application/x-thing", vec![1, 2]);
        let out = passthrough(&[file]).unwrap();
        assert_eq!(out[0].name, "processed_sig.bin");
        assert_eq!(out[0].mime_type, "application/x-thing");
        assert_eq!(out[0].data, vec![1, 2]);
    }
}
