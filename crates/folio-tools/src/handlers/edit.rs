// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page edits: stamping text, boxes, resizing, overlays, annotations and the
// raster transforms that rebuild pages from rendered images.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use folio_core::error::{FolioError, Result};
use folio_core::{InputFile, Orientation, PaperSize, ResultDescriptor};
use folio_document::pdf::{
    FontRef, PageInfo, Placement, Rect, Rgb, SaveOptions, ShapeStyle, StandardFont, TextRun,
};
use folio_document::raster::{contrast as contrast_transform, deskew as deskew_surface};
use folio_document::PdfDocumentHandle;
use tracing::{debug, info, instrument};

use super::{Outputs, first, fit_into, load, prefixed, rerender, single_pdf};
use crate::dispatcher::Dispatcher;
use crate::request::{
    Anchor, Annotation, CompressOptions, ContrastOptions, CropOptions, GrayscaleOptions,
    HeaderFooterOptions, PageNumberOptions, RasterOptions,
};

/// Distance of stamped text from the page edge, in points.
const STAMP_MARGIN: f32 = 30.0;

/// Opacity of highlight annotations.
const HIGHLIGHT_OPACITY: f32 = 0.3;

pub(crate) fn compress(files: &[InputFile], options: &CompressOptions) -> Outputs {
    let file = first(files)?;
    let mut doc = load(file)?;
    if options.remove_metadata {
        doc.clear_metadata()?;
    }
    let data = doc.save(&SaveOptions::compact())?;
    info!(before = file.data().len(), after = data.len(), "Compressed");
    Ok(vec![ResultDescriptor::pdf(prefixed("compressed", file), data)])
}

#[instrument(skip_all, fields(position = ?options.position))]
pub(crate) fn page_numbers(files: &[InputFile], options: &PageNumberOptions) -> Outputs {
    let file = first(files)?;
    let mut doc = load(file)?;
    let font = doc.embed_font(StandardFont::Helvetica)?;
    let count = doc.page_count();
    let total = (options.start + count as i64 - 1).max(0) as usize;

    for index in 0..count {
        let number = (options.start + index as i64).max(0) as usize;
        let label = options.format.render(number, total);
        let crop = doc.page_info(index)?.crop_box;
        let (x, y) = anchored(crop, options.position, font.text_width(&label, options.size), options.size);
        doc.draw_text(index, &TextRun::new(label, x, y, options.size, font))?;
    }
    single_pdf("numbered", file, doc)
}

/// Baseline origin for a run of `width` points placed at `anchor`.
fn anchored(crop: Rect, anchor: Anchor, width: f32, size: f32) -> (f32, f32) {
    let x = match anchor {
        Anchor::TopLeft | Anchor::BottomLeft => crop.x + STAMP_MARGIN,
        Anchor::TopCenter | Anchor::BottomCenter => crop.x + (crop.width - width) / 2.0,
        Anchor::TopRight | Anchor::BottomRight => crop.x + crop.width - STAMP_MARGIN - width,
    };
    let y = if anchor.is_top() {
        crop.y + crop.height - STAMP_MARGIN - size
    } else {
        crop.y + STAMP_MARGIN
    };
    (x, y)
}

pub(crate) fn header_footer(files: &[InputFile], options: &HeaderFooterOptions) -> Outputs {
    let file = first(files)?;
    let mut doc = load(file)?;
    let font = doc.embed_font(StandardFont::Helvetica)?;
    let size = options.header_footer_size;
    let total = doc.page_count();
    let date = Utc::now().format("%Y-%m-%d").to_string();

    for index in 0..total {
        let crop = doc.page_info(index)?.crop_box;
        for (template, anchor) in [
            (&options.header_text, Anchor::TopCenter),
            (&options.footer_text, Anchor::BottomCenter),
        ] {
            if template.trim().is_empty() {
                continue;
            }
            let text = template
                .replace("{page}", &(index + 1).to_string())
                .replace("{total}", &total.to_string())
                .replace("{date}", &date);
            let (x, y) = anchored(crop, anchor, font.text_width(&text, size), size);
            doc.draw_text(index, &TextRun::new(text, x, y, size, font))?;
        }
    }
    single_pdf("header_footer", file, doc)
}

/// Pull the crop box in by the margin on every side.
pub(crate) fn crop(files: &[InputFile], options: &CropOptions) -> Outputs {
    let file = first(files)?;
    let mut doc = load(file)?;
    for index in 0..doc.page_count() {
        let crop = doc.page_info(index)?.crop_box;
        doc.set_crop_box(index, crop.inset(options.crop_margin))?;
    }
    single_pdf("cropped", file, doc)
}

/// Scale every page onto the target paper, keeping each page's orientation.
#[instrument(skip_all, fields(?paper))]
pub(crate) fn resize(files: &[InputFile], paper: PaperSize) -> Outputs {
    let file = first(files)?;
    let source = load(file)?;
    let mut out = PdfDocumentHandle::create();
    for index in 0..source.page_count() {
        let (width, height) = source.page_info(index)?.display_size();
        let orientation = if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        };
        let target = paper.oriented(orientation);
        let page = out.add_page(target)?;
        let embedded = out.embed_page(&source, index)?;
        let at = fit_into(embedded.width, embedded.height, (0.0, 0.0, target.0, target.1));
        out.draw_page(page, &embedded, &at)?;
    }
    out.set_metadata(&source.metadata())?;
    single_pdf("resized", file, out)
}

pub(crate) fn grayscale(dispatcher: &Dispatcher, files: &[InputFile], options: &GrayscaleOptions) -> Outputs {
    let file = first(files)?;
    let config = &dispatcher.config;
    let transform = options.method.transform();
    let data = rerender(
        dispatcher.renderer.as_ref(),
        file,
        config.scale_for(options.quality),
        config.rerender_jpeg_quality,
        |_, mut surface| {
            surface.apply_pixel_transform(&transform);
            Ok(surface)
        },
    )?;
    Ok(vec![ResultDescriptor::pdf(prefixed("grayscale", file), data)])
}

pub(crate) fn contrast(dispatcher: &Dispatcher, files: &[InputFile], options: &ContrastOptions) -> Outputs {
    let file = first(files)?;
    let config = &dispatcher.config;
    let transform = contrast_transform(options.contrast_factor);
    let data = rerender(
        dispatcher.renderer.as_ref(),
        file,
        config.scale_for(&options.quality),
        config.rerender_jpeg_quality,
        |_, mut surface| {
            surface.apply_pixel_transform(&transform);
            Ok(surface)
        },
    )?;
    Ok(vec![ResultDescriptor::pdf(prefixed("contrast", file), data)])
}

pub(crate) fn deskew(dispatcher: &Dispatcher, files: &[InputFile], options: &RasterOptions) -> Outputs {
    let file = first(files)?;
    let config = &dispatcher.config;
    let data = rerender(
        dispatcher.renderer.as_ref(),
        file,
        config.scale_for(&options.quality),
        config.rerender_jpeg_quality,
        |index, surface| {
            let (level, angle) = deskew_surface(&surface);
            debug!(page = index + 1, angle, "Deskewed");
            Ok(level)
        },
    )?;
    Ok(vec![ResultDescriptor::pdf(prefixed("deskewed", file), data)])
}

/// Draw the pages of the second file over the first. A shorter overlay is
/// repeated from its first page.
pub(crate) fn overlay(files: &[InputFile]) -> Outputs {
    let [base_file, overlay_file, ..] = files else {
        return Err(FolioError::Validation(
            "Please select a base PDF and an overlay PDF.".into(),
        ));
    };
    let mut base = load(base_file)?;
    let overlay = load(overlay_file)?;
    if overlay.page_count() == 0 {
        return Err(super::no_pages(overlay_file));
    }

    let mut embedded = Vec::with_capacity(overlay.page_count());
    for index in 0..overlay.page_count() {
        embedded.push(base.embed_page(&overlay, index)?);
    }
    for index in 0..base.page_count() {
        let page = &embedded[index % embedded.len()];
        let crop = base.page_info(index)?.crop_box;
        base.draw_page(index, page, &Placement::covering(crop))?;
    }
    single_pdf("overlay", base_file, base)
}

pub(crate) fn delete_annotations(files: &[InputFile]) -> Outputs {
    let file = first(files)?;
    let mut doc = load(file)?;
    let removed = doc.remove_annotations()?;
    info!(removed, "Annotations removed");
    single_pdf("annotations_removed", file, doc)
}

/// Flatten annotations into page content, in list order.
#[instrument(skip_all, fields(annotations = annotations.len()))]
pub(crate) fn annotate(files: &[InputFile], annotations: &[Annotation]) -> Outputs {
    let file = first(files)?;
    let mut doc = load(file)?;
    let font = doc.embed_font(StandardFont::Helvetica)?;
    for annotation in annotations {
        let page = annotation.page();
        if page == 0 || page > doc.page_count() {
            return Err(FolioError::Validation(format!(
                "Annotation on page {page}, but {} has {} pages.",
                file.name(),
                doc.page_count()
            )));
        }
        let index = page - 1;
        let info = doc.page_info(index)?;
        draw_annotation(&mut doc, index, &info, font, annotation)?;
    }
    single_pdf("annotated", file, doc)
}

fn draw_annotation(
    doc: &mut PdfDocumentHandle,
    index: usize,
    info: &PageInfo,
    font: FontRef,
    annotation: &Annotation,
) -> Result<()> {
    let crop = info.crop_box;
    // Editor coordinates grow downwards from the top-left corner.
    let flip = |x: f32, y: f32| (crop.x + x, crop.y + crop.height - y);

    match annotation {
        Annotation::Text {
            x,
            y,
            text,
            font_size,
            color,
            ..
        } => {
            let (px, py) = flip(*x, *y);
            let run = TextRun::new(text.clone(), px, py, *font_size, font).with_color(color.parse()?);
            doc.draw_text(index, &run)
        }
        Annotation::Rectangle {
            x,
            y,
            width,
            height,
            color,
            stroke_width,
            ..
        } => {
            let (px, py) = flip(*x, *y + *height);
            let style = ShapeStyle::stroked(color.parse()?, *stroke_width);
            doc.draw_rectangle(index, Rect::new(px, py, *width, *height), &style)
        }
        Annotation::Circle {
            x,
            y,
            width,
            height,
            color,
            stroke_width,
            ..
        } => {
            let centre = flip(*x + *width / 2.0, *y + *height / 2.0);
            let style = ShapeStyle::stroked(color.parse()?, *stroke_width);
            doc.draw_ellipse(index, centre, (*width / 2.0, *height / 2.0), &style)
        }
        Annotation::Line {
            x,
            y,
            x2,
            y2,
            color,
            stroke_width,
            ..
        } => {
            let style = ShapeStyle::stroked(color.parse()?, *stroke_width);
            doc.draw_line(index, flip(*x, *y), flip(*x2, *y2), &style)
        }
        Annotation::Highlight {
            x,
            y,
            width,
            height,
            color,
            ..
        } => {
            let (px, py) = flip(*x, *y + *height);
            let color: Rgb = color.parse()?;
            let style = ShapeStyle::filled(color).with_opacity(HIGHLIGHT_OPACITY);
            doc.draw_rectangle(index, Rect::new(px, py, *width, *height), &style)
        }
        Annotation::Image {
            x,
            y,
            width,
            height,
            data,
            ..
        } => {
            let bytes = decode_image_data(data)?;
            let image = doc.embed_image(&bytes)?;
            let (px, py) = flip(*x, *y + *height);
            doc.draw_image(index, &image, &Placement::new(px, py, *width, *height))
        }
    }
}

/// Base64 payload, with or without a `data:<mime>;base64,` prefix.
fn decode_image_data(data: &str) -> Result<Vec<u8>> {
    let payload = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    BASE64
        .decode(payload.trim())
        .map_err(|err| FolioError::Validation(format!("annotation image is not base64: {err}")))
}
