// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Advanced tools: repair, the OCR text layer, comparison, web and print
// preparation, metadata and viewer settings, inspection and batch runs.

use std::collections::HashSet;
use std::fmt::Write as _;

use chrono::Utc;
use folio_core::error::{FolioError, Result};
use folio_core::{DocumentType, InputFile, OptionsBag, ResultDescriptor};
use folio_document::pdf::{
    Placement, Rect, RepairPolicy, Rgb, SaveOptions, ShapeStyle, StandardFont, TextRun,
    ViewerPreferences,
};
use folio_document::raster::{GrayscaleMethod, cmyk_proof, contrast, deskew};
use folio_document::{PdfDocumentHandle, Surface};
use folio_security::hash_bytes;
use image::Rgba;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::{Outputs, RasterPage, first, load, no_pages, prefixed, rebuild_from_rasters, render_pages, rerender, single_pdf};
use crate::catalog::ToolId;
use crate::dispatcher::Dispatcher;
use crate::request::{
    ColorProfile, CompareMode, CompareOptions, MetadataOptions, OcrOptions, PrintOptions,
    RasterOptions, RepairOptions, WebOptions,
};

/// Contrast boost applied before the OCR text layer is added.
const OCR_ENHANCE_FACTOR: f32 = 1.3;
const OCR_FONT_SIZE: f32 = 10.0;
const OCR_MARGIN: f32 = 50.0;

/// Largest per-channel difference still treated as the same pixel.
const DIFF_TOLERANCE: u8 = 32;

/// Total ink coverage allowed by the CMYK soft proof (300%).
const INK_LIMIT: f32 = 3.0;
/// Space outside the bleed reserved for crop marks.
const CROP_MARK_SLUG: f32 = 18.0;
const CROP_MARK_OFFSET: f32 = 3.0;
const CROP_MARK_LENGTH: f32 = 12.0;

#[instrument(skip_all, fields(mode = %options.repair_mode))]
pub(crate) fn repair(files: &[InputFile], options: &RepairOptions) -> Outputs {
    let file = first(files)?;
    let policy = if options.remove_corrupted {
        RepairPolicy::Drop
    } else {
        RepairPolicy::Placeholder
    };
    let (doc, report) = PdfDocumentHandle::load_with_repair(file.data(), policy)
        .map_err(|err| err.for_file(file.name()))?;
    if doc.page_count() == 0 {
        return Err(FolioError::Corrupt(format!(
            "{}: no page could be recovered",
            file.name()
        )));
    }
    let save_options = if options.repair_mode.trim().eq_ignore_ascii_case("rebuild") {
        SaveOptions::compact()
    } else {
        SaveOptions::default()
    };
    info!(recovered = report.recovered, dropped = report.dropped, "Repaired");
    Ok(vec![ResultDescriptor::pdf(
        prefixed("repaired", file),
        doc.save(&save_options)?,
    )])
}

/// Searchable-PDF stand-in: optionally clean the page images, then lay the
/// document's extractable text over each page as invisible text.
#[instrument(skip_all, fields(language = %options.ocr_language))]
pub(crate) fn ocr(dispatcher: &Dispatcher, files: &[InputFile], options: &OcrOptions) -> Outputs {
    let file = first(files)?;
    let source = load(file)?;
    let texts = source.text()?;

    let mut doc = if options.ocr_deskew || options.ocr_enhance {
        let enhance = contrast(OCR_ENHANCE_FACTOR);
        let config = &dispatcher.config;
        let bytes = rerender(
            dispatcher.renderer.as_ref(),
            file,
            config.scale_for("high"),
            config.rerender_jpeg_quality,
            |_, mut surface| {
                if options.ocr_deskew {
                    surface = deskew(&surface).0;
                }
                if options.ocr_enhance {
                    surface.apply_pixel_transform(&enhance);
                }
                Ok(surface)
            },
        )?;
        PdfDocumentHandle::load(&bytes, None)?
    } else {
        source
    };

    let font = doc.embed_font(StandardFont::Helvetica)?;
    let line_height = OCR_FONT_SIZE * 1.2;
    for (index, text) in texts.iter().enumerate() {
        if text.trim().is_empty() {
            warn!(page = index + 1, "No text to lay over page");
            continue;
        }
        let crop = doc.page_info(index)?.crop_box;
        let top = crop.y + crop.height - OCR_MARGIN;
        let lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
        for (row, line) in lines.enumerate() {
            let y = top - row as f32 * line_height;
            if y < crop.y {
                break;
            }
            let run = TextRun::new(line, crop.x + OCR_MARGIN, y, OCR_FONT_SIZE, font).invisible();
            doc.draw_text(index, &run)?;
        }
    }
    single_pdf("ocr", file, doc)
}

#[instrument(skip_all, fields(mode = ?options.mode))]
pub(crate) fn compare(dispatcher: &Dispatcher, files: &[InputFile], options: &CompareOptions) -> Outputs {
    let [left_file, right_file, ..] = files else {
        return Err(FolioError::Validation(
            "Please select two PDFs to compare.".into(),
        ));
    };
    let left = load(left_file)?;
    let right = load(right_file)?;
    match options.mode {
        CompareMode::Text => compare_text(left_file, &left, right_file, &right),
        CompareMode::Visual => compare_visual(dispatcher, (left_file, &left), (right_file, &right), options.highlight),
    }
}

fn compare_text(
    left_file: &InputFile,
    left: &PdfDocumentHandle,
    right_file: &InputFile,
    right: &PdfDocumentHandle,
) -> Outputs {
    let (left_pages, right_pages) = (left.text()?, right.text()?);
    let mut report = format!(
        "Comparison of {} and {}\nPages: {} vs {}\n",
        left_file.name(),
        right_file.name(),
        left_pages.len(),
        right_pages.len()
    );
    let mut differing = 0;
    for index in 0..left_pages.len().max(right_pages.len()) {
        let before = page_lines(left_pages.get(index));
        let after = page_lines(right_pages.get(index));
        let before_set: HashSet<_> = before.iter().collect();
        let after_set: HashSet<_> = after.iter().collect();
        let removed: Vec<_> = before.iter().filter(|line| !after_set.contains(line)).collect();
        let added: Vec<_> = after.iter().filter(|line| !before_set.contains(line)).collect();

        if removed.is_empty() && added.is_empty() {
            let _ = writeln!(report, "\nPage {}: identical", index + 1);
            continue;
        }
        differing += 1;
        let _ = writeln!(report, "\nPage {}:", index + 1);
        for line in removed {
            let _ = writeln!(report, "- {line}");
        }
        for line in added {
            let _ = writeln!(report, "+ {line}");
        }
    }
    let _ = writeln!(report, "\n{differing} page(s) differ.");
    Ok(vec![ResultDescriptor::new(
        "comparison.txt",
        report.into_bytes(),
        DocumentType::PlainText.mime_type(),
    )])
}

fn page_lines(text: Option<&String>) -> Vec<String> {
    text.map(|text| {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

/// One page per page pair: the left page faded, with every differing pixel
/// painted in the highlight colour.
fn compare_visual(
    dispatcher: &Dispatcher,
    (left_file, left): (&InputFile, &PdfDocumentHandle),
    (right_file, right): (&InputFile, &PdfDocumentHandle),
    highlight: Rgb,
) -> Outputs {
    let renderer = dispatcher.renderer.as_ref();
    let scale = dispatcher.config.scale_for("low");
    let count = left.page_count().max(right.page_count());
    if count == 0 {
        return Err(no_pages(left_file));
    }

    let all = |doc: &PdfDocumentHandle| (0..doc.page_count()).collect::<Vec<_>>();
    let left_renders = render_pages(renderer, left_file, left, &all(left), scale)?;
    let right_renders = render_pages(renderer, right_file, right, &all(right), scale)?;

    let mut pages = Vec::with_capacity(count);
    for index in 0..count {
        let before = left_renders.get(index);
        let after = right_renders.get(index);
        let size = if index < left.page_count() {
            left.page_info(index)?.display_size()
        } else {
            right.page_info(index)?.display_size()
        };
        let (surface, changed) = diff_surfaces(before, after, highlight);
        debug!(page = index + 1, changed, "Pages compared");
        pages.push(RasterPage { surface, size });
    }
    let data = rebuild_from_rasters(&pages, dispatcher.config.export_jpeg_quality)?;
    Ok(vec![ResultDescriptor::pdf("compare_result.pdf", data)])
}

/// Pixel diff of two renders. A missing side counts as differing everywhere.
fn diff_surfaces(before: Option<&Surface>, after: Option<&Surface>, highlight: Rgb) -> (Surface, usize) {
    let dims = |surface: Option<&Surface>| surface.map_or((0, 0), |s| (s.width(), s.height()));
    let (bw, bh) = dims(before);
    let (aw, ah) = dims(after);
    let (width, height) = (bw.max(aw).max(1), bh.max(ah).max(1));
    let mark = Rgba([
        (highlight.r * 255.0).round() as u8,
        (highlight.g * 255.0).round() as u8,
        (highlight.b * 255.0).round() as u8,
        255,
    ]);
    let sample = |surface: Option<&Surface>, x: u32, y: u32| {
        surface
            .filter(|s| x < s.width() && y < s.height())
            .map(|s| s.pixel(x, y))
    };

    let mut out = Surface::blank(width, height);
    let mut changed = 0;
    for y in 0..height {
        for x in 0..width {
            let pixel = match (sample(before, x, y), sample(after, x, y)) {
                (Some(a), Some(b)) if same_pixel(a, b) => {
                    let fade = |c: u8| ((c as u16 + 255) / 2) as u8;
                    Rgba([fade(a[0]), fade(a[1]), fade(a[2]), 255])
                }
                (None, None) => continue,
                _ => {
                    changed += 1;
                    mark
                }
            };
            out.as_image_mut().put_pixel(x, y, pixel);
        }
    }
    (out, changed)
}

fn same_pixel(a: [u8; 4], b: [u8; 4]) -> bool {
    a.iter().zip(&b).take(3).all(|(x, y)| x.abs_diff(*y) <= DIFF_TOLERANCE)
}

pub(crate) fn optimize_web(files: &[InputFile], options: &WebOptions) -> Outputs {
    let file = first(files)?;
    let mut doc = load(file)?;
    if options.remove_metadata {
        doc.clear_metadata()?;
    }
    let save_options = if options.web_compression.trim().eq_ignore_ascii_case("low") {
        SaveOptions::default()
    } else {
        SaveOptions::compact()
    };
    Ok(vec![ResultDescriptor::pdf(
        prefixed("web_optimized", file),
        doc.save(&save_options)?,
    )])
}

/// Overwrite the non-empty fields and stamp the modification date.
pub(crate) fn meta_edit(files: &[InputFile], options: &MetadataOptions) -> Outputs {
    let file = first(files)?;
    let mut doc = load(file)?;
    let mut metadata = doc.metadata();
    for (field, value) in [
        (&mut metadata.title, &options.meta_title),
        (&mut metadata.author, &options.meta_author),
        (&mut metadata.subject, &options.meta_subject),
        (&mut metadata.keywords, &options.meta_keywords),
        (&mut metadata.creator, &options.meta_creator),
    ] {
        if !value.trim().is_empty() {
            *field = Some(value.trim().to_owned());
        }
    }
    metadata.modification_date = Some(Utc::now());
    doc.set_metadata(&metadata)?;
    single_pdf("metadata", file, doc)
}

pub(crate) fn set_viewer(files: &[InputFile], prefs: &ViewerPreferences) -> Outputs {
    let file = first(files)?;
    let mut doc = load(file)?;
    doc.set_viewer_preferences(prefs)?;
    single_pdf("viewer", file, doc)
}

/// Embedded font programs plus a JSON listing of every font.
pub(crate) fn extract_fonts(files: &[InputFile]) -> Outputs {
    let file = first(files)?;
    let fonts = load(file)?.fonts();
    let mut results = Vec::new();
    for (number, font) in fonts.iter().enumerate() {
        if let Some(program) = &font.program {
            results.push(ResultDescriptor::new(
                format!(
                    "{}_font_{}_{}.{}",
                    file.stem(),
                    number + 1,
                    file_safe(&font.name),
                    program.extension
                ),
                program.data.clone(),
                program.mime_type,
            ));
        }
    }
    let listing = json!({ "file": file.name(), "fonts": fonts });
    results.push(ResultDescriptor::new(
        format!("{}_fonts.json", file.stem()),
        serde_json::to_vec_pretty(&listing)?,
        DocumentType::Json.mime_type(),
    ));
    info!(fonts = fonts.len(), programs = results.len() - 1, "Fonts extracted");
    Ok(results)
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

pub(crate) fn analyze(files: &[InputFile]) -> Outputs {
    let file = first(files)?;
    let doc = load(file)?;
    let summary = doc.summary()?;
    let text_chars: usize = doc.text()?.iter().map(|page| page.chars().count()).sum();
    let report = json!({
        "file": file.name(),
        "size": file.data().len(),
        "sha256": hash_bytes(file.data()),
        "version": summary.version,
        "pageCount": summary.page_count,
        "metadata": summary.metadata,
        "pages": summary.pages,
        "fontCount": summary.font_count,
        "imageCount": summary.image_count,
        "annotationCount": summary.annotation_count,
        "textCharacters": text_chars,
        "fonts": doc.fonts(),
        "images": doc.images(),
    });
    Ok(vec![ResultDescriptor::new(
        format!("{}_analysis.json", file.stem()),
        serde_json::to_vec_pretty(&report)?,
        DocumentType::Json.mime_type(),
    )])
}

/// Run `tool` on each file separately. Failures are logged and skipped.
#[instrument(skip_all, fields(tool = %tool, files = files.len()))]
pub(crate) fn batch(dispatcher: &Dispatcher, tool: ToolId, files: &[InputFile], options: &OptionsBag) -> Outputs {
    first(files)?;
    let mut results = Vec::new();
    for file in files {
        match dispatcher.run(tool, std::slice::from_ref(file), options) {
            Ok(outputs) => results.extend(outputs),
            Err(err) => warn!(file = file.name(), %err, "Batch item failed"),
        }
    }
    if results.is_empty() {
        return Err(FolioError::Validation(format!(
            "{} failed for every file.",
            tool.name()
        )));
    }
    info!(outputs = results.len(), "Batch complete");
    Ok(results)
}

/// Convert colours for print, then optionally add bleed and crop marks.
#[instrument(skip_all, fields(profile = ?print.profile, bleed = print.bleed))]
pub(crate) fn print_ready(
    dispatcher: &Dispatcher,
    files: &[InputFile],
    print: &PrintOptions,
    raster: &RasterOptions,
) -> Outputs {
    let file = first(files)?;
    let config = &dispatcher.config;
    let scale = config.scale_for(&raster.quality);
    let renderer = dispatcher.renderer.as_ref();
    let converted = match print.profile {
        ColorProfile::Cmyk => {
            let proof = cmyk_proof(INK_LIMIT);
            rerender(renderer, file, scale, config.rerender_jpeg_quality, |_, mut surface| {
                surface.apply_pixel_transform(&proof);
                Ok(surface)
            })?
        }
        ColorProfile::Grayscale => {
            let gray = GrayscaleMethod::Luminosity.transform();
            rerender(renderer, file, scale, config.rerender_jpeg_quality, |_, mut surface| {
                surface.apply_pixel_transform(&gray);
                Ok(surface)
            })?
        }
        ColorProfile::Rgb => file.data().to_vec(),
    };

    if print.bleed <= 0.0 && !print.crop_marks {
        return Ok(vec![ResultDescriptor::pdf(prefixed("print_ready", file), converted)]);
    }
    let source = PdfDocumentHandle::load(&converted, None).map_err(|err| err.for_file(file.name()))?;
    let out = with_bleed(&source, print)?;
    single_pdf("print_ready", file, out)
}

/// Place each page on a sheet grown by the bleed (and the crop mark slug),
/// stretching the artwork into the bleed and setting TrimBox and BleedBox.
fn with_bleed(source: &PdfDocumentHandle, print: &PrintOptions) -> Result<PdfDocumentHandle> {
    let bleed = print.bleed;
    let slug = if print.crop_marks { CROP_MARK_SLUG } else { 0.0 };
    let outer = bleed + slug;
    let mut out = PdfDocumentHandle::create();
    let marks = ShapeStyle::stroked(Rgb::BLACK, 0.25);

    for index in 0..source.page_count() {
        let (width, height) = source.page_info(index)?.display_size();
        let page = out.add_page((width + 2.0 * outer, height + 2.0 * outer))?;
        let embedded = out.embed_page(source, index)?;
        let art = Placement::new(slug, slug, width + 2.0 * bleed, height + 2.0 * bleed);
        out.draw_page(page, &embedded, &art)?;

        let trim = Rect::new(outer, outer, width, height);
        out.set_page_box(page, "TrimBox", trim)?;
        out.set_page_box(page, "BleedBox", trim.outset(bleed))?;

        if print.crop_marks {
            let near = bleed + CROP_MARK_OFFSET;
            let far = near + CROP_MARK_LENGTH;
            for (cx, dx) in [(trim.x, -1.0), (trim.x + trim.width, 1.0)] {
                for (cy, dy) in [(trim.y, -1.0), (trim.y + trim.height, 1.0)] {
                    out.draw_line(page, (cx + dx * near, cy), (cx + dx * far, cy), &marks)?;
                    out.draw_line(page, (cx, cy + dy * near), (cx, cy + dy * far), &marks)?;
                }
            }
        }
    }
    out.set_metadata(&source.metadata())?;
    Ok(out)
}
