// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversions out of PDF: page images, text formats, Office packages and
// embedded image extraction.

use std::fmt::Write as _;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use folio_core::error::{FolioError, Result};
use folio_core::{DocumentType, InputFile, ResultDescriptor};
use folio_document::ooxml::{MIME_PPTX, MIME_XLSX, SlideImage, escape_xml, pptx_from_images, xlsx_from_rows};
use folio_document::{PdfDocumentHandle, RasterFormat, Surface};
use serde_json::json;
use tracing::{info, instrument, warn};

use super::{Outputs, first, load, no_pages, render_pages};
use crate::dispatcher::Dispatcher;
use crate::request::ExportOptions;

/// Tier used for the page previews embedded in HTML output.
const HTML_PREVIEW_QUALITY: &str = "low";

/// One image per selected page, `<stem>_page_<n>.<ext>`.
#[instrument(skip_all, fields(?format))]
pub(crate) fn page_images(
    dispatcher: &Dispatcher,
    files: &[InputFile],
    format: RasterFormat,
    options: &ExportOptions,
) -> Outputs {
    let file = first(files)?;
    let doc = load(file)?;
    let pages = selection(file, &doc, options)?;
    let scale = dispatcher.config.scale_for(&options.quality);
    let format = options.format_or(format)?;

    let surfaces = render_pages(dispatcher.renderer.as_ref(), file, &doc, &pages, scale)?;
    let mut results = Vec::with_capacity(pages.len());
    for (index, surface) in pages.into_iter().zip(surfaces) {
        let data = surface.encode(format, dispatcher.config.export_jpeg_quality)?;
        results.push(ResultDescriptor::new(
            format!("{}_page_{}.{}", file.stem(), index + 1, format.extension()),
            data,
            format.mime_type(),
        ));
    }
    info!(images = results.len(), "Pages exported");
    Ok(results)
}

/// Every selected page stacked into one tall image.
pub(crate) fn long_image(dispatcher: &Dispatcher, files: &[InputFile], options: &ExportOptions) -> Outputs {
    let file = first(files)?;
    let doc = load(file)?;
    let pages = selection(file, &doc, options)?;
    let scale = dispatcher.config.scale_for(&options.quality);
    let format = options.format_or(RasterFormat::Png)?;

    let surfaces = render_pages(dispatcher.renderer.as_ref(), file, &doc, &pages, scale)?;
    let stacked = Surface::stack_vertical(&surfaces)?;
    let data = stacked.encode(format, dispatcher.config.export_jpeg_quality)?;
    Ok(vec![ResultDescriptor::new(
        format!("{}_long.{}", file.stem(), format.extension()),
        data,
        format.mime_type(),
    )])
}

pub(crate) fn text(files: &[InputFile]) -> Outputs {
    let file = first(files)?;
    let pages = load(file)?.text()?;
    if pages.iter().all(|page| page.trim().is_empty()) {
        warn!(file = file.name(), "No extractable text; the PDF may be scanned");
    }
    Ok(vec![ResultDescriptor::new(
        format!("{}.txt", file.stem()),
        pages.join("\n\n").into_bytes(),
        DocumentType::PlainText.mime_type(),
    )])
}

/// A standalone HTML page per document: each PDF page becomes a section with
/// an inline preview image followed by its text.
pub(crate) fn html(dispatcher: &Dispatcher, files: &[InputFile], options: &ExportOptions) -> Outputs {
    let file = first(files)?;
    let doc = load(file)?;
    let pages = selection(file, &doc, options)?;
    let title = doc.metadata().title.unwrap_or_else(|| file.stem().to_owned());
    let scale = dispatcher.config.scale_for(HTML_PREVIEW_QUALITY);

    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
         <style>section.page{{margin:2em auto;max-width:60em}}section.page img{{width:100%;border:1px solid #ccc}}</style>\n\
         </head>\n<body>\n",
        escape_xml(&title)
    );
    let previews = render_pages(dispatcher.renderer.as_ref(), file, &doc, &pages, scale)?;
    for (index, preview) in pages.into_iter().zip(previews) {
        let info = doc.page_info(index)?;
        let (width, height) = info.display_size();
        let preview = preview.encode(RasterFormat::Jpeg, dispatcher.config.export_jpeg_quality)?;
        let _ = writeln!(html, "<section class=\"page\" id=\"page-{}\">", index + 1);
        let _ = writeln!(
            html,
            "<img alt=\"Page {}\" width=\"{}\" height=\"{}\" src=\"data:image/jpeg;base64,{}\">",
            index + 1,
            width.round(),
            height.round(),
            BASE64.encode(&preview)
        );
        for line in doc.page_text(index)?.lines().filter(|line| !line.trim().is_empty()) {
            let _ = writeln!(html, "<p>{}</p>", escape_xml(line.trim()));
        }
        html.push_str("</section>\n");
    }
    html.push_str("</body>\n</html>\n");

    Ok(vec![ResultDescriptor::new(
        format!("{}.html", file.stem()),
        html.into_bytes(),
        DocumentType::Html.mime_type(),
    )])
}

pub(crate) fn json(files: &[InputFile]) -> Outputs {
    let file = first(files)?;
    let doc = load(file)?;
    let summary = doc.summary()?;
    let pages: Vec<_> = doc
        .text()?
        .into_iter()
        .zip(&summary.pages)
        .enumerate()
        .map(|(index, (text, info))| {
            json!({
                "number": index + 1,
                "width": info.width,
                "height": info.height,
                "rotation": info.rotation,
                "text": text,
            })
        })
        .collect();
    let document = json!({
        "file": file.name(),
        "version": summary.version,
        "pageCount": summary.page_count,
        "metadata": summary.metadata,
        "pages": pages,
    });
    Ok(vec![ResultDescriptor::new(
        format!("{}.json", file.stem()),
        serde_json::to_vec_pretty(&document)?,
        DocumentType::Json.mime_type(),
    )])
}

pub(crate) fn xml(files: &[InputFile]) -> Outputs {
    let file = first(files)?;
    let doc = load(file)?;
    let metadata = doc.metadata();

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        xml,
        "<document name=\"{}\" version=\"{}\" pages=\"{}\">",
        escape_xml(file.name()),
        escape_xml(doc.version()),
        doc.page_count()
    );
    xml.push_str("  <metadata>\n");
    for (tag, value) in [
        ("title", &metadata.title),
        ("author", &metadata.author),
        ("subject", &metadata.subject),
        ("keywords", &metadata.keywords),
        ("creator", &metadata.creator),
        ("producer", &metadata.producer),
    ] {
        if let Some(value) = value {
            let _ = writeln!(xml, "    <{tag}>{}</{tag}>", escape_xml(value));
        }
    }
    xml.push_str("  </metadata>\n");
    for index in 0..doc.page_count() {
        let info = doc.page_info(index)?;
        let _ = writeln!(
            xml,
            "  <page number=\"{}\" width=\"{}\" height=\"{}\" rotation=\"{}\">",
            index + 1,
            info.width,
            info.height,
            info.rotation
        );
        for line in doc.page_text(index)?.lines().filter(|line| !line.trim().is_empty()) {
            let _ = writeln!(xml, "    <line>{}</line>", escape_xml(line.trim()));
        }
        xml.push_str("  </page>\n");
    }
    xml.push_str("</document>\n");

    Ok(vec![ResultDescriptor::new(
        format!("{}.xml", file.stem()),
        xml.into_bytes(),
        DocumentType::Xml.mime_type(),
    )])
}

/// `page,line,text` rows, one per non-empty text line.
pub(crate) fn csv(files: &[InputFile]) -> Outputs {
    let file = first(files)?;
    let doc = load(file)?;
    let mut csv = String::from("page,line,text\n");
    for (index, text) in doc.text()?.iter().enumerate() {
        let lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
        for (number, line) in lines.enumerate() {
            let _ = writeln!(csv, "{},{},{}", index + 1, number + 1, csv_field(line));
        }
    }
    Ok(vec![ResultDescriptor::new(
        format!("{}.csv", file.stem()),
        csv.into_bytes(),
        DocumentType::Csv.mime_type(),
    )])
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

/// One slide per page image, slides sized like the first page.
pub(crate) fn powerpoint(dispatcher: &Dispatcher, files: &[InputFile], options: &ExportOptions) -> Outputs {
    let file = first(files)?;
    let doc = load(file)?;
    let pages = selection(file, &doc, options)?;
    let slide_size = doc.page_info(pages[0])?.display_size();
    let scale = dispatcher.config.scale_for(&options.quality);

    let slides = render_pages(dispatcher.renderer.as_ref(), file, &doc, &pages, scale)?
        .into_iter()
        .map(|surface| {
            Ok(SlideImage {
                data: surface.encode(RasterFormat::Jpeg, dispatcher.config.export_jpeg_quality)?,
                format: RasterFormat::Jpeg,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let package = pptx_from_images(&slides, slide_size)?;
    Ok(vec![ResultDescriptor::new(
        format!("{}.pptx", file.stem()),
        package,
        MIME_PPTX,
    )])
}

/// One row per page: page number and its text.
pub(crate) fn excel(files: &[InputFile]) -> Outputs {
    let file = first(files)?;
    let doc = load(file)?;
    let mut rows = vec![vec!["Page".to_owned(), "Text".to_owned()]];
    for (index, text) in doc.text()?.into_iter().enumerate() {
        rows.push(vec![(index + 1).to_string(), text.trim().to_owned()]);
    }
    Ok(vec![ResultDescriptor::new(
        format!("{}.xlsx", file.stem()),
        xlsx_from_rows(&rows)?,
        MIME_XLSX,
    )])
}

/// Every image XObject in its original encoding where possible. Images that
/// cannot be decoded are skipped.
pub(crate) fn images(files: &[InputFile]) -> Outputs {
    let file = first(files)?;
    let doc = load(file)?;
    let mut results = Vec::new();
    for info in doc.images() {
        match doc.extract_image(&info) {
            Ok(image) => results.push(ResultDescriptor::new(
                format!("{}_image_{}.{}", file.stem(), results.len() + 1, image.extension),
                image.data,
                image.mime_type,
            )),
            Err(err) => warn!(page = info.page, name = %info.name, %err, "Image skipped"),
        }
    }
    if results.is_empty() {
        return Err(FolioError::Validation(format!(
            "No images found in {}.",
            file.name()
        )));
    }
    info!(images = results.len(), "Images extracted");
    Ok(results)
}

fn selection(file: &InputFile, doc: &PdfDocumentHandle, options: &ExportOptions) -> Result<Vec<usize>> {
    if doc.page_count() == 0 {
        return Err(no_pages(file));
    }
    let pages = options.pages(doc.page_count());
    if pages.is_empty() {
        return Err(FolioError::Validation(format!(
            "No valid pages in '{}'.",
            options.page_range
        )));
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_fields_are_quoted_when_needed() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
