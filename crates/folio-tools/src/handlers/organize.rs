// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page tree tools: merge, split, select, reorder, rotate and imposition.

use folio_core::error::{FolioError, Result};
use folio_core::{InputFile, Orientation, PaperSize, ResultDescriptor};
use folio_document::{PdfDocumentHandle, parse_ranges, to_range_string};
use tracing::{debug, info, warn};

use super::{Outputs, extract, first, fit_into, load, no_pages, save, single_pdf};
use crate::request::{
    BlankPageOptions, DuplicateOptions, NUpOptions, PageSelection, ReorderOptions, RotateOptions,
    RotateScope, SplitSizeOptions,
};

/// Gap between imposed pages and the edge of their cell.
const CELL_GUTTER: f32 = 10.0;

pub(crate) fn merge(files: &[InputFile]) -> Outputs {
    let mut merged = PdfDocumentHandle::create();
    for file in files {
        let source = load(file)?;
        let indices: Vec<usize> = (0..source.page_count()).collect();
        merged.copy_pages(&source, &indices)?;
        debug!(file = file.name(), pages = indices.len(), "Appended");
    }
    info!(pages = merged.page_count(), inputs = files.len(), "Merged");
    Ok(vec![ResultDescriptor::pdf("merged_ultra.pdf", save(merged)?)])
}

/// One PDF per page, or one per comma-separated range token.
pub(crate) fn split(files: &[InputFile], options: &PageSelection) -> Outputs {
    let file = first(files)?;
    let source = load(file)?;
    let count = source.page_count();
    if count == 0 {
        return Err(no_pages(file));
    }

    let mut results = Vec::new();
    if options.pages.trim().is_empty() {
        for index in 0..count {
            let part = extract(&source, &[index])?;
            results.push(ResultDescriptor::pdf(
                format!("{}_page_{}.pdf", file.stem(), index + 1),
                save(part)?,
            ));
        }
    } else {
        for token in options.pages.split(',') {
            let indices = parse_ranges(token, count);
            if indices.is_empty() {
                continue;
            }
            let part = extract(&source, &indices)?;
            debug!(range = %to_range_string(&indices), "Split part");
            results.push(ResultDescriptor::pdf(
                format!("{}_part_{}.pdf", file.stem(), results.len() + 1),
                save(part)?,
            ));
        }
    }

    if results.is_empty() {
        return Err(FolioError::Validation(format!(
            "No valid pages in '{}'.",
            options.pages
        )));
    }
    Ok(results)
}

pub(crate) fn remove_pages(files: &[InputFile], options: &PageSelection) -> Outputs {
    let file = first(files)?;
    let mut doc = load(file)?;
    let count = doc.page_count();
    let remove = selected(&options.pages, count)?;
    if remove.len() == count {
        return Err(FolioError::Validation(
            "Cannot remove every page of the document.".into(),
        ));
    }
    let keep: Vec<usize> = (0..count).filter(|index| !remove.contains(index)).collect();
    doc.retain_pages(&keep)?;
    info!(removed = %to_range_string(&remove), "Pages removed");
    single_pdf("pages_removed", file, doc)
}

pub(crate) fn extract_pages(files: &[InputFile], options: &PageSelection) -> Outputs {
    let file = first(files)?;
    let source = load(file)?;
    let indices = selected(&options.pages, source.page_count())?;
    single_pdf("extracted", file, extract(&source, &indices)?)
}

/// New page `i` is old page `page_order[i]`. The order must name every page
/// exactly once.
pub(crate) fn reorder(files: &[InputFile], options: &ReorderOptions) -> Outputs {
    let file = first(files)?;
    let mut doc = load(file)?;
    let order = options
        .page_order
        .iter()
        .map(|&page| {
            usize::try_from(page)
                .ok()
                .filter(|&page| page >= 1)
                .map(|page| page - 1)
                .ok_or_else(|| FolioError::Validation(format!("{page} is not a page number")))
        })
        .collect::<Result<Vec<usize>>>()?;
    doc.reorder(&order)?;
    single_pdf("reordered", file, doc)
}

/// Rotation adds to whatever the page already has.
pub(crate) fn rotate(files: &[InputFile], options: &RotateOptions) -> Outputs {
    let file = first(files)?;
    let mut doc = load(file)?;
    let count = doc.page_count();
    let indices = match &options.scope {
        RotateScope::All => (0..count).collect(),
        RotateScope::Specific(pages) => selected(pages, count)?,
    };
    for &index in &indices {
        let now = doc.rotate_by(index, options.degrees)?;
        debug!(page = index + 1, rotation = now, "Rotated");
    }
    single_pdf("rotated", file, doc)
}

pub(crate) fn add_blank(files: &[InputFile], options: &BlankPageOptions) -> Outputs {
    let file = first(files)?;
    let mut doc = load(file)?;
    let at = options.blank_page_pos.clamp(0, doc.page_count() as i64) as usize;
    doc.insert_page(at, PaperSize::A4.dimensions_pt())?;
    single_pdf("added_blank", file, doc)
}

/// Copies of the selected pages are appended after the last page.
pub(crate) fn duplicate(files: &[InputFile], options: &DuplicateOptions) -> Outputs {
    let file = first(files)?;
    let mut doc = load(file)?;
    let indices = selected(&options.duplicate_pages, doc.page_count())?;
    for index in indices {
        let end = doc.page_count();
        doc.duplicate_page(index, end)?;
    }
    single_pdf("duplicated", file, doc)
}

pub(crate) fn reverse(files: &[InputFile]) -> Outputs {
    let file = first(files)?;
    let mut doc = load(file)?;
    doc.reverse()?;
    single_pdf("reversed", file, doc)
}

/// Alternate pages from the first two files; the longer file's tail follows
/// on its own.
pub(crate) fn mix(files: &[InputFile]) -> Outputs {
    let (a, b) = match files {
        [a, b, rest @ ..] => {
            if !rest.is_empty() {
                warn!(ignored = rest.len(), "Only the first two files are mixed");
            }
            (load(a)?, load(b)?)
        }
        _ => {
            return Err(FolioError::Validation(
                "Please select at least 2 files to mix.".into(),
            ));
        }
    };

    let mut mixed = PdfDocumentHandle::create();
    for index in 0..a.page_count().max(b.page_count()) {
        if index < a.page_count() {
            mixed.copy_pages(&a, &[index])?;
        }
        if index < b.page_count() {
            mixed.copy_pages(&b, &[index])?;
        }
    }
    Ok(vec![ResultDescriptor::pdf("mixed_result.pdf", save(mixed)?)])
}

/// Greedy packing: pages are added to the current part until the saved size
/// passes the limit, then the part is closed without the page that tipped
/// it over. A single page larger than the limit still gets its own part.
pub(crate) fn split_by_size(files: &[InputFile], options: &SplitSizeOptions) -> Outputs {
    let file = first(files)?;
    let source = load(file)?;
    if source.page_count() == 0 {
        return Err(no_pages(file));
    }
    let max_bytes = options.max_bytes();

    let mut results = Vec::new();
    let mut part: Vec<usize> = Vec::new();
    let mut part_bytes = Vec::new();
    for index in 0..source.page_count() {
        let mut candidate = part.clone();
        candidate.push(index);
        let bytes = save(extract(&source, &candidate)?)?;
        if bytes.len() > max_bytes && !part.is_empty() {
            results.push(size_part(results.len() + 1, std::mem::take(&mut part_bytes)));
            part = vec![index];
            part_bytes = save(extract(&source, &part)?)?;
        } else {
            part = candidate;
            part_bytes = bytes;
        }
    }
    if !part.is_empty() {
        results.push(size_part(results.len() + 1, part_bytes));
    }
    info!(parts = results.len(), max_bytes, "Split by size");
    Ok(results)
}

fn size_part(number: usize, data: Vec<u8>) -> ResultDescriptor {
    ResultDescriptor::pdf(format!("split_size_{number}.pdf"), data)
}

/// Several pages per sheet, filled left to right and top to bottom.
pub(crate) fn n_up(files: &[InputFile], options: &NUpOptions) -> Outputs {
    let file = first(files)?;
    let source = load(file)?;
    if source.page_count() == 0 {
        return Err(no_pages(file));
    }
    let (sheet_w, sheet_h) = options.sheet.paper.oriented(options.sheet.orientation);
    let (cols, rows) = grid(options.per_sheet, options.sheet.orientation);
    let (cell_w, cell_h) = (sheet_w / cols as f32, sheet_h / rows as f32);

    let mut out = PdfDocumentHandle::create();
    let mut sheet = 0;
    for index in 0..source.page_count() {
        let slot = index % options.per_sheet;
        if slot == 0 {
            sheet = out.add_page((sheet_w, sheet_h))?;
        }
        let (col, row) = (slot % cols, slot / cols);
        let page = out.embed_page(&source, index)?;
        let cell = (
            col as f32 * cell_w + CELL_GUTTER,
            sheet_h - (row + 1) as f32 * cell_h + CELL_GUTTER,
            cell_w - 2.0 * CELL_GUTTER,
            cell_h - 2.0 * CELL_GUTTER,
        );
        out.draw_page(sheet, &page, &fit_into(page.width, page.height, cell))?;
    }
    info!(sheets = out.page_count(), per_sheet = options.per_sheet, "N-up done");
    single_pdf("nup", file, out)
}

/// Columns and rows for `per_sheet` pages; portrait sheets stack the longer
/// side vertically.
fn grid(per_sheet: usize, orientation: Orientation) -> (usize, usize) {
    let (long, short) = match per_sheet {
        2 => (2, 1),
        4 => (2, 2),
        6 => (3, 2),
        9 => (3, 3),
        16 => (4, 4),
        other => (other, 1),
    };
    match orientation {
        Orientation::Landscape => (long, short),
        Orientation::Portrait => (short, long),
    }
}

/// Saddle-stitch imposition: two pages per sheet side, padded with blanks to
/// a multiple of four, ordered so the folded stack reads front to back.
pub(crate) fn booklet(files: &[InputFile]) -> Outputs {
    let file = first(files)?;
    let source = load(file)?;
    let count = source.page_count();
    if count == 0 {
        return Err(no_pages(file));
    }
    let (page_w, page_h) = source.page_info(0)?.display_size();
    let padded = count.div_ceil(4) * 4;

    let mut out = PdfDocumentHandle::create();
    for (left, right) in booklet_sides(padded) {
        let side = out.add_page((page_w * 2.0, page_h))?;
        for (slot, index) in [(0.0, left), (1.0, right)] {
            if index >= count {
                continue;
            }
            let page = out.embed_page(&source, index)?;
            let cell = (slot * page_w, 0.0, page_w, page_h);
            out.draw_page(side, &page, &fit_into(page.width, page.height, cell))?;
        }
    }
    info!(pages = count, blanks = padded - count, sides = out.page_count(), "Booklet imposed");
    single_pdf("booklet", file, out)
}

/// `(left, right)` page indices for each printed side.
fn booklet_sides(padded: usize) -> Vec<(usize, usize)> {
    let mut sides = Vec::with_capacity(padded / 2);
    for sheet in 0..padded / 4 {
        sides.push((padded - 1 - 2 * sheet, 2 * sheet));
        sides.push((2 * sheet + 1, padded - 2 - 2 * sheet));
    }
    sides
}

/// Parse a range for a tool that needs at least one page.
fn selected(pages: &str, count: usize) -> Result<Vec<usize>> {
    let indices = parse_ranges(pages, count);
    if indices.is_empty() {
        return Err(FolioError::Validation(format!(
            "No valid pages selected in '{pages}' (the document has {count} pages)."
        )));
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booklet_order_for_eight_pages() {
        let sides = booklet_sides(8);
        assert_eq!(sides, vec![(7, 0), (1, 6), (5, 2), (3, 4)]);
    }

    #[test]
    fn grid_follows_orientation() {
        assert_eq!(grid(2, Orientation::Portrait), (1, 2));
        assert_eq!(grid(2, Orientation::Landscape), (2, 1));
        assert_eq!(grid(9, Orientation::Portrait), (3, 3));
    }

    #[test]
    fn empty_selection_is_rejected() {
        assert!(matches!(selected("abc", 3), Err(FolioError::Validation(_))));
        assert_eq!(selected("3-1,2", 3).unwrap(), vec![1]);
    }
}
