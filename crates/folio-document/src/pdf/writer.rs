// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: new documents from text or images using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`. Layout is computed first as plain data so it can be
// tested without parsing the output.

use folio_core::error::{FolioError, Result};
use folio_core::{Orientation, PaperSize};
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, RawImage,
    RawImageData, RawImageFormat, TextItem, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

use super::fonts::{StandardFont, sanitize_ascii};
use crate::raster::Surface;

/// Pixels per inch assumed for images: one pixel per point.
const IMAGE_DPI: f32 = 72.0;

fn mm(points: f32) -> Mm {
    Mm(points * 25.4 / 72.0)
}

/// Page margin keyword for image pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Margin {
    None,
    #[default]
    Small,
    Big,
}

impl Margin {
    pub fn points(self) -> f32 {
        match self {
            Self::None => 0.0,
            Self::Small => 20.0,
            Self::Big => 50.0,
        }
    }

    /// `none` and `big` are recognised; anything else is `Small`.
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "none" => Self::None,
            "big" | "large" => Self::Big,
            _ => Self::Small,
        }
    }
}

/// Flowing text layout parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextLayout {
    pub font_size: f32,
    pub margin: f32,
    pub paper: PaperSize,
    pub orientation: Orientation,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            margin: 50.0,
            paper: PaperSize::A4,
            orientation: Orientation::Portrait,
        }
    }
}

/// One line of text positioned on a page, baseline in points.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub x: f32,
    pub y: f32,
    pub text: String,
}

impl TextLayout {
    pub fn with_font_size(mut self, size: f32) -> Self {
        if size.is_finite() && size > 0.0 {
            self.font_size = size;
        }
        self
    }

    pub fn with_margin(mut self, margin: f32) -> Self {
        if margin.is_finite() && margin >= 0.0 {
            self.margin = margin;
        }
        self
    }

    pub fn line_height(&self) -> f32 {
        self.font_size + 4.0
    }

    pub fn page_size(&self) -> (f32, f32) {
        self.paper.oriented(self.orientation)
    }

    /// Greedy word wrap on Helvetica advance widths. Every source line is a
    /// paragraph; paragraphs are followed by half a line of space and a page
    /// starts whenever the cursor falls below the bottom margin.
    pub fn layout(&self, text: &str) -> Vec<Vec<PlacedLine>> {
        let font = StandardFont::Helvetica;
        let (page_w, page_h) = self.page_size();
        let max_width = page_w - self.margin * 2.0;
        let top = page_h - self.margin;
        let line_height = self.line_height();

        let mut pages: Vec<Vec<PlacedLine>> = vec![Vec::new()];
        let mut y = top;
        let place = |pages: &mut Vec<Vec<PlacedLine>>, y: f32, text: String| {
            if let Some(page) = pages.last_mut() {
                page.push(PlacedLine {
                    x: self.margin,
                    y,
                    text,
                });
            }
        };

        let text = text.replace('\t', "    ");
        for paragraph in text.split('\n') {
            let paragraph = paragraph.strip_suffix('\r').unwrap_or(paragraph);
            let mut current = String::new();
            for word in paragraph.split(' ') {
                let candidate = if current.is_empty() {
                    word.to_owned()
                } else {
                    format!("{current} {word}")
                };
                if !current.is_empty() && font.text_width(&candidate, self.font_size) > max_width {
                    place(&mut pages, y, sanitize_ascii(&current));
                    y -= line_height;
                    current = word.to_owned();
                    if y < self.margin {
                        pages.push(Vec::new());
                        y = top;
                    }
                } else {
                    current = candidate;
                }
            }
            if !current.is_empty() {
                place(&mut pages, y, sanitize_ascii(&current));
                y -= line_height;
            }
            y -= line_height * 0.5;
            if y < self.margin {
                pages.push(Vec::new());
                y = top;
            }
        }

        // A trailing page break with nothing after it is not a page.
        if pages.len() > 1 && pages.last().is_some_and(Vec::is_empty) {
            pages.pop();
        }
        pages
    }
}

/// Where and how large an image lands on its page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub page_width: f32,
    pub page_height: f32,
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

/// Image page parameters. `paper: None` sizes each page to its image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageLayout {
    pub paper: Option<PaperSize>,
    pub orientation: Orientation,
    pub margin: Margin,
}

impl Default for ImageLayout {
    fn default() -> Self {
        Self {
            paper: Some(PaperSize::A4),
            orientation: Orientation::Portrait,
            margin: Margin::Small,
        }
    }
}

impl ImageLayout {
    /// Build from form keywords. `fit` sizes pages to the image; unknown
    /// paper names fall back to A4.
    pub fn from_keywords(page_size: &str, orientation: &str, margin: &str) -> Self {
        let paper = if page_size.trim().eq_ignore_ascii_case("fit") {
            None
        } else {
            Some(PaperSize::from_keyword(page_size).unwrap_or(PaperSize::A4))
        };
        let orientation = if orientation.trim().eq_ignore_ascii_case("landscape") {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        };
        Self {
            paper,
            orientation,
            margin: Margin::from_keyword(margin),
        }
    }

    /// Uniform scale no larger than 1, centred on the page.
    pub fn place(&self, image_width: f32, image_height: f32) -> ImagePlacement {
        let (page_width, page_height) = match self.paper {
            Some(paper) => paper.oriented(self.orientation),
            None => (image_width, image_height),
        };
        let margin = self.margin.points();
        let available_w = (page_width - margin * 2.0).max(1.0);
        let available_h = (page_height - margin * 2.0).max(1.0);
        let scale = (available_w / image_width)
            .min(available_h / image_height)
            .min(1.0);
        ImagePlacement {
            page_width,
            page_height,
            x: (page_width - image_width * scale) / 2.0,
            y: (page_height - image_height * scale) / 2.0,
            scale,
        }
    }
}

/// Creates new PDF documents from text content or raster images.
pub struct PdfWriter {
    /// Title metadata embedded in the document.
    title: String,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new("Folio Document")
    }
}

impl PdfWriter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Flow `text` over as many pages as it needs. Empty text still yields
    /// one blank page.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub fn text_document(&self, text: &str, layout: &TextLayout) -> Result<Vec<u8>> {
        let (page_w, page_h) = layout.page_size();
        let placed = layout.layout(text);
        info!(title = %self.title, pages = placed.len(), "Creating text PDF");

        let pages = placed
            .iter()
            .map(|lines| {
                let ops = lines
                    .iter()
                    .flat_map(|line| text_ops(line, layout.font_size))
                    .collect();
                PdfPage::new(mm(page_w), mm(page_h), ops)
            })
            .collect();
        self.finish(PdfDocument::new(&self.title), pages)
    }

    /// Single A4 page with `text` drawn from (`x`, `y`) downward, one source
    /// line per row, clipped at the page bottom. Used where a conversion has no
    /// real layout.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub fn text_block(&self, text: &str, x: f32, y: f32, font_size: f32) -> Result<Vec<u8>> {
        let (page_w, page_h) = PaperSize::A4.dimensions_pt();
        let line_height = font_size + 4.0;
        let mut ops = Vec::new();
        let mut cursor = y;
        for source in text.replace('\t', "    ").lines() {
            if cursor < font_size {
                debug!("Text block clipped at page bottom");
                break;
            }
            let line = PlacedLine {
                x,
                y: cursor,
                text: sanitize_ascii(source),
            };
            ops.extend(text_ops(&line, font_size));
            cursor -= line_height;
        }
        let page = PdfPage::new(mm(page_w), mm(page_h), ops);
        self.finish(PdfDocument::new(&self.title), vec![page])
    }

    /// One page per image, each placed by `layout`. Alpha is flattened onto
    /// white.
    #[instrument(skip(self, images), fields(count = images.len()))]
    pub fn image_document(&self, images: &[Surface], layout: &ImageLayout) -> Result<Vec<u8>> {
        if images.is_empty() {
            return Err(FolioError::Validation(
                "at least one image is required".into(),
            ));
        }
        info!(title = %self.title, ?layout, "Creating image PDF");

        let mut doc = PdfDocument::new(&self.title);
        let mut pages = Vec::with_capacity(images.len());
        for surface in images {
            let rgb = surface.flattened_rgb();
            let (width, height) = rgb.dimensions();
            let raw = RawImage {
                pixels: RawImageData::U8(rgb.into_raw()),
                width: width as usize,
                height: height as usize,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);
            let placement = layout.place(width as f32, height as f32);
            debug!(width, height, scale = placement.scale, "Image placed on page");

            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(placement.x)),
                    translate_y: Some(Pt(placement.y)),
                    scale_x: Some(placement.scale),
                    scale_y: Some(placement.scale),
                    dpi: Some(IMAGE_DPI),
                    rotate: None,
                },
            }];
            pages.push(PdfPage::new(
                mm(placement.page_width),
                mm(placement.page_height),
                ops,
            ));
        }
        self.finish(doc, pages)
    }

    fn finish(&self, mut doc: PdfDocument, mut pages: Vec<PdfPage>) -> Result<Vec<u8>> {
        if pages.is_empty() {
            let (w, h) = PaperSize::A4.dimensions_pt();
            pages.push(PdfPage::new(mm(w), mm(h), Vec::new()));
        }
        doc.with_pages(pages);
        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "printpdf reported warnings");
        }
        Ok(output)
    }
}

fn text_ops(line: &PlacedLine, font_size: f32) -> Vec<Op> {
    vec![
        Op::StartTextSection,
        Op::SetTextCursor {
            pos: Point {
                x: Pt(line.x),
                y: Pt(line.y),
            },
        },
        Op::SetFontSizeBuiltinFont {
            size: Pt(font_size),
            font: BuiltinFont::Helvetica,
        },
        Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(line.text.clone())],
            font: BuiltinFont::Helvetica,
        },
        Op::EndTextSection,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::PdfDocumentHandle;

    #[test]
    fn short_text_is_one_line_at_the_top_margin() {
        let layout = TextLayout::default();
        let pages = layout.layout("Hello world");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].len(), 1);
        let line = &pages[0][0];
        assert_eq!(line.x, 50.0);
        assert!((line.y - (841.89 - 50.0)).abs() < 0.01);
    }

    #[test]
    fn long_paragraph_wraps_within_margins() {
        let layout = TextLayout::default();
        let text = "lorem ipsum dolor sit amet ".repeat(40);
        let pages = layout.layout(&text);
        let lines = &pages[0];
        assert!(lines.len() > 1);
        let max = 595.28 - 100.0;
        for line in lines {
            assert!(StandardFont::Helvetica.text_width(&line.text, 12.0) <= max);
        }
        assert!((lines[0].y - lines[1].y - 16.0).abs() < 0.01);
    }

    #[test]
    fn blank_lines_add_half_a_line() {
        let layout = TextLayout::default();
        let pages = layout.layout("one\n\ntwo");
        let lines = &pages[0];
        // one line + paragraph gap, then an empty paragraph's gap.
        let gap = lines[0].y - lines[1].y;
        assert!((gap - (16.0 + 8.0 + 8.0)).abs() < 0.01);
    }

    #[test]
    fn many_lines_break_pages() {
        let layout = TextLayout::default();
        let text = (0..200).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let pages = layout.layout(&text);
        assert!(pages.len() > 1);
        for page in &pages {
            assert!(page.iter().all(|line| line.y >= layout.margin));
        }
    }

    #[test]
    fn non_ascii_is_replaced() {
        let pages = TextLayout::default().layout("naïve\tcafé");
        assert_eq!(pages[0][0].text, "na?ve    caf?");
    }

    #[test]
    fn image_is_centred_and_never_upscaled() {
        let layout = ImageLayout::default();
        let small = layout.place(100.0, 50.0);
        assert_eq!(small.scale, 1.0);
        assert!((small.x - (595.28 - 100.0) / 2.0).abs() < 0.01);

        let big = layout.place(2000.0, 1000.0);
        assert!((big.scale - (595.28 - 40.0) / 2000.0).abs() < 1e-4);
    }

    #[test]
    fn fit_uses_image_size() {
        let layout = ImageLayout::from_keywords("fit", "portrait", "none");
        let placed = layout.place(300.0, 200.0);
        assert_eq!((placed.page_width, placed.page_height), (300.0, 200.0));
        assert_eq!((placed.x, placed.y, placed.scale), (0.0, 0.0, 1.0));
    }

    #[test]
    fn keywords_parse_leniently() {
        let layout = ImageLayout::from_keywords("LETTER", "landscape", "big");
        assert_eq!(layout.paper, Some(PaperSize::Letter));
        assert_eq!(layout.orientation, Orientation::Landscape);
        assert_eq!(layout.margin.points(), 50.0);
        assert_eq!(ImageLayout::from_keywords("b7", "", "").paper, Some(PaperSize::A4));
        assert_eq!(Margin::from_keyword("whatever"), Margin::Small);
    }

    #[test]
    fn text_document_loads_back() {
        let bytes = PdfWriter::default()
            .text_document("Hello from Folio", &TextLayout::default())
            .unwrap();
        let handle = PdfDocumentHandle::load(&bytes, None).unwrap();
        assert_eq!(handle.page_count(), 1);
    }

    #[test]
    fn image_document_has_a_page_per_image() {
        let images = vec![Surface::blank(40, 30), Surface::blank(10, 80)];
        let bytes = PdfWriter::default()
            .image_document(&images, &ImageLayout::default())
            .unwrap();
        let handle = PdfDocumentHandle::load(&bytes, None).unwrap();
        assert_eq!(handle.page_count(), 2);
    }

    #[test]
    fn no_images_is_a_validation_error() {
        let result = PdfWriter::default().image_document(&[], &ImageLayout::default());
        assert!(matches!(result, Err(FolioError::Validation(_))));
    }
}
