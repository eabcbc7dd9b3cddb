// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Typed per-tool configuration parsed out of the loose options bag.
//
// Form values arrive as strings, numbers or booleans depending on the widget
// that produced them, so every field goes through the lenient deserialisers.
// Absent keys take the defaults the tool forms start with.

use folio_core::error::{FolioError, Result};
use folio_core::options::lenient;
use folio_core::{OptionsBag, Orientation, PaperSize};
use folio_document::pdf::{ImageLayout, Rgb, ViewerPreferences};
use folio_document::raster::GrayscaleMethod;
use folio_document::RasterFormat;
use serde::Deserialize;
use serde_json::Value;

use crate::catalog::ToolId;

// -- Organize -----------------------------------------------------------------

/// A page range expression such as `"1,3-5"`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSelection {
    #[serde(deserialize_with = "lenient::string")]
    pub pages: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReorderOptions {
    /// 1-based page numbers in their new order.
    #[serde(deserialize_with = "lenient::int_list")]
    pub page_order: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotateScope {
    All,
    Specific(String),
}

#[derive(Debug, Clone)]
pub struct RotateOptions {
    pub degrees: i32,
    pub scope: RotateScope,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawRotate {
    #[serde(deserialize_with = "lenient::int")]
    rotation: i64,
    #[serde(deserialize_with = "lenient::string")]
    rotate_mode: String,
    #[serde(deserialize_with = "lenient::string")]
    pages: String,
}

impl Default for RawRotate {
    fn default() -> Self {
        Self {
            rotation: 90,
            rotate_mode: "all".into(),
            pages: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlankPageOptions {
    /// Zero-based insertion point, clamped to the page count.
    #[serde(deserialize_with = "lenient::int")]
    pub blank_page_pos: i64,
}

impl Default for BlankPageOptions {
    fn default() -> Self {
        Self { blank_page_pos: 1 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DuplicateOptions {
    #[serde(deserialize_with = "lenient::string")]
    pub duplicate_pages: String,
}

impl Default for DuplicateOptions {
    fn default() -> Self {
        Self {
            duplicate_pages: "1".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SplitSizeOptions {
    /// Largest part size in megabytes.
    #[serde(deserialize_with = "lenient::float")]
    pub split_size: f32,
}

impl Default for SplitSizeOptions {
    fn default() -> Self {
        Self { split_size: 5.0 }
    }
}

impl SplitSizeOptions {
    pub fn max_bytes(&self) -> usize {
        (self.split_size as f64 * 1024.0 * 1024.0) as usize
    }
}

/// Sheet used by the imposition tools.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetOptions {
    pub paper: PaperSize,
    pub orientation: Orientation,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawSheet {
    #[serde(deserialize_with = "lenient::string")]
    page_size: String,
    #[serde(deserialize_with = "lenient::string")]
    orientation: String,
}

impl Default for RawSheet {
    fn default() -> Self {
        Self {
            page_size: "a4".into(),
            orientation: "portrait".into(),
        }
    }
}

impl RawSheet {
    fn resolve(self) -> SheetOptions {
        SheetOptions {
            paper: PaperSize::from_keyword(&self.page_size).unwrap_or(PaperSize::A4),
            orientation: orientation(&self.orientation),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NUpOptions {
    pub per_sheet: usize,
    pub sheet: SheetOptions,
}

/// Pages-per-sheet values with a tidy grid.
pub const N_UP_CHOICES: [usize; 5] = [2, 4, 6, 9, 16];

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawNUp {
    #[serde(deserialize_with = "lenient::int")]
    n_up: i64,
}

impl Default for RawNUp {
    fn default() -> Self {
        Self { n_up: 2 }
    }
}

// -- Conversion ---------------------------------------------------------------

/// What the text-to-PDF family reads its input as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    Plain,
    Markdown,
    Html,
    Word,
    Spreadsheet,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QrOptions {
    #[serde(deserialize_with = "lenient::string")]
    pub qr_text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextOptions {
    /// Zero means the configured default.
    #[serde(deserialize_with = "lenient::float")]
    pub font_size: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawImageLayout {
    #[serde(deserialize_with = "lenient::string")]
    page_size: String,
    #[serde(deserialize_with = "lenient::string")]
    orientation: String,
    #[serde(deserialize_with = "lenient::string")]
    margin: String,
}

impl Default for RawImageLayout {
    fn default() -> Self {
        Self {
            page_size: "a4".into(),
            orientation: "portrait".into(),
            margin: "small".into(),
        }
    }
}

/// Page rendering options shared by every raster export.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    /// `low`, `medium` or `high`; exports default to the middle tier.
    #[serde(deserialize_with = "lenient::string")]
    pub quality: String,
    /// Page range, or `all`.
    #[serde(deserialize_with = "lenient::string")]
    pub page_range: String,
    /// Overrides the tool's own format where the tool allows a choice.
    #[serde(deserialize_with = "lenient::opt_string")]
    pub image_format: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            quality: "medium".into(),
            page_range: "all".into(),
            image_format: None,
        }
    }
}

impl ExportOptions {
    /// Zero-based pages to export. `all` or an empty range selects every page.
    pub fn pages(&self, page_count: usize) -> Vec<usize> {
        let range = self.page_range.trim();
        if range.is_empty() || range.eq_ignore_ascii_case("all") {
            (0..page_count).collect()
        } else {
            folio_document::parse_ranges(range, page_count)
        }
    }

    pub fn format_or(&self, fallback: RasterFormat) -> Result<RasterFormat> {
        match self.image_format.as_deref() {
            None => Ok(fallback),
            Some(keyword) => raster_format(keyword),
        }
    }
}

// -- Security -----------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PasswordOptions {
    #[serde(deserialize_with = "lenient::string")]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangePasswordOptions {
    #[serde(deserialize_with = "lenient::string")]
    pub old_password: String,
    #[serde(deserialize_with = "lenient::string")]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatermarkOptions {
    #[serde(deserialize_with = "lenient::string")]
    pub watermark_text: String,
    /// Percent, 0-100.
    #[serde(deserialize_with = "lenient::float")]
    pub watermark_opacity: f32,
    #[serde(deserialize_with = "lenient::float")]
    pub watermark_size: f32,
    /// Degrees counter-clockwise.
    #[serde(deserialize_with = "lenient::float")]
    pub watermark_rotation: f32,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            watermark_text: "CONFIDENTIAL".into(),
            watermark_opacity: 30.0,
            watermark_size: 48.0,
            watermark_rotation: 45.0,
        }
    }
}

// -- Edit ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Anchor {
    fn from_keyword(keyword: &str) -> Result<Self> {
        Ok(match keyword.trim().to_ascii_lowercase().as_str() {
            "top-left" => Self::TopLeft,
            "top-center" | "top-centre" | "top" => Self::TopCenter,
            "top-right" => Self::TopRight,
            "bottom-left" => Self::BottomLeft,
            "bottom-center" | "bottom-centre" | "bottom" | "" => Self::BottomCenter,
            "bottom-right" => Self::BottomRight,
            other => {
                return Err(FolioError::Validation(format!(
                    "unknown page number position '{other}'"
                )));
            }
        })
    }

    pub fn is_top(self) -> bool {
        matches!(self, Self::TopLeft | Self::TopCenter | Self::TopRight)
    }
}

/// How a page number is spelled out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFormat {
    /// `7`
    Number,
    /// `Page 7`
    Page,
    /// `Page 7 of 12`
    PageOfTotal,
    /// `7 / 12`
    Fraction,
}

impl NumberFormat {
    fn from_keyword(keyword: &str) -> Result<Self> {
        Ok(match keyword.trim().to_ascii_lowercase().as_str() {
            "number" | "" => Self::Number,
            "page" | "page-n" => Self::Page,
            "page-of" | "page-n-of-m" | "page-of-total" => Self::PageOfTotal,
            "fraction" | "n/m" => Self::Fraction,
            other => {
                return Err(FolioError::Validation(format!(
                    "unknown page number format '{other}'"
                )));
            }
        })
    }

    pub fn render(self, number: usize, total: usize) -> String {
        match self {
            Self::Number => number.to_string(),
            Self::Page => format!("Page {number}"),
            Self::PageOfTotal => format!("Page {number} of {total}"),
            Self::Fraction => format!("{number} / {total}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageNumberOptions {
    pub position: Anchor,
    /// Number printed on the first page.
    pub start: i64,
    pub size: f32,
    pub format: NumberFormat,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawPageNumbers {
    #[serde(deserialize_with = "lenient::string")]
    page_number_position: String,
    #[serde(deserialize_with = "lenient::int")]
    page_number_start: i64,
    #[serde(deserialize_with = "lenient::float")]
    page_number_size: f32,
    #[serde(deserialize_with = "lenient::string")]
    page_number_format: String,
}

impl Default for RawPageNumbers {
    fn default() -> Self {
        Self {
            page_number_position: "bottom-center".into(),
            page_number_start: 1,
            page_number_size: 12.0,
            page_number_format: "number".into(),
        }
    }
}

/// `{page}`, `{total}` and `{date}` are substituted per page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeaderFooterOptions {
    #[serde(deserialize_with = "lenient::string")]
    pub header_text: String,
    #[serde(deserialize_with = "lenient::string")]
    pub footer_text: String,
    #[serde(deserialize_with = "lenient::float")]
    pub header_footer_size: f32,
}

impl Default for HeaderFooterOptions {
    fn default() -> Self {
        Self {
            header_text: String::new(),
            footer_text: String::new(),
            header_footer_size: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CropOptions {
    /// Points trimmed from every edge.
    #[serde(deserialize_with = "lenient::float")]
    pub crop_margin: f32,
}

impl Default for CropOptions {
    fn default() -> Self {
        Self { crop_margin: 50.0 }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawResize {
    #[serde(deserialize_with = "lenient::string")]
    resize_target: String,
}

impl Default for RawResize {
    fn default() -> Self {
        Self {
            resize_target: "a4".into(),
        }
    }
}

/// Render quality for tools that rebuild pages from rasters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RasterOptions {
    #[serde(deserialize_with = "lenient::string")]
    pub quality: String,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            quality: "high".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrayscaleOptions {
    pub method: GrayscaleMethod,
    pub quality: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawGrayscale {
    #[serde(deserialize_with = "lenient::string")]
    grayscale_method: String,
    #[serde(deserialize_with = "lenient::string")]
    grayscale_quality: String,
}

impl Default for RawGrayscale {
    fn default() -> Self {
        Self {
            grayscale_method: "luminosity".into(),
            grayscale_quality: "high".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContrastOptions {
    #[serde(deserialize_with = "lenient::float")]
    pub contrast_factor: f32,
    #[serde(deserialize_with = "lenient::string")]
    pub quality: String,
}

impl Default for ContrastOptions {
    fn default() -> Self {
        Self {
            contrast_factor: 1.5,
            quality: "high".into(),
        }
    }
}

/// One shape drawn by the annotation tool. Coordinates are measured from
/// the top-left corner of the page, as an on-screen editor reports them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Annotation {
    Text {
        page: usize,
        x: f32,
        y: f32,
        text: String,
        #[serde(default = "default_annotation_font", rename = "fontSize")]
        font_size: f32,
        #[serde(default = "default_annotation_color")]
        color: String,
    },
    Rectangle {
        page: usize,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        #[serde(default = "default_annotation_color")]
        color: String,
        #[serde(default = "default_stroke", rename = "strokeWidth")]
        stroke_width: f32,
    },
    Circle {
        page: usize,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        #[serde(default = "default_annotation_color")]
        color: String,
        #[serde(default = "default_stroke", rename = "strokeWidth")]
        stroke_width: f32,
    },
    Line {
        page: usize,
        x: f32,
        y: f32,
        x2: f32,
        y2: f32,
        #[serde(default = "default_annotation_color")]
        color: String,
        #[serde(default = "default_stroke", rename = "strokeWidth")]
        stroke_width: f32,
    },
    Highlight {
        page: usize,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        #[serde(default = "default_highlight_color")]
        color: String,
    },
    Image {
        page: usize,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        /// Base64 image bytes, optionally as a `data:` URL.
        data: String,
    },
}

impl Annotation {
    /// 1-based page number.
    pub fn page(&self) -> usize {
        match self {
            Self::Text { page, .. }
            | Self::Rectangle { page, .. }
            | Self::Circle { page, .. }
            | Self::Line { page, .. }
            | Self::Highlight { page, .. }
            | Self::Image { page, .. } => *page,
        }
    }
}

fn default_annotation_font() -> f32 {
    16.0
}

fn default_annotation_color() -> String {
    "#000000".into()
}

fn default_highlight_color() -> String {
    "#ffff00".into()
}

fn default_stroke() -> f32 {
    2.0
}

// -- Advanced -----------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepairOptions {
    /// `standard` keeps objects as recovered; `rebuild` renumbers and
    /// recompresses everything on save.
    #[serde(deserialize_with = "lenient::string")]
    pub repair_mode: String,
    /// Drop unreadable pages instead of substituting a placeholder.
    #[serde(deserialize_with = "lenient::boolean")]
    pub remove_corrupted: bool,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            repair_mode: "standard".into(),
            remove_corrupted: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OcrOptions {
    #[serde(deserialize_with = "lenient::string")]
    pub ocr_language: String,
    #[serde(deserialize_with = "lenient::boolean")]
    pub ocr_deskew: bool,
    #[serde(deserialize_with = "lenient::boolean")]
    pub ocr_enhance: bool,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            ocr_language: "eng".into(),
            ocr_deskew: true,
            ocr_enhance: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    Visual,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompareOptions {
    pub mode: CompareMode,
    pub highlight: Rgb,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawCompare {
    #[serde(deserialize_with = "lenient::string")]
    compare_mode: String,
    #[serde(deserialize_with = "lenient::string")]
    highlight_color: String,
}

impl Default for RawCompare {
    fn default() -> Self {
        Self {
            compare_mode: "visual".into(),
            highlight_color: "red".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebOptions {
    /// `low` keeps streams as they are; `medium` and `high` recompress.
    #[serde(deserialize_with = "lenient::string")]
    pub web_compression: String,
    #[serde(deserialize_with = "lenient::boolean")]
    pub remove_metadata: bool,
}

impl Default for WebOptions {
    fn default() -> Self {
        Self {
            web_compression: "medium".into(),
            remove_metadata: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompressOptions {
    #[serde(deserialize_with = "lenient::boolean")]
    pub remove_metadata: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataOptions {
    #[serde(deserialize_with = "lenient::string")]
    pub meta_title: String,
    #[serde(deserialize_with = "lenient::string")]
    pub meta_author: String,
    #[serde(deserialize_with = "lenient::string")]
    pub meta_subject: String,
    #[serde(deserialize_with = "lenient::string")]
    pub meta_keywords: String,
    #[serde(deserialize_with = "lenient::string")]
    pub meta_creator: String,
}

impl Default for MetadataOptions {
    fn default() -> Self {
        Self {
            meta_title: String::new(),
            meta_author: String::new(),
            meta_subject: String::new(),
            meta_keywords: String::new(),
            meta_creator: "All PDF Tools".into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawViewer {
    #[serde(deserialize_with = "lenient::string")]
    viewer_page_mode: String,
    #[serde(deserialize_with = "lenient::string")]
    viewer_page_layout: String,
    #[serde(deserialize_with = "lenient::boolean")]
    viewer_fit_window: bool,
    #[serde(deserialize_with = "lenient::boolean")]
    viewer_center_window: bool,
    #[serde(deserialize_with = "lenient::boolean")]
    viewer_hide_toolbar: bool,
    #[serde(deserialize_with = "lenient::boolean")]
    viewer_hide_menubar: bool,
}

impl Default for RawViewer {
    fn default() -> Self {
        let prefs = ViewerPreferences::default();
        Self {
            viewer_page_mode: prefs.page_mode,
            viewer_page_layout: prefs.page_layout,
            viewer_fit_window: prefs.fit_window,
            viewer_center_window: prefs.center_window,
            viewer_hide_toolbar: prefs.hide_toolbar,
            viewer_hide_menubar: prefs.hide_menubar,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawBatch {
    #[serde(deserialize_with = "lenient::string")]
    batch_action: String,
}

impl Default for RawBatch {
    fn default() -> Self {
        Self {
            batch_action: "compress".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorProfile {
    Cmyk,
    Grayscale,
    Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintOptions {
    pub profile: ColorProfile,
    /// Points added around every page.
    pub bleed: f32,
    pub crop_marks: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawPrint {
    #[serde(deserialize_with = "lenient::string")]
    print_color_profile: String,
    #[serde(deserialize_with = "lenient::float")]
    print_bleed: f32,
    #[serde(deserialize_with = "lenient::boolean")]
    print_crop_marks: bool,
}

impl Default for RawPrint {
    fn default() -> Self {
        Self {
            print_color_profile: "cmyk".into(),
            print_bleed: 0.0,
            print_crop_marks: false,
        }
    }
}

// -- Request ------------------------------------------------------------------

/// A dispatched tool with its options parsed and validated.
#[derive(Debug, Clone)]
pub enum ToolRequest {
    Merge,
    Split(PageSelection),
    RemovePages(PageSelection),
    ExtractPages(PageSelection),
    Reorder(ReorderOptions),
    Rotate(RotateOptions),
    AddBlank(BlankPageOptions),
    Duplicate(DuplicateOptions),
    Reverse,
    Mix,
    SplitBySize(SplitSizeOptions),
    NUp(NUpOptions),
    Booklet,

    ImagesToPdf(ImageLayout),
    TextToPdf(TextSource, TextOptions),
    QrCode(QrOptions),

    RenderPages(RasterFormat, ExportOptions),
    LongImage(ExportOptions),
    ExportText,
    ExportHtml(ExportOptions),
    ExportJson,
    ExportXml,
    ExportCsv,
    ExportPowerPoint(ExportOptions),
    ExportExcel,
    ExtractImages,

    Protect(PasswordOptions),
    Decrypt(PasswordOptions),
    Unlock(PasswordOptions),
    ChangePassword(ChangePasswordOptions),
    Watermark(WatermarkOptions),
    Sanitize,

    Compress(CompressOptions),
    PageNumbers(PageNumberOptions),
    HeaderFooter(HeaderFooterOptions),
    Crop(CropOptions),
    Resize(PaperSize),
    Grayscale(GrayscaleOptions),
    Contrast(ContrastOptions),
    Deskew(RasterOptions),
    Overlay,
    DeleteAnnotations,
    Annotate(Vec<Annotation>),

    Repair(RepairOptions),
    Ocr(OcrOptions),
    Compare(CompareOptions),
    OptimizeWeb(WebOptions),
    MetaEdit(MetadataOptions),
    SetViewer(ViewerPreferences),
    ExtractFonts,
    Analyze,
    Batch(ToolId),
    PrintReady(PrintOptions, RasterOptions),

    /// Catalogued conversion into PDF with no dedicated handler: the input
    /// is read as text and drawn on a single page.
    TextFallback,
    /// Catalogued tool with no handler: inputs come back renamed.
    Passthrough,
}

impl ToolRequest {
    /// Parse the options `tool` reads and reject values no handler could
    /// act on.
    pub fn build(tool: ToolId, options: &OptionsBag) -> Result<Self> {
        use ToolId::*;

        Ok(match tool {
            Merge => Self::Merge,
            Split => Self::Split(options.parse()?),
            RemovePages => Self::RemovePages(options.parse()?),
            ExtractPages => Self::ExtractPages(options.parse()?),
            ReorderPages | OrganizePdf => Self::Reorder(options.parse()?),
            RotatePdf | RotatePages => Self::Rotate(rotate(options)?),
            AddBlank => Self::AddBlank(options.parse()?),
            DuplicatePages => Self::Duplicate(options.parse()?),
            ReversePdf => Self::Reverse,
            MixPdf => Self::Mix,
            SplitBySize => {
                let parsed: SplitSizeOptions = options.parse()?;
                if !(parsed.split_size.is_finite() && parsed.split_size > 0.0) {
                    return Err(FolioError::Validation(
                        "Split size must be greater than 0 MB.".into(),
                    ));
                }
                Self::SplitBySize(parsed)
            }
            NUp => {
                let raw: RawNUp = options.parse()?;
                let per_sheet = usize::try_from(raw.n_up).unwrap_or(0);
                if !N_UP_CHOICES.contains(&per_sheet) {
                    return Err(FolioError::Validation(format!(
                        "Pages per sheet must be one of {N_UP_CHOICES:?}, got {}.",
                        raw.n_up
                    )));
                }
                let sheet = options.parse::<RawSheet>()?.resolve();
                Self::NUp(NUpOptions { per_sheet, sheet })
            }
            BookletMaker => Self::Booklet,

            JpgToPdf | PngToPdf | BmpToPdf | WebpToPdf | TiffToPdf | SvgToPdf | HeicToPdf
            | ScanPdf => {
                let raw: RawImageLayout = options.parse()?;
                Self::ImagesToPdf(ImageLayout::from_keywords(
                    &raw.page_size,
                    &raw.orientation,
                    &raw.margin,
                ))
            }
            TxtToPdf => Self::TextToPdf(TextSource::Plain, options.parse()?),
            MarkdownToPdf => Self::TextToPdf(TextSource::Markdown, options.parse()?),
            HtmlToPdf => Self::TextToPdf(TextSource::Html, options.parse()?),
            WordToPdf => Self::TextToPdf(TextSource::Word, options.parse()?),
            ExcelToPdf => Self::TextToPdf(TextSource::Spreadsheet, options.parse()?),
            QrToPdf => {
                let parsed: QrOptions = options.parse()?;
                if parsed.qr_text.trim().is_empty() {
                    return Err(FolioError::Validation(
                        "Please enter the text to encode in the QR code.".into(),
                    ));
                }
                Self::QrCode(parsed)
            }

            PdfToJpg => Self::RenderPages(RasterFormat::Jpeg, options.parse()?),
            PdfToPng => Self::RenderPages(RasterFormat::Png, options.parse()?),
            PdfToBmp => Self::RenderPages(RasterFormat::Bmp, options.parse()?),
            PdfToTiff => Self::RenderPages(RasterFormat::Tiff, options.parse()?),
            PdfToLongImg => Self::LongImage(options.parse()?),
            PdfToText => Self::ExportText,
            PdfToHtml => Self::ExportHtml(options.parse()?),
            ConvertPdfJson => Self::ExportJson,
            ConvertPdfXml => Self::ExportXml,
            PdfToCsv => Self::ExportCsv,
            PdfToPowerpoint => Self::ExportPowerPoint(options.parse()?),
            PdfToExcel => Self::ExportExcel,
            ExtractImages | ImageExtraction => Self::ExtractImages,

            ProtectPdf => Self::Protect(options.parse()?),
            DecryptPdf => Self::Decrypt(options.parse()?),
            UnlockPdf | RemovePassword => Self::Unlock(options.parse()?),
            ChangePassword => Self::ChangePassword(options.parse()?),
            WatermarkPdf => {
                let parsed: WatermarkOptions = options.parse()?;
                if parsed.watermark_text.trim().is_empty() {
                    return Err(FolioError::Validation("Watermark text is empty.".into()));
                }
                if !(parsed.watermark_size.is_finite() && parsed.watermark_size > 0.0) {
                    return Err(FolioError::Validation(
                        "Watermark size must be greater than 0.".into(),
                    ));
                }
                Self::Watermark(parsed)
            }
            SanitizePdf => Self::Sanitize,

            CompressPdf => Self::Compress(options.parse()?),
            PageNumbers => {
                let raw: RawPageNumbers = options.parse()?;
                Self::PageNumbers(PageNumberOptions {
                    position: Anchor::from_keyword(&raw.page_number_position)?,
                    start: raw.page_number_start,
                    size: positive(raw.page_number_size, "Page number size")?,
                    format: NumberFormat::from_keyword(&raw.page_number_format)?,
                })
            }
            AddHeaderFooter => {
                let parsed: HeaderFooterOptions = options.parse()?;
                if parsed.header_text.trim().is_empty() && parsed.footer_text.trim().is_empty() {
                    return Err(FolioError::Validation(
                        "Enter a header or a footer text.".into(),
                    ));
                }
                positive(parsed.header_footer_size, "Header and footer size")?;
                Self::HeaderFooter(parsed)
            }
            CropPdf => {
                let parsed: CropOptions = options.parse()?;
                if !(parsed.crop_margin.is_finite() && parsed.crop_margin >= 0.0) {
                    return Err(FolioError::Validation(
                        "Crop margin cannot be negative.".into(),
                    ));
                }
                Self::Crop(parsed)
            }
            ResizePdf => {
                let raw: RawResize = options.parse()?;
                let paper = PaperSize::from_keyword(&raw.resize_target).ok_or_else(|| {
                    FolioError::Validation(format!(
                        "unknown page size '{}'",
                        raw.resize_target
                    ))
                })?;
                Self::Resize(paper)
            }
            GrayscalePdf => {
                let raw: RawGrayscale = options.parse()?;
                Self::Grayscale(GrayscaleOptions {
                    method: raw.grayscale_method.parse()?,
                    quality: quality_tier(&raw.grayscale_quality),
                })
            }
            ContrastPdf => {
                let parsed: ContrastOptions = options.parse()?;
                positive(parsed.contrast_factor, "Contrast factor")?;
                Self::Contrast(parsed)
            }
            DeskewPdf => Self::Deskew(options.parse()?),
            OverlayPdf => Self::Overlay,
            DeleteAnnotations => Self::DeleteAnnotations,
            AnnotationPdf => Self::Annotate(annotations(options)?),

            RepairPdf => Self::Repair(options.parse()?),
            OcrPdf => Self::Ocr(options.parse()?),
            ComparePdf => {
                let raw: RawCompare = options.parse()?;
                let mode = match raw.compare_mode.trim().to_ascii_lowercase().as_str() {
                    "visual" | "" => CompareMode::Visual,
                    "text" => CompareMode::Text,
                    other => {
                        return Err(FolioError::Validation(format!(
                            "unknown comparison mode '{other}'"
                        )));
                    }
                };
                Self::Compare(CompareOptions {
                    mode,
                    highlight: raw.highlight_color.parse()?,
                })
            }
            OptimizeWeb => Self::OptimizeWeb(options.parse()?),
            MetaEdit => Self::MetaEdit(options.parse()?),
            SetViewer => {
                let raw: RawViewer = options.parse()?;
                Self::SetViewer(ViewerPreferences {
                    page_mode: raw.viewer_page_mode,
                    page_layout: raw.viewer_page_layout,
                    fit_window: raw.viewer_fit_window,
                    center_window: raw.viewer_center_window,
                    hide_toolbar: raw.viewer_hide_toolbar,
                    hide_menubar: raw.viewer_hide_menubar,
                })
            }
            ExtractFonts => Self::ExtractFonts,
            AnalyzePdf => Self::Analyze,
            BatchProcess => Self::Batch(batch_action(options)?),
            PrintReady => {
                let raw: RawPrint = options.parse()?;
                let profile = match raw.print_color_profile.trim().to_ascii_lowercase().as_str() {
                    "cmyk" | "" => ColorProfile::Cmyk,
                    "grayscale" | "greyscale" | "gray" => ColorProfile::Grayscale,
                    "rgb" | "srgb" => ColorProfile::Rgb,
                    other => {
                        return Err(FolioError::Validation(format!(
                            "unknown colour profile '{other}'"
                        )));
                    }
                };
                if !(raw.print_bleed.is_finite() && raw.print_bleed >= 0.0) {
                    return Err(FolioError::Validation("Bleed cannot be negative.".into()));
                }
                Self::PrintReady(
                    PrintOptions {
                        profile,
                        bleed: raw.print_bleed,
                        crop_marks: raw.print_crop_marks,
                    },
                    options.parse()?,
                )
            }

            other if other.converts_to_pdf() => Self::TextFallback,
            _ => Self::Passthrough,
        })
    }
}

fn rotate(options: &OptionsBag) -> Result<RotateOptions> {
    let raw: RawRotate = options.parse()?;
    // An unset or zero rotation means a quarter turn.
    let requested = if raw.rotation == 0 { 90 } else { raw.rotation };
    let degrees = i32::try_from(requested)
        .ok()
        .filter(|degrees| degrees % 90 == 0)
        .ok_or_else(|| {
            FolioError::Validation(format!(
                "Rotation must be a multiple of 90 degrees, got {}.",
                raw.rotation
            ))
        })?;
    let scope = if raw.rotate_mode.trim().eq_ignore_ascii_case("specific") {
        RotateScope::Specific(raw.pages)
    } else {
        RotateScope::All
    };
    Ok(RotateOptions { degrees, scope })
}

fn annotations(options: &OptionsBag) -> Result<Vec<Annotation>> {
    let value = match options.get("annotations") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::String(text)) if text.trim().is_empty() => return Ok(Vec::new()),
        Some(Value::String(text)) => serde_json::from_str::<Value>(text)
            .map_err(|err| FolioError::Validation(format!("annotations are not JSON: {err}")))?,
        Some(value) => value.clone(),
    };
    serde_json::from_value(value)
        .map_err(|err| FolioError::Validation(format!("invalid annotation: {err}")))
}

fn batch_action(options: &OptionsBag) -> Result<ToolId> {
    let raw: RawBatch = options.parse()?;
    let action = raw.batch_action.trim().to_ascii_lowercase();
    let tool = match action.as_str() {
        "compress" => ToolId::CompressPdf,
        "grayscale" | "greyscale" => ToolId::GrayscalePdf,
        "rotate" => ToolId::RotatePdf,
        "watermark" => ToolId::WatermarkPdf,
        "page-numbers" | "number" => ToolId::PageNumbers,
        "sanitize" => ToolId::SanitizePdf,
        "protect" | "encrypt" => ToolId::ProtectPdf,
        "unlock" => ToolId::UnlockPdf,
        "repair" => ToolId::RepairPdf,
        "remove-metadata" | "strip-metadata" => ToolId::SanitizePdf,
        other => other.parse()?,
    };
    if tool == ToolId::BatchProcess || tool.min_files() > 1 {
        return Err(FolioError::Validation(format!(
            "'{}' cannot run as a batch action.",
            tool.id()
        )));
    }
    Ok(tool)
}

fn positive(value: f32, what: &str) -> Result<f32> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(FolioError::Validation(format!(
            "{what} must be greater than 0."
        )))
    }
}

fn orientation(keyword: &str) -> Orientation {
    if keyword.trim().eq_ignore_ascii_case("landscape") {
        Orientation::Landscape
    } else {
        Orientation::Portrait
    }
}

fn quality_tier(keyword: &str) -> &'static str {
    match keyword.trim().to_ascii_lowercase().as_str() {
        "low" => "low",
        "medium" => "medium",
        _ => "high",
    }
}

/// `jpg`, `png`, `bmp` or `tiff` (with common aliases).
pub fn raster_format(keyword: &str) -> Result<RasterFormat> {
    match keyword.trim().to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Ok(RasterFormat::Jpeg),
        "png" => Ok(RasterFormat::Png),
        "bmp" => Ok(RasterFormat::Bmp),
        "tif" | "tiff" => Ok(RasterFormat::Tiff),
        other => Err(FolioError::Validation(format!(
            "unknown image format '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn bag(value: Value) -> OptionsBag {
        OptionsBag::from_json(value).unwrap()
    }

    #[test]
    fn rotate_defaults_to_all_pages_by_ninety() {
        let ToolRequest::Rotate(options) =
            ToolRequest::build(ToolId::RotatePdf, &OptionsBag::new()).unwrap()
        else {
            panic!("expected a rotate request");
        };
        assert_eq!(options.degrees, 90);
        assert_eq!(options.scope, RotateScope::All);
    }

    #[test]
    fn rotate_specific_keeps_range() {
        let options = bag(json!({"rotation": "180", "rotateMode": "specific", "pages": "2,4"}));
        let ToolRequest::Rotate(parsed) = ToolRequest::build(ToolId::RotatePages, &options).unwrap()
        else {
            panic!("expected a rotate request");
        };
        assert_eq!(parsed.degrees, 180);
        assert_eq!(parsed.scope, RotateScope::Specific("2,4".into()));
    }

    #[test]
    fn zero_rotation_means_a_quarter_turn() {
        let ToolRequest::Rotate(parsed) =
            ToolRequest::build(ToolId::RotatePdf, &bag(json!({"rotation": 0}))).unwrap()
        else {
            panic!("expected a rotate request");
        };
        assert_eq!(parsed.degrees, 90);
    }

    #[test]
    fn qr_code_needs_text() {
        assert!(matches!(
            ToolRequest::build(ToolId::QrToPdf, &bag(json!({"qrText": "  "}))),
            Err(FolioError::Validation(_))
        ));
        let ToolRequest::QrCode(parsed) =
            ToolRequest::build(ToolId::QrToPdf, &bag(json!({"qrText": "https://example.org"})))
                .unwrap()
        else {
            panic!("expected a QR request");
        };
        assert_eq!(parsed.qr_text, "https://example.org");
    }

    #[test]
    fn odd_rotation_rejected() {
        let options = bag(json!({"rotation": 45}));
        assert!(matches!(
            ToolRequest::build(ToolId::RotatePdf, &options),
            Err(FolioError::Validation(_))
        ));
    }

    #[test]
    fn n_up_accepts_grid_sizes_only() {
        assert!(ToolRequest::build(ToolId::NUp, &bag(json!({"nUp": 4}))).is_ok());
        assert!(ToolRequest::build(ToolId::NUp, &bag(json!({"nUp": 3}))).is_err());
    }

    #[test]
    fn watermark_defaults() {
        let ToolRequest::Watermark(options) =
            ToolRequest::build(ToolId::WatermarkPdf, &OptionsBag::new()).unwrap()
        else {
            panic!("expected a watermark request");
        };
        assert_eq!(options.watermark_text, "CONFIDENTIAL");
        assert_eq!(options.watermark_opacity, 30.0);
        assert_eq!(options.watermark_rotation, 45.0);
    }

    #[test]
    fn page_number_formats_render() {
        assert_eq!(NumberFormat::Number.render(3, 9), "3");
        assert_eq!(NumberFormat::PageOfTotal.render(3, 9), "Page 3 of 9");
        assert!(
            ToolRequest::build(ToolId::PageNumbers, &bag(json!({"pageNumberPosition": "middle"})))
                .is_err()
        );
    }

    #[test]
    fn annotations_parse_from_string_or_array() {
        let list = json!([
            {"type": "text", "page": 1, "x": 10, "y": 20, "text": "hi"},
            {"type": "highlight", "page": 2, "x": 0, "y": 0, "width": 50, "height": 10}
        ]);
        let from_array = annotations(&bag(json!({"annotations": list.clone()}))).unwrap();
        let from_string = annotations(&bag(json!({"annotations": list.to_string()}))).unwrap();
        assert_eq!(from_array, from_string);
        assert_eq!(from_array.len(), 2);
        assert_eq!(from_array[1].page(), 2);
        assert!(annotations(&bag(json!({"annotations": [{"type": "blob"}]}))).is_err());
    }

    #[test]
    fn batch_action_maps_to_tool() {
        let compress = batch_action(&OptionsBag::new()).unwrap();
        assert_eq!(compress, ToolId::CompressPdf);
        let direct = batch_action(&bag(json!({"batchAction": "reverse-pdf"}))).unwrap();
        assert_eq!(direct, ToolId::ReversePdf);
        assert!(batch_action(&bag(json!({"batchAction": "mix-pdf"}))).is_err());
        assert!(batch_action(&bag(json!({"batchAction": "batch-process"}))).is_err());
    }

    #[test]
    fn export_range_all_selects_every_page() {
        let options = ExportOptions::default();
        assert_eq!(options.pages(3), vec![0, 1, 2]);
        let ranged = ExportOptions {
            page_range: "2-3".into(),
            ..ExportOptions::default()
        };
        assert_eq!(ranged.pages(5), vec![1, 2]);
    }

    #[test]
    fn uncatalogued_behaviour_split_by_direction() {
        assert!(matches!(
            ToolRequest::build(ToolId::EpubToPdf, &OptionsBag::new()).unwrap(),
            ToolRequest::TextFallback
        ));
        assert!(matches!(
            ToolRequest::build(ToolId::SignPdf, &OptionsBag::new()).unwrap(),
            ToolRequest::Passthrough
        ));
    }
}
