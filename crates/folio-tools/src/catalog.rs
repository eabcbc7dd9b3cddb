// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The tool catalog: every identifier a caller may dispatch, its display
// name and the category it is listed under.

use std::fmt;
use std::str::FromStr;

use folio_core::error::FolioError;
use serde::Serialize;

/// Catalog grouping, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Organize,
    ConvertTo,
    ConvertFrom,
    Security,
    Edit,
    Advanced,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Organize,
        Category::ConvertTo,
        Category::ConvertFrom,
        Category::Security,
        Category::Edit,
        Category::Advanced,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Organize => "Organize PDF",
            Self::ConvertTo => "Convert to PDF",
            Self::ConvertFrom => "Convert from PDF",
            Self::Security => "Security",
            Self::Edit => "Edit PDF",
            Self::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

macro_rules! catalog {
    ($( $variant:ident => $id:literal, $name:literal, $category:ident; )*) => {
        /// Every tool identifier the dispatcher recognises.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ToolId {
            $( $variant, )*
        }

        impl ToolId {
            /// All tools in catalog order.
            pub const ALL: &'static [ToolId] = &[ $( ToolId::$variant, )* ];

            /// The kebab-case identifier, e.g. `"merge"`.
            pub fn id(self) -> &'static str {
                match self {
                    $( ToolId::$variant => $id, )*
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $( ToolId::$variant => $name, )*
                }
            }

            pub fn category(self) -> Category {
                match self {
                    $( ToolId::$variant => Category::$category, )*
                }
            }
        }

        impl FromStr for ToolId {
            type Err = FolioError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim() {
                    $( $id => Ok(ToolId::$variant), )*
                    other => Err(FolioError::UnsupportedOperation(other.to_owned())),
                }
            }
        }
    };
}

catalog! {
    Merge => "merge", "Merge PDF", Organize;
    Split => "split", "Split PDF", Organize;
    RemovePages => "remove-pages", "Remove Pages", Organize;
    ExtractPages => "extract-pages", "Extract Pages", Organize;
    OrganizePdf => "organize-pdf", "Organize PDF", Organize;
    ScanPdf => "scan-pdf", "Scan to PDF", Organize;
    ReorderPages => "reorder-pages", "Reorder Pages", Organize;
    RotatePdf => "rotate-pdf", "Rotate PDF", Organize;
    AddBlank => "add-blank", "Add Blank Page", Organize;
    DuplicatePages => "duplicate-pages", "Duplicate Pages", Organize;
    ReversePdf => "reverse-pdf", "Reverse PDF", Organize;
    MixPdf => "mix-pdf", "Mix PDF", Organize;
    SplitByBookmark => "split-by-bookmark", "Split via Bookmarks", Organize;
    SplitBySize => "split-by-size", "Split by Size", Organize;
    SplitByText => "split-by-text", "Split by Text", Organize;
    NUp => "n-up", "N-Up", Organize;
    BookletMaker => "booklet-maker", "Booklet", Organize;

    JpgToPdf => "jpg-to-pdf", "JPG to PDF", ConvertTo;
    WordToPdf => "word-to-pdf", "Word to PDF", ConvertTo;
    PowerpointToPdf => "powerpoint-to-pdf", "PowerPoint to PDF", ConvertTo;
    ExcelToPdf => "excel-to-pdf", "Excel to PDF", ConvertTo;
    HtmlToPdf => "html-to-pdf", "HTML to PDF", ConvertTo;
    PngToPdf => "png-to-pdf", "PNG to PDF", ConvertTo;
    TiffToPdf => "tiff-to-pdf", "TIFF to PDF", ConvertTo;
    TxtToPdf => "txt-to-pdf", "TXT to PDF", ConvertTo;
    MarkdownToPdf => "markdown-to-pdf", "Markdown to PDF", ConvertTo;
    EpubToPdf => "epub-to-pdf", "EPUB to PDF", ConvertTo;
    DjvuToPdf => "djvu-to-pdf", "DJVU to PDF", ConvertTo;
    RtfToPdf => "rtf-to-pdf", "RTF to PDF", ConvertTo;
    OdtToPdf => "odt-to-pdf", "ODT to PDF", ConvertTo;
    PptToPdf => "ppt-to-pdf", "PPT to PDF", ConvertTo;
    BmpToPdf => "bmp-to-pdf", "BMP to PDF", ConvertTo;
    SvgToPdf => "svg-to-pdf", "SVG to PDF", ConvertTo;
    HeicToPdf => "heic-to-pdf", "HEIC to PDF", ConvertTo;
    WebpToPdf => "webp-to-pdf", "WebP to PDF", ConvertTo;
    QrToPdf => "qr-to-pdf", "QR to PDF", ConvertTo;
    XpsToPdf => "xps-to-pdf", "XPS to PDF", ConvertTo;
    OxpsToPdf => "oxps-to-pdf", "OXPS to PDF", ConvertTo;
    CbrToPdf => "cbr-to-pdf", "CBR to PDF", ConvertTo;
    CbzToPdf => "cbz-to-pdf", "CBZ to PDF", ConvertTo;
    Jb2ToPdf => "jb2-to-pdf", "JB2 to PDF", ConvertTo;
    PctToPdf => "pct-to-pdf", "PCT to PDF", ConvertTo;

    PdfToJpg => "pdf-to-jpg", "PDF to JPG", ConvertFrom;
    PdfToWord => "pdf-to-word", "PDF to Word", ConvertFrom;
    PdfToPowerpoint => "pdf-to-powerpoint", "PDF to PowerPoint", ConvertFrom;
    PdfToExcel => "pdf-to-excel", "PDF to Excel", ConvertFrom;
    PdfToPdfa => "pdf-to-pdfa", "PDF to PDF/A", ConvertFrom;
    PdfToPng => "pdf-to-png", "PDF to PNG", ConvertFrom;
    PdfToHtml => "pdf-to-html", "PDF to HTML", ConvertFrom;
    PdfToText => "pdf-to-text", "PDF to Text", ConvertFrom;
    PdfToRtf => "pdf-to-rtf", "PDF to RTF", ConvertFrom;
    PdfToEpub => "pdf-to-epub", "PDF to EPUB", ConvertFrom;
    PdfToBmp => "pdf-to-bmp", "PDF to BMP", ConvertFrom;
    PdfToTiff => "pdf-to-tiff", "PDF to TIFF", ConvertFrom;
    PdfToSvg => "pdf-to-svg", "PDF to SVG", ConvertFrom;
    ExtractImages => "extract-images", "Extract Images", ConvertFrom;
    ConvertPdfXml => "convert-pdf-xml", "PDF to XML", ConvertFrom;
    ConvertPdfJson => "convert-pdf-json", "PDF to JSON", ConvertFrom;
    ExtractTables => "extract-tables", "Extract Tables", ConvertFrom;
    ImageExtraction => "image-extraction", "Grab Images", ConvertFrom;
    PdfToLongImg => "pdf-to-long-img", "Long Image", ConvertFrom;
    PdfToCsv => "pdf-to-csv", "PDF to CSV", ConvertFrom;

    UnlockPdf => "unlock-pdf", "Unlock PDF", Security;
    ProtectPdf => "protect-pdf", "Protect PDF", Security;
    DecryptPdf => "decrypt-pdf", "Decrypt PDF", Security;
    SignPdf => "sign-pdf", "Sign PDF", Security;
    WatermarkPdf => "watermark-pdf", "Watermark", Security;
    RedactPdf => "redact-pdf", "Redact PDF", Security;
    SanitizePdf => "sanitize-pdf", "Sanitize PDF", Security;
    FlattenPdf => "flatten-pdf", "Flatten PDF", Security;
    CertificateSign => "certificate-sign", "Certify PDF", Security;
    TimestampPdf => "timestamp-pdf", "Timestamp PDF", Security;
    BarcodePdf => "barcode-pdf", "Barcode Stamp", Security;
    RemovePassword => "remove-password", "Remove Pass", Security;
    ChangePassword => "change-password", "Change Pass", Security;

    CompressPdf => "compress-pdf", "Compress PDF", Edit;
    PageNumbers => "page-numbers", "Page Numbers", Edit;
    AddHeaderFooter => "add-header-footer", "Header & Footer", Edit;
    CropPdf => "crop-pdf", "Crop PDF", Edit;
    RotatePages => "rotate-pages", "Rotate Pages", Edit;
    ResizePdf => "resize-pdf", "Resize PDF", Edit;
    GrayscalePdf => "grayscale-pdf", "Grayscale PDF", Edit;
    AnnotationPdf => "annotation-pdf", "Annotate PDF", Edit;
    OverlayPdf => "overlay-pdf", "Overlay PDF", Edit;
    DeskewPdf => "deskew-pdf", "Deskew PDF", Edit;
    ContrastPdf => "contrast-pdf", "Adjust Contrast", Edit;
    DeleteAnnotations => "delete-annotations", "Clear Notes", Edit;

    RepairPdf => "repair-pdf", "Repair PDF", Advanced;
    OcrPdf => "ocr-pdf", "OCR PDF", Advanced;
    ComparePdf => "compare-pdf", "Compare PDF", Advanced;
    OptimizeWeb => "optimize-web", "Optimize for Web", Advanced;
    MetaEdit => "meta-edit", "Edit Metadata", Advanced;
    SetViewer => "set-viewer", "Viewer Prefs", Advanced;
    ExtractFonts => "extract-fonts", "Extract Fonts", Advanced;
    AnalyzePdf => "analyze-pdf", "Analyze PDF", Advanced;
    BatchProcess => "batch-process", "Batch Process", Advanced;
    PrintReady => "print-ready", "Print Ready", Advanced;
}

impl ToolId {
    /// Fewest input files the tool can run with.
    pub fn min_files(self) -> usize {
        match self {
            Self::QrToPdf => 0,
            Self::MixPdf | Self::OverlayPdf | Self::ComparePdf => 2,
            _ => 1,
        }
    }

    /// Whether the identifier names a conversion into PDF.
    pub fn converts_to_pdf(self) -> bool {
        self.id().ends_with("-to-pdf")
    }

    /// Tools in one category, in catalog order.
    pub fn in_category(category: Category) -> impl Iterator<Item = ToolId> {
        Self::ALL
            .iter()
            .copied()
            .filter(move |tool| tool.category() == category)
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn every_id_round_trips() {
        for tool in ToolId::ALL {
            assert_eq!(tool.id().parse::<ToolId>().unwrap(), *tool);
        }
    }

    #[test]
    fn ids_are_unique() {
        let ids: HashSet<&str> = ToolId::ALL.iter().map(|tool| tool.id()).collect();
        assert_eq!(ids.len(), ToolId::ALL.len());
        assert_eq!(ToolId::ALL.len(), 97);
    }

    #[test]
    fn unknown_id_is_unsupported_operation() {
        let err = "make-coffee".parse::<ToolId>().unwrap_err();
        assert!(matches!(err, FolioError::UnsupportedOperation(ref id) if id == "make-coffee"));
    }

    #[test]
    fn categories_cover_the_catalog() {
        let total: usize = Category::ALL
            .iter()
            .map(|category| ToolId::in_category(*category).count())
            .sum();
        assert_eq!(total, ToolId::ALL.len());
        assert_eq!(ToolId::ExtractTables.category(), Category::ConvertFrom);
        assert_eq!(ToolId::BarcodePdf.category(), Category::Security);
    }

    #[test]
    fn two_file_tools() {
        assert_eq!(ToolId::MixPdf.min_files(), 2);
        assert_eq!(ToolId::ComparePdf.min_files(), 2);
        assert_eq!(ToolId::Merge.min_files(), 1);
        assert_eq!(ToolId::QrToPdf.min_files(), 0);
        assert!(ToolId::QrToPdf.converts_to_pdf());
        assert!(!ToolId::PdfToJpg.converts_to_pdf());
    }
}
