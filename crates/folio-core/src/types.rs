// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: input files, result descriptors, document types and
// paper sizes.

use serde::{Deserialize, Serialize};

/// MIME type of a PDF document.
pub const MIME_PDF: &str = "application/pdf";

/// MIME type of an encrypted envelope.
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

/// An immutable named byte buffer handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    name: String,
    mime_type: String,
    data: Vec<u8>,
}

impl InputFile {
    /// Create an input file. An empty `mime_type` is inferred from the
    /// file extension.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        let name = name.into();
        let mut mime_type = mime_type.into();
        if mime_type.is_empty() {
            mime_type = extension_of(&name)
                .and_then(|ext| DocumentType::from_extension(&ext))
                .map(|doc_type| doc_type.mime_type().to_owned())
                .unwrap_or_else(|| MIME_OCTET_STREAM.to_owned());
        }
        Self {
            name,
            mime_type,
            data,
        }
    }

    /// Convenience constructor for PDF inputs.
    pub fn pdf(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self::new(name, MIME_PDF, data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// File name without its final extension (`report.pdf` -> `report`).
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => &self.name[..idx],
            _ => &self.name,
        }
    }

    /// Lower-cased final extension, if any.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }

    /// Whether the name ends with `.ext` (case-insensitive).
    pub fn has_extension(&self, ext: &str) -> bool {
        self.extension().is_some_and(|e| e == ext)
    }

    /// Interpret the content as UTF-8 text, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

fn extension_of(name: &str) -> Option<String> {
    let idx = name.rfind('.')?;
    let ext = &name[idx + 1..];
    (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
}

/// One output artifact of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultDescriptor {
    pub name: String,
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl ResultDescriptor {
    pub fn new(name: impl Into<String>, data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data,
            mime_type: mime_type.into(),
        }
    }

    /// A PDF result.
    pub fn pdf(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self::new(name, data, MIME_PDF)
    }
}

/// Document types Folio reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Pdf,
    Jpeg,
    Png,
    Bmp,
    Tiff,
    Webp,
    Gif,
    Svg,
    Heic,
    PlainText,
    Markdown,
    Html,
    Json,
    Xml,
    Csv,
    Docx,
    Xlsx,
    Pptx,
    /// Legacy binary Office formats (DOC, XLS, PPT): always rejected.
    LegacyOffice,
    /// Folio's AES-256-GCM envelope.
    Envelope,
}

impl DocumentType {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => MIME_PDF,
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
            Self::Svg => "image/svg+xml",
            Self::Heic => "image/heic",
            Self::PlainText => "text/plain",
            Self::Markdown => "text/markdown",
            Self::Html => "text/html",
            Self::Json => "application/json",
            Self::Xml => "application/xml",
            Self::Csv => "text/csv",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::LegacyOffice => "application/octet-stream",
            Self::Envelope => MIME_OCTET_STREAM,
        }
    }

    /// Canonical file extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Webp => "webp",
            Self::Gif => "gif",
            Self::Svg => "svg",
            Self::Heic => "heic",
            Self::PlainText => "txt",
            Self::Markdown => "md",
            Self::Html => "html",
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Csv => "csv",
            Self::Docx => "docx",
            Self::Xlsx => "xlsx",
            Self::Pptx => "pptx",
            Self::LegacyOffice => "doc",
            Self::Envelope => "aes256",
        }
    }

    /// Infer document type from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            "webp" => Some(Self::Webp),
            "gif" => Some(Self::Gif),
            "svg" => Some(Self::Svg),
            "heic" | "heif" => Some(Self::Heic),
            "txt" | "text" | "log" => Some(Self::PlainText),
            "md" | "markdown" => Some(Self::Markdown),
            "html" | "htm" => Some(Self::Html),
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            "csv" => Some(Self::Csv),
            "docx" => Some(Self::Docx),
            "xlsx" => Some(Self::Xlsx),
            "pptx" => Some(Self::Pptx),
            "doc" | "xls" | "ppt" => Some(Self::LegacyOffice),
            "aes256" => Some(Self::Envelope),
            _ => None,
        }
    }
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PaperSize {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom { width_pt: f32, height_pt: f32 },
}

impl PaperSize {
    /// Portrait dimensions in PDF points (width, height).
    pub fn dimensions_pt(&self) -> (f32, f32) {
        match self {
            Self::A3 => (841.89, 1190.55),
            Self::A4 => (595.28, 841.89),
            Self::A5 => (419.53, 595.28),
            Self::Letter => (612.0, 792.0),
            Self::Legal => (612.0, 1008.0),
            Self::Tabloid => (792.0, 1224.0),
            Self::Custom {
                width_pt,
                height_pt,
            } => (*width_pt, *height_pt),
        }
    }

    /// Dimensions in points for the given orientation.
    pub fn oriented(&self, orientation: Orientation) -> (f32, f32) {
        let (w, h) = self.dimensions_pt();
        match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    /// Parse a page-size keyword (`a4`, `letter`, ...). Unknown keywords
    /// yield `None`; `fit` is handled by callers.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "a3" => Some(Self::A3),
            "a4" => Some(Self::A4),
            "a5" => Some(Self::A5),
            "letter" => Some(Self::Letter),
            "legal" => Some(Self::Legal),
            "tabloid" | "ledger" => Some(Self::Tabloid),
            _ => None,
        }
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_file_infers_mime_from_extension() {
        let file = InputFile::new("Scan.JPG", "", vec![1, 2, 3]);
        assert_eq!(file.mime_type(), "image/jpeg");
        assert_eq!(file.stem(), "Scan");
        assert_eq!(file.extension().as_deref(), Some("jpg"));
        assert!(file.has_extension("jpg"));
    }

    #[test]
    fn stem_without_extension() {
        let file = InputFile::new("README", "", Vec::new());
        assert_eq!(file.stem(), "README");
        assert_eq!(file.extension(), None);
        assert_eq!(file.mime_type(), MIME_OCTET_STREAM);
    }

    #[test]
    fn envelope_extension_round_trip() {
        assert_eq!(
            DocumentType::from_extension("aes256"),
            Some(DocumentType::Envelope)
        );
        assert_eq!(DocumentType::Envelope.extension(), "aes256");
    }

    #[test]
    fn legacy_office_is_recognised() {
        for ext in ["doc", "xls", "ppt"] {
            assert_eq!(
                DocumentType::from_extension(ext),
                Some(DocumentType::LegacyOffice)
            );
        }
    }

    #[test]
    fn landscape_swaps_dimensions() {
        let (w, h) = PaperSize::A4.oriented(Orientation::Landscape);
        assert!(w > h);
        assert_eq!(PaperSize::from_keyword("LETTER"), Some(PaperSize::Letter));
        assert_eq!(PaperSize::from_keyword("fit"), None);
    }
}
