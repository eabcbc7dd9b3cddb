// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Processing configuration.

use serde::{Deserialize, Serialize};

/// Tunables shared by every dispatch call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    /// Render scale for the "low" quality tier.
    pub scale_low: f32,
    /// Render scale for the "medium" quality tier.
    pub scale_medium: f32,
    /// Render scale for the "high" quality tier.
    pub scale_high: f32,
    /// JPEG quality (0.0-1.0) for page image exports.
    pub export_jpeg_quality: f32,
    /// JPEG quality (0.0-1.0) for pages re-rendered back into a PDF.
    pub rerender_jpeg_quality: f32,
    /// Minimum password length accepted by the protect/change-password tools.
    pub min_password_length: usize,
    /// Characters rendered by the plain-text fallback for unknown `*-to-pdf`
    /// tools.
    pub fallback_char_limit: usize,
    /// Default font size for text conversions when the options omit one.
    pub text_font_size: f32,
    /// Page margin (points) for text conversions.
    pub text_margin_pt: f32,
    /// PDFium shared library, as a file or the directory holding it. When
    /// unset, `PDFIUM_DYNAMIC_LIB_PATH`, the working directory and the system
    /// library path are tried in that order.
    pub pdfium_library_path: Option<String>,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            scale_low: 1.5,
            scale_medium: 2.0,
            scale_high: 2.5,
            export_jpeg_quality: 0.9,
            rerender_jpeg_quality: 0.85,
            min_password_length: 6,
            fallback_char_limit: 2000,
            text_font_size: 12.0,
            text_margin_pt: 50.0,
            pdfium_library_path: None,
        }
    }
}

impl FolioConfig {
    /// Scale factor for a quality keyword (`low`, `medium`, `high`).
    /// Unknown keywords map to the high tier.
    pub fn scale_for(&self, quality: &str) -> f32 {
        match quality.trim().to_ascii_lowercase().as_str() {
            "low" => self.scale_low,
            "medium" => self.scale_medium,
            _ => self.scale_high,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_tiers_are_ordered() {
        let config = FolioConfig::default();
        assert!(config.scale_for("low") < config.scale_for("medium"));
        assert!(config.scale_for("medium") < config.scale_for("high"));
        assert_eq!(config.scale_for("unknown"), config.scale_high);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: FolioConfig = serde_json::from_str(r#"{"min_password_length": 10}"#).unwrap();
        assert_eq!(config.min_password_length, 10);
        assert_eq!(config.scale_medium, 2.0);
        assert_eq!(config.pdfium_library_path, None);
    }
}
