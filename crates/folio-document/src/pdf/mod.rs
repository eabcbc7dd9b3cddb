// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: the lopdf-backed document handle, drawing, metadata and
// inspection, plus printpdf-based text and image layout.

mod clone;
pub mod draw;
pub mod fonts;
pub mod handle;
pub mod inspect;
pub mod metadata;
pub mod writer;

use std::str::FromStr;

use folio_core::error::FolioError;
use lopdf::{Document, Object};
use serde::Serialize;

pub use draw::{FontRef, ImageRef, PageRef, Placement, ShapeStyle, TextRun};
pub use fonts::StandardFont;
pub use handle::{PdfDocumentHandle, RepairPolicy, RepairReport, SaveOptions};
pub use inspect::{DocumentSummary, ExtractedImage, FontInfo, FontProgram, ImageInfo};
pub use metadata::{DocumentMetadata, ViewerPreferences};
pub use writer::{ImageLayout, ImagePlacement, Margin, PdfWriter, PlacedLine, TextLayout};

/// Axis-aligned rectangle in PDF user space (points, origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size anchored at the origin.
    pub fn sized(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Parse a PDF rectangle array `[llx lly urx ury]`, normalising corners.
    pub fn from_object(object: &Object) -> Option<Self> {
        let values = object.as_array().ok()?;
        if values.len() != 4 {
            return None;
        }
        let mut nums = [0.0f32; 4];
        for (slot, value) in nums.iter_mut().zip(values) {
            *slot = number(value)?;
        }
        let (x0, x1) = (nums[0].min(nums[2]), nums[0].max(nums[2]));
        let (y0, y1) = (nums[1].min(nums[3]), nums[1].max(nums[3]));
        Some(Self::new(x0, y0, x1 - x0, y1 - y0))
    }

    pub fn to_object(self) -> Object {
        Object::Array(vec![
            Object::Real(self.x),
            Object::Real(self.y),
            Object::Real(self.x + self.width),
            Object::Real(self.y + self.height),
        ])
    }

    /// Shrink on every side by `margin`, keeping at least one point of area.
    pub fn inset(self, margin: f32) -> Self {
        let dx = margin.min((self.width - 1.0).max(0.0) / 2.0);
        let dy = margin.min((self.height - 1.0).max(0.0) / 2.0);
        Self::new(
            self.x + dx,
            self.y + dy,
            self.width - 2.0 * dx,
            self.height - 2.0 * dy,
        )
    }

    /// Grow on every side by `margin`.
    pub fn outset(self, margin: f32) -> Self {
        Self::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }
}

/// An RGB colour with components in 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);
    pub const GRAY: Rgb = Rgb::new(0.5, 0.5, 0.5);
    pub const RED: Rgb = Rgb::new(1.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_bytes(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// `#rrggbb` or `#rgb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#')?;
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_owned(),
            _ => return None,
        };
        let channel = |i: usize| u8::from_str_radix(expanded.get(i..i + 2)?, 16).ok();
        Some(Self::from_bytes(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn named(name: &str) -> Option<Self> {
        Some(match name.trim().to_ascii_lowercase().as_str() {
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            "gray" | "grey" => Self::GRAY,
            "red" => Self::RED,
            "green" => Self::new(0.0, 0.6, 0.0),
            "blue" => Self::new(0.0, 0.0, 1.0),
            "yellow" => Self::new(1.0, 1.0, 0.0),
            "orange" => Self::new(1.0, 0.55, 0.0),
            "purple" => Self::new(0.5, 0.0, 0.5),
            _ => return None,
        })
    }

    pub(crate) fn operands(self) -> Vec<Object> {
        vec![
            Object::Real(self.r),
            Object::Real(self.g),
            Object::Real(self.b),
        ]
    }
}

impl FromStr for Rgb {
    type Err = FolioError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_hex(value)
            .or_else(|| Self::named(value))
            .ok_or_else(|| FolioError::Validation(format!("'{value}' is not a colour")))
    }
}

/// Geometry of one page as seen through the handle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageInfo {
    /// Crop box width, unrotated.
    pub width: f32,
    /// Crop box height, unrotated.
    pub height: f32,
    /// Cumulative rotation, one of 0/90/180/270.
    pub rotation: i32,
    pub media_box: Rect,
    pub crop_box: Rect,
}

impl PageInfo {
    /// Width and height as a viewer shows them, after rotation.
    pub fn display_size(&self) -> (f32, f32) {
        if self.rotation % 180 == 0 {
            (self.width, self.height)
        } else {
            (self.height, self.width)
        }
    }
}

/// Read an integer or real operand as `f32`.
pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

/// Follow a single level of indirection.
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

pub(crate) fn pdf_err(context: &str, err: lopdf::Error) -> FolioError {
    FolioError::Pdf(format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_normalises_reversed_corners() {
        let array = Object::Array(vec![
            Object::Integer(600),
            Object::Integer(800),
            Object::Integer(0),
            Object::Real(0.0),
        ]);
        let rect = Rect::from_object(&array).unwrap();
        assert_eq!(rect, Rect::new(0.0, 0.0, 600.0, 800.0));
    }

    #[test]
    fn inset_never_inverts() {
        let rect = Rect::sized(100.0, 40.0).inset(50.0);
        assert!(rect.width >= 1.0 && rect.height >= 1.0);
        assert_eq!(Rect::sized(100.0, 100.0).inset(10.0), Rect::new(10.0, 10.0, 80.0, 80.0));
    }

    #[test]
    fn colours_parse_from_hex_and_names() {
        assert_eq!("#ff0000".parse::<Rgb>().unwrap(), Rgb::RED);
        assert_eq!("#fff".parse::<Rgb>().unwrap(), Rgb::WHITE);
        assert_eq!("Red".parse::<Rgb>().unwrap(), Rgb::RED);
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("mauve-ish".parse::<Rgb>().is_err());
    }

    #[test]
    fn display_size_swaps_for_quarter_turns() {
        let info = PageInfo {
            width: 100.0,
            height: 200.0,
            rotation: 90,
            media_box: Rect::sized(100.0, 200.0),
            crop_box: Rect::sized(100.0, 200.0),
        };
        assert_eq!(info.display_size(), (200.0, 100.0));
    }
}
