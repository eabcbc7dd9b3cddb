// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-pixel colour transforms applied to rendered pages.

use std::str::FromStr;

use folio_core::error::FolioError;

/// Luminance formula used to reduce a pixel to a single grey level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrayscaleMethod {
    /// ITU-R BT.601 weights: `0.299R + 0.587G + 0.114B`.
    #[default]
    Luminosity,
    /// Arithmetic mean of the three channels.
    Average,
    /// Midpoint of the brightest and darkest channel.
    Desaturate,
}

impl GrayscaleMethod {
    /// Grey level for one pixel. Integer arithmetic keeps grey inputs fixed,
    /// so applying the transform twice changes nothing.
    pub fn gray_level(self, r: u8, g: u8, b: u8) -> u8 {
        let (r, g, b) = (r as u32, g as u32, b as u32);
        let level = match self {
            Self::Luminosity => (299 * r + 587 * g + 114 * b + 500) / 1000,
            Self::Average => (r + g + b + 1) / 3,
            Self::Desaturate => (r.max(g).max(b) + r.min(g).min(b)) / 2,
        };
        level.min(255) as u8
    }

    /// Pixel transform suitable for [`super::Surface::apply_pixel_transform`].
    pub fn transform(self) -> impl Fn([u8; 4]) -> [u8; 4] {
        move |[r, g, b, a]| {
            let level = self.gray_level(r, g, b);
            [level, level, level, a]
        }
    }
}

impl FromStr for GrayscaleMethod {
    type Err = FolioError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "luminosity" | "" => Ok(Self::Luminosity),
            "average" => Ok(Self::Average),
            "desaturate" | "lightness" => Ok(Self::Desaturate),
            other => Err(FolioError::Validation(format!(
                "unknown grayscale method '{other}' (expected luminosity, average or desaturate)"
            ))),
        }
    }
}

/// Multiply-and-clamp contrast around mid-grey. `factor` 1.0 is the identity.
pub fn contrast(factor: f32) -> impl Fn([u8; 4]) -> [u8; 4] {
    move |[r, g, b, a]| {
        let adjust = |channel: u8| -> u8 {
            let value = factor * (channel as f32 - 128.0) + 128.0;
            value.round().clamp(0.0, 255.0) as u8
        };
        [adjust(r), adjust(g), adjust(b), a]
    }
}

/// Soft-proof a pixel through naive CMYK separation: convert to CMYK, cap the
/// total ink coverage at `ink_limit` (1.0 = 100%, typical presses use 3.0),
/// and convert back to RGB.
pub fn cmyk_proof(ink_limit: f32) -> impl Fn([u8; 4]) -> [u8; 4] {
    move |[r, g, b, a]| {
        let (mut c, mut m, mut y, k) = rgb_to_cmyk(r, g, b);
        let chroma = c + m + y;
        let allowed = (ink_limit - k).max(0.0);
        if chroma > allowed && chroma > 0.0 {
            let scale = allowed / chroma;
            c *= scale;
            m *= scale;
            y *= scale;
        }
        let [r, g, b] = cmyk_to_rgb(c, m, y, k);
        [r, g, b, a]
    }
}

pub fn rgb_to_cmyk(r: u8, g: u8, b: u8) -> (f32, f32, f32, f32) {
    let (r, g, b) = (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let k = 1.0 - r.max(g).max(b);
    if k >= 1.0 {
        return (0.0, 0.0, 0.0, 1.0);
    }
    let white = 1.0 - k;
    ((white - r) / white, (white - g) / white, (white - b) / white, k)
}

pub fn cmyk_to_rgb(c: f32, m: f32, y: f32, k: f32) -> [u8; 3] {
    let channel = |ink: f32| -> u8 {
        (255.0 * (1.0 - ink.clamp(0.0, 1.0)) * (1.0 - k.clamp(0.0, 1.0))).round() as u8
    };
    [channel(c), channel(m), channel(y)]
}
