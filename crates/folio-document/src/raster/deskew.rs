// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Skew estimation by projection-profile variance, and rotation back to level.
//
// Text lines on a level page produce a horizontal projection with sharp peaks
// (lines) and troughs (leading). Shearing the dark pixels by candidate angles
// and keeping the angle with the highest profile variance recovers the skew.

use image::{Rgba, imageops::FilterType};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use tracing::{debug, instrument};

use super::Surface;

/// Largest skew we try to correct, in degrees.
pub const MAX_SKEW_DEGREES: f32 = 5.0;

const STEP_DEGREES: f32 = 0.25;
const ANALYSIS_WIDTH: u32 = 800;
const DARK_THRESHOLD: u8 = 128;

/// Estimate page skew in degrees within `[-5, 5]`. Positive means the content
/// runs downhill to the right. Blank pages report 0.
#[instrument(skip_all, fields(width = surface.width(), height = surface.height()))]
pub fn estimate_skew(surface: &Surface) -> f32 {
    let gray = image::DynamicImage::ImageRgba8(surface.as_image().clone()).to_luma8();
    let gray = if gray.width() > ANALYSIS_WIDTH {
        let height = (gray.height() as u64 * ANALYSIS_WIDTH as u64 / gray.width() as u64).max(1);
        image::imageops::resize(&gray, ANALYSIS_WIDTH, height as u32, FilterType::Triangle)
    } else {
        gray
    };

    let dark: Vec<(f32, f32)> = gray
        .enumerate_pixels()
        .filter(|(_, _, pixel)| pixel.0[0] < DARK_THRESHOLD)
        .map(|(x, y, _)| (x as f32, y as f32))
        .collect();
    if dark.is_empty() {
        return 0.0;
    }

    let offset = gray.width() as f32 * MAX_SKEW_DEGREES.to_radians().tan();
    let bins = (gray.height() as f32 + 2.0 * offset).ceil() as usize + 2;
    let steps = (MAX_SKEW_DEGREES / STEP_DEGREES).round() as i32;

    let mut best_angle = 0.0f32;
    let mut best_score = f64::MIN;
    let mut profile = vec![0u32; bins];

    for step in -steps..=steps {
        let angle = step as f32 * STEP_DEGREES;
        let slope = angle.to_radians().tan();
        profile.iter_mut().for_each(|count| *count = 0);

        for &(x, y) in &dark {
            let projected = y - x * slope + offset;
            if projected >= 0.0 {
                let bin = projected as usize;
                if bin < bins {
                    profile[bin] += 1;
                }
            }
        }

        let score = variance(&profile);
        // Ties resolve to the smaller correction.
        if score > best_score + 1e-9 || (score >= best_score - 1e-9 && angle.abs() < best_angle.abs()) {
            best_score = score;
            best_angle = angle;
        }
    }

    debug!(best_angle, dark_pixels = dark.len(), "skew estimated");
    best_angle
}

/// Rotate the surface so that the estimated skew is removed. Surfaces that are
/// already level come back untouched.
pub fn deskew(surface: &Surface) -> (Surface, f32) {
    let angle = estimate_skew(surface);
    if angle.abs() < STEP_DEGREES / 2.0 {
        return (surface.clone(), 0.0);
    }
    let rotated = rotate_about_center(
        surface.as_image(),
        -angle.to_radians(),
        Interpolation::Bilinear,
        Rgba([255, 255, 255, 255]),
    );
    (Surface::from_rgba(rotated), angle)
}

fn variance(profile: &[u32]) -> f64 {
    let n = profile.len() as f64;
    let mean = profile.iter().map(|&v| v as f64).sum::<f64>() / n;
    profile
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    /// Horizontal black rules drawn with a slope of `degrees`.
    fn ruled_page(degrees: f32) -> Surface {
        let (width, height) = (400u32, 300u32);
        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        let slope = degrees.to_radians().tan();
        for line in 0..8 {
            let base = 40.0 + line as f32 * 30.0;
            for x in 20..380 {
                let y = base + x as f32 * slope;
                for thickness in 0..3 {
                    let py = y as i64 + thickness;
                    if (0..height as i64).contains(&py) {
                        image.put_pixel(x, py as u32, Rgba([0, 0, 0, 255]));
                    }
                }
            }
        }
        Surface::from_rgba(image)
    }

    #[test]
    fn blank_page_has_no_skew() {
        assert_eq!(estimate_skew(&Surface::blank(100, 100)), 0.0);
    }

    #[test]
    fn level_rules_have_no_skew() {
        assert!(estimate_skew(&ruled_page(0.0)).abs() <= 0.25);
    }

    #[test]
    fn detects_positive_and_negative_skew() {
        assert!((estimate_skew(&ruled_page(3.0)) - 3.0).abs() <= 0.5);
        assert!((estimate_skew(&ruled_page(-2.0)) + 2.0).abs() <= 0.5);
    }

    #[test]
    fn deskew_reduces_measured_skew() {
        let (corrected, applied) = deskew(&ruled_page(3.0));
        assert!(applied > 2.0);
        assert!(estimate_skew(&corrected).abs() < 1.0);
    }

    #[test]
    fn level_page_is_returned_unchanged() {
        let page = ruled_page(0.0);
        let (corrected, applied) = deskew(&page);
        assert_eq!(applied, 0.0);
        assert_eq!(corrected, page);
    }
}
