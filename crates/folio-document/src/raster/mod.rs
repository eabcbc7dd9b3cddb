// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster bridge: page surfaces, per-pixel transforms, deskew and encoding.

pub mod deskew;
pub mod pdfium;
pub mod renderer;
pub mod transform;

use std::io::Cursor;

use folio_core::error::{FolioError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tracing::debug;

pub use deskew::{deskew, estimate_skew};
pub use pdfium::PdfiumRenderer;
pub use renderer::{ContentRenderer, PageRenderer};
pub use transform::{GrayscaleMethod, cmyk_proof, contrast};

/// Output encodings for a rendered surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Jpeg,
    Png,
    Bmp,
    Tiff,
}

impl RasterFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        }
    }

    /// Lossless PNG when the surface carries transparency, JPEG otherwise.
    pub fn preferred_for(surface: &Surface) -> Self {
        if surface.has_alpha() { Self::Png } else { Self::Jpeg }
    }
}

/// An in-memory RGBA pixel buffer produced by rendering a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    image: RgbaImage,
}

impl Surface {
    /// Opaque white surface of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])),
        }
    }

    pub fn from_rgba(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            image: image.to_rgba8(),
        }
    }

    /// Decode an encoded image (JPEG, PNG, ...) into a surface.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|err| FolioError::Image(format!("failed to decode image: {err}")))?;
        Ok(Self::from_dynamic(image))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Raw RGBA bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn as_image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn has_alpha(&self) -> bool {
        self.image.pixels().any(|pixel| pixel.0[3] < 255)
    }

    /// Map every pixel in place through `transform`.
    pub fn apply_pixel_transform(&mut self, mut transform: impl FnMut([u8; 4]) -> [u8; 4]) {
        for pixel in self.image.pixels_mut() {
            pixel.0 = transform(pixel.0);
        }
    }

    /// Encode the surface. `quality` (0.0-1.0) only affects JPEG; alpha is
    /// flattened onto white for formats that cannot carry it.
    pub fn encode(&self, format: RasterFormat, quality: f32) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        match format {
            RasterFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgb8(self.flattened_rgb());
                let quality = (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8;
                let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
                rgb.write_with_encoder(encoder)
                    .map_err(|err| FolioError::Image(format!("JPEG encoding failed: {err}")))?;
            }
            RasterFormat::Png | RasterFormat::Tiff => {
                let image_format = if format == RasterFormat::Png {
                    ImageFormat::Png
                } else {
                    ImageFormat::Tiff
                };
                self.image
                    .write_to(&mut Cursor::new(&mut buffer), image_format)
                    .map_err(|err| FolioError::Image(format!("image encoding failed: {err}")))?;
            }
            RasterFormat::Bmp => {
                DynamicImage::ImageRgb8(self.flattened_rgb())
                    .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Bmp)
                    .map_err(|err| FolioError::Image(format!("BMP encoding failed: {err}")))?;
            }
        }
        debug!(?format, bytes = buffer.len(), "surface encoded");
        Ok(buffer)
    }

    /// RGB copy composited over white.
    pub fn flattened_rgb(&self) -> image::RgbImage {
        image::RgbImage::from_fn(self.width(), self.height(), |x, y| {
            let [r, g, b, a] = self.image.get_pixel(x, y).0;
            let blend = |channel: u8| -> u8 {
                let alpha = a as u32;
                ((channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8
            };
            image::Rgb([blend(r), blend(g), blend(b)])
        })
    }

    /// Stack surfaces vertically, centring narrower ones on white.
    pub fn stack_vertical(surfaces: &[Surface]) -> Result<Self> {
        if surfaces.is_empty() {
            return Err(FolioError::Render("no pages to stack".into()));
        }
        let width = surfaces.iter().map(Surface::width).max().unwrap_or(0);
        let height: u32 = surfaces.iter().map(Surface::height).sum();
        let mut canvas = Self::blank(width, height);
        let mut top = 0i64;
        for surface in surfaces {
            let left = ((width - surface.width()) / 2) as i64;
            image::imageops::overlay(&mut canvas.image, &surface.image, left, top);
            top += surface.height() as i64;
        }
        Ok(canvas)
    }
}
