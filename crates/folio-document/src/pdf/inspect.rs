// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Read-only inspection: font and image inventories, image extraction, text.

use std::collections::HashMap;

use folio_core::error::{FolioError, Result};
use image::{ImageFormat, Rgba, RgbaImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;
use tracing::{debug, warn};

use super::handle::PdfDocumentHandle;
use super::metadata::DocumentMetadata;
use super::{PageInfo, number, resolve};
use crate::raster::transform::cmyk_to_rgb;
use crate::raster::{RasterFormat, Surface};

/// How deep to follow form XObjects when collecting resources.
const MAX_FORM_DEPTH: usize = 4;

/// One font referenced by the document.
#[derive(Debug, Clone, Serialize)]
pub struct FontInfo {
    pub name: String,
    pub subtype: String,
    pub embedded: bool,
    /// Subset fonts carry a six-uppercase-letter `ABCDEF+` name prefix.
    pub subset: bool,
    /// 1-based page numbers the font is used on.
    pub pages: Vec<usize>,
    #[serde(skip)]
    pub program: Option<FontProgram>,
}

/// An embedded font file.
#[derive(Debug, Clone)]
pub struct FontProgram {
    pub data: Vec<u8>,
    pub mime_type: &'static str,
    pub extension: &'static str,
}

/// One image XObject placement on a page.
#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    pub page: usize,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    pub color_space: String,
    pub filter: Option<String>,
    #[serde(skip)]
    pub(super) id: ObjectId,
}

/// Image bytes recovered from the document.
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    pub data: Vec<u8>,
    pub extension: &'static str,
    pub mime_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub page_count: usize,
    pub version: String,
    pub metadata: DocumentMetadata,
    pub pages: Vec<PageInfo>,
    pub font_count: usize,
    pub image_count: usize,
    pub annotation_count: usize,
}

#[derive(Hash, PartialEq, Eq)]
enum ResourceKey {
    Object(ObjectId),
    Inline(usize, Vec<u8>),
}

impl PdfDocumentHandle {
    /// Fonts referenced from page resources, in first-use order.
    pub fn fonts(&self) -> Vec<FontInfo> {
        let mut fonts = Vec::new();
        let mut seen = HashMap::new();
        for (index, resources) in self.page_resources() {
            self.collect_fonts(resources, index + 1, 0, &mut fonts, &mut seen);
        }
        debug!(fonts = fonts.len(), "Font inventory built");
        fonts
    }

    fn collect_fonts(
        &self,
        resources: &Dictionary,
        page: usize,
        depth: usize,
        fonts: &mut Vec<FontInfo>,
        seen: &mut HashMap<ResourceKey, usize>,
    ) {
        if let Some(entries) = sub_dict(&self.doc, resources, b"Font") {
            for (name, value) in entries.iter() {
                let key = match value {
                    Object::Reference(id) => ResourceKey::Object(*id),
                    _ => ResourceKey::Inline(page, name.clone()),
                };
                if let Some(&slot) = seen.get(&key) {
                    let font: &mut FontInfo = &mut fonts[slot];
                    if !font.pages.contains(&page) {
                        font.pages.push(page);
                    }
                    continue;
                }
                if let Ok(dict) = resolve(&self.doc, value).as_dict() {
                    fonts.push(describe_font(&self.doc, dict, page));
                    seen.insert(key, fonts.len() - 1);
                }
            }
        }
        if depth < MAX_FORM_DEPTH {
            for form in form_resources(&self.doc, resources) {
                self.collect_fonts(form, page, depth + 1, fonts, seen);
            }
        }
    }

    /// Image XObjects placed on each page (an image shared between pages is
    /// listed once per page).
    pub fn images(&self) -> Vec<ImageInfo> {
        let mut images = Vec::new();
        for (index, resources) in self.page_resources() {
            let mut seen = Vec::new();
            self.collect_images(resources, index + 1, 0, &mut images, &mut seen);
        }
        images
    }

    fn collect_images(
        &self,
        resources: &Dictionary,
        page: usize,
        depth: usize,
        images: &mut Vec<ImageInfo>,
        seen: &mut Vec<ObjectId>,
    ) {
        let Some(entries) = sub_dict(&self.doc, resources, b"XObject") else {
            return;
        };
        for (name, value) in entries.iter() {
            let Object::Reference(id) = value else {
                continue;
            };
            let Ok(stream) = self.doc.get_object(*id).and_then(Object::as_stream) else {
                continue;
            };
            match name_of(&stream.dict, b"Subtype").as_deref() {
                Some("Image") if !seen.contains(id) => {
                    seen.push(*id);
                    images.push(ImageInfo {
                        page,
                        name: String::from_utf8_lossy(name).into_owned(),
                        width: int_of(&self.doc, &stream.dict, b"Width") as u32,
                        height: int_of(&self.doc, &stream.dict, b"Height") as u32,
                        bits_per_component: int_of(&self.doc, &stream.dict, b"BitsPerComponent")
                            as u8,
                        color_space: color_space_label(&self.doc, &stream.dict),
                        filter: filters(&stream.dict).pop(),
                        id: *id,
                    });
                }
                Some("Form") if depth < MAX_FORM_DEPTH => {
                    if let Some(form) = sub_dict(&self.doc, &stream.dict, b"Resources") {
                        self.collect_images(form, page, depth + 1, images, seen);
                    }
                }
                _ => {}
            }
        }
    }

    /// Recover an image: JPEG and JPEG 2000 data is returned untouched,
    /// everything else is decoded and re-encoded as PNG.
    pub fn extract_image(&self, image: &ImageInfo) -> Result<ExtractedImage> {
        let stream = self
            .doc
            .get_object(image.id)
            .and_then(Object::as_stream)
            .map_err(|err| FolioError::Pdf(format!("image {} is unreadable: {err}", image.name)))?;
        match image.filter.as_deref() {
            Some("DCTDecode") => Ok(ExtractedImage {
                data: stream.content.clone(),
                extension: "jpg",
                mime_type: "image/jpeg",
            }),
            Some("JPXDecode") => Ok(ExtractedImage {
                data: stream.content.clone(),
                extension: "jp2",
                mime_type: "image/jp2",
            }),
            _ => {
                let pixels = decode_image_xobject(&self.doc, stream)?;
                let data = Surface::from_rgba(pixels).encode(RasterFormat::Png, 1.0)?;
                Ok(ExtractedImage {
                    data,
                    extension: "png",
                    mime_type: RasterFormat::Png.mime_type(),
                })
            }
        }
    }

    /// Extracted text of one page. Pages whose fonts defeat extraction yield
    /// an empty string.
    pub fn page_text(&self, index: usize) -> Result<String> {
        self.page_id(index)?;
        match self.doc.extract_text(&[(index + 1) as u32]) {
            Ok(text) => Ok(text),
            Err(err) => {
                warn!(page = index + 1, %err, "Text extraction failed");
                Ok(String::new())
            }
        }
    }

    /// Text of every page, in page order.
    pub fn text(&self) -> Result<Vec<String>> {
        (0..self.page_count()).map(|index| self.page_text(index)).collect()
    }

    pub fn summary(&self) -> Result<DocumentSummary> {
        let pages = (0..self.page_count())
            .map(|index| self.page_info(index))
            .collect::<Result<Vec<_>>>()?;
        let annotation_count = self
            .page_ids()
            .iter()
            .filter_map(|id| self.doc.get_dictionary(*id).ok())
            .filter_map(|page| page.get(b"Annots").ok())
            .filter_map(|annots| resolve(&self.doc, annots).as_array().ok())
            .map(Vec::len)
            .sum();
        Ok(DocumentSummary {
            page_count: self.page_count(),
            version: self.version().to_owned(),
            metadata: self.metadata(),
            pages,
            font_count: self.fonts().len(),
            image_count: self.images().len(),
            annotation_count,
        })
    }

    fn page_resources(&self) -> Vec<(usize, &Dictionary)> {
        self.page_ids()
            .iter()
            .enumerate()
            .filter_map(|(index, id)| {
                let page = self.doc.get_dictionary(*id).ok()?;
                let resources = resolve(&self.doc, page.get(b"Resources").ok()?).as_dict().ok()?;
                Some((index, resources))
            })
            .collect()
    }
}

fn describe_font(doc: &Document, font: &Dictionary, page: usize) -> FontInfo {
    let name = name_of(font, b"BaseFont").unwrap_or_else(|| "(unnamed)".to_owned());
    let subtype = name_of(font, b"Subtype").unwrap_or_default();

    let descriptor_owner = if subtype == "Type0" {
        font.get(b"DescendantFonts")
            .ok()
            .and_then(|value| resolve(doc, value).as_array().ok())
            .and_then(|fonts| fonts.first())
            .and_then(|first| resolve(doc, first).as_dict().ok())
            .unwrap_or(font)
    } else {
        font
    };
    let program = descriptor_owner
        .get(b"FontDescriptor")
        .ok()
        .and_then(|value| resolve(doc, value).as_dict().ok())
        .and_then(|descriptor| font_program(doc, descriptor));

    FontInfo {
        subset: is_subset_name(&name),
        embedded: program.is_some() || subtype == "Type3",
        name,
        subtype,
        pages: vec![page],
        program,
    }
}

fn font_program(doc: &Document, descriptor: &Dictionary) -> Option<FontProgram> {
    let candidates: [(&[u8], &str, &str); 2] = [
        (b"FontFile2", "font/ttf", "ttf"),
        (b"FontFile", "application/x-font-type1", "pfb"),
    ];
    for (key, mime_type, extension) in candidates {
        if let Some(stream) = stream_at(doc, descriptor, key) {
            return Some(FontProgram {
                data: stream_bytes(stream).ok()?,
                mime_type,
                extension,
            });
        }
    }
    let stream = stream_at(doc, descriptor, b"FontFile3")?;
    let (mime_type, extension) = match name_of(&stream.dict, b"Subtype").as_deref() {
        Some("OpenType") => ("font/otf", "otf"),
        _ => ("application/x-font-type1", "cff"),
    };
    Some(FontProgram {
        data: stream_bytes(stream).ok()?,
        mime_type,
        extension,
    })
}

pub(crate) fn is_subset_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() > 7 && bytes[6] == b'+' && bytes[..6].iter().all(u8::is_ascii_uppercase)
}

/// Decode an image XObject to RGBA. Handles DCT, Flate/LZW/uncompressed
/// samples at 8 bits (1 bit for grey), Gray/RGB/CMYK/ICC/Indexed colour and
/// an optional soft mask.
pub(crate) fn decode_image_xobject(doc: &Document, stream: &Stream) -> Result<RgbaImage> {
    let dict = &stream.dict;
    let width = int_of(doc, dict, b"Width").max(0) as u32;
    let height = int_of(doc, dict, b"Height").max(0) as u32;
    if width == 0 || height == 0 {
        return Err(FolioError::Image("image XObject has no size".into()));
    }

    let mut image = if filters(dict).last().is_some_and(|f| f == "DCTDecode") {
        image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
            .map_err(|err| FolioError::Image(format!("embedded JPEG is unreadable: {err}")))?
            .to_rgba8()
    } else {
        let samples = stream_bytes(stream)?;
        let bits = match int_of(doc, dict, b"BitsPerComponent") {
            0 => 8,
            bits => bits as u8,
        };
        let model = if dict.get(b"ImageMask").is_ok_and(|v| matches!(v, Object::Boolean(true))) {
            ColorModel::Gray
        } else {
            color_model(doc, dict.get(b"ColorSpace").ok())?
        };
        unpack_samples(&samples, width, height, bits, &model)?
    };

    if let Some(mask) = stream_at(doc, dict, b"SMask") {
        let alpha = decode_image_xobject(doc, mask)?;
        if alpha.dimensions() == image.dimensions() {
            for (pixel, alpha) in image.pixels_mut().zip(alpha.pixels()) {
                pixel.0[3] = alpha.0[0];
            }
        }
    }
    Ok(image)
}

enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
    Indexed(Vec<[u8; 3]>),
}

fn color_model(doc: &Document, value: Option<&Object>) -> Result<ColorModel> {
    let Some(value) = value else {
        return Ok(ColorModel::Gray);
    };
    match resolve(doc, value) {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Ok(ColorModel::Gray),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(ColorModel::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(ColorModel::Cmyk),
            other => Err(FolioError::Image(format!(
                "colour space {} is not supported",
                String::from_utf8_lossy(other)
            ))),
        },
        Object::Array(items) => match items.first().and_then(|first| first.as_name().ok()) {
            Some(b"ICCBased") => {
                let components = items
                    .get(1)
                    .and_then(|profile| resolve(doc, profile).as_stream().ok())
                    .map(|profile| int_of(doc, &profile.dict, b"N"))
                    .unwrap_or(3);
                Ok(match components {
                    1 => ColorModel::Gray,
                    4 => ColorModel::Cmyk,
                    _ => ColorModel::Rgb,
                })
            }
            Some(b"CalGray") => Ok(ColorModel::Gray),
            Some(b"CalRGB") | Some(b"Lab") => Ok(ColorModel::Rgb),
            Some(b"Indexed") | Some(b"I") => indexed_palette(doc, items),
            _ => Err(FolioError::Image("unsupported colour space array".into())),
        },
        _ => Err(FolioError::Image("malformed colour space".into())),
    }
}

fn indexed_palette(doc: &Document, items: &[Object]) -> Result<ColorModel> {
    let base = color_model(doc, items.get(1))?;
    let lookup = match items.get(3).map(|value| resolve(doc, value)) {
        Some(Object::String(bytes, _)) => bytes.clone(),
        Some(Object::Stream(stream)) => stream_bytes(stream)?,
        _ => return Err(FolioError::Image("indexed colour space has no palette".into())),
    };
    let palette = match base {
        ColorModel::Gray => lookup.iter().map(|&v| [v, v, v]).collect(),
        ColorModel::Rgb => lookup.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect(),
        ColorModel::Cmyk => lookup
            .chunks_exact(4)
            .map(|c| cmyk_to_rgb(unit(c[0]), unit(c[1]), unit(c[2]), unit(c[3])))
            .collect(),
        ColorModel::Indexed(_) => {
            return Err(FolioError::Image("nested indexed colour space".into()));
        }
    };
    Ok(ColorModel::Indexed(palette))
}

fn unpack_samples(
    samples: &[u8],
    width: u32,
    height: u32,
    bits: u8,
    model: &ColorModel,
) -> Result<RgbaImage> {
    let (w, h) = (width as usize, height as usize);
    let components = match model {
        ColorModel::Gray | ColorModel::Indexed(_) => 1,
        ColorModel::Rgb => 3,
        ColorModel::Cmyk => 4,
    };
    let row_bytes = match bits {
        8 => w * components,
        1 if components == 1 => w.div_ceil(8),
        _ => {
            return Err(FolioError::Image(format!(
                "{bits}-bit samples are not supported"
            )));
        }
    };
    if samples.len() < row_bytes * h {
        return Err(FolioError::Image(format!(
            "image data is truncated ({} of {} bytes)",
            samples.len(),
            row_bytes * h
        )));
    }

    let mut image = RgbaImage::new(width, height);
    for (y, row) in samples.chunks_exact(row_bytes).take(h).enumerate() {
        for x in 0..w {
            let rgb = match (bits, model) {
                (1, _) => {
                    let on = row[x / 8] & (0x80 >> (x % 8)) != 0;
                    let level = if on { 255 } else { 0 };
                    [level, level, level]
                }
                (_, ColorModel::Gray) => [row[x]; 3],
                (_, ColorModel::Rgb) => [row[3 * x], row[3 * x + 1], row[3 * x + 2]],
                (_, ColorModel::Cmyk) => {
                    let c = &row[4 * x..4 * x + 4];
                    cmyk_to_rgb(unit(c[0]), unit(c[1]), unit(c[2]), unit(c[3]))
                }
                (_, ColorModel::Indexed(palette)) => {
                    palette.get(row[x] as usize).copied().unwrap_or([0, 0, 0])
                }
            };
            image.put_pixel(x as u32, y as u32, Rgba([rgb[0], rgb[1], rgb[2], 255]));
        }
    }
    Ok(image)
}

fn unit(byte: u8) -> f32 {
    byte as f32 / 255.0
}

/// Stream payload with filters removed; unfiltered streams are returned as-is.
pub(crate) fn stream_bytes(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        stream
            .decompressed_content()
            .map_err(|err| FolioError::Pdf(format!("stream cannot be decoded: {err}")))
    } else {
        Ok(stream.content.clone())
    }
}

pub(crate) fn filters(dict: &Dictionary) -> Vec<String> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![String::from_utf8_lossy(name).into_owned()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok())
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .collect(),
        _ => Vec::new(),
    }
}

fn color_space_label(doc: &Document, dict: &Dictionary) -> String {
    match dict.get(b"ColorSpace").map(|value| resolve(doc, value)) {
        Ok(Object::Name(name)) => String::from_utf8_lossy(name).into_owned(),
        Ok(Object::Array(items)) => items
            .first()
            .and_then(|first| first.as_name().ok())
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn name_of(dict: &Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .and_then(Object::as_name)
        .ok()
        .map(|name| String::from_utf8_lossy(name).into_owned())
}

fn int_of(doc: &Document, dict: &Dictionary, key: &[u8]) -> i64 {
    dict.get(key)
        .ok()
        .and_then(|value| number(resolve(doc, value)))
        .map_or(0, |value| value as i64)
}

fn sub_dict<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    dict.get(key)
        .ok()
        .and_then(|value| resolve(doc, value).as_dict().ok())
}

fn stream_at<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Stream> {
    dict.get(key)
        .ok()
        .and_then(|value| resolve(doc, value).as_stream().ok())
}

/// Resource dictionaries of the form XObjects in `resources`.
fn form_resources<'a>(doc: &'a Document, resources: &'a Dictionary) -> Vec<&'a Dictionary> {
    let Some(entries) = sub_dict(doc, resources, b"XObject") else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|(_, value)| resolve(doc, value).as_stream().ok())
        .filter(|stream| name_of(&stream.dict, b"Subtype").as_deref() == Some("Form"))
        .filter_map(|stream| sub_dict(doc, &stream.dict, b"Resources"))
        .collect()
}
