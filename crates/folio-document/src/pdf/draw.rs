// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Drawing primitives and resource embedding.
//
// The first draw on a page wraps its original content streams in q..Q; every
// later draw call appends one more q..Q stream, so primitives stack in
// painter's order and never inherit graphics state from the page.

use std::io::Cursor;

use folio_core::error::{FolioError, Result};
use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, ImageDecoder, ImageFormat, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::debug;

use super::clone::ObjectCloner;
use super::fonts::{StandardFont, encode_win_ansi};
use super::handle::PdfDocumentHandle;
use super::{Rect, Rgb, pdf_err, resolve};

/// Bezier control distance for a quarter circle of radius 1.
const KAPPA: f32 = 0.552_284_8;

/// A standard font embedded in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontRef {
    pub(super) id: ObjectId,
    pub font: StandardFont,
}

impl FontRef {
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        self.font.text_width(text, size)
    }
}

/// An image XObject embedded in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRef {
    pub(super) id: ObjectId,
    pub width: u32,
    pub height: u32,
}

/// Another document's page embedded as a form XObject. `width` and
/// `height` are the page's displayed size, after rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRef {
    pub(super) id: ObjectId,
    pub width: f32,
    pub height: f32,
}

/// Where an image or embedded page lands on a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub opacity: f32,
}

impl Placement {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            opacity: 1.0,
        }
    }

    pub fn covering(rect: Rect) -> Self {
        Self::new(rect.x, rect.y, rect.width, rect.height)
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }
}

/// A single line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Baseline origin.
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub font: FontRef,
    pub color: Rgb,
    pub opacity: f32,
    /// Counter-clockwise, in degrees, about the origin.
    pub rotation: f32,
    /// Render mode 3: selectable and searchable but not painted.
    pub invisible: bool,
}

impl TextRun {
    pub fn new(text: impl Into<String>, x: f32, y: f32, size: f32, font: FontRef) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            size,
            font,
            color: Rgb::BLACK,
            opacity: 1.0,
            rotation: 0.0,
            invisible: false,
        }
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn invisible(mut self) -> Self {
        self.invisible = true;
        self
    }
}

/// Fill and stroke settings for shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeStyle {
    pub fill: Option<Rgb>,
    pub stroke: Option<Rgb>,
    pub line_width: f32,
    pub opacity: f32,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: Some(Rgb::BLACK),
            line_width: 1.0,
            opacity: 1.0,
        }
    }
}

impl ShapeStyle {
    pub fn filled(color: Rgb) -> Self {
        Self {
            fill: Some(color),
            stroke: None,
            ..Self::default()
        }
    }

    pub fn stroked(color: Rgb, line_width: f32) -> Self {
        Self {
            stroke: Some(color),
            line_width,
            ..Self::default()
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    fn paint_operator(&self) -> &'static str {
        match (self.fill.is_some(), self.stroke.is_some()) {
            (true, true) => "B",
            (true, false) => "f",
            (false, true) => "S",
            (false, false) => "n",
        }
    }

    fn setup(&self) -> Vec<Operation> {
        let mut ops = Vec::new();
        if let Some(fill) = self.fill {
            ops.push(Operation::new("rg", fill.operands()));
        }
        if let Some(stroke) = self.stroke {
            ops.push(Operation::new("RG", stroke.operands()));
            ops.push(Operation::new("w", reals(&[self.line_width])));
        }
        ops
    }
}

impl PdfDocumentHandle {
    // -- Embedding ------------------------------------------------------------

    /// Embed one of the standard 14 fonts. Repeated calls return the same
    /// font object.
    pub fn embed_font(&mut self, font: StandardFont) -> Result<FontRef> {
        if let Some(id) = self.fonts.get(&font) {
            return Ok(FontRef { id: *id, font });
        }
        let mut dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
        };
        if font.uses_win_ansi() {
            dict.set("Encoding", "WinAnsiEncoding");
        }
        let id = self.doc.add_object(dict);
        self.fonts.insert(font, id);
        Ok(FontRef { id, font })
    }

    /// Embed an encoded image. Baseline grey or RGB JPEGs are stored as-is
    /// (DCTDecode); everything else is decoded, stored as Flate RGB and given
    /// an SMask when it has transparency.
    pub fn embed_image(&mut self, bytes: &[u8]) -> Result<ImageRef> {
        let format = image::guess_format(bytes)
            .map_err(|err| FolioError::Image(format!("unrecognised image data: {err}")))?;
        if format == ImageFormat::Jpeg
            && let Some(image_ref) = self.embed_jpeg(bytes)?
        {
            return Ok(image_ref);
        }
        let decoded = image::load_from_memory(bytes)
            .map_err(|err| FolioError::Image(format!("failed to decode image: {err}")))?;
        self.embed_rgba(&decoded.to_rgba8())
    }

    fn embed_jpeg(&mut self, bytes: &[u8]) -> Result<Option<ImageRef>> {
        if jpeg_component_count(bytes) == Some(4) {
            return Ok(None);
        }
        let decoder = JpegDecoder::new(Cursor::new(bytes))
            .map_err(|err| FolioError::Image(format!("invalid JPEG: {err}")))?;
        let (width, height) = decoder.dimensions();
        let color_space = match decoder.color_type() {
            ColorType::L8 => "DeviceGray",
            ColorType::Rgb8 => "DeviceRGB",
            _ => return Ok(None),
        };
        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => color_space,
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            bytes.to_vec(),
        );
        stream.allows_compression = false;
        let id = self.doc.add_object(stream);
        debug!(width, height, color_space, "JPEG embedded without re-encoding");
        Ok(Some(ImageRef { id, width, height }))
    }

    /// Embed decoded pixels.
    pub fn embed_rgba(&mut self, image: &RgbaImage) -> Result<ImageRef> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(FolioError::Image("image has no pixels".into()));
        }
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in image.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        let mut dict = image_dict(width, height, "DeviceRGB");
        if alpha.iter().any(|&a| a != u8::MAX) {
            let mut mask = Stream::new(image_dict(width, height, "DeviceGray"), alpha);
            mask.compress()
                .map_err(|err| pdf_err("soft mask compression", err))?;
            dict.set("SMask", self.doc.add_object(mask));
        }
        let mut stream = Stream::new(dict, rgb);
        stream
            .compress()
            .map_err(|err| pdf_err("image compression", err))?;
        let id = self.doc.add_object(stream);
        Ok(ImageRef { id, width, height })
    }

    /// Embed page `index` of `source` as a form XObject whose origin is the
    /// bottom-left corner of the page as displayed.
    pub fn embed_page(&mut self, source: &PdfDocumentHandle, index: usize) -> Result<PageRef> {
        let info = source.page_info(index)?;
        let page_id = source.page_id(index)?;
        let content = source
            .doc
            .get_page_content(page_id)
            .map_err(|err| pdf_err(&format!("page {} content", index + 1), err))?;
        let page = source.page_dict(index)?;

        let mut cloner = ObjectCloner::new(&source.doc, false);
        let resources = match page.get(b"Resources") {
            Ok(value) => cloner.clone_object(&mut self.doc, value)?,
            Err(_) => Object::Dictionary(Dictionary::new()),
        };

        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => info.crop_box.to_object(),
                "Matrix" => reals(&form_matrix(info.rotation, info.crop_box)),
                "Resources" => resources,
            },
            content,
        );
        stream
            .compress()
            .map_err(|err| pdf_err("form compression", err))?;
        let id = self.doc.add_object(stream);
        let (width, height) = info.display_size();
        Ok(PageRef { id, width, height })
    }

    // -- Primitives -----------------------------------------------------------

    pub fn draw_text(&mut self, index: usize, run: &TextRun) -> Result<()> {
        let name = format!("FoF{}", run.font.id.0);
        self.register_resource(index, "Font", &name, run.font.id)?;

        let mut ops = self.opacity_ops(index, run.opacity)?;
        let (sin, cos) = run.rotation.to_radians().sin_cos();
        let encoded = if run.font.font.uses_win_ansi() {
            encode_win_ansi(&run.text).0
        } else {
            run.text.bytes().collect()
        };
        ops.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(name.into_bytes()), Object::Real(run.size)],
            ),
            Operation::new("rg", run.color.operands()),
            Operation::new("Tr", vec![Object::Integer(if run.invisible { 3 } else { 0 })]),
            Operation::new("Tm", reals(&[cos, sin, -sin, cos, run.x, run.y])),
            Operation::new("Tj", vec![Object::String(encoded, StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ]);
        self.append_content(index, ops)
    }

    pub fn draw_rectangle(&mut self, index: usize, rect: Rect, style: &ShapeStyle) -> Result<()> {
        let mut ops = self.opacity_ops(index, style.opacity)?;
        ops.extend(style.setup());
        ops.push(Operation::new(
            "re",
            reals(&[rect.x, rect.y, rect.width, rect.height]),
        ));
        ops.push(Operation::new(style.paint_operator(), vec![]));
        self.append_content(index, ops)
    }

    /// Ellipse centred on `(cx, cy)` from four Bezier quarter arcs.
    pub fn draw_ellipse(
        &mut self,
        index: usize,
        (cx, cy): (f32, f32),
        (rx, ry): (f32, f32),
        style: &ShapeStyle,
    ) -> Result<()> {
        let (kx, ky) = (KAPPA * rx, KAPPA * ry);
        let mut ops = self.opacity_ops(index, style.opacity)?;
        ops.extend(style.setup());
        ops.extend([
            Operation::new("m", reals(&[cx + rx, cy])),
            Operation::new("c", reals(&[cx + rx, cy + ky, cx + kx, cy + ry, cx, cy + ry])),
            Operation::new("c", reals(&[cx - kx, cy + ry, cx - rx, cy + ky, cx - rx, cy])),
            Operation::new("c", reals(&[cx - rx, cy - ky, cx - kx, cy - ry, cx, cy - ry])),
            Operation::new("c", reals(&[cx + kx, cy - ry, cx + rx, cy - ky, cx + rx, cy])),
            Operation::new("h", vec![]),
            Operation::new(style.paint_operator(), vec![]),
        ]);
        self.append_content(index, ops)
    }

    pub fn draw_line(
        &mut self,
        index: usize,
        from: (f32, f32),
        to: (f32, f32),
        style: &ShapeStyle,
    ) -> Result<()> {
        let style = ShapeStyle {
            fill: None,
            stroke: style.stroke.or(Some(Rgb::BLACK)),
            ..*style
        };
        let mut ops = self.opacity_ops(index, style.opacity)?;
        ops.extend(style.setup());
        ops.extend([
            Operation::new("m", reals(&[from.0, from.1])),
            Operation::new("l", reals(&[to.0, to.1])),
            Operation::new("S", vec![]),
        ]);
        self.append_content(index, ops)
    }

    pub fn draw_image(&mut self, index: usize, image: &ImageRef, at: &Placement) -> Result<()> {
        let name = format!("FoIm{}", image.id.0);
        self.register_resource(index, "XObject", &name, image.id)?;
        let mut ops = self.opacity_ops(index, at.opacity)?;
        ops.extend([
            Operation::new("cm", reals(&[at.width, 0.0, 0.0, at.height, at.x, at.y])),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
        ]);
        self.append_content(index, ops)
    }

    /// Draw an embedded page scaled into `at`.
    pub fn draw_page(&mut self, index: usize, page: &PageRef, at: &Placement) -> Result<()> {
        let name = format!("FoPg{}", page.id.0);
        self.register_resource(index, "XObject", &name, page.id)?;
        let (sx, sy) = (at.width / page.width, at.height / page.height);
        let mut ops = self.opacity_ops(index, at.opacity)?;
        ops.extend([
            Operation::new("cm", reals(&[sx, 0.0, 0.0, sy, at.x, at.y])),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
        ]);
        self.append_content(index, ops)
    }

    // -- Internals ------------------------------------------------------------

    fn opacity_ops(&mut self, index: usize, opacity: f32) -> Result<Vec<Operation>> {
        let permille = (opacity.clamp(0.0, 1.0) * 1000.0).round() as u16;
        if permille >= 1000 {
            return Ok(Vec::new());
        }
        let id = match self.opacity_states.get(&permille) {
            Some(id) => *id,
            None => {
                let alpha = permille as f32 / 1000.0;
                let id = self.doc.add_object(dictionary! {
                    "Type" => "ExtGState",
                    "ca" => Object::Real(alpha),
                    "CA" => Object::Real(alpha),
                });
                self.opacity_states.insert(permille, id);
                id
            }
        };
        let name = format!("FoGS{permille}");
        self.register_resource(index, "ExtGState", &name, id)?;
        Ok(vec![Operation::new("gs", vec![Object::Name(name.into_bytes())])])
    }

    /// Add `name -> target` to the page's resource `category`, inlining
    /// shared resource dictionaries first so other pages are unaffected.
    pub(super) fn register_resource(
        &mut self,
        index: usize,
        category: &str,
        name: &str,
        target: ObjectId,
    ) -> Result<()> {
        let page = self.page_dict(index)?;
        let mut resources = page
            .get(b"Resources")
            .ok()
            .and_then(|value| owned_dict(&self.doc, value))
            .unwrap_or_else(Dictionary::new);
        let mut entries = resources
            .get(category.as_bytes())
            .ok()
            .and_then(|value| owned_dict(&self.doc, value))
            .unwrap_or_else(Dictionary::new);
        entries.set(name, Object::Reference(target));
        resources.set(category, Object::Dictionary(entries));
        self.page_dict_mut(index)?
            .set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    pub(super) fn append_content(&mut self, index: usize, operations: Vec<Operation>) -> Result<()> {
        let page_id = self.page_id(index)?;
        if self.isolated.insert(page_id) {
            self.isolate_content(index)?;
        }

        let mut wrapped = Vec::with_capacity(operations.len() + 2);
        wrapped.push(Operation::new("q", vec![]));
        wrapped.extend(operations);
        wrapped.push(Operation::new("Q", vec![]));
        let bytes = Content { operations: wrapped }
            .encode()
            .map_err(|err| pdf_err("content encoding", err))?;
        let stream_id = self.doc.add_object(Stream::new(Dictionary::new(), bytes));

        let page = self.page_dict_mut(index)?;
        if let Ok(Object::Array(items)) = page.get_mut(b"Contents") {
            items.push(Object::Reference(stream_id));
        } else {
            page.set("Contents", Object::Array(vec![Object::Reference(stream_id)]));
        }
        Ok(())
    }

    /// Replace /Contents with `[q, original..., Q]` as a fresh array.
    fn isolate_content(&mut self, index: usize) -> Result<()> {
        let page = self.page_dict(index)?;
        let existing = match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                Ok(Object::Array(items)) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        let contents = if existing.is_empty() {
            Vec::new()
        } else {
            let open = self.doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            let close = self.doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
            let mut contents = Vec::with_capacity(existing.len() + 2);
            contents.push(Object::Reference(open));
            contents.extend(existing);
            contents.push(Object::Reference(close));
            contents
        };
        self.page_dict_mut(index)?
            .set("Contents", Object::Array(contents));
        Ok(())
    }
}

/// Form matrix that maps a rotated page's crop box onto `[0 0 w h]` as the
/// page is displayed.
pub(crate) fn form_matrix(rotation: i32, bbox: Rect) -> [f32; 6] {
    let (x0, y0) = (bbox.x, bbox.y);
    let (x1, y1) = (bbox.x + bbox.width, bbox.y + bbox.height);
    match rotation {
        90 => [0.0, -1.0, 1.0, 0.0, -y0, x1],
        180 => [-1.0, 0.0, 0.0, -1.0, x1, y1],
        270 => [0.0, 1.0, -1.0, 0.0, y1, -x0],
        _ => [1.0, 0.0, 0.0, 1.0, -x0, -y0],
    }
}

fn image_dict(width: u32, height: u32, color_space: &str) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
    }
}

fn owned_dict(doc: &Document, value: &Object) -> Option<Dictionary> {
    match resolve(doc, value) {
        Object::Dictionary(dict) => Some(dict.clone()),
        _ => None,
    }
}

fn reals(values: &[f32]) -> Vec<Object> {
    values.iter().map(|value| Object::Real(*value)).collect()
}

/// Component count from the first SOF marker of a JPEG stream.
fn jpeg_component_count(bytes: &[u8]) -> Option<u8> {
    let mut pos = 2;
    while pos + 9 < bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        let length = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        if matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF) {
            return Some(bytes[pos + 9]);
        }
        pos += 2 + length;
    }
    None
}
