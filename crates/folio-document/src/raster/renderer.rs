// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rendering.
//
// `PageRenderer` is the seam every raster-based operation goes through.
// Production rendering is `PdfiumRenderer` (see `pdfium.rs`). `ContentRenderer`
// is a small headless interpreter for the graphics-state, colour, path-fill
// and XObject operators. It draws no text, so it serves fixtures and tests
// built from shapes and images.

use std::collections::HashMap;

use folio_core::error::{FolioError, Result};
use image::RgbaImage;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, instrument, warn};

use super::Surface;
use super::transform::cmyk_to_rgb;
use crate::pdf::PdfDocumentHandle;
use crate::pdf::inspect::{decode_image_xobject, stream_bytes};
use crate::pdf::{number, resolve};

/// Upper bound on rendered pixels per page.
const MAX_PIXELS: u64 = 200_000_000;

/// Form XObject nesting limit.
const MAX_DEPTH: usize = 8;

/// Segments per flattened Bezier curve.
const CURVE_STEPS: usize = 12;

/// Renders one page of a document to pixels.
pub trait PageRenderer: Send + Sync {
    /// Render page `page_index` (zero-based) at `scale` pixels per point. The
    /// surface has the page's displayed orientation.
    fn render(&self, doc: &PdfDocumentHandle, page_index: usize, scale: f32) -> Result<Surface>;

    /// Render several pages in the given order. Backends with per-document
    /// setup cost override this to pay it once.
    fn render_pages(
        &self,
        doc: &PdfDocumentHandle,
        pages: &[usize],
        scale: f32,
    ) -> Result<Vec<Surface>> {
        pages
            .iter()
            .map(|&index| self.render(doc, index, scale))
            .collect()
    }
}

/// Headless renderer for the image and filled-path subset of PDF content.
/// Text is not rasterised.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentRenderer;

impl PageRenderer for ContentRenderer {
    #[instrument(skip(self, doc))]
    fn render(&self, doc: &PdfDocumentHandle, page_index: usize, scale: f32) -> Result<Surface> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(FolioError::Render(format!("invalid scale {scale}")));
        }
        let info = doc.page_info(page_index)?;
        let crop = info.crop_box;
        let (display_w, display_h) = info.display_size();
        let width = (display_w * scale).round().max(1.0) as u32;
        let height = (display_h * scale).round().max(1.0) as u32;
        if width as u64 * height as u64 > MAX_PIXELS {
            return Err(FolioError::Render(format!(
                "page {} would be {width}x{height} pixels",
                page_index + 1
            )));
        }

        // User space to unrotated device space (y down), then the page
        // rotation applied in device space.
        let device_w = crop.width * scale;
        let device_h = crop.height * scale;
        let base = [
            scale,
            0.0,
            0.0,
            -scale,
            -crop.x * scale,
            (crop.y + crop.height) * scale,
        ];
        let ctm = multiply(&base, &rotation_matrix(info.rotation, device_w, device_h));

        let document = doc.document();
        let page_id = doc.page_id(page_index)?;
        let content = document.get_page_content(page_id).map_err(|err| {
            FolioError::Render(format!("page {} content: {err}", page_index + 1))
        })?;
        let resources = document
            .get_dictionary(page_id)
            .ok()
            .and_then(|page| page.get(b"Resources").ok())
            .and_then(|value| resolve(document, value).as_dict().ok());

        let mut surface = Surface::blank(width, height);
        let mut painter = Painter {
            doc: document,
            canvas: surface.as_image_mut(),
            images: HashMap::new(),
        };
        painter.run(&content, resources, GraphicsState::new(ctm), 0)?;
        debug!(width, height, "Page rendered");
        Ok(surface)
    }
}

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `a` then `b`, in PDF's row-vector convention.
fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

fn apply(m: &Matrix, x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

fn invert(m: &Matrix) -> Option<Matrix> {
    let det = m[0] * m[3] - m[1] * m[2];
    if det.abs() < f32::EPSILON {
        return None;
    }
    let inv = [m[3] / det, -m[1] / det, -m[2] / det, m[0] / det, 0.0, 0.0];
    let (e, f) = apply(&inv, -m[4], -m[5]);
    Some([inv[0], inv[1], inv[2], inv[3], e, f])
}

/// Clockwise page rotation in a `w` x `h` device space.
fn rotation_matrix(rotation: i32, w: f32, h: f32) -> Matrix {
    match rotation {
        90 => [0.0, 1.0, -1.0, 0.0, h, 0.0],
        180 => [-1.0, 0.0, 0.0, -1.0, w, h],
        270 => [0.0, -1.0, 1.0, 0.0, 0.0, w],
        _ => IDENTITY,
    }
}

#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: Matrix,
    fill: [u8; 3],
    alpha: f32,
}

impl GraphicsState {
    fn new(ctm: Matrix) -> Self {
        Self {
            ctm,
            fill: [0, 0, 0],
            alpha: 1.0,
        }
    }
}

type Polygon = Vec<(f32, f32)>;

struct Painter<'a> {
    doc: &'a Document,
    canvas: &'a mut RgbaImage,
    images: HashMap<ObjectId, Option<RgbaImage>>,
}

impl Painter<'_> {
    fn run(
        &mut self,
        content: &[u8],
        resources: Option<&Dictionary>,
        initial: GraphicsState,
        depth: usize,
    ) -> Result<()> {
        let content = Content::decode(content)
            .map_err(|err| FolioError::Render(format!("content stream does not parse: {err}")))?;
        let mut state = initial;
        let mut saved: Vec<GraphicsState> = Vec::new();
        let mut path: Vec<Polygon> = Vec::new();

        for op in &content.operations {
            let n: Vec<f32> = op.operands.iter().filter_map(number).collect();
            match (op.operator.as_str(), n.len()) {
                ("q", _) => saved.push(state),
                ("Q", _) => {
                    if let Some(previous) = saved.pop() {
                        state = previous;
                    }
                }
                ("cm", 6) => {
                    let m = [n[0], n[1], n[2], n[3], n[4], n[5]];
                    state.ctm = multiply(&m, &state.ctm);
                }
                ("re", 4) => {
                    let (x, y, w, h) = (n[0], n[1], n[2], n[3]);
                    path.push(
                        [(x, y), (x + w, y), (x + w, y + h), (x, y + h)]
                            .iter()
                            .map(|&(px, py)| apply(&state.ctm, px, py))
                            .collect(),
                    );
                }
                ("m", 2) => path.push(vec![apply(&state.ctm, n[0], n[1])]),
                ("l", 2) => {
                    if let Some(current) = path.last_mut() {
                        current.push(apply(&state.ctm, n[0], n[1]));
                    }
                }
                ("c", 6) => curve_to(&mut path, &state.ctm, None, (n[0], n[1]), (n[2], n[3]), (n[4], n[5])),
                ("v", 4) => curve_to(&mut path, &state.ctm, Some(true), (n[0], n[1]), (n[0], n[1]), (n[2], n[3])),
                ("y", 4) => curve_to(&mut path, &state.ctm, Some(false), (n[0], n[1]), (n[2], n[3]), (n[2], n[3])),
                ("f" | "F" | "B" | "b", _) => {
                    self.fill(&path, &state, false);
                    path.clear();
                }
                ("f*" | "B*" | "b*", _) => {
                    self.fill(&path, &state, true);
                    path.clear();
                }
                ("S" | "s" | "n", _) => path.clear(),
                ("g", 1) => state.fill = [channel(n[0]); 3],
                ("rg", 3) => state.fill = [channel(n[0]), channel(n[1]), channel(n[2])],
                ("k", 4) => state.fill = cmyk_to_rgb(n[0], n[1], n[2], n[3]),
                ("sc" | "scn", 1) => state.fill = [channel(n[0]); 3],
                ("sc" | "scn", 3) => state.fill = [channel(n[0]), channel(n[1]), channel(n[2])],
                ("sc" | "scn", 4) => state.fill = cmyk_to_rgb(n[0], n[1], n[2], n[3]),
                ("gs", _) => {
                    if let Some(alpha) = operand_name(op.operands.first())
                        .and_then(|name| resource(self.doc, resources, b"ExtGState", name))
                        .and_then(|gs| gs.as_dict().ok())
                        .and_then(|gs| gs.get(b"ca").ok().and_then(number))
                    {
                        state.alpha = alpha.clamp(0.0, 1.0);
                    }
                }
                ("Do", _) => {
                    if let Some(name) = operand_name(op.operands.first()) {
                        self.draw_xobject(name, resources, &state, depth)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn draw_xobject(
        &mut self,
        name: &[u8],
        resources: Option<&Dictionary>,
        state: &GraphicsState,
        depth: usize,
    ) -> Result<()> {
        let Some(id) = resources
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|value| resolve(self.doc, value).as_dict().ok())
            .and_then(|entries| entries.get(name).ok())
            .and_then(|value| value.as_reference().ok())
        else {
            return Ok(());
        };
        let doc = self.doc;
        let Ok(stream) = doc.get_object(id).and_then(Object::as_stream) else {
            return Ok(());
        };
        let subtype = stream.dict.get(b"Subtype").and_then(Object::as_name).ok();
        match subtype {
            Some(b"Image") => {
                if !self.images.contains_key(&id) {
                    let decoded = match decode_image_xobject(doc, stream) {
                        Ok(image) => Some(image),
                        Err(err) => {
                            warn!(?id, %err, "Image skipped");
                            None
                        }
                    };
                    self.images.insert(id, decoded);
                }
                if let Some(Some(image)) = self.images.remove(&id) {
                    self.paint_image(&image, state);
                    self.images.insert(id, Some(image));
                }
                Ok(())
            }
            Some(b"Form") if depth < MAX_DEPTH => {
                let content = stream_bytes(stream)?;
                let matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|value| value.as_array().ok())
                    .filter(|values| values.len() == 6)
                    .map(|values| {
                        let mut m = IDENTITY;
                        for (slot, value) in m.iter_mut().zip(values) {
                            *slot = number(value).unwrap_or(*slot);
                        }
                        m
                    })
                    .unwrap_or(IDENTITY);
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|value| resolve(doc, value).as_dict().ok())
                    .or(resources);
                let inner = GraphicsState {
                    ctm: multiply(&matrix, &state.ctm),
                    ..*state
                };
                self.run(&content, form_resources, inner, depth + 1)
            }
            _ => Ok(()),
        }
    }

    /// Map the unit square through the CTM and sample the image for every
    /// covered pixel.
    fn paint_image(&mut self, image: &RgbaImage, state: &GraphicsState) {
        let Some(inverse) = invert(&state.ctm) else {
            return;
        };
        let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .map(|(x, y)| apply(&state.ctm, x, y));
        let Some((x0, y0, x1, y1)) = self.clip_bounds(&corners) else {
            return;
        };
        let (iw, ih) = image.dimensions();
        for py in y0..y1 {
            for px in x0..x1 {
                let (u, v) = apply(&inverse, px as f32 + 0.5, py as f32 + 0.5);
                if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                    continue;
                }
                let sx = ((u * iw as f32) as u32).min(iw - 1);
                let sy = (((1.0 - v) * ih as f32) as u32).min(ih - 1);
                let [r, g, b, a] = image.get_pixel(sx, sy).0;
                self.blend(px, py, [r, g, b], a as f32 / 255.0 * state.alpha);
            }
        }
    }

    fn fill(&mut self, path: &[Polygon], state: &GraphicsState, even_odd: bool) {
        let points: Vec<(f32, f32)> = path.iter().flatten().copied().collect();
        let Some((x0, y0, x1, y1)) = self.clip_bounds(&points) else {
            return;
        };
        for py in y0..y1 {
            for px in x0..x1 {
                let winding = winding_number(path, px as f32 + 0.5, py as f32 + 0.5);
                let inside = if even_odd { winding % 2 != 0 } else { winding != 0 };
                if inside {
                    self.blend(px, py, state.fill, state.alpha);
                }
            }
        }
    }

    fn clip_bounds(&self, points: &[(f32, f32)]) -> Option<(u32, u32, u32, u32)> {
        if points.is_empty() {
            return None;
        }
        let (w, h) = (self.canvas.width() as f32, self.canvas.height() as f32);
        let min_x = points.iter().map(|p| p.0).fold(f32::INFINITY, f32::min).max(0.0);
        let min_y = points.iter().map(|p| p.1).fold(f32::INFINITY, f32::min).max(0.0);
        let max_x = points.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max).min(w);
        let max_y = points.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max).min(h);
        if min_x >= max_x || min_y >= max_y {
            return None;
        }
        Some((
            min_x.floor() as u32,
            min_y.floor() as u32,
            max_x.ceil() as u32,
            max_y.ceil() as u32,
        ))
    }

    fn blend(&mut self, x: u32, y: u32, color: [u8; 3], alpha: f32) {
        if alpha <= 0.0 || x >= self.canvas.width() || y >= self.canvas.height() {
            return;
        }
        let pixel = self.canvas.get_pixel_mut(x, y);
        for (dst, src) in pixel.0.iter_mut().zip(color) {
            *dst = (src as f32 * alpha + *dst as f32 * (1.0 - alpha)).round() as u8;
        }
    }
}

fn curve_to(
    path: &mut [Polygon],
    ctm: &Matrix,
    start_is_control: Option<bool>,
    c1: (f32, f32),
    c2: (f32, f32),
    end: (f32, f32),
) {
    let Some(current) = path.last_mut() else {
        return;
    };
    let Some(&p0) = current.last() else {
        return;
    };
    let map = |(x, y): (f32, f32)| apply(ctm, x, y);
    // `v` reuses the current point as the first control point.
    let p1 = if start_is_control == Some(true) { p0 } else { map(c1) };
    let p2 = map(c2);
    let p3 = map(end);
    for step in 1..=CURVE_STEPS {
        let t = step as f32 / CURVE_STEPS as f32;
        let mt = 1.0 - t;
        let x = mt * mt * mt * p0.0 + 3.0 * mt * mt * t * p1.0 + 3.0 * mt * t * t * p2.0 + t * t * t * p3.0;
        let y = mt * mt * mt * p0.1 + 3.0 * mt * mt * t * p1.1 + 3.0 * mt * t * t * p2.1 + t * t * t * p3.1;
        current.push((x, y));
    }
}

/// Non-zero winding number of `(x, y)` against closed polygons.
fn winding_number(path: &[Polygon], x: f32, y: f32) -> i32 {
    let mut winding = 0;
    for polygon in path.iter().filter(|polygon| polygon.len() > 2) {
        for (i, &(ax, ay)) in polygon.iter().enumerate() {
            let (bx, by) = polygon[(i + 1) % polygon.len()];
            let cross = (bx - ax) * (y - ay) - (x - ax) * (by - ay);
            if ay <= y {
                if by > y && cross > 0.0 {
                    winding += 1;
                }
            } else if by <= y && cross < 0.0 {
                winding -= 1;
            }
        }
    }
    winding
}

fn resource<'r>(
    doc: &'r Document,
    resources: Option<&'r Dictionary>,
    category: &[u8],
    name: &[u8],
) -> Option<&'r Object> {
    let entries = resolve(doc, resources?.get(category).ok()?).as_dict().ok()?;
    Some(resolve(doc, entries.get(name).ok()?))
}

fn channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn operand_name(operand: Option<&Object>) -> Option<&[u8]> {
    operand.and_then(|value| value.as_name().ok())
}
