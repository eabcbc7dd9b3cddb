// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document handle: load, create, page tree edits and save, on top of
// `lopdf`.
//
// On load the page tree is flattened: inherited attributes are copied onto
// each page and intermediate /Pages nodes are dropped, so the handle's page
// vector is the single source of page order.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use folio_core::error::{FolioError, Result};
use folio_core::types::PaperSize;
use lopdf::content::Content;
use lopdf::encryption::{EncryptionState, EncryptionVersion, Permissions};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::{debug, info, instrument, warn};

use super::clone::ObjectCloner;
use super::draw::TextRun;
use super::fonts::StandardFont;
use super::{PageInfo, Rect, number, pdf_err, resolve};

/// Page attributes a page may inherit from its ancestors.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// US Letter, the PDF default when no MediaBox is present anywhere.
const DEFAULT_MEDIA_BOX: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 612.0,
    height: 792.0,
};

/// Options for [`PdfDocumentHandle::save`].
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Password required to open the document.
    pub user_password: Option<String>,
    /// Password for full permissions; defaults to the user password.
    pub owner_password: Option<String>,
    /// Renumber objects and Flate-compress every stream.
    pub compact: bool,
}

impl SaveOptions {
    pub fn compact() -> Self {
        Self {
            compact: true,
            ..Self::default()
        }
    }

    pub fn protected(user_password: impl Into<String>, owner_password: Option<String>) -> Self {
        Self {
            user_password: Some(user_password.into()),
            owner_password,
            compact: false,
        }
    }

    fn is_protected(&self) -> bool {
        self.user_password.as_deref().is_some_and(|p| !p.is_empty())
            || self.owner_password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// What to do with a page that cannot be copied during repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairPolicy {
    /// Substitute a blank A4 page labelled with the lost page number.
    Placeholder,
    /// Leave the page out.
    Drop,
}

/// Outcome counts of [`PdfDocumentHandle::load_with_repair`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub recovered: usize,
    pub replaced: usize,
    pub dropped: usize,
}

/// A mutable PDF document with a flat, ordered page list.
///
/// `save` consumes the handle; anything done after saving needs a fresh load.
#[derive(Clone)]
pub struct PdfDocumentHandle {
    pub(super) doc: Document,
    pages_id: ObjectId,
    pages: Vec<ObjectId>,
    /// Pages whose original content has already been wrapped in q..Q.
    pub(super) isolated: HashSet<ObjectId>,
    pub(super) fonts: HashMap<StandardFont, ObjectId>,
    /// ExtGState objects keyed by opacity in thousandths.
    pub(super) opacity_states: HashMap<u16, ObjectId>,
}

impl PdfDocumentHandle {
    // -- Construction ---------------------------------------------------------

    /// Decode PDF bytes, decrypting with `password` when the file is
    /// natively protected.
    #[instrument(skip_all, fields(bytes_len = bytes.len(), has_password = password.is_some()))]
    pub fn load(bytes: &[u8], password: Option<&str>) -> Result<Self> {
        let mut doc = match Document::load_mem(bytes) {
            Ok(doc) => doc,
            Err(err) if contains(bytes, b"/Encrypt") => {
                return Err(FolioError::Password(format!(
                    "encrypted PDF could not be opened: {err}"
                )));
            }
            Err(err) => return Err(FolioError::Corrupt(format!("not a readable PDF: {err}"))),
        };

        if doc.is_encrypted() {
            doc = if doc.encryption_state.is_some() {
                // Opened with the empty user password; objects are already plain.
                strip_encryption(doc)
            } else {
                decrypt_document(&doc, bytes, password)?
            };
            debug!("Native encryption removed");
        }

        let handle = Self::from_document(doc)?;
        debug!(pages = handle.page_count(), "PDF loaded");
        Ok(handle)
    }

    /// An empty document with a catalog and zero pages.
    pub fn create() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        Self::with_parts(doc, pages_id, Vec::new())
    }

    fn with_parts(doc: Document, pages_id: ObjectId, pages: Vec<ObjectId>) -> Self {
        Self {
            doc,
            pages_id,
            pages,
            isolated: HashSet::new(),
            fonts: HashMap::new(),
            opacity_states: HashMap::new(),
        }
    }

    fn from_document(mut doc: Document) -> Result<Self> {
        let pages_id = catalog_id(&doc)
            .and_then(|root| doc.get_dictionary(root).map_err(|err| pdf_err("catalog", err)))
            .and_then(|catalog| {
                catalog
                    .get(b"Pages")
                    .and_then(Object::as_reference)
                    .map_err(|err| pdf_err("catalog has no page tree", err))
            })
            .map_err(|err| FolioError::Corrupt(err.to_string()))?;

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();

        for &page_id in &pages {
            let inherited = inherited_attributes(&doc, page_id);
            if let Ok(page) = doc.get_dictionary_mut(page_id) {
                for (key, value) in inherited {
                    page.set(key, value);
                }
                if !page.has(b"MediaBox") {
                    page.set("MediaBox", DEFAULT_MEDIA_BOX.to_object());
                }
            }
        }

        let intermediate: Vec<ObjectId> = doc
            .objects
            .iter()
            .filter(|(id, object)| **id != pages_id && is_pages_node(object))
            .map(|(id, _)| *id)
            .collect();
        for id in &intermediate {
            doc.objects.remove(id);
        }
        debug!(
            pages = pages.len(),
            removed_nodes = intermediate.len(),
            "Page tree flattened"
        );

        let mut handle = Self::with_parts(doc, pages_id, pages);
        handle.sync_page_tree()?;
        Ok(handle)
    }

    /// Load a damaged file by copying it page by page into a fresh document.
    /// Pages whose objects or content streams cannot be read are replaced or
    /// dropped per `policy`.
    #[instrument(skip_all, fields(bytes_len = bytes.len(), ?policy))]
    pub fn load_with_repair(bytes: &[u8], policy: RepairPolicy) -> Result<(Self, RepairReport)> {
        let source = Self::load(bytes, None)?;
        let mut repaired = Self::create();
        let mut report = RepairReport::default();
        let mut cloner = ObjectCloner::new(&source.doc, true);

        for index in 0..source.page_count() {
            match repaired.copy_page_using(&mut cloner, &source, index) {
                Ok(_) => report.recovered += 1,
                Err(err) => {
                    warn!(page = index + 1, %err, "Page could not be recovered");
                    match policy {
                        RepairPolicy::Placeholder => {
                            repaired.insert_placeholder(index + 1)?;
                            report.replaced += 1;
                        }
                        RepairPolicy::Drop => report.dropped += 1,
                    }
                }
            }
        }
        repaired.sync_page_tree()?;

        info!(
            recovered = report.recovered,
            replaced = report.replaced,
            dropped = report.dropped,
            "Repair complete"
        );
        Ok((repaired, report))
    }

    fn insert_placeholder(&mut self, page_number: usize) -> Result<()> {
        let index = self.add_page(PaperSize::A4.dimensions_pt())?;
        let font = self.embed_font(StandardFont::Helvetica)?;
        let label = format!("Page {page_number} could not be recovered");
        self.draw_text(index, &TextRun::new(label, 50.0, 780.0, 14.0, font))
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn version(&self) -> &str {
        &self.doc.version
    }

    /// Serialise the current state without consuming the handle.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.clone().save(&SaveOptions::default())
    }

    pub(crate) fn document(&self) -> &Document {
        &self.doc
    }

    pub(crate) fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.pages.get(index).copied().ok_or_else(|| {
            FolioError::Validation(format!(
                "page {} is out of range (document has {} pages)",
                index + 1,
                self.pages.len()
            ))
        })
    }

    pub(super) fn page_dict(&self, index: usize) -> Result<&Dictionary> {
        let id = self.page_id(index)?;
        self.doc
            .get_dictionary(id)
            .map_err(|err| pdf_err(&format!("page {} dictionary", index + 1), err))
    }

    pub(super) fn page_dict_mut(&mut self, index: usize) -> Result<&mut Dictionary> {
        let id = self.page_id(index)?;
        self.doc
            .get_dictionary_mut(id)
            .map_err(|err| pdf_err(&format!("page {} dictionary", index + 1), err))
    }

    pub fn page_info(&self, index: usize) -> Result<PageInfo> {
        let page = self.page_dict(index)?;
        let read_box = |key: &[u8]| {
            page.get(key)
                .ok()
                .and_then(|value| Rect::from_object(resolve(&self.doc, value)))
        };
        let media_box = read_box(b"MediaBox").unwrap_or(DEFAULT_MEDIA_BOX);
        let crop_box = read_box(b"CropBox").unwrap_or(media_box);
        let rotation = page
            .get(b"Rotate")
            .ok()
            .and_then(|value| number(resolve(&self.doc, value)))
            .map(|degrees| normalise_rotation(degrees.round() as i32))
            .unwrap_or(0);
        Ok(PageInfo {
            width: crop_box.width,
            height: crop_box.height,
            rotation,
            media_box,
            crop_box,
        })
    }

    // -- Page tree ------------------------------------------------------------

    /// Append copies of `indices` (zero-based, in the given order, repeats
    /// allowed) from `source`. Returns the new page indices.
    #[instrument(skip_all, fields(count = indices.len()))]
    pub fn copy_pages(&mut self, source: &PdfDocumentHandle, indices: &[usize]) -> Result<Vec<usize>> {
        for &index in indices {
            source.page_id(index)?;
        }
        let mut cloner = ObjectCloner::new(&source.doc, false);
        let mut inserted = Vec::with_capacity(indices.len());
        for &index in indices {
            inserted.push(self.copy_page_using(&mut cloner, source, index)?);
        }
        self.sync_page_tree()?;
        debug!(total = self.pages.len(), "Pages copied");
        Ok(inserted)
    }

    fn copy_page_using(
        &mut self,
        cloner: &mut ObjectCloner<'_>,
        source: &PdfDocumentHandle,
        index: usize,
    ) -> Result<usize> {
        let page_id = source.page_id(index)?;
        let page = source.doc.get_dictionary(page_id).map_err(|err| {
            FolioError::Corrupt(format!("page {} is unreadable: {err}", index + 1))
        })?;
        if cloner.is_strict() {
            let content = source.doc.get_page_content(page_id).map_err(|err| {
                FolioError::Corrupt(format!("page {} content is unreadable: {err}", index + 1))
            })?;
            Content::decode(&content).map_err(|err| {
                FolioError::Corrupt(format!("page {} content does not parse: {err}", index + 1))
            })?;
        }
        let new_id = cloner.clone_page(&mut self.doc, page)?;
        self.pages.push(new_id);
        Ok(self.pages.len() - 1)
    }

    /// Insert a shallow copy of page `index` at `insert_at`.
    pub fn duplicate_page(&mut self, index: usize, insert_at: usize) -> Result<usize> {
        let copy = self.page_dict(index)?.clone();
        let new_id = self.doc.add_object(copy);
        let at = insert_at.min(self.pages.len());
        self.pages.insert(at, new_id);
        self.sync_page_tree()?;
        Ok(at)
    }

    /// Append an empty page of `size` (width, height in points).
    pub fn add_page(&mut self, size: (f32, f32)) -> Result<usize> {
        self.insert_page(self.pages.len(), size)
    }

    /// Insert an empty page before `index` (`index == page_count` appends).
    pub fn insert_page(&mut self, index: usize, (width, height): (f32, f32)) -> Result<usize> {
        if index > self.pages.len() {
            return Err(FolioError::Validation(format!(
                "cannot insert at position {} in a {} page document",
                index + 1,
                self.pages.len()
            )));
        }
        if width <= 0.0 || height <= 0.0 {
            return Err(FolioError::Validation(format!(
                "page size {width}x{height} is not positive"
            )));
        }
        let contents = self.doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => Rect::sized(width, height).to_object(),
            "Resources" => Dictionary::new(),
            "Contents" => contents,
        });
        self.pages.insert(index, page_id);
        self.sync_page_tree()?;
        Ok(index)
    }

    pub fn remove_page(&mut self, index: usize) -> Result<()> {
        self.page_id(index)?;
        self.pages.remove(index);
        self.sync_page_tree()
    }

    /// Keep only `indices`, in their original relative order.
    pub fn retain_pages(&mut self, indices: &[usize]) -> Result<()> {
        for &index in indices {
            self.page_id(index)?;
        }
        let keep: HashSet<usize> = indices.iter().copied().collect();
        self.pages = self
            .pages
            .iter()
            .enumerate()
            .filter(|(index, _)| keep.contains(index))
            .map(|(_, id)| *id)
            .collect();
        self.sync_page_tree()
    }

    /// Permute pages so that new page `i` is old page `order[i]` (zero-based).
    /// `order` must be a bijection over the current pages.
    pub fn reorder(&mut self, order: &[usize]) -> Result<()> {
        let count = self.pages.len();
        if order.len() != count {
            return Err(FolioError::Validation(format!(
                "page order lists {} pages but the document has {count}",
                order.len()
            )));
        }
        let mut seen = vec![false; count];
        for &index in order {
            if index >= count {
                return Err(FolioError::Validation(format!(
                    "page {} in the order does not exist",
                    index + 1
                )));
            }
            if std::mem::replace(&mut seen[index], true) {
                return Err(FolioError::Validation(format!(
                    "page {} appears twice in the order",
                    index + 1
                )));
            }
        }
        self.pages = order.iter().map(|&index| self.pages[index]).collect();
        self.sync_page_tree()
    }

    pub fn reverse(&mut self) -> Result<()> {
        self.pages.reverse();
        self.sync_page_tree()
    }

    // -- Page geometry --------------------------------------------------------

    /// Set the absolute rotation of a page. Must be a multiple of 90.
    pub fn set_rotation(&mut self, index: usize, degrees: i32) -> Result<()> {
        if degrees % 90 != 0 {
            return Err(FolioError::Validation(format!(
                "rotation must be a multiple of 90, got {degrees}"
            )));
        }
        let rotation = normalise_rotation(degrees);
        self.page_dict_mut(index)?
            .set("Rotate", Object::Integer(rotation as i64));
        Ok(())
    }

    /// Add `degrees` to the current rotation; returns the new value.
    pub fn rotate_by(&mut self, index: usize, degrees: i32) -> Result<i32> {
        let current = self.page_info(index)?.rotation;
        let rotation = normalise_rotation(current + degrees);
        self.set_rotation(index, rotation)?;
        Ok(rotation)
    }

    pub fn set_crop_box(&mut self, index: usize, rect: Rect) -> Result<()> {
        self.set_page_box(index, "CropBox", rect)
    }

    pub fn set_media_box(&mut self, index: usize, rect: Rect) -> Result<()> {
        self.set_page_box(index, "MediaBox", rect)
    }

    /// Set any page boundary (`TrimBox`, `BleedBox`, ...).
    pub fn set_page_box(&mut self, index: usize, key: &str, rect: Rect) -> Result<()> {
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return Err(FolioError::Validation(format!(
                "{key} must have a positive size"
            )));
        }
        self.page_dict_mut(index)?.set(key, rect.to_object());
        Ok(())
    }

    // -- Save -----------------------------------------------------------------

    /// Serialise the document. Unreferenced objects are always pruned.
    #[instrument(skip_all, fields(pages = self.pages.len(), compact = options.compact))]
    pub fn save(mut self, options: &SaveOptions) -> Result<Vec<u8>> {
        self.sync_page_tree()?;
        self.doc.trailer.remove(b"Encrypt");
        self.doc.prune_objects();
        if options.compact {
            self.doc.renumber_objects();
            self.doc.compress();
        }
        if options.is_protected() {
            self.encrypt(options)?;
        }

        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|err| FolioError::Pdf(format!("failed to serialise PDF: {err}")))?;
        debug!(output_bytes = output.len(), "PDF saved");
        Ok(output)
    }

    fn encrypt(&mut self, options: &SaveOptions) -> Result<()> {
        let user = options.user_password.as_deref().unwrap_or("");
        let owner = options
            .owner_password
            .as_deref()
            .filter(|password| !password.is_empty())
            .unwrap_or(user);
        self.ensure_document_id();

        let version = EncryptionVersion::V2 {
            document: &self.doc,
            owner_password: owner,
            user_password: user,
            key_length: 128,
            permissions: Permissions::all(),
        };
        let state = EncryptionState::try_from(version)
            .map_err(|err| FolioError::Encryption(format!("cannot derive PDF key: {err}")))?;
        self.doc
            .encrypt(&state)
            .map_err(|err| FolioError::Encryption(format!("PDF encryption failed: {err}")))?;
        info!("Native password protection applied");
        Ok(())
    }

    /// The standard security handler keys off the first trailer /ID entry.
    fn ensure_document_id(&mut self) {
        if self.doc.trailer.has(b"ID") {
            return;
        }
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u128;
        let seed = nanos ^ ((self.doc.objects.len() as u128) << 64);
        let id = seed.to_be_bytes().to_vec();
        self.doc.trailer.set(
            "ID",
            Object::Array(vec![
                Object::String(id.clone(), StringFormat::Hexadecimal),
                Object::String(id, StringFormat::Hexadecimal),
            ]),
        );
    }

    // -- Internals ------------------------------------------------------------

    pub(super) fn catalog_mut(&mut self) -> Result<&mut Dictionary> {
        let root = catalog_id(&self.doc)?;
        self.doc
            .get_dictionary_mut(root)
            .map_err(|err| pdf_err("catalog", err))
    }

    pub(super) fn page_ids(&self) -> &[ObjectId] {
        &self.pages
    }

    /// Rewrite /Kids, /Count and every page's /Parent from the page vector.
    fn sync_page_tree(&mut self) -> Result<()> {
        let pages_id = self.pages_id;
        let kids: Vec<Object> = self.pages.iter().map(|id| Object::Reference(*id)).collect();
        let root = self
            .doc
            .get_dictionary_mut(pages_id)
            .map_err(|err| pdf_err("page tree root", err))?;
        root.set("Kids", Object::Array(kids));
        root.set("Count", Object::Integer(self.pages.len() as i64));
        for &page_id in &self.pages {
            if let Ok(page) = self.doc.get_dictionary_mut(page_id) {
                page.set("Parent", Object::Reference(pages_id));
            }
        }
        Ok(())
    }
}

fn catalog_id(doc: &Document) -> Result<ObjectId> {
    doc.trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|err| FolioError::Corrupt(format!("trailer has no catalog: {err}")))
}

fn is_pages_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => dict
            .get(b"Type")
            .and_then(Object::as_name)
            .is_ok_and(|name| name == b"Pages"),
        _ => false,
    }
}

/// Attributes missing on the page but set on an ancestor /Pages node.
fn inherited_attributes(doc: &Document, page_id: ObjectId) -> Vec<(Vec<u8>, Object)> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };
    let mut missing: Vec<&[u8]> = INHERITABLE
        .iter()
        .copied()
        .filter(|key| !page.has(key))
        .collect();
    let mut found = Vec::new();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(parent_id) = parent {
        if missing.is_empty() || depth > 64 {
            break;
        }
        let Ok(node) = doc.get_dictionary(parent_id) else {
            break;
        };
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                found.push((key.to_vec(), value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }
    found
}

fn normalise_rotation(degrees: i32) -> i32 {
    (degrees.rem_euclid(360) / 90) * 90
}

/// Drop the security handler from a document whose objects are already
/// decrypted.
fn strip_encryption(mut doc: Document) -> Document {
    if let Some(Object::Reference(id)) = doc.trailer.remove(b"Encrypt") {
        doc.objects.remove(&id);
    }
    doc.encryption_state = None;
    doc
}

/// Open a file whose user password is not empty.
///
/// lopdf only materialises the object table of an encrypted file when the
/// empty password authenticates. For any other password the file is parsed a
/// second time with the trailer `/Encrypt` key and the `/ObjStm` type names
/// masked (same length, so xref offsets stay valid), then the key is restored
/// and the objects are decrypted in place.
fn decrypt_document(header: &Document, bytes: &[u8], password: Option<&str>) -> Result<Document> {
    let password = match password {
        Some(password) if !password.is_empty() => password,
        _ => return Err(FolioError::Password("this PDF is password protected".into())),
    };
    // The file key derives from the user password; an owner password alone
    // authenticates but cannot decrypt.
    if let Err(err) = header.authenticate_user_password(password) {
        return Err(FolioError::Password(
            if header.authenticate_owner_password(password).is_ok() {
                "this is the permissions password; enter the open password instead".to_owned()
            } else {
                format!("the password is incorrect ({err})")
            },
        ));
    }
    let encrypt_id = header
        .trailer
        .get(b"Encrypt")
        .and_then(Object::as_reference)
        .map_err(|err| FolioError::Corrupt(format!("unusable /Encrypt entry: {err}")))?;

    let masked = mask_names(bytes, &[(b"/Encrypt", b"/Encrypx"), (b"/ObjStm", b"/ObjStx")]);
    let mut doc = Document::load_mem(&masked)
        .map_err(|err| FolioError::Corrupt(format!("encrypted PDF is unreadable: {err}")))?;
    doc.trailer.remove(b"Encrypx");
    doc.trailer.set("Encrypt", encrypt_id);
    for object in doc.objects.values_mut() {
        if let Ok(stream) = object.as_stream_mut() {
            if stream.dict.has_type(b"ObjStx") {
                stream.dict.set("Type", Object::Name(b"ObjStm".to_vec()));
            }
        }
    }

    doc.decrypt(password)
        .map_err(|err| FolioError::Password(format!("the password is incorrect ({err})")))?;
    doc.encryption_state = None;

    let containers: Vec<ObjectId> = doc
        .objects
        .iter()
        .filter(|(_, object)| {
            object
                .as_stream()
                .is_ok_and(|stream| stream.dict.has_type(b"ObjStm") || stream.dict.has_type(b"XRef"))
        })
        .map(|(id, _)| *id)
        .collect();
    for id in containers {
        doc.objects.remove(&id);
    }
    Ok(doc)
}

/// Replace PDF name tokens with same-length stand-ins. A match must end at a
/// delimiter or whitespace, so `/EncryptMetadata` is left alone.
fn mask_names(bytes: &[u8], names: &[(&[u8], &[u8])]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    for (name, replacement) in names {
        let mut at = 0;
        while let Some(offset) = find(&out[at..], name) {
            let start = at + offset;
            let end = start + name.len();
            if out.get(end).is_none_or(|&byte| !is_regular(byte)) {
                out[start..end].copy_from_slice(replacement);
            }
            at = end;
        }
    }
    out
}

fn is_regular(byte: u8) -> bool {
    !byte.is_ascii_whitespace() && !b"()<>[]{}/%".contains(&byte)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(pages: usize) -> PdfDocumentHandle {
        let mut handle = PdfDocumentHandle::create();
        let font = handle.embed_font(StandardFont::Helvetica).unwrap();
        for n in 0..pages {
            let index = handle.add_page(PaperSize::A4.dimensions_pt()).unwrap();
            let label = format!("Page {}", n + 1);
            handle
                .draw_text(index, &TextRun::new(label, 72.0, 700.0, 24.0, font))
                .unwrap();
        }
        handle
    }

    fn page_text(handle: &PdfDocumentHandle, index: usize) -> String {
        handle.page_text(index).unwrap()
    }

    #[test]
    fn created_document_saves_and_reloads() {
        let bytes = sample(3).save(&SaveOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        let reloaded = PdfDocumentHandle::load(&bytes, None).unwrap();
        assert_eq!(reloaded.page_count(), 3);
        assert!(page_text(&reloaded, 2).contains("Page 3"));
    }

    #[test]
    fn empty_document_has_zero_pages() {
        let bytes = PdfDocumentHandle::create()
            .save(&SaveOptions::default())
            .unwrap();
        assert_eq!(PdfDocumentHandle::load(&bytes, None).unwrap().page_count(), 0);
    }

    #[test]
    fn garbage_is_corrupt() {
        let result = PdfDocumentHandle::load(b"definitely not a pdf", None);
        assert!(matches!(result, Err(FolioError::Corrupt(_))));
    }

    #[test]
    fn copy_pages_preserves_order_and_repeats() {
        let source = sample(3);
        let mut target = PdfDocumentHandle::create();
        let inserted = target.copy_pages(&source, &[2, 0, 2]).unwrap();
        assert_eq!(inserted, vec![0, 1, 2]);
        assert!(page_text(&target, 0).contains("Page 3"));
        assert!(page_text(&target, 1).contains("Page 1"));
        assert!(page_text(&target, 2).contains("Page 3"));

        let ids = target.page_ids();
        assert_ne!(ids[0], ids[2]);
    }

    #[test]
    fn copy_pages_rejects_out_of_range() {
        let source = sample(2);
        let mut target = PdfDocumentHandle::create();
        assert!(matches!(
            target.copy_pages(&source, &[0, 5]),
            Err(FolioError::Validation(_))
        ));
        assert_eq!(target.page_count(), 0);
    }

    #[test]
    fn reorder_requires_bijection() {
        let mut handle = sample(3);
        assert!(handle.reorder(&[0, 0, 1]).is_err());
        assert!(handle.reorder(&[0, 1]).is_err());
        assert!(handle.reorder(&[0, 1, 3]).is_err());

        handle.reorder(&[2, 0, 1]).unwrap();
        assert!(page_text(&handle, 0).contains("Page 3"));
        assert!(page_text(&handle, 1).contains("Page 1"));
    }

    #[test]
    fn rotation_accumulates_modulo_360() {
        let mut handle = sample(1);
        assert_eq!(handle.rotate_by(0, 90).unwrap(), 90);
        assert_eq!(handle.rotate_by(0, 270).unwrap(), 0);
        assert_eq!(handle.rotate_by(0, -90).unwrap(), 270);
        assert!(handle.set_rotation(0, 45).is_err());
        assert_eq!(handle.page_info(0).unwrap().rotation, 270);
    }

    #[test]
    fn insert_remove_and_reverse() {
        let mut handle = sample(2);
        handle.insert_page(1, (200.0, 300.0)).unwrap();
        assert_eq!(handle.page_count(), 3);
        assert_eq!(handle.page_info(1).unwrap().width, 200.0);
        assert!(handle.insert_page(9, (200.0, 300.0)).is_err());

        handle.remove_page(1).unwrap();
        handle.reverse().unwrap();
        assert!(page_text(&handle, 0).contains("Page 2"));
    }

    #[test]
    fn crop_box_is_reported() {
        let mut handle = sample(1);
        handle
            .set_crop_box(0, Rect::new(10.0, 10.0, 100.0, 50.0))
            .unwrap();
        let info = handle.page_info(0).unwrap();
        assert_eq!((info.width, info.height), (100.0, 50.0));
        assert_eq!(info.media_box.width, PaperSize::A4.dimensions_pt().0);
    }

    #[test]
    fn password_round_trip() {
        let bytes = sample(1)
            .save(&SaveOptions::protected("secret1", None))
            .unwrap();
        assert!(matches!(
            PdfDocumentHandle::load(&bytes, None),
            Err(FolioError::Password(_))
        ));
        assert!(matches!(
            PdfDocumentHandle::load(&bytes, Some("wrong-one")),
            Err(FolioError::Password(_))
        ));
        let opened = PdfDocumentHandle::load(&bytes, Some("secret1")).unwrap();
        assert_eq!(opened.page_count(), 1);
        assert!(page_text(&opened, 0).contains("Page 1"));
    }

    #[test]
    fn decrypted_document_saves_without_password() {
        let locked = sample(2)
            .save(&SaveOptions {
                compact: true,
                ..SaveOptions::protected("secret1", None)
            })
            .unwrap();
        let plain = PdfDocumentHandle::load(&locked, Some("secret1"))
            .unwrap()
            .save(&SaveOptions::default())
            .unwrap();
        let reopened = PdfDocumentHandle::load(&plain, None).unwrap();
        assert_eq!(reopened.page_count(), 2);
        assert!(page_text(&reopened, 1).contains("Page 2"));
    }

    #[test]
    fn masking_keeps_offsets_and_longer_names() {
        let input = b"<< /Encrypt 5 0 R /EncryptMetadata true /Type/ObjStm>>";
        let masked = mask_names(input, &[(b"/Encrypt", b"/Encrypx"), (b"/ObjStm", b"/ObjStx")]);
        assert_eq!(masked.len(), input.len());
        assert_eq!(
            masked,
            b"<< /Encrypx 5 0 R /EncryptMetadata true /Type/ObjStx>>".to_vec()
        );
    }

    #[test]
    fn repair_keeps_readable_pages() {
        let bytes = sample(2).save(&SaveOptions::default()).unwrap();
        let (repaired, report) =
            PdfDocumentHandle::load_with_repair(&bytes, RepairPolicy::Placeholder).unwrap();
        assert_eq!(report.recovered, 2);
        assert_eq!(repaired.page_count(), 2);
    }

    #[test]
    fn compact_save_is_loadable() {
        let bytes = sample(2).save(&SaveOptions::compact()).unwrap();
        assert_eq!(PdfDocumentHandle::load(&bytes, None).unwrap().page_count(), 2);
    }

    #[test]
    fn inherited_media_box_is_materialised() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
                "MediaBox" => Rect::sized(300.0, 400.0).to_object(),
                "Rotate" => 90,
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let handle = PdfDocumentHandle::load(&bytes, None).unwrap();
        let info = handle.page_info(0).unwrap();
        assert_eq!((info.width, info.height, info.rotation), (300.0, 400.0, 90));
    }

    /// Two pages; the second page's `/Contents` names an object that was
    /// never written.
    fn dangling_contents_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content = doc.add_object(Stream::new(Dictionary::new(), b"0 0 m 10 10 l S".to_vec()));
        let good = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => Rect::sized(200.0, 200.0).to_object(),
            "Contents" => content,
        });
        let missing = doc.new_object_id();
        let broken = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => Rect::sized(200.0, 200.0).to_object(),
            "Contents" => missing,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(good), Object::Reference(broken)],
                "Count" => 2,
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn repair_replaces_page_with_missing_contents() {
        let (handle, report) =
            PdfDocumentHandle::load_with_repair(&dangling_contents_pdf(), RepairPolicy::Placeholder)
                .unwrap();
        assert_eq!(handle.page_count(), 2);
        assert_eq!((report.recovered, report.replaced, report.dropped), (1, 1, 0));
        assert!(page_text(&handle, 1).contains("Page 2 could not be recovered"));
    }

    #[test]
    fn repair_drops_page_with_missing_contents() {
        let (handle, report) =
            PdfDocumentHandle::load_with_repair(&dangling_contents_pdf(), RepairPolicy::Drop)
                .unwrap();
        assert_eq!(handle.page_count(), 1);
        assert_eq!((report.recovered, report.replaced, report.dropped), (1, 0, 1));
        let bytes = handle.save(&SaveOptions::default()).unwrap();
        assert_eq!(PdfDocumentHandle::load(&bytes, None).unwrap().page_count(), 1);
    }
}
