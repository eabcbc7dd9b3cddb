// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document-level dictionaries: /Info metadata, viewer preferences, and
// removal of annotations and active content.

use chrono::{DateTime, NaiveDateTime, Utc};
use folio_core::error::{FolioError, Result};
use lopdf::{Dictionary, Object, ObjectId, StringFormat};
use serde::Serialize;
use tracing::{debug, info};

use super::handle::PdfDocumentHandle;
use super::resolve;

const PAGE_MODES: [&str; 6] = [
    "UseNone",
    "UseOutlines",
    "UseThumbs",
    "FullScreen",
    "UseOC",
    "UseAttachments",
];

const PAGE_LAYOUTS: [&str; 6] = [
    "SinglePage",
    "OneColumn",
    "TwoColumnLeft",
    "TwoColumnRight",
    "TwoPageLeft",
    "TwoPageRight",
];

/// Action types that run code or reach outside the document.
const ACTIVE_ACTIONS: [&[u8]; 5] = [
    b"JavaScript",
    b"Launch",
    b"SubmitForm",
    b"ImportData",
    b"ResetForm",
];

/// The /Info dictionary. `None` leaves an entry untouched on write; an
/// empty string removes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub modification_date: Option<DateTime<Utc>>,
}

/// Catalog /PageMode, /PageLayout and the /ViewerPreferences flags.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerPreferences {
    pub page_mode: String,
    pub page_layout: String,
    pub fit_window: bool,
    pub center_window: bool,
    pub hide_toolbar: bool,
    pub hide_menubar: bool,
}

impl Default for ViewerPreferences {
    fn default() -> Self {
        Self {
            page_mode: "UseNone".into(),
            page_layout: "SinglePage".into(),
            fit_window: true,
            center_window: true,
            hide_toolbar: false,
            hide_menubar: false,
        }
    }
}

impl PdfDocumentHandle {
    /// Current /Info entries.
    pub fn metadata(&self) -> DocumentMetadata {
        let Some(info) = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|value| resolve(&self.doc, value).as_dict().ok())
        else {
            return DocumentMetadata::default();
        };
        let text = |key: &[u8]| match info.get(key).map(|value| resolve(&self.doc, value)) {
            Ok(Object::String(bytes, _)) => Some(decode_text_string(bytes)),
            _ => None,
        };
        DocumentMetadata {
            title: text(b"Title"),
            author: text(b"Author"),
            subject: text(b"Subject"),
            keywords: text(b"Keywords"),
            creator: text(b"Creator"),
            producer: text(b"Producer"),
            creation_date: text(b"CreationDate").and_then(|raw| parse_pdf_date(&raw)),
            modification_date: text(b"ModDate").and_then(|raw| parse_pdf_date(&raw)),
        }
    }

    /// Merge `metadata` into /Info.
    pub fn set_metadata(&mut self, metadata: &DocumentMetadata) -> Result<()> {
        let info = self.info_dict_mut()?;
        let entries = [
            ("Title", &metadata.title),
            ("Author", &metadata.author),
            ("Subject", &metadata.subject),
            ("Keywords", &metadata.keywords),
            ("Creator", &metadata.creator),
            ("Producer", &metadata.producer),
        ];
        for (key, value) in entries {
            match value.as_deref() {
                Some("") => {
                    info.remove(key.as_bytes());
                }
                Some(text) => info.set(key, encode_text_string(text)),
                None => {}
            }
        }
        let dates = [
            ("CreationDate", metadata.creation_date),
            ("ModDate", metadata.modification_date),
        ];
        for (key, value) in dates {
            if let Some(date) = value {
                info.set(key, Object::string_literal(pdf_date(&date)));
            }
        }
        debug!(?metadata, "Metadata written");
        Ok(())
    }

    /// Drop /Info and the catalog's XMP /Metadata stream.
    pub fn clear_metadata(&mut self) -> Result<()> {
        self.doc.trailer.remove(b"Info");
        self.catalog_mut()?.remove(b"Metadata");
        Ok(())
    }

    pub fn set_viewer_preferences(&mut self, prefs: &ViewerPreferences) -> Result<()> {
        if !PAGE_MODES.contains(&prefs.page_mode.as_str()) {
            return Err(FolioError::Validation(format!(
                "unknown page mode '{}', expected one of {}",
                prefs.page_mode,
                PAGE_MODES.join(", ")
            )));
        }
        if !PAGE_LAYOUTS.contains(&prefs.page_layout.as_str()) {
            return Err(FolioError::Validation(format!(
                "unknown page layout '{}', expected one of {}",
                prefs.page_layout,
                PAGE_LAYOUTS.join(", ")
            )));
        }
        let mut flags = Dictionary::new();
        flags.set("FitWindow", Object::Boolean(prefs.fit_window));
        flags.set("CenterWindow", Object::Boolean(prefs.center_window));
        flags.set("HideToolbar", Object::Boolean(prefs.hide_toolbar));
        flags.set("HideMenubar", Object::Boolean(prefs.hide_menubar));

        let catalog = self.catalog_mut()?;
        catalog.set("PageMode", Object::Name(prefs.page_mode.clone().into_bytes()));
        catalog.set("PageLayout", Object::Name(prefs.page_layout.clone().into_bytes()));
        catalog.set("ViewerPreferences", Object::Dictionary(flags));
        Ok(())
    }

    /// Remove every page annotation (and the form that depends on them).
    /// Returns the number of annotations removed.
    pub fn remove_annotations(&mut self) -> Result<usize> {
        let mut removed = 0;
        for page_id in self.page_ids().to_vec() {
            let count = match self.doc.get_dictionary(page_id).ok().and_then(|page| page.get(b"Annots").ok()) {
                Some(annots) => resolve(&self.doc, annots).as_array().map_or(0, Vec::len),
                None => continue,
            };
            if let Ok(page) = self.doc.get_dictionary_mut(page_id) {
                page.remove(b"Annots");
                removed += count;
            }
        }
        self.catalog_mut()?.remove(b"AcroForm");
        info!(removed, "Annotations removed");
        Ok(removed)
    }

    /// Remove scripts, automatic actions, embedded files and code-running
    /// link actions. Returns the number of entries removed.
    pub fn strip_active_content(&mut self) -> Result<usize> {
        let mut removed = 0;

        let names = self.catalog_mut()?.get(b"Names").ok().cloned();
        match names {
            Some(Object::Reference(id)) => {
                if let Ok(dict) = self.doc.get_dictionary_mut(id) {
                    removed += remove_keys(dict, &["JavaScript", "EmbeddedFiles"]);
                }
            }
            Some(Object::Dictionary(mut dict)) => {
                removed += remove_keys(&mut dict, &["JavaScript", "EmbeddedFiles"]);
                self.catalog_mut()?.set("Names", Object::Dictionary(dict));
            }
            _ => {}
        }

        let catalog = self.catalog_mut()?;
        if matches!(catalog.get(b"OpenAction"), Ok(Object::Dictionary(_) | Object::Reference(_))) {
            catalog.remove(b"OpenAction");
            removed += 1;
        }
        removed += remove_keys(catalog, &["AA"]);
        if let Ok(Object::Dictionary(form)) = catalog.get_mut(b"AcroForm") {
            removed += remove_keys(form, &["XFA"]);
        }

        let mut annotation_ids: Vec<ObjectId> = Vec::new();
        for page_id in self.page_ids().to_vec() {
            let Ok(page) = self.doc.get_dictionary_mut(page_id) else {
                continue;
            };
            removed += remove_keys(page, &["AA"]);
            if let Ok(Object::Array(annots)) = page.get_mut(b"Annots") {
                for annot in annots.iter_mut() {
                    match annot {
                        Object::Reference(id) => annotation_ids.push(*id),
                        Object::Dictionary(dict) => removed += strip_annotation_actions(dict),
                        _ => {}
                    }
                }
            }
        }
        for id in annotation_ids {
            if let Ok(dict) = self.doc.get_dictionary_mut(id) {
                removed += strip_annotation_actions(dict);
            }
        }

        info!(removed, "Active content stripped");
        Ok(removed)
    }

    fn info_dict_mut(&mut self) -> Result<&mut Dictionary> {
        let id = match self.doc.trailer.get(b"Info").ok().cloned() {
            Some(Object::Reference(id)) if self.doc.get_dictionary(id).is_ok() => id,
            Some(Object::Dictionary(dict)) => self.doc.add_object(dict),
            _ => self.doc.add_object(Dictionary::new()),
        };
        self.doc.trailer.set("Info", Object::Reference(id));
        self.doc
            .get_dictionary_mut(id)
            .map_err(|err| FolioError::Pdf(format!("info dictionary: {err}")))
    }
}

fn remove_keys(dict: &mut Dictionary, keys: &[&str]) -> usize {
    keys.iter()
        .filter(|key| dict.remove(key.as_bytes()).is_some())
        .count()
}

fn strip_annotation_actions(dict: &mut Dictionary) -> usize {
    let mut removed = remove_keys(dict, &["AA"]);
    let active = match dict.get(b"A") {
        Ok(Object::Dictionary(action)) => action
            .get(b"S")
            .and_then(Object::as_name)
            .is_ok_and(|kind| ACTIVE_ACTIONS.contains(&kind)),
        _ => false,
    };
    if active {
        dict.remove(b"A");
        removed += 1;
    }
    removed
}

/// PDF text string: literal for ASCII, UTF-16BE with BOM otherwise.
pub(crate) fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        Object::string_literal(text)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| b as char).collect(),
    }
}

pub(crate) fn pdf_date(date: &DateTime<Utc>) -> String {
    date.format("D:%Y%m%d%H%M%SZ").to_string()
}

/// Parse `D:YYYYMMDDHHmmSS...`; trailing fields may be omitted and any
/// timezone suffix is ignored.
pub(crate) fn parse_pdf_date(raw: &str) -> Option<DateTime<Utc>> {
    let digits: String = raw
        .trim()
        .trim_start_matches("D:")
        .chars()
        .take_while(char::is_ascii_digit)
        .take(14)
        .collect();
    if digits.len() < 4 {
        return None;
    }
    let defaults = "0101000000";
    let padded = format!("{digits}{}", &defaults[digits.len().saturating_sub(4).min(10)..]);
    NaiveDateTime::parse_from_str(&padded, "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| naive.and_utc())
}
