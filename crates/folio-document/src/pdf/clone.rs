// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cross-document object cloning.

use std::collections::HashMap;

use folio_core::error::{FolioError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::warn;

/// Copies object graphs from one document into another.
///
/// Objects reachable from several cloned pages are copied once: the memo maps
/// source ids to the ids already allocated in the target. References to other
/// page objects are cut (replaced by `null`) so copying one page never drags
/// in the rest of the source page tree.
pub(crate) struct ObjectCloner<'a> {
    source: &'a Document,
    memo: HashMap<ObjectId, ObjectId>,
    /// Strict clones fail on dangling references instead of nulling them.
    strict: bool,
}

impl<'a> ObjectCloner<'a> {
    pub fn new(source: &'a Document, strict: bool) -> Self {
        Self {
            source,
            memo: HashMap::new(),
            strict,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Clone a page dictionary under a freshly allocated id. `/Parent` is left
    /// for the caller to set; annotations are cloned per page with `/P`
    /// pointing at the new page.
    pub fn clone_page(&mut self, target: &mut Document, page: &Dictionary) -> Result<ObjectId> {
        let new_id = target.new_object_id();
        let mut cloned = Dictionary::new();
        for (key, value) in page.iter() {
            match key.as_slice() {
                b"Parent" | b"B" => continue,
                b"Annots" => {
                    let annots = self.clone_annotations(target, value, new_id)?;
                    if !annots.is_empty() {
                        cloned.set("Annots", Object::Array(annots));
                    }
                }
                _ => {
                    let value = self.clone_object(target, value)?;
                    cloned.set(key.clone(), value);
                }
            }
        }
        target.objects.insert(new_id, Object::Dictionary(cloned));
        Ok(new_id)
    }

    fn clone_annotations(
        &mut self,
        target: &mut Document,
        annots: &Object,
        page_id: ObjectId,
    ) -> Result<Vec<Object>> {
        let array = match super::resolve(self.source, annots) {
            Object::Array(items) => items,
            _ => return Ok(Vec::new()),
        };
        let mut out = Vec::with_capacity(array.len());
        for item in array {
            let dict = match super::resolve(self.source, item) {
                Object::Dictionary(dict) => dict,
                _ => continue,
            };
            let mut cloned = Dictionary::new();
            for (key, value) in dict.iter() {
                if matches!(key.as_slice(), b"P" | b"Parent" | b"Popup" | b"IRT") {
                    continue;
                }
                let value = self.clone_object(target, value)?;
                cloned.set(key.clone(), value);
            }
            cloned.set("P", Object::Reference(page_id));
            out.push(Object::Reference(target.add_object(cloned)));
        }
        Ok(out)
    }

    /// Deep-clone a value, following references through the memo.
    pub fn clone_object(&mut self, target: &mut Document, object: &Object) -> Result<Object> {
        match object {
            Object::Dictionary(dict) => Ok(Object::Dictionary(self.clone_dict(target, dict)?)),
            Object::Array(items) => {
                let mut cloned = Vec::with_capacity(items.len());
                for item in items {
                    cloned.push(self.clone_object(target, item)?);
                }
                Ok(Object::Array(cloned))
            }
            Object::Stream(stream) => {
                let dict = self.clone_dict(target, &stream.dict)?;
                let mut cloned = Stream::new(dict, stream.content.clone());
                cloned.allows_compression = stream.allows_compression;
                Ok(Object::Stream(cloned))
            }
            Object::Reference(id) => self.clone_reference(target, *id),
            other => Ok(other.clone()),
        }
    }

    fn clone_dict(&mut self, target: &mut Document, dict: &Dictionary) -> Result<Dictionary> {
        let mut cloned = Dictionary::new();
        for (key, value) in dict.iter() {
            if key == b"Parent" {
                continue;
            }
            let value = self.clone_object(target, value)?;
            cloned.set(key.clone(), value);
        }
        Ok(cloned)
    }

    fn clone_reference(&mut self, target: &mut Document, id: ObjectId) -> Result<Object> {
        if let Some(mapped) = self.memo.get(&id) {
            return Ok(Object::Reference(*mapped));
        }
        let referenced = match self.source.get_object(id) {
            Ok(object) => object,
            Err(err) if self.strict => {
                return Err(FolioError::Corrupt(format!(
                    "object {} {} R cannot be read: {err}",
                    id.0, id.1
                )));
            }
            Err(err) => {
                warn!(?id, %err, "Cannot resolve reference, using null");
                return Ok(Object::Null);
            }
        };
        if is_page_node(referenced) {
            return Ok(Object::Null);
        }
        // Reserve the id before recursing so cycles terminate.
        let new_id = target.new_object_id();
        self.memo.insert(id, new_id);
        let cloned = self.clone_object(target, referenced)?;
        target.objects.insert(new_id, cloned);
        Ok(Object::Reference(new_id))
    }
}

fn is_page_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => dict
            .get(b"Type")
            .and_then(Object::as_name)
            .is_ok_and(|name| name == b"Page" || name == b"Pages"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn shared_objects_are_cloned_once() {
        let mut source = Document::with_version("1.7");
        let shared = source.add_object(dictionary! { "Value" => 7 });
        let holder = dictionary! { "A" => shared, "B" => shared };

        let mut target = Document::with_version("1.7");
        let mut cloner = ObjectCloner::new(&source, true);
        let cloned = cloner
            .clone_object(&mut target, &Object::Dictionary(holder))
            .unwrap();
        let dict = cloned.as_dict().unwrap();
        assert_eq!(
            dict.get(b"A").unwrap().as_reference().unwrap(),
            dict.get(b"B").unwrap().as_reference().unwrap()
        );
        assert_eq!(target.objects.len(), 1);
    }

    #[test]
    fn strict_mode_rejects_dangling_references() {
        let source = Document::with_version("1.7");
        let mut target = Document::with_version("1.7");
        let dangling = Object::Reference((99, 0));

        let mut lenient = ObjectCloner::new(&source, false);
        assert!(matches!(
            lenient.clone_object(&mut target, &dangling),
            Ok(Object::Null)
        ));

        let mut strict = ObjectCloner::new(&source, true);
        assert!(matches!(
            strict.clone_object(&mut target, &dangling),
            Err(FolioError::Corrupt(_))
        ));
    }

    #[test]
    fn self_referencing_graph_terminates() {
        let mut source = Document::with_version("1.7");
        let id = source.new_object_id();
        source
            .objects
            .insert(id, Object::Dictionary(dictionary! { "Next" => id }));

        let mut target = Document::with_version("1.7");
        let mut cloner = ObjectCloner::new(&source, true);
        let cloned = cloner.clone_object(&mut target, &Object::Reference(id)).unwrap();
        let new_id = cloned.as_reference().unwrap();
        let next = target
            .get_dictionary(new_id)
            .unwrap()
            .get(b"Next")
            .unwrap()
            .as_reference()
            .unwrap();
        assert_eq!(next, new_id);
    }
}
