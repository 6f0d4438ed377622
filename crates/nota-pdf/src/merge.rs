//! PDF Merge algorithm
//!
//! Combines per-page PDFs into a single document, preserving input order.

use crate::error::PdfError;
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;

/// Merge PDFs into one, pages in input order
///
/// The algorithm:
/// 1. If empty, return error
/// 2. If single document, return it as-is
/// 3. Use the first document as the destination
/// 4. For each remaining source document:
///    a. Offset its object IDs past the destination's highest ID
///    b. Import all objects with remapped references
///    c. Append its pages to the destination page list
/// 5. Re-parent every page under the destination page tree
/// 6. Drop unreachable objects, compress and serialize
pub fn merge_documents(documents: Vec<Vec<u8>>) -> Result<Vec<u8>, PdfError> {
    let mut documents = documents.into_iter();

    let first = match (documents.next(), documents.len()) {
        (None, _) => return Err(PdfError::MergeError("No documents to merge".into())),
        (Some(only), 0) => return Ok(only),
        (Some(first), _) => first,
    };

    let mut dest = Document::load_mem(&first)
        .map_err(|e| PdfError::ParseError(format!("Failed to load document 0: {}", e)))?;
    let mut dest_max_id = dest.max_id;
    let mut dest_page_refs = get_page_references(&dest);

    for (i, doc_bytes) in documents.enumerate() {
        let source = Document::load_mem(&doc_bytes).map_err(|e| {
            PdfError::ParseError(format!("Failed to load document {}: {}", i + 1, e))
        })?;

        // Collect pages before the objects are moved out
        let source_pages = get_page_references(&source);
        let id_offset = dest_max_id;

        let remapped: BTreeMap<ObjectId, Object> = source
            .objects
            .into_iter()
            .map(|(old_id, object)| {
                (
                    (old_id.0 + id_offset, old_id.1),
                    remap_object_refs(object, id_offset),
                )
            })
            .collect();
        dest.objects.extend(remapped);

        dest_page_refs.extend(
            source_pages
                .into_iter()
                .map(|page| (page.0 + id_offset, page.1)),
        );

        dest_max_id = (source.max_id + id_offset).max(dest_max_id);
    }

    dest.max_id = dest_max_id;
    update_page_tree(&mut dest, &dest_page_refs)?;

    dest.prune_objects();
    dest.compress();

    let mut buffer = Vec::new();
    dest.save_to(&mut buffer)
        .map_err(|e| PdfError::MergeError(format!("Failed to save merged PDF: {}", e)))?;

    Ok(buffer)
}

/// Page object references in page order
fn get_page_references(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().values().copied().collect()
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(value.clone(), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(value.clone(), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Point the destination page tree at `page_refs` and re-parent each page
fn update_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> Result<(), PdfError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| PdfError::MergeError("No Root reference in trailer".into()))?;

    let pages_id = doc
        .get_dictionary(catalog_id)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| PdfError::MergeError("No Pages reference in catalog".into()))?;

    match doc.objects.get_mut(&pages_id) {
        Some(Object::Dictionary(pages_dict)) => {
            let kids = page_refs
                .iter()
                .map(|&id| Object::Reference(id))
                .collect::<Vec<_>>();
            pages_dict.set("Kids", Object::Array(kids));
            pages_dict.set("Count", Object::Integer(page_refs.len() as i64));
        }
        _ => return Err(PdfError::MergeError("Invalid pages dictionary".into())),
    }

    for page_id in page_refs {
        match doc.objects.get_mut(page_id) {
            Some(Object::Dictionary(page_dict)) => {
                page_dict.set("Parent", Object::Reference(pages_id));
            }
            _ => {
                return Err(PdfError::MergeError(format!(
                    "Page object {} {} is not a dictionary",
                    page_id.0, page_id.1
                )))
            }
        }
    }

    Ok(())
}
