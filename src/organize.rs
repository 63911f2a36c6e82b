//! Page-level operations: organize (select/reorder/repeat), split and merge

use crate::document::{inherited_attribute, CleanupOptions, PdfDocument};
use crate::error::{CompactError, Result};
use crate::pages::{all_pages, resolve_page_spec};
use lopdf::{Document, Object, ObjectId};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Page attributes a page may inherit from its ancestors in the page tree
static INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// One page produced by [`split`]
#[derive(Debug, Clone)]
pub struct SplitPage {
    /// 1-based number of the page in the source document
    pub page_number: u32,
    pub bytes: Vec<u8>,
}

/// Rebuild the document with the pages named by `page_order`.
///
/// Pages may be reordered or repeated; an empty or unusable order keeps every
/// page in its natural order.
#[instrument(skip_all, fields(input_bytes = input.len(), page_order = %page_order))]
pub fn organize(input: &[u8], page_order: &str) -> Result<Vec<u8>> {
    let mut doc = PdfDocument::load_mem(input)?;
    let indices = resolve_page_spec(page_order, doc.page_count());
    info!(pages = indices.len(), "Organizing pages");

    select_pages(doc.document_mut(), &indices)?;
    doc.save_bytes(&CleanupOptions::prune_only())
}

/// One single-page PDF per selected page.
///
/// `pages` uses the page specification syntax; `None` selects every page.
#[instrument(skip_all, fields(input_bytes = input.len()))]
pub fn split(input: &[u8], pages: Option<&str>) -> Result<Vec<SplitPage>> {
    let doc = PdfDocument::load_mem(input)?;
    let indices = resolve_page_spec(pages.unwrap_or(""), doc.page_count());
    split_indices(&doc, &indices)
}

/// Split the pages `start..=end` (1-based) into single-page PDFs.
///
/// `start` defaults to the first page and `end` to the last; both are clamped
/// to the document. An inverted range yields nothing.
#[instrument(skip_all, fields(input_bytes = input.len(), start = ?start, end = ?end))]
pub fn split_range(input: &[u8], start: Option<u32>, end: Option<u32>) -> Result<Vec<SplitPage>> {
    let doc = PdfDocument::load_mem(input)?;
    let total = doc.page_count();

    let first = start.map(|s| s.saturating_sub(1)).unwrap_or(0);
    let last = end.unwrap_or(total).min(total);
    let indices: Vec<u32> = (first..last).collect();

    split_indices(&doc, &indices)
}

fn split_indices(doc: &PdfDocument, indices: &[u32]) -> Result<Vec<SplitPage>> {
    let mut pages = Vec::with_capacity(indices.len());

    for &index in indices {
        let mut single = doc.clone();
        select_pages(single.document_mut(), &[index])?;
        let bytes = single.save_bytes(&CleanupOptions::prune_only())?;
        debug!(page = index + 1, bytes = bytes.len(), "Page split out");
        pages.push(SplitPage {
            page_number: index + 1,
            bytes,
        });
    }

    info!(pages = pages.len(), "Split complete");
    Ok(pages)
}

/// Concatenate PDFs in the order given
#[instrument(skip_all, fields(documents = inputs.len()))]
pub fn merge(inputs: &[&[u8]]) -> Result<Vec<u8>> {
    let (first, rest) = inputs
        .split_first()
        .ok_or_else(|| CompactError::ProcessingError("No files selected".to_string()))?;

    let mut merged = PdfDocument::load_mem(first)?.into_document();
    let base_pages = merged.get_pages().len() as u32;
    select_pages(&mut merged, &all_pages(base_pages))?;
    let pages_root = pages_root_id(&merged)?;

    for (index, bytes) in rest.iter().enumerate() {
        let mut other = Document::load_mem(bytes).map_err(|e| {
            CompactError::LoadError(format!("additional PDF #{}: {}", index + 1, e))
        })?;
        other.renumber_objects_with(merged.max_id + 1);

        let other_pages: Vec<ObjectId> = other.get_pages().into_values().collect();
        for &page_id in &other_pages {
            push_down_inherited(&mut other, page_id);
        }

        let other_max = other.objects.keys().map(|id| id.0).max().unwrap_or(0);
        for (id, object) in std::mem::take(&mut other.objects) {
            if is_tree_node(&object) {
                continue;
            }
            merged.objects.insert(id, object);
        }
        merged.max_id = merged.max_id.max(other_max);

        append_pages(&mut merged, pages_root, &other_pages)?;
        debug!(document = index + 2, pages = other_pages.len(), "Document appended");
    }

    info!(pages = merged.get_pages().len(), "Merge complete");

    let mut merged = PdfDocument::from_document(merged);
    merged.save_bytes(&CleanupOptions {
        garbage: 3,
        deflate: true,
        clean: false,
    })
}

/// Replace the page tree with a flat list of the pages at `indices`.
///
/// A page listed more than once is copied so each node in the tree has a
/// single parent. Indices past the end are ignored.
pub fn select_pages(doc: &mut Document, indices: &[u32]) -> Result<()> {
    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let pages_root = pages_root_id(doc)?;

    for &page_id in &pages {
        push_down_inherited(doc, page_id);
    }

    let mut used: HashSet<ObjectId> = HashSet::new();
    let mut kids = Vec::with_capacity(indices.len());

    for &index in indices {
        let page_id = match pages.get(index as usize) {
            Some(id) => *id,
            None => continue,
        };
        let kid = if used.insert(page_id) {
            page_id
        } else {
            let copy = doc
                .get_dictionary(page_id)
                .map_err(|e| CompactError::ProcessingError(e.to_string()))?
                .clone();
            doc.add_object(copy)
        };
        kids.push(kid);
    }

    set_kids(doc, pages_root, &kids)
}

fn append_pages(doc: &mut Document, pages_root: ObjectId, new_pages: &[ObjectId]) -> Result<()> {
    let mut kids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    kids.extend_from_slice(new_pages);
    set_kids(doc, pages_root, &kids)
}

fn set_kids(doc: &mut Document, pages_root: ObjectId, kids: &[ObjectId]) -> Result<()> {
    for &kid in kids {
        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(kid) {
            page.set("Parent", Object::Reference(pages_root));
        }
    }

    let root = doc
        .get_object_mut(pages_root)
        .and_then(Object::as_dict_mut)
        .map_err(|e| CompactError::ProcessingError(format!("page tree root: {}", e)))?;
    root.set(
        "Kids",
        Object::Array(kids.iter().map(|id| Object::Reference(*id)).collect()),
    );
    root.set("Count", Object::Integer(kids.len() as i64));

    Ok(())
}

/// Copy inheritable attributes from the page's ancestors onto the page itself
fn push_down_inherited(doc: &mut Document, page_id: ObjectId) {
    let page = match doc.get_object(page_id) {
        Ok(Object::Dictionary(d)) => d,
        _ => return,
    };

    let inherited: Vec<(&[u8], Object)> = INHERITABLE_KEYS
        .iter()
        .filter(|key| !page.has(key))
        .filter_map(|key| inherited_attribute(doc, page, key).map(|v| (*key, v.clone())))
        .collect();

    if inherited.is_empty() {
        return;
    }

    if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
        for (key, value) in inherited {
            page.set(key.to_vec(), value);
        }
    }
}

fn pages_root_id(doc: &Document) -> Result<ObjectId> {
    doc.catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| CompactError::ProcessingError(format!("no page tree: {}", e)))
}

/// Catalog and intermediate page tree nodes of a merged-in document
fn is_tree_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type"),
            Ok(Object::Name(n)) if n == b"Pages" || n == b"Catalog"
        ),
        _ => false,
    }
}
