//! Document I/O
//!
//! Thin wrapper over `lopdf::Document` exposing what the compression pipeline
//! needs: pages in order, the image identities each page draws, read/replace of
//! image streams, and serialization with a cleanup level.

use crate::cleanup;
use crate::error::{CompactError, Result};
use crate::transcode::ImageResource;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, instrument};

/// Structural cleanup applied when saving.
///
/// `garbage` follows the usual 0-4 scale: 1 drops unreachable objects, 2 also
/// drops empty streams, 3 compacts the cross-reference table, 4 additionally
/// merges byte-identical streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanupOptions {
    pub garbage: u8,
    /// Flate-compress streams that have no filter
    pub deflate: bool,
    /// Re-serialize page content streams in normalized form
    pub clean: bool,
}

impl CleanupOptions {
    /// Drop unreachable objects and deflate, nothing else
    pub fn prune_only() -> Self {
        Self {
            garbage: 1,
            deflate: true,
            clean: false,
        }
    }
}

/// What a cleanup pass removed or rewrote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanupStats {
    pub pruned_objects: usize,
    pub empty_streams: usize,
    pub merged_streams: usize,
    pub cleaned_streams: usize,
}

/// Information about a single image in the PDF
#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    /// Object ID (number, generation)
    pub object_id: (u32, u16),
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub alpha: u8,
    pub color_space: String,
    pub bits_per_component: u32,
    /// Filter/encoding
    pub filter: String,
    /// Encoded stream size in bytes
    pub size_bytes: usize,
}

/// Images grouped by page
#[derive(Debug, Clone, Serialize)]
pub struct PageImages {
    /// 1-based page number
    pub page_number: u32,
    pub images: Vec<ImageInfo>,
}

/// A loaded PDF owned by a single operation
#[derive(Debug, Clone)]
pub struct PdfDocument {
    document: Document,
}

impl PdfDocument {
    /// Parse a PDF held in memory
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    pub fn load_mem(bytes: &[u8]) -> Result<Self> {
        let document =
            Document::load_mem(bytes).map_err(|e| CompactError::LoadError(e.to_string()))?;
        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    /// Parse a PDF from the filesystem
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let document = Document::load(path)
            .map_err(|e| CompactError::LoadError(format!("{:?}: {}", path, e)))?;
        debug!(pages = document.get_pages().len(), "PDF loaded");
        Ok(Self { document })
    }

    pub fn from_document(document: Document) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Page object ids in document order
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.document.get_pages().into_values().collect()
    }

    /// Image identities drawn by a page, including those nested in Form
    /// XObjects, in resource dictionary order without repeats.
    pub fn page_image_ids(&self, page_id: ObjectId) -> Vec<ObjectId> {
        collect_page_images(&self.document, page_id)
    }

    /// Read an image resource by identity
    pub fn image(&self, id: ObjectId) -> Option<ImageResource> {
        match self.document.get_object(id) {
            Ok(Object::Stream(stream)) => ImageResource::from_stream(id, stream, &self.document),
            _ => None,
        }
    }

    /// Replace the stored stream of an image identity
    pub fn replace_image(&mut self, id: ObjectId, stream: Stream) {
        self.document.objects.insert(id, Object::Stream(stream));
    }

    /// Images per page with their dimensions and encoding
    pub fn image_inventory(&self) -> Vec<PageImages> {
        let mut result = Vec::new();

        for (page_number, page_id) in self.document.get_pages() {
            let images: Vec<ImageInfo> = self
                .page_image_ids(page_id)
                .into_iter()
                .filter_map(|id| self.image(id))
                .map(|image| ImageInfo {
                    object_id: image.id,
                    width: image.width,
                    height: image.height,
                    channels: image.channels,
                    alpha: image.alpha,
                    filter: image.filter().unwrap_or_else(|| "raw".to_string()),
                    size_bytes: image.stream.content.len(),
                    color_space: image.color_space,
                    bits_per_component: image.bits_per_component,
                })
                .collect();

            if !images.is_empty() {
                result.push(PageImages {
                    page_number,
                    images,
                });
            }
        }

        result
    }

    /// Apply structural cleanup in place
    pub fn cleanup(&mut self, options: &CleanupOptions) -> CleanupStats {
        cleanup::apply(&mut self.document, options)
    }

    /// Serialize the document as it currently stands
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.document
            .save_to(&mut output)
            .map_err(|e| CompactError::SaveError(e.to_string()))?;
        Ok(output)
    }

    /// Clean up, then serialize
    pub fn save_bytes(&mut self, options: &CleanupOptions) -> Result<Vec<u8>> {
        self.cleanup(options);
        self.to_bytes()
    }
}

/// Collect all image object IDs referenced from a page
fn collect_page_images(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let mut images: Vec<ObjectId> = Vec::new();
    let mut seen: HashSet<ObjectId> = HashSet::new();

    let page_dict = match doc.get_object(page_id) {
        Ok(Object::Dictionary(d)) => d,
        _ => return images,
    };

    let resources = get_page_resources(doc, page_dict);

    for obj_id in get_xobjects(doc, &resources) {
        collect_images_recursive(doc, obj_id, &mut images, &mut seen);
    }

    images
}

/// Recursively collect images from an object (handles Form XObjects)
fn collect_images_recursive(
    doc: &Document,
    obj_id: ObjectId,
    images: &mut Vec<ObjectId>,
    seen: &mut HashSet<ObjectId>,
) {
    if !seen.insert(obj_id) {
        return;
    }

    let stream = match doc.get_object(obj_id) {
        Ok(Object::Stream(s)) => s,
        _ => return,
    };

    match stream.dict.get(b"Subtype") {
        Ok(Object::Name(n)) if n == b"Image" => images.push(obj_id),
        Ok(Object::Name(n)) if n == b"Form" => {
            if let Ok(res) = stream.dict.get(b"Resources") {
                for child_id in get_xobjects(doc, res) {
                    collect_images_recursive(doc, child_id, images, seen);
                }
            }
        }
        _ => {}
    }
}

/// Page resources, inherited from the nearest ancestor when the page has none
fn get_page_resources(doc: &Document, page_dict: &Dictionary) -> Object {
    if let Some(resources) = inherited_attribute(doc, page_dict, b"Resources") {
        return resources.clone();
    }
    Object::Null
}

/// Look up `key` on a page node, walking `/Parent` links until found
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page_dict;
    let mut visited: HashSet<ObjectId> = HashSet::new();

    loop {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent_id = match current.get(b"Parent") {
            Ok(Object::Reference(id)) => *id,
            _ => return None,
        };
        if !visited.insert(parent_id) {
            return None;
        }
        current = match doc.get_object(parent_id) {
            Ok(Object::Dictionary(d)) => d,
            _ => return None,
        };
    }
}

/// XObject references from a resource dictionary, in dictionary order
fn get_xobjects(doc: &Document, resources: &Object) -> Vec<ObjectId> {
    let res_dict = match resolve_dict(doc, resources) {
        Some(d) => d,
        None => return Vec::new(),
    };

    let xobj_dict = match res_dict.get(b"XObject").ok().and_then(|x| resolve_dict(doc, x)) {
        Some(d) => d,
        None => return Vec::new(),
    };

    xobj_dict
        .iter()
        .filter_map(|(_, value)| match value {
            Object::Reference(obj_id) => Some(*obj_id),
            _ => None,
        })
        .collect()
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d),
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Dictionary(d)) => Some(d),
            _ => None,
        },
        _ => None,
    }
}
