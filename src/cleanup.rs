//! Structural cleanup: unreachable-object removal, duplicate stream merging,
//! cross-reference compaction, content normalization and stream deflation.

use crate::document::{CleanupOptions, CleanupStats};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Run a cleanup pass over `doc` in place.
///
/// Content normalization happens first (it leaves streams unfiltered), object
/// collection next, and deflation last so every surviving stream is compressed.
pub(crate) fn apply(doc: &mut Document, options: &CleanupOptions) -> CleanupStats {
    let mut stats = CleanupStats::default();

    if options.clean {
        stats.cleaned_streams = clean_content_streams(doc);
    }

    if options.garbage >= 1 {
        stats.pruned_objects += doc.prune_objects().len();
    }
    if options.garbage >= 2 {
        stats.empty_streams = doc.delete_zero_length_streams().len();
    }
    if options.garbage >= 4 {
        stats.merged_streams = merge_duplicate_streams(doc);
        if stats.merged_streams > 0 {
            stats.pruned_objects += doc.prune_objects().len();
        }
    }
    if options.garbage >= 3 {
        doc.renumber_objects();
    }

    if options.deflate {
        doc.compress();
    }

    debug!(
        garbage = options.garbage,
        deflate = options.deflate,
        clean = options.clean,
        pruned = stats.pruned_objects,
        empty = stats.empty_streams,
        merged = stats.merged_streams,
        cleaned = stats.cleaned_streams,
        "Structural cleanup complete"
    );

    stats
}

/// Re-encode every page content stream through the content parser.
///
/// Streams that fail to decompress or parse are left as they are.
fn clean_content_streams(doc: &mut Document) -> usize {
    let mut content_ids: Vec<ObjectId> = doc
        .get_pages()
        .into_values()
        .flat_map(|page_id| doc.get_page_contents(page_id))
        .collect();
    content_ids.sort();
    content_ids.dedup();

    let mut cleaned = 0;
    for id in content_ids {
        let stream = match doc.get_object_mut(id) {
            Ok(Object::Stream(stream)) => stream,
            _ => continue,
        };

        let raw = if stream.dict.has(b"Filter") {
            match stream.decompressed_content() {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(?id, %e, "Leaving content stream as is: cannot decompress");
                    continue;
                }
            }
        } else {
            stream.content.clone()
        };

        let normalized = match Content::decode(&raw).and_then(|content| content.encode()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(?id, %e, "Leaving content stream as is: cannot parse");
                continue;
            }
        };

        stream.set_plain_content(normalized);
        cleaned += 1;
    }

    cleaned
}

/// Point every reference to a byte-identical stream at a single copy.
///
/// Streams are keyed by a digest of their dictionary and content; the lowest
/// object id in each group survives. Returns the number of redirected streams.
fn merge_duplicate_streams(doc: &mut Document) -> usize {
    let mut canonical: HashMap<[u8; 32], ObjectId> = HashMap::new();
    let mut redirects: HashMap<ObjectId, ObjectId> = HashMap::new();

    for (id, object) in doc.objects.iter() {
        if let Object::Stream(stream) = object {
            let mut hasher = Sha256::new();
            hasher.update(format!("{:?}", stream.dict).as_bytes());
            hasher.update(&stream.content);
            let digest: [u8; 32] = hasher.finalize().into();

            match canonical.get(&digest) {
                Some(keep) => {
                    redirects.insert(*id, *keep);
                }
                None => {
                    canonical.insert(digest, *id);
                }
            }
        }
    }

    if redirects.is_empty() {
        return 0;
    }

    for object in doc.objects.values_mut() {
        replace_references(object, &redirects);
    }
    for (_, value) in doc.trailer.iter_mut() {
        replace_references(value, &redirects);
    }

    redirects.len()
}

fn replace_references(object: &mut Object, redirects: &HashMap<ObjectId, ObjectId>) {
    match object {
        Object::Reference(id) => {
            if let Some(target) = redirects.get(id) {
                *id = *target;
            }
        }
        Object::Array(items) => {
            for item in items.iter_mut() {
                replace_references(item, redirects);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                replace_references(value, redirects);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                replace_references(value, redirects);
            }
        }
        _ => {}
    }
}
