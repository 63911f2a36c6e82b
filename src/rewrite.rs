//! Document rewriting
//!
//! Walks every page in order, gathers each image identity once, hands the
//! unique images to a [`Transcoder`], swaps in the successful replacements and
//! finally runs the tier's structural cleanup.

use crate::document::{CleanupStats, PdfDocument};
use crate::tier::{CompressionTier, ImagePolicy};
use crate::transcode::{
    ImageResource, JpegTranscoder, SkipReason, TranscodeOutcome, Transcoder,
};
use lopdf::ObjectId;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Options for a rewrite pass
#[derive(Debug, Clone)]
pub struct RewriteOptions {
    /// Worker threads used for transcoding; 1 keeps everything on the
    /// calling thread
    pub workers: usize,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

/// Result of a rewrite pass
#[derive(Debug, Clone, Default)]
pub struct RewriteReport {
    pub pages: u32,
    /// Unique image identities reached from the page tree
    pub unique_images: usize,
    pub transcoded_images: usize,
    pub skipped_images: Vec<(ObjectId, SkipReason)>,
    pub cleanup: CleanupStats,
}

/// Rewrite `doc` in place under `tier` using the JPEG transcoder
pub fn rewrite(
    doc: &mut PdfDocument,
    tier: CompressionTier,
    options: &RewriteOptions,
) -> RewriteReport {
    rewrite_with(doc, tier, options, &JpegTranscoder)
}

/// Rewrite `doc` in place under `tier` with a caller-supplied transcoder
#[instrument(skip_all, fields(tier = %tier, workers = options.workers))]
pub fn rewrite_with<T: Transcoder>(
    doc: &mut PdfDocument,
    tier: CompressionTier,
    options: &RewriteOptions,
    transcoder: &T,
) -> RewriteReport {
    let mut report = RewriteReport {
        pages: doc.page_count(),
        ..Default::default()
    };

    if let Some(policy) = tier.image_policy() {
        let image_ids = collect_unique_images(doc);
        report.unique_images = image_ids.len();
        debug!(count = image_ids.len(), "Found unique images");

        let resources: Vec<ImageResource> =
            image_ids.iter().filter_map(|id| doc.image(*id)).collect();

        for (id, outcome) in transcode_all(&resources, &policy, options, transcoder) {
            match outcome {
                TranscodeOutcome::Transcoded(stream) => {
                    debug!(?id, bytes = stream.content.len(), "Image replaced");
                    doc.replace_image(id, stream);
                    report.transcoded_images += 1;
                }
                TranscodeOutcome::Skipped(reason) => {
                    debug!(?id, %reason, "Image skipped");
                    report.skipped_images.push((id, reason));
                }
            }
        }
    }

    report.cleanup = doc.cleanup(&tier.cleanup());

    info!(
        pages = report.pages,
        images = report.unique_images,
        transcoded = report.transcoded_images,
        skipped = report.skipped_images.len(),
        "Rewrite complete"
    );

    report
}

/// Image identities in page order, each listed once however many pages
/// draw it.
pub fn collect_unique_images(doc: &PdfDocument) -> Vec<ObjectId> {
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut ordered = Vec::new();

    for page_id in doc.page_ids() {
        for image_id in doc.page_image_ids(page_id) {
            if seen.insert(image_id) {
                ordered.push(image_id);
            }
        }
    }

    ordered
}

/// Transcode every resource exactly once.
///
/// Returns only after all work has finished, in the order of `resources`.
fn transcode_all<T: Transcoder>(
    resources: &[ImageResource],
    policy: &ImagePolicy,
    options: &RewriteOptions,
    transcoder: &T,
) -> Vec<(ObjectId, TranscodeOutcome)> {
    if options.workers > 1 && resources.len() > 1 {
        if let Some(outcomes) = transcode_parallel(resources, policy, options.workers, transcoder)
        {
            return outcomes;
        }
    }

    resources
        .iter()
        .map(|image| (image.id, transcoder.transcode(image, policy)))
        .collect()
}

#[cfg(not(target_arch = "wasm32"))]
fn transcode_parallel<T: Transcoder>(
    resources: &[ImageResource],
    policy: &ImagePolicy,
    workers: usize,
    transcoder: &T,
) -> Option<Vec<(ObjectId, TranscodeOutcome)>> {
    use rayon::prelude::*;

    let pool = match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool,
        Err(e) => {
            warn!(%e, "Could not start transcode pool, continuing on one thread");
            return None;
        }
    };

    Some(pool.install(|| {
        resources
            .par_iter()
            .map(|image| (image.id, transcoder.transcode(image, policy)))
            .collect()
    }))
}

#[cfg(target_arch = "wasm32")]
fn transcode_parallel<T: Transcoder>(
    _resources: &[ImageResource],
    _policy: &ImagePolicy,
    _workers: usize,
    _transcoder: &T,
) -> Option<Vec<(ObjectId, TranscodeOutcome)>> {
    None
}
