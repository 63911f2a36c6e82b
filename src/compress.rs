//! Compression supervisor
//!
//! Runs the rewriter on a working copy and only hands back the result when it
//! is strictly smaller than the input. Otherwise the input is returned
//! unchanged, so the output is never larger than what came in.

use crate::document::PdfDocument;
use crate::error::Result;
use crate::organize::organize;
use crate::rewrite::{rewrite_with, RewriteOptions, RewriteReport};
use crate::tier::CompressionTier;
use crate::transcode::{JpegTranscoder, Transcoder};
use tracing::{info, instrument};

/// Output of a compression run
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    /// The PDF to hand back to the caller
    pub bytes: Vec<u8>,
    pub original_size: u64,
    pub final_size: u64,
    /// True when the rewrite was discarded because it was not smaller
    pub kept_original: bool,
    pub tier: CompressionTier,
    pub report: RewriteReport,
}

impl CompressionOutcome {
    /// Human readable before/after sizes, e.g. `"512.00KB ➔ 230.15KB"`
    pub fn size_comparison(&self) -> String {
        format!(
            "{} ➔ {}",
            format_size(self.original_size),
            format_size(self.final_size)
        )
    }

    pub fn saved_bytes(&self) -> u64 {
        self.original_size - self.final_size
    }

    /// Size reduction as a percentage of the original
    pub fn reduction_percent(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        self.saved_bytes() as f64 * 100.0 / self.original_size as f64
    }
}

/// Compress a PDF under `tier` with the JPEG transcoder
pub fn compress(
    input: &[u8],
    tier: CompressionTier,
    options: &RewriteOptions,
) -> Result<CompressionOutcome> {
    compress_with(input, tier, options, &JpegTranscoder)
}

/// Compress a PDF under `tier` with a caller-supplied transcoder
#[instrument(skip_all, fields(tier = %tier, input_bytes = input.len()))]
pub fn compress_with<T: Transcoder>(
    input: &[u8],
    tier: CompressionTier,
    options: &RewriteOptions,
    transcoder: &T,
) -> Result<CompressionOutcome> {
    let original_size = input.len() as u64;

    let mut working = PdfDocument::load_mem(input)?;
    let report = rewrite_with(&mut working, tier, options, transcoder);
    let candidate = working.to_bytes()?;
    let candidate_size = candidate.len() as u64;

    let outcome = if candidate_size >= original_size {
        info!(
            original_size,
            candidate_size, "Rewrite is not smaller, returning the original document"
        );
        CompressionOutcome {
            bytes: input.to_vec(),
            original_size,
            final_size: original_size,
            kept_original: true,
            tier,
            report,
        }
    } else {
        CompressionOutcome {
            bytes: candidate,
            original_size,
            final_size: candidate_size,
            kept_original: false,
            tier,
            report,
        }
    };

    info!(
        original_size,
        final_size = outcome.final_size,
        "Compression finished: {}",
        outcome.size_comparison()
    );

    Ok(outcome)
}

/// Select and reorder pages, then compress the selection.
///
/// The size guarantee applies to the organized document, which is what the
/// caller asked to be compressed.
pub fn compress_pages(
    input: &[u8],
    page_order: &str,
    tier: CompressionTier,
    options: &RewriteOptions,
) -> Result<CompressionOutcome> {
    let organized = organize(input, page_order)?;
    compress(&organized, tier, options)
}

/// Format a byte count with binary prefixes and two decimals
pub fn format_size(bytes: u64) -> String {
    const FACTOR: f64 = 1024.0;
    let mut value = bytes as f64;
    for unit in ["", "K", "M", "G", "T"] {
        if value < FACTOR {
            return format!("{:.2}{}B", value, unit);
        }
        value /= FACTOR;
    }
    format!("{:.2}YB", value)
}
