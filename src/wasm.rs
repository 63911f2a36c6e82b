//! WebAssembly bindings for PDF Compactor

use crate::{compress, list_images, organize, resolve_page_spec, CompressionTier, RewriteOptions};
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn parse_level(level: Option<String>) -> Result<CompressionTier, JsError> {
    match level {
        Some(level) => level
            .parse::<CompressionTier>()
            .map_err(|e| JsError::new(&e.to_string())),
        None => Ok(CompressionTier::default()),
    }
}

/// Compress a PDF
///
/// # Arguments
/// * `pdf_bytes` - The input PDF file as a byte array
/// * `level` - "less", "recommended" (default) or "extreme"
///
/// # Returns
/// A `CompressResultJs` with the output PDF and size statistics
#[wasm_bindgen]
pub fn compress_pdf(pdf_bytes: &[u8], level: Option<String>) -> Result<CompressResultJs, JsError> {
    let tier = parse_level(level)?;

    // Browsers run single-threaded here; RewriteOptions::default() uses one worker
    let outcome = compress(pdf_bytes, tier, &RewriteOptions::default())
        .map_err(|e| JsError::new(&e.to_string()))?;

    let image_info_json = list_images(&outcome.bytes)
        .ok()
        .and_then(|pages| serde_json::to_string(&pages).ok())
        .unwrap_or_else(|| "[]".to_string());

    Ok(CompressResultJs {
        size_comparison: outcome.size_comparison(),
        original_size: outcome.original_size as f64,
        final_size: outcome.final_size as f64,
        kept_original: outcome.kept_original,
        transcoded_images: outcome.report.transcoded_images,
        skipped_images: outcome.report.skipped_images.len(),
        pdf_bytes: outcome.bytes,
        image_info_json,
    })
}

/// Rebuild a PDF with the pages named by `page_order` (e.g. "3,1-2")
#[wasm_bindgen]
pub fn organize_pdf(pdf_bytes: &[u8], page_order: &str) -> Result<Vec<u8>, JsError> {
    organize(pdf_bytes, page_order).map_err(|e| JsError::new(&e.to_string()))
}

/// Zero-based page indices selected by `page_order` in a document of
/// `total_pages` pages
#[wasm_bindgen]
pub fn resolve_pages(page_order: &str, total_pages: u32) -> Vec<u32> {
    resolve_page_spec(page_order, total_pages)
}

/// Result of a compression run
#[wasm_bindgen]
pub struct CompressResultJs {
    pdf_bytes: Vec<u8>,
    original_size: f64,
    final_size: f64,
    kept_original: bool,
    transcoded_images: usize,
    skipped_images: usize,
    size_comparison: String,
    image_info_json: String,
}

#[wasm_bindgen]
impl CompressResultJs {
    /// Get the output PDF bytes
    #[wasm_bindgen(getter)]
    pub fn pdf_bytes(&self) -> Vec<u8> {
        self.pdf_bytes.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn original_size(&self) -> f64 {
        self.original_size
    }

    #[wasm_bindgen(getter)]
    pub fn final_size(&self) -> f64 {
        self.final_size
    }

    /// True when the rewrite was not smaller and the input was returned
    #[wasm_bindgen(getter)]
    pub fn kept_original(&self) -> bool {
        self.kept_original
    }

    #[wasm_bindgen(getter)]
    pub fn transcoded_images(&self) -> usize {
        self.transcoded_images
    }

    #[wasm_bindgen(getter)]
    pub fn skipped_images(&self) -> usize {
        self.skipped_images
    }

    /// e.g. "512.00KB ➔ 230.15KB"
    #[wasm_bindgen(getter)]
    pub fn size_comparison(&self) -> String {
        self.size_comparison.clone()
    }

    /// Per-page image information of the output as a JSON string
    #[wasm_bindgen(getter)]
    pub fn image_info_json(&self) -> String {
        self.image_info_json.clone()
    }
}
