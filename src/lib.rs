//! PDF Compactor Library
//!
//! Adaptive PDF recompression shared between the CLI and WASM targets.
//!
//! Every image resource reached from the page tree is transcoded at most once
//! under the policy of the chosen [`CompressionTier`], the document is cleaned
//! up structurally, and the result is only kept when it is strictly smaller
//! than the input. Page-level tools (organize, split, merge) build on the same
//! page selector.

mod cleanup;
pub mod compress;
pub mod config;
pub mod document;
pub mod error;
pub mod organize;
pub mod pages;
pub mod rewrite;
pub mod tier;
pub mod transcode;
pub mod upload;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use compress::{compress, compress_pages, compress_with, format_size, CompressionOutcome};
pub use config::Settings;
pub use document::{CleanupOptions, CleanupStats, ImageInfo, PageImages, PdfDocument};
pub use error::{CompactError, Result};
pub use organize::{merge, organize, split, split_range, SplitPage};
pub use pages::resolve_page_spec;
pub use rewrite::{rewrite, rewrite_with, RewriteOptions, RewriteReport};
pub use tier::{CompressionTier, ImagePolicy};
pub use transcode::{ImageResource, JpegTranscoder, SkipReason, TranscodeOutcome, Transcoder};
pub use upload::Upload;

/// Images of a PDF, grouped by page
pub fn list_images(pdf_bytes: &[u8]) -> Result<Vec<PageImages>> {
    Ok(PdfDocument::load_mem(pdf_bytes)?.image_inventory())
}

#[cfg(not(target_arch = "wasm32"))]
pub mod file_ops {
    //! Path-based wrappers writing into the configured download directory

    use super::*;
    use crate::upload::base_name;
    use std::path::{Path, PathBuf};
    use tracing::{info, instrument};

    fn read_input(path: &Path) -> Result<(Vec<u8>, String)> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Upload::from_parts(Some(&name), Some(bytes)).into_valid()
    }

    fn write_output(settings: &Settings, file_name: String, bytes: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&settings.paths.download_dir)?;
        let path = settings.paths.download_dir.join(file_name);
        std::fs::write(&path, bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "Wrote output");
        Ok(path)
    }

    /// Compress `input_path` into `{base}_compressed.pdf`.
    ///
    /// With a page order, the selected pages are organized first.
    #[instrument(skip_all, fields(input = %input_path.display(), tier = %tier))]
    pub fn compress_file(
        settings: &Settings,
        input_path: &Path,
        tier: CompressionTier,
        page_order: Option<&str>,
    ) -> Result<(PathBuf, CompressionOutcome)> {
        let (bytes, name) = read_input(input_path)?;
        let options = settings.rewrite_options();

        let outcome = match page_order {
            Some(order) => compress_pages(&bytes, order, tier, &options)?,
            None => compress(&bytes, tier, &options)?,
        };

        let path = write_output(
            settings,
            format!("{}_compressed.pdf", base_name(&name)),
            &outcome.bytes,
        )?;
        Ok((path, outcome))
    }

    /// Reorder pages of `input_path` into `{base}_organized.pdf`
    #[instrument(skip_all, fields(input = %input_path.display()))]
    pub fn organize_file(
        settings: &Settings,
        input_path: &Path,
        page_order: &str,
    ) -> Result<PathBuf> {
        let (bytes, name) = read_input(input_path)?;
        let organized = organize(&bytes, page_order)?;
        write_output(
            settings,
            format!("{}_organized.pdf", base_name(&name)),
            &organized,
        )
    }

    /// Split `input_path` into `{base}_page_{n}.pdf` files
    #[instrument(skip_all, fields(input = %input_path.display()))]
    pub fn split_file(
        settings: &Settings,
        input_path: &Path,
        start: Option<u32>,
        end: Option<u32>,
    ) -> Result<Vec<PathBuf>> {
        let (bytes, name) = read_input(input_path)?;
        let base = base_name(&name);

        split_range(&bytes, start, end)?
            .into_iter()
            .map(|page| {
                write_output(
                    settings,
                    format!("{}_page_{}.pdf", base, page.page_number),
                    &page.bytes,
                )
            })
            .collect()
    }

    /// Merge the inputs in order into `Merged_{first}_and_others.pdf`
    #[instrument(skip_all, fields(documents = input_paths.len()))]
    pub fn merge_files(settings: &Settings, input_paths: &[PathBuf]) -> Result<PathBuf> {
        let inputs = input_paths
            .iter()
            .map(|path| read_input(path))
            .collect::<Result<Vec<_>>>()?;

        let first_name = match inputs.first() {
            Some((_, name)) => base_name(name).to_string(),
            None => return Err(CompactError::MissingUpload),
        };

        let slices: Vec<&[u8]> = inputs.iter().map(|(bytes, _)| bytes.as_slice()).collect();
        let merged = merge(&slices)?;

        write_output(
            settings,
            format!("Merged_{}_and_others.pdf", first_name),
            &merged,
        )
    }
}
