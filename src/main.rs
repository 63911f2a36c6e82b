//! PDF Compactor CLI
//!
//! Command-line interface for compressing and reorganizing PDFs.

use anyhow::Context;
use clap::{Parser, Subcommand};
use pdf_compactor::{
    file_ops::{compress_file, merge_files, organize_file, split_file},
    list_images, resolve_page_spec, CompressionTier, PdfDocument, Settings,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Shrink PDFs by recompressing their images and cleaning up their structure
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory results are written to (overrides the settings file)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compress a PDF
    Compress {
        input: PathBuf,

        /// less, recommended or extreme
        #[arg(short, long)]
        level: Option<CompressionTier>,

        /// Only keep these pages, in this order (e.g. "3,1-2")
        #[arg(short, long)]
        pages: Option<String>,

        /// Transcode worker threads
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Select, reorder or repeat pages
    Organize {
        input: PathBuf,

        /// Page order, e.g. "1,3-5,2"
        order: String,
    },
    /// Write every page in a range to its own PDF
    Split {
        input: PathBuf,

        #[arg(long)]
        start: Option<u32>,

        #[arg(long)]
        end: Option<u32>,
    },
    /// Concatenate PDFs in the order given
    Merge {
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<PathBuf>,
    },
    /// List the images of a PDF page by page
    Info { input: PathBuf },
    /// Show how a page order resolves against a document
    Pages { input: PathBuf, order: String },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut settings = match &args.config {
        Some(path) => {
            let settings = Settings::load(path)?;
            settings.ensure_dirs()?;
            settings
        }
        None => Settings::default(),
    };
    if let Some(dir) = &args.output_dir {
        settings.paths.download_dir = dir.clone();
    }

    match args.command {
        Command::Compress {
            input,
            level,
            pages,
            workers,
        } => {
            if let Some(workers) = workers {
                settings.compression.workers = workers;
            }
            let tier = level.unwrap_or(settings.compression.default_level);
            let (path, outcome) = compress_file(&settings, &input, tier, pages.as_deref())?;

            println!("Compression level: {}", outcome.tier);
            println!(
                "Images: {} found, {} transcoded, {} skipped",
                outcome.report.unique_images,
                outcome.report.transcoded_images,
                outcome.report.skipped_images.len()
            );
            println!("Size: {}", outcome.size_comparison());
            if outcome.kept_original {
                println!("Result was not smaller, the original file was kept");
            } else {
                println!("Reduced by {:.1}%", outcome.reduction_percent());
            }
            println!("Output saved to: {:?}", path);
        }
        Command::Organize { input, order } => {
            let path = organize_file(&settings, &input, &order)?;
            println!("Output saved to: {:?}", path);
        }
        Command::Split { input, start, end } => {
            let paths = split_file(&settings, &input, start, end)?;
            println!("Split into {} files:", paths.len());
            for path in paths {
                println!("  {:?}", path);
            }
        }
        Command::Merge { inputs } => {
            let path = merge_files(&settings, &inputs)?;
            println!("Output saved to: {:?}", path);
        }
        Command::Info { input } => print_images(&input)?,
        Command::Pages { input, order } => {
            let total = PdfDocument::load(&input)?.page_count();
            let pages: Vec<String> = resolve_page_spec(&order, total)
                .into_iter()
                .map(|index| (index + 1).to_string())
                .collect();
            println!("{} of {} pages: {}", pages.len(), total, pages.join(","));
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "pdf_compactor=debug"
    } else {
        "pdf_compactor=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_images(input: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(input).with_context(|| format!("read {}", input.display()))?;
    let pages = list_images(&bytes)?;

    if pages.is_empty() {
        println!("No images found");
        return Ok(());
    }

    for page in pages {
        println!("Page {}:", page.page_number);
        for image in page.images {
            println!(
                "  {} {} R: {}x{} {} ({} channels, {} alpha), {} bpc, {}, {}",
                image.object_id.0,
                image.object_id.1,
                image.width,
                image.height,
                image.color_space,
                image.channels,
                image.alpha,
                image.bits_per_component,
                image.filter,
                pdf_compactor::format_size(image.size_bytes as u64)
            );
        }
    }

    Ok(())
}
