//! vessel-ocr command line
//!
//! Extracts tables, nozzles and notes from drawing page images.
//!
//! # Usage
//!
//! ```bash
//! vessel-ocr analyze page-3.png --page 3 --model-dir models --output page-3.json
//! vessel-ocr analyze page-3.png --annotate page-3-annotated.png --device cuda:0
//! vessel-ocr check-models --model-dir models
//! ```

mod cli;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "vessel-ocr")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Structured data extraction from vessel drawing pages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one page image and print its JSON record
    Analyze {
        /// Page image to analyze
        image: PathBuf,

        /// Page number recorded in the result
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Write the JSON record here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Write the annotated page image here
        #[arg(long)]
        annotate: Option<PathBuf>,

        /// JSON file with analyzer settings
        #[arg(long = "config", env = "VESSEL_CONFIG")]
        config_file: Option<PathBuf>,

        /// Directory holding the model artifacts
        #[arg(long = "model-dir", default_value = "models", env = "VESSEL_MODEL_DIR")]
        model_dir: PathBuf,

        /// Device to use (cpu, cuda, cuda:0, etc.)
        #[arg(long, default_value = "cpu", env = "VESSEL_DEVICE")]
        device: String,

        /// Note extraction service endpoint
        #[arg(long = "notes-url", env = "VESSEL_NOTES_URL")]
        notes_url: Option<String>,

        /// Number of worker threads (defaults to rayon's global pool)
        #[arg(long, env = "VESSEL_WORKERS")]
        workers: Option<usize>,

        /// Pretty-print the JSON record
        #[arg(long)]
        pretty: bool,
    },
    /// Check that every model artifact is present
    CheckModels {
        /// Directory holding the model artifacts
        #[arg(long = "model-dir", default_value = "models", env = "VESSEL_MODEL_DIR")]
        model_dir: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    vessel_ocr::utils::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            image,
            page,
            output,
            annotate,
            config_file,
            model_dir,
            device,
            notes_url,
            workers,
            pretty,
        } => {
            let run = config::RunConfig::resolve(config::Overrides {
                config_file,
                model_dir,
                device,
                notes_url,
                workers,
                annotate,
            })?;

            info!("Analyzing {} as page {}", image.display(), page);
            cli::analyze_page(&run, &image, page, output.as_deref(), pretty)?;
        }
        Commands::CheckModels { model_dir } => {
            if !cli::check_models(&model_dir) {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
