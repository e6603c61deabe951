//! `make_dataset`: fetch the raw archive (optional) and run the full
//! preprocessing pipeline.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use xray_preprocess::fetch::ArchiveFetcher;
use xray_preprocess::{PreprocessConfig, Preprocessor};

#[derive(Debug, Parser)]
#[command(about = "Download, preprocess and split the chest X-ray dataset")]
struct Args {
    /// URL of the dataset zip archive. When omitted, the input directory
    /// must already exist.
    #[arg(long)]
    url: Option<String>,

    /// Directory holding the downloaded archive and its extracted tree.
    #[arg(long, default_value = "data/raw")]
    raw_dir: PathBuf,

    /// File name the archive is stored under.
    #[arg(long, default_value = "chest_xray_dataset.zip")]
    archive_name: String,

    /// Name of the directory the archive extracts to, relative to raw_dir.
    #[arg(long, default_value = "chest_xray_dataset")]
    extracted_dir: String,

    /// Dataset root to preprocess. Defaults to the extracted directory.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output directory for the six split artifacts.
    #[arg(long, default_value = "data/processed")]
    out_dir: PathBuf,

    /// Pipeline configuration file.
    #[arg(long, default_value = "config/data.yaml")]
    config: PathBuf,

    /// Overrides the per-class sample cap from the config file.
    #[arg(long)]
    max_per_class: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = if args.config.is_file() {
        PreprocessConfig::from_yaml(&args.config)?
    } else {
        info!(config = %args.config.display(), "config file not found, using defaults");
        PreprocessConfig::default()
    };
    if let Some(cap) = args.max_per_class {
        config.max_per_class = cap;
    }

    let input = match (&args.url, &args.input) {
        (_, Some(input)) => input.clone(),
        (Some(url), None) => ArchiveFetcher::new().fetch(
            url,
            &args.raw_dir,
            &args.archive_name,
            &args.extracted_dir,
        )?,
        (None, None) => args.raw_dir.join(&args.extracted_dir),
    };

    let summary = Preprocessor::new(config).run(&input, &args.out_dir)?;
    info!(
        classes = ?summary.classes,
        train = summary.train,
        valid = summary.valid,
        test = summary.test,
        "preprocessing complete"
    );

    Ok(())
}
