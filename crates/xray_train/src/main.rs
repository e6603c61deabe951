//! `train`: fit the classifier on preprocessed artifacts and optionally
//! upload the results.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use xray_preprocess::persist;
use xray_preprocess::transforms::Augmentation;
use xray_preprocess::{AugmentationConfig, TensorDataset};
use xray_train::upload::{upload_dir, HttpBlobUploader};
use xray_train::{JsonlTracker, TrainConfig, Trainer};

#[derive(Debug, Parser)]
#[command(about = "Train the chest X-ray classifier")]
struct Args {
    /// Directory holding the six preprocessed split artifacts.
    #[arg(long, default_value = "data/processed")]
    data_dir: PathBuf,

    /// Training configuration file.
    #[arg(long, default_value = "config/train.yaml")]
    config: PathBuf,

    /// Output directory for the checkpoint and the metrics file.
    #[arg(long, default_value = "models")]
    out_dir: PathBuf,

    /// Blob storage endpoint; when set, the output directory is uploaded
    /// after training.
    #[arg(long)]
    upload_endpoint: Option<String>,

    /// Object-name prefix for uploaded artifacts.
    #[arg(long, default_value = "xray-runs")]
    upload_prefix: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = if args.config.is_file() {
        TrainConfig::from_yaml(&args.config)?
    } else {
        info!(config = %args.config.display(), "config file not found, using defaults");
        TrainConfig::default()
    };

    info!(data_dir = %args.data_dir.display(), "loading datasets from disk");
    let mut train_set = TensorDataset::load(
        &persist::images_path(&args.data_dir, "train"),
        &persist::labels_path(&args.data_dir, "train"),
    )?;
    if config.augment {
        train_set = train_set.with_transform(Augmentation::new(&AugmentationConfig::train_time())?);
    }
    let valid_set = TensorDataset::load(
        &persist::images_path(&args.data_dir, "valid"),
        &persist::labels_path(&args.data_dir, "valid"),
    )?;

    std::fs::create_dir_all(&args.out_dir)?;
    let model_out = args.out_dir.join("model.pt");
    let mut tracker = JsonlTracker::create(args.out_dir.join("metrics.jsonl"))?;

    let report = Trainer::new(config).fit(&train_set, &valid_set, &mut tracker, &model_out)?;
    info!(
        epochs = report.epochs,
        best_accuracy = report.best_accuracy,
        "training complete"
    );

    if let Some(endpoint) = args.upload_endpoint {
        let uploader = HttpBlobUploader::new(endpoint);
        let uploaded = upload_dir(&uploader, &args.out_dir, &args.upload_prefix)?;
        info!(uploaded, "uploaded run artifacts");
    }

    Ok(())
}
