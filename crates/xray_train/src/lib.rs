//! Convolutional chest X-ray classifier training.
//!
//! Consumes the six tensor artifacts the preprocessing pipeline persists,
//! trains [`model::XrayClassifier`] with per-epoch metrics pushed through an
//! [`tracker::ExperimentTracker`], and optionally uploads the resulting
//! artifacts to blob storage.

pub mod config;
pub mod loader;
pub mod model;
pub mod tracker;
pub mod train;
pub mod upload;

pub use config::TrainConfig;
pub use loader::BatchLoader;
pub use model::XrayClassifier;
pub use tracker::{ExperimentTracker, JsonlTracker, NoopTracker};
pub use train::{TrainReport, Trainer};
pub use upload::{BlobUploader, HttpBlobUploader};
