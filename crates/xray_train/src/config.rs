//! Training configuration, loaded from `config/train.yaml`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Dropout probability before the final classification layer.
    pub dropout: f64,
    pub num_classes: i64,
    /// Accepted for config compatibility; the in-process batch loader is
    /// single-threaded and ignores it.
    pub num_workers: usize,
    /// Seed for the per-epoch shuffle and weight initialization.
    pub seed: u64,
    /// Side length of the canonical input frame the preprocessing pipeline
    /// produced.
    pub image_size: i64,
    /// Re-roll gentle augmentation on every training sample fetch.
    pub augment: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 5,
            batch_size: 16,
            learning_rate: 1e-3,
            dropout: 0.2,
            num_classes: 3,
            num_workers: 0,
            seed: 1,
            image_size: 512,
            augment: true,
        }
    }
}

impl TrainConfig {
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_yaml_fills_defaults() -> Result<()> {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml")?;
        writeln!(file, "epochs: 20\nlearning_rate: 0.01")?;

        let config = TrainConfig::from_yaml(file.path())?;
        assert_eq!(config.epochs, 20);
        assert!((config.learning_rate - 0.01).abs() < f64::EPSILON);
        assert_eq!(config.batch_size, 16);
        Ok(())
    }
}
