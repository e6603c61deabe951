//! Pipeline configuration.
//!
//! All knobs live in explicit structs that are deserialized from YAML
//! (`config/data.yaml`) and passed into component constructors. Nothing in
//! this crate reads process-wide state, so the splitter and the transform
//! pipeline stay independently constructible in tests.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Probabilities and magnitudes for the randomized augmentation stage.
///
/// Each transform is gated by its own independent probability; the
/// magnitudes control how strong the transform is when it fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentationConfig {
    /// Chance of a horizontal flip.
    pub flip_p: f64,
    /// Chance of sharpening, and the upper bound of the sharpening factor
    /// (drawn uniformly from `[0, sharpen_max]`).
    pub sharpen_p: f64,
    pub sharpen_max: f64,
    /// Chance of additive Gaussian noise, and its standard deviation.
    pub noise_p: f64,
    pub noise_std: f64,
    /// Chance of a thin-plate-spline warp, and the control-point jitter in
    /// normalized coordinates.
    pub warp_p: f64,
    pub warp_scale: f64,
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self {
            flip_p: 0.5,
            sharpen_p: 0.5,
            sharpen_max: 0.5,
            noise_p: 0.2,
            noise_std: 0.1,
            warp_p: 0.2,
            warp_scale: 0.2,
        }
    }
}

impl AugmentationConfig {
    /// Gentler settings for per-epoch augmentation at training time, where
    /// the perturbations are re-rolled every pass over the data rather than
    /// baked into the stored tensors once.
    pub fn train_time() -> Self {
        Self {
            flip_p: 0.2,
            sharpen_p: 0.2,
            sharpen_max: 0.5,
            noise_p: 0.1,
            noise_std: 0.01,
            warp_p: 0.2,
            warp_scale: 0.2,
        }
    }
}

/// Configuration for the full preprocessing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Seed for every source of randomness in the run (shuffling, transform
    /// gating, noise, warps).
    pub seed: u64,
    /// Fraction of the dataset held out of training; the holdout is then
    /// halved positionally into validation and test.
    pub validation_split: f64,
    /// Hard cap on samples taken per class, in sorted-filename order.
    pub max_per_class: usize,
    /// Side length of the canonical square frame.
    pub image_size: i64,
    /// Intensity statistics for the final normalization step
    /// (`(x - mean) / std`), single channel.
    pub mean: f32,
    pub std: f32,
    pub augmentation: AugmentationConfig,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            validation_split: 0.2,
            max_per_class: 200,
            image_size: 512,
            mean: 0.0,
            std: 1.0,
            augmentation: AugmentationConfig::default(),
        }
    }
}

impl PreprocessConfig {
    /// Loads the config from a YAML file.
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
    fn test_defaults_match_reference_pipeline() {
        let config = PreprocessConfig::default();
        assert_eq!(config.image_size, 512);
        assert_eq!(config.max_per_class, 200);
        assert!((config.validation_split - 0.2).abs() < f64::EPSILON);
        assert!((config.augmentation.flip_p - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() -> Result<()> {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml")?;
        writeln!(file, "seed: 7\nvalidation_split: 0.3")?;

        let config = PreprocessConfig::from_yaml(file.path())?;
        assert_eq!(config.seed, 7);
        assert!((config.validation_split - 0.3).abs() < f64::EPSILON);
        // untouched fields keep their defaults
        assert_eq!(config.image_size, 512);
        Ok(())
    }

    #[test]
    fn test_missing_config_file_errors() {
        assert!(PreprocessConfig::from_yaml("no/such/config.yaml").is_err());
    }
}
