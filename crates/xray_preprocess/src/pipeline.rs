//! End-to-end preprocessing orchestration.
//!
//! ```text
//!  root/<class>/<file>          (Image Loader)
//!        ↓ ordered (path, label) pairs
//!  load → resize → tensor → grayscale      (canonicalization)
//!        ↓ [1, S, S] per image
//!  flip / sharpen / noise / warp           (augmentation, baked in once)
//!        ↓
//!  (x - mean) / std                        (normalization)
//!        ↓ stacked [N, 1, S, S]
//!  stratified split → {train, valid, test}
//!        ↓
//!  six .pt artifacts                       (persistence)
//! ```
//!
//! The run is single-threaded and holds the whole dataset tensor in memory;
//! peak usage scales linearly with `N * S * S`. Any unreadable image aborts
//! the run.

use crate::config::PreprocessConfig;
use crate::error::PipelineError;
use crate::loader;
use crate::persist;
use crate::rng::seed_pipeline_rng;
use crate::split::StratifiedSplitter;
use crate::transforms::{
    Augmentation, LoadImage, Normalize, Resize, ToGrayscale, ToTensor, Transform,
};
use image::imageops::FilterType;
use std::path::{Path, PathBuf};
use tch::{Device, Kind, Tensor};
use tracing::{debug, info};

/// Per-split sample counts reported by a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSummary {
    pub classes: Vec<String>,
    pub train: usize,
    pub valid: usize,
    pub test: usize,
}

impl SplitSummary {
    pub fn total(&self) -> usize {
        self.train + self.valid + self.test
    }
}

/// Runs the full preprocessing pipeline for one dataset.
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Preprocesses every image under `root` and writes the six split
    /// artifacts into `out_dir`. Returns the per-split counts.
    pub fn run(&self, root: &Path, out_dir: &Path) -> Result<SplitSummary, PipelineError> {
        seed_pipeline_rng(self.config.seed);
        tch::manual_seed(self.config.seed as i64);

        let scan = loader::scan_dataset(root, self.config.max_per_class)?;
        info!(
            classes = scan.classes.len(),
            samples = scan.samples.len(),
            "scanned dataset root"
        );

        let (images, labels) = self.build_tensors(&scan.samples)?;

        let splitter = StratifiedSplitter::new(self.config.validation_split, self.config.seed)?;
        let indices = splitter.split(&labels)?;
        debug!(
            train = indices.train.len(),
            valid = indices.valid.len(),
            test = indices.test.len(),
            "stratified split complete"
        );

        let label_tensor = Tensor::from_slice(&labels);
        for (name, subset) in [
            ("train", &indices.train),
            ("test", &indices.test),
            ("valid", &indices.valid),
        ] {
            let index: Vec<i64> = subset.iter().map(|&i| i as i64).collect();
            let index = Tensor::from_slice(&index);
            persist::write_split(
                out_dir,
                name,
                &images.index_select(0, &index),
                &label_tensor.index_select(0, &index),
            )?;
        }
        info!(out_dir = %out_dir.display(), "wrote split artifacts");

        Ok(SplitSummary {
            classes: scan.classes.names().to_vec(),
            train: indices.train.len(),
            valid: indices.valid.len(),
            test: indices.test.len(),
        })
    }

    /// Applies the per-image transform chain and stacks the results into the
    /// dataset tensor, together with the label vector.
    fn build_tensors(
        &self,
        samples: &[(PathBuf, i64)],
    ) -> Result<(Tensor, Vec<i64>), PipelineError> {
        let size = self.config.image_size;
        let canonicalize = LoadImage::new()
            .then(Resize::new(size as u32, FilterType::Triangle).map_err(config_error)?)
            .then(ToTensor)
            .then(ToGrayscale::default());
        let augment = Augmentation::new(&self.config.augmentation).map_err(config_error)?;
        let normalize =
            Normalize::single(self.config.mean, self.config.std).map_err(config_error)?;
        let pipeline = canonicalize.then(augment).then(normalize);

        let count = samples.len() as i64;
        let images = Tensor::zeros(&[count, 1, size, size], (Kind::Float, Device::Cpu));
        let mut labels = Vec::with_capacity(samples.len());

        for (i, (path, label)) in samples.iter().enumerate() {
            let tensor = pipeline
                .apply(path.clone())
                .map_err(|e| PipelineError::Decode {
                    path: path.clone(),
                    message: format!("{e:#}"),
                })?;
            images.get(i as i64).copy_(&tensor);
            labels.push(*label);
        }

        Ok((images, labels))
    }
}

fn config_error(err: anyhow::Error) -> PipelineError {
    PipelineError::Config(format!("{err:#}"))
}
