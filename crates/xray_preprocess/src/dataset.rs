//! Tensor-backed dataset over the persisted split artifacts.
//!
//! Training consumes the six `.pt` files through this abstraction: a length,
//! random access by index, and an optional per-epoch transform that re-rolls
//! augmentation every time a sample is fetched.

use crate::error::PipelineError;
use crate::transforms::Transform;
use anyhow::{ensure, Result};
use std::path::Path;
use tch::{Kind, Tensor};

/// An in-memory dataset of `[N, 1, S, S]` images with `[N]` integer labels.
///
/// Samples are read-only once loaded; `get` returns shallow views plus
/// whatever the optional transform produces.
pub struct TensorDataset {
    images: Tensor,
    labels: Tensor,
    transform: Option<Box<dyn Transform<Tensor, Tensor>>>,
}

impl TensorDataset {
    /// Loads a dataset from a pair of persisted artifacts.
    pub fn load(images_path: &Path, labels_path: &Path) -> Result<Self, PipelineError> {
        let images = Tensor::load(images_path).map_err(|e| PipelineError::Persist {
            path: images_path.to_path_buf(),
            message: e.to_string(),
        })?;
        let labels = Tensor::load(labels_path).map_err(|e| PipelineError::Persist {
            path: labels_path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::from_tensors(images, labels.to_kind(Kind::Int64))
    }

    /// Builds a dataset from in-memory tensors, validating their shapes.
    pub fn from_tensors(images: Tensor, labels: Tensor) -> Result<Self, PipelineError> {
        let image_count = images.size().first().copied().unwrap_or(0);
        let label_count = labels.size().first().copied().unwrap_or(0);
        if images.size().len() != 4 || image_count != label_count {
            return Err(PipelineError::Persist {
                path: "<memory>".into(),
                message: format!(
                    "shape mismatch: images {:?} vs labels {:?}",
                    images.size(),
                    labels.size()
                ),
            });
        }
        Ok(Self {
            images,
            labels,
            transform: None,
        })
    }

    /// Attaches a per-sample transform, applied on every `get`.
    pub fn with_transform(mut self, transform: impl Transform<Tensor, Tensor> + 'static) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.images.size()[0] as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches `(image, label)` for a sample index.
    pub fn get(&self, index: usize) -> Result<(Tensor, Tensor)> {
        ensure!(
            index < self.len(),
            "Sample index {} out of bounds for dataset of size {}",
            index,
            self.len()
        );
        let index = index as i64;
        let mut image = self.images.get(index);
        if let Some(transform) = &self.transform {
            image = transform.apply(image)?;
        }
        Ok((image, self.labels.get(index)))
    }

    /// Mean and standard deviation of all pixel intensities; handy for
    /// picking normalization statistics.
    pub fn mean_std(&self) -> Result<(f64, f64)> {
        ensure!(!self.is_empty(), "Cannot compute statistics of an empty dataset");
        let mean = self.images.mean(Kind::Float).double_value(&[]);
        let std = self.images.std(true).double_value(&[]);
        Ok((mean, std))
    }
}
