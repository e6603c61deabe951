//! Minibatch assembly over a [`TensorDataset`].
//!
//! The loader is single-threaded: worker-level prefetch belongs to whatever
//! framework consumes the artifacts, not to this crate. A `Sampler` decides
//! the visit order per epoch, and samples are stacked along dim 0.

use anyhow::{ensure, Result};
use tch::Tensor;
use xray_preprocess::sampler::Sampler;
use xray_preprocess::TensorDataset;

/// Batches `(images, labels)` pairs out of a dataset in sampler order.
pub struct BatchLoader<'a, S> {
    dataset: &'a TensorDataset,
    sampler: S,
    batch_size: usize,
    drop_last: bool,
}

impl<'a, S> BatchLoader<'a, S>
where
    S: Sampler<Item = usize>,
{
    pub fn new(
        dataset: &'a TensorDataset,
        sampler: S,
        batch_size: usize,
        drop_last: bool,
    ) -> Result<Self> {
        ensure!(batch_size > 0, "Batch size must be positive");
        Ok(Self {
            dataset,
            sampler,
            batch_size,
            drop_last,
        })
    }

    /// Number of batches an epoch yields.
    pub fn batches_per_epoch(&self) -> usize {
        let n = self.dataset.len();
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }

    /// Iterates one epoch of stacked `(images, labels)` batches.
    ///
    /// Images come out as `[B, 1, S, S]`, labels as `[B]`. The dataset's
    /// per-sample transform (if any) re-rolls on every fetch, so augmented
    /// views differ between epochs.
    pub fn iter(&self, epoch: usize) -> impl Iterator<Item = Result<(Tensor, Tensor)>> + '_ {
        let order: Vec<usize> = self.sampler.iter(epoch).collect();
        let chunks: Vec<Vec<usize>> = order
            .chunks(self.batch_size)
            .filter(|chunk| !self.drop_last || chunk.len() == self.batch_size)
            .map(<[usize]>::to_vec)
            .collect();

        chunks.into_iter().map(move |chunk| {
            let mut images = Vec::with_capacity(chunk.len());
            let mut labels = Vec::with_capacity(chunk.len());
            for index in chunk {
                let (image, label) = self.dataset.get(index)?;
                images.push(image);
                labels.push(label);
            }
            Ok((Tensor::stack(&images, 0), Tensor::stack(&labels, 0)))
        })
    }
}
