//! Deterministic stratified splitting.
//!
//! The split runs in two stages. Stage one is stratified: each class is
//! shuffled with the seeded RNG and a fraction of it is held out, so every
//! class appears in both partitions in roughly the requested ratio. Stage
//! two is positional: the holdout is halved as-is, first half to validation
//! and second half to test, with no re-stratification. The holdout ordering
//! the second stage sees is the permutation stage one produced, so the
//! halves are usually balanced but that is inherited behavior, not a
//! guarantee.

use crate::error::PipelineError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Three disjoint index sets partitioning `0..N`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub valid: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    /// Total number of indices across the three partitions.
    pub fn len(&self) -> usize {
        self.train.len() + self.valid.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partitions labeled sample indices into train/validation/test.
///
/// Identical `(labels, validation_split, seed)` always produce identical
/// partitions; that determinism is the component's core contract.
#[derive(Debug, Clone)]
pub struct StratifiedSplitter {
    validation_split: f64,
    seed: u64,
}

impl StratifiedSplitter {
    pub fn new(validation_split: f64, seed: u64) -> Result<Self, PipelineError> {
        if !(validation_split > 0.0 && validation_split < 1.0) {
            return Err(PipelineError::Split(format!(
                "validation_split must be in (0, 1), got {validation_split}"
            )));
        }
        Ok(Self {
            validation_split,
            seed,
        })
    }

    /// Splits `0..labels.len()` into three disjoint index sets.
    ///
    /// Per class of size `n`, `round(validation_split * n)` samples are held
    /// out, clamped to `[1, n - 1]`; a single-sample class stays entirely in
    /// train. Classes are visited in ascending label order so the RNG stream
    /// does not depend on input ordering.
    pub fn split(&self, labels: &[i64]) -> Result<SplitIndices, PipelineError> {
        if labels.is_empty() {
            return Err(PipelineError::Split(
                "cannot split an empty dataset".to_string(),
            ));
        }

        let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (index, label) in labels.iter().enumerate() {
            by_class.entry(*label).or_default().push(index);
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut train = Vec::new();
        let mut holdout = Vec::new();

        for (_label, mut indices) in by_class {
            let class_size = indices.len();
            indices.shuffle(&mut rng);

            let take = if class_size < 2 {
                0
            } else {
                let rounded = (self.validation_split * class_size as f64).round() as usize;
                rounded.clamp(1, class_size - 1)
            };

            holdout.extend(indices.drain(..take));
            train.extend(indices);
        }

        if holdout.is_empty() {
            return Err(PipelineError::Split(
                "holdout is empty; every class has fewer than 2 samples".to_string(),
            ));
        }

        // Final permutations: the holdout ordering here is what the
        // positional second stage inherits.
        train.shuffle(&mut rng);
        holdout.shuffle(&mut rng);

        let half = holdout.len() / 2;
        let test = holdout.split_off(half);
        let valid = holdout;

        Ok(SplitIndices { train, valid, test })
    }
}
