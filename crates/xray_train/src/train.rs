//! The training loop.
//!
//! Adam over cross-entropy, per-epoch train and validation metrics pushed
//! through the experiment tracker, and a best-validation-accuracy
//! checkpoint written whenever the score improves.

use crate::config::TrainConfig;
use crate::loader::BatchLoader;
use crate::model::XrayClassifier;
use crate::tracker::ExperimentTracker;
use anyhow::{Context, Result};
use std::path::Path;
use tch::nn::{self, ModuleT, OptimizerConfig};
use tch::{Device, Kind, Tensor};
use tracing::info;
use xray_preprocess::sampler::{RandomSampler, SequentialSampler};
use xray_preprocess::TensorDataset;

/// Outcome of a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    pub epochs: usize,
    pub best_accuracy: f64,
}

pub struct Trainer {
    config: TrainConfig,
}

impl Trainer {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Trains on `train_set`, validates on `valid_set`, and writes the best
    /// checkpoint to `model_out`.
    pub fn fit(
        &self,
        train_set: &TensorDataset,
        valid_set: &TensorDataset,
        tracker: &mut dyn ExperimentTracker,
        model_out: &Path,
    ) -> Result<TrainReport> {
        tch::manual_seed(self.config.seed as i64);

        let vs = nn::VarStore::new(Device::Cpu);
        let model = XrayClassifier::new(
            &vs.root(),
            self.config.num_classes,
            self.config.dropout,
            self.config.image_size,
        )?;
        let mut optimizer = nn::Adam::default()
            .build(&vs, self.config.learning_rate)
            .context("Failed to build optimizer")?;

        let train_sampler =
            RandomSampler::new(train_set.len(), false, None, self.config.seed)?;
        let train_loader =
            BatchLoader::new(train_set, train_sampler, self.config.batch_size, false)?;
        let valid_loader = BatchLoader::new(
            valid_set,
            SequentialSampler::new(valid_set.len()),
            self.config.batch_size,
            false,
        )?;

        let mut best_accuracy = 0.0;
        for epoch in 0..self.config.epochs {
            let mut losses = Vec::new();
            let mut correct = 0i64;
            let mut total = 0i64;

            for batch in train_loader.iter(epoch) {
                let (images, labels) = batch?;
                let logits = model.forward_t(&images, true);
                let loss = logits.cross_entropy_for_logits(&labels);
                optimizer.backward_step(&loss);

                losses.push(loss.double_value(&[]));
                correct += count_correct(&logits, &labels);
                total += labels.size()[0];
            }

            let train_loss = losses.iter().sum::<f64>() / losses.len().max(1) as f64;
            let train_acc = correct as f64 / total.max(1) as f64;
            tracker.log_scalar(epoch, "train_loss", train_loss)?;
            tracker.log_scalar(epoch, "train_acc", train_acc)?;

            let (valid_loss, valid_acc) =
                tch::no_grad(|| evaluate(&model, &valid_loader))?;
            tracker.log_scalar(epoch, "valid_loss", valid_loss)?;
            tracker.log_scalar(epoch, "valid_acc", valid_acc)?;

            info!(
                epoch,
                train_loss, train_acc, valid_loss, valid_acc, "epoch complete"
            );

            if valid_acc >= best_accuracy {
                best_accuracy = valid_acc;
                vs.save(model_out).with_context(|| {
                    format!("Failed to save checkpoint: {}", model_out.display())
                })?;
                info!(valid_acc, "saved new best checkpoint");
            }
        }

        Ok(TrainReport {
            epochs: self.config.epochs,
            best_accuracy,
        })
    }
}

fn count_correct(logits: &Tensor, labels: &Tensor) -> i64 {
    logits
        .argmax(-1, false)
        .eq_tensor(labels)
        .sum(Kind::Int64)
        .int64_value(&[])
}

fn evaluate<S>(model: &XrayClassifier, loader: &BatchLoader<'_, S>) -> Result<(f64, f64)>
where
    S: xray_preprocess::sampler::Sampler<Item = usize>,
{
    let mut losses = Vec::new();
    let mut correct = 0i64;
    let mut total = 0i64;

    for batch in loader.iter(0) {
        let (images, labels) = batch?;
        let logits = model.forward_t(&images, false);
        losses.push(logits.cross_entropy_for_logits(&labels).double_value(&[]));
        correct += count_correct(&logits, &labels);
        total += labels.size()[0];
    }

    let loss = losses.iter().sum::<f64>() / losses.len().max(1) as f64;
    let accuracy = correct as f64 / total.max(1) as f64;
    Ok((loss, accuracy))
}
