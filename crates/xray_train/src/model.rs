//! The convolutional chest X-ray classifier.

use anyhow::{ensure, Result};
use tch::nn::{self, ConvConfig, ModuleT};
use tch::Tensor;

/// Five-layer convolutional classifier: two conv/pool stages followed by
/// three fully connected layers, dropout before the final projection.
///
/// Input is `[B, 1, S, S]` where `S` is the canonical frame size the
/// preprocessing pipeline produced; output is `[B, num_classes]` logits.
#[derive(Debug)]
pub struct XrayClassifier {
    conv1: nn::Conv2D,
    conv2: nn::Conv2D,
    fc1: nn::Linear,
    fc2: nn::Linear,
    fc3: nn::Linear,
    dropout: f64,
}

impl XrayClassifier {
    /// Builds the network in the given variable store path.
    ///
    /// `image_size` must be at least 14 so that two 5x5 convolutions with
    /// 2x2 pooling leave a positive spatial extent.
    pub fn new(vs: &nn::Path, num_classes: i64, dropout: f64, image_size: i64) -> Result<Self> {
        ensure!(num_classes > 1, "Need at least two classes (got {})", num_classes);
        ensure!(
            (0.0..1.0).contains(&dropout),
            "Dropout must be in [0.0, 1.0) (got {})",
            dropout
        );
        ensure!(
            image_size >= 14,
            "Input frame of {}px is too small for this architecture",
            image_size
        );

        // spatial extent after each conv (kernel 5) + 2x2 max-pool stage
        let after_stage1 = (image_size - 4) / 2;
        let after_stage2 = (after_stage1 - 4) / 2;
        let fc_in = 16 * after_stage2 * after_stage2;

        Ok(Self {
            conv1: nn::conv2d(vs / "conv1", 1, 6, 5, ConvConfig::default()),
            conv2: nn::conv2d(vs / "conv2", 6, 16, 5, ConvConfig::default()),
            fc1: nn::linear(vs / "fc1", fc_in, 120, Default::default()),
            fc2: nn::linear(vs / "fc2", 120, 84, Default::default()),
            fc3: nn::linear(vs / "fc3", 84, num_classes, Default::default()),
            dropout,
        })
    }
}

impl ModuleT for XrayClassifier {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        xs.apply(&self.conv1)
            .relu()
            .max_pool2d_default(2)
            .apply(&self.conv2)
            .relu()
            .max_pool2d_default(2)
            .flatten(1, -1)
            .apply(&self.fc1)
            .relu()
            .apply(&self.fc2)
            .relu()
            .dropout(self.dropout, train)
            .apply(&self.fc3)
    }
}
