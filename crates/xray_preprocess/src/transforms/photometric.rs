use crate::rng::{pipeline_gen_bool, pipeline_gen_range};
use crate::transforms::Transform;
use anyhow::{ensure, Context, Result};
use tch::{Device, Kind, Tensor};

// ============================================================================
// Normalize
// ============================================================================

/// Normalizes tensors using channel-wise statistics.
///
/// # Arguments:
/// - `mean`: per-channel means
/// - `std`: per-channel standard deviations
/// The dimensions of mean and std must match the input tensor's channel
/// count.
///
/// # Mathematical Operation:
/// ```text
/// output[c,h,w] = (input[c,h,w] - mean[c]) / std[c]
/// ```
#[derive(Debug)]
pub struct Normalize {
    mean: Vec<f32>,
    std: Vec<f32>,
}

impl Normalize {
    /// Creates new normalization parameters.
    pub fn new(mean: &[f32], std: &[f32]) -> Result<Self> {
        ensure!(!mean.is_empty(), "Normalization mean cannot be empty");
        ensure!(
            mean.len() == std.len(),
            "The mean and standard deviation for normalization must match in dimension \
             (mean has {} entries, std has {})",
            mean.len(),
            std.len()
        );
        ensure!(
            std.iter().all(|s| *s != 0.0),
            "Normalization std must be non-zero"
        );
        Ok(Self {
            mean: mean.to_vec(),
            std: std.to_vec(),
        })
    }

    /// Single-channel intensity normalization.
    pub fn single(mean: f32, std: f32) -> Result<Self> {
        Self::new(&[mean], &[std])
    }
}

impl Transform<Tensor, Tensor> for Normalize {
    fn apply(&self, tensor: Tensor) -> Result<Tensor> {
        let (num_channels, _height, _width) = tensor
            .size3()
            .context("Input must be 3D tensor [C, H, W]")?;

        ensure!(
            num_channels as usize == self.mean.len(),
            "Channel count mismatch: input has {} channels but normalization expects {}",
            num_channels,
            self.mean.len()
        );

        let mean_t = Tensor::from_slice(&self.mean)
            .reshape(&[num_channels, 1, 1])
            .to_kind(tensor.kind());

        let std_t = Tensor::from_slice(&self.std)
            .reshape(&[num_channels, 1, 1])
            .to_kind(tensor.kind());

        Ok((tensor - mean_t) / std_t)
    }
}

// ============================================================================
// RandomSharpness
// ============================================================================

/// Randomly sharpens an image, gated by probability `p`.
///
/// When the transform fires, a factor is drawn uniformly from
/// `[0, max_factor]` and an unsharp mask is applied:
/// `output = input + factor * (input - blurred)`, clamped to [0, 1].
/// The blur is the standard 3x3 smoothing kernel with border pixels left to
/// the convolution's zero padding.
#[derive(Debug)]
pub struct RandomSharpness {
    p: f64,
    max_factor: f32,
}

impl RandomSharpness {
    pub fn new(p: f64, max_factor: f32) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&p),
            "Probability must be in [0.0, 1.0] range (got {})",
            p
        );
        ensure!(
            max_factor >= 0.0,
            "Sharpness factor must be non-negative (got {})",
            max_factor
        );
        Ok(Self { p, max_factor })
    }

    fn sharpen(img: &Tensor, factor: f64) -> Result<Tensor> {
        let (channels, _h, _w) = img.size3()?;

        let kernel = (Tensor::from_slice(&[1f32, 1., 1., 1., 5., 1., 1., 1., 1.]) / 13.0)
            .reshape(&[1, 1, 3, 3])
            .repeat(&[channels, 1, 1, 1]);

        let blurred = img
            .unsqueeze(0)
            .conv2d(&kernel, None::<Tensor>, &[1], &[1], &[1], channels)
            .squeeze_dim(0);

        Ok((img + (img - &blurred) * factor).clamp(0.0, 1.0))
    }
}

impl Transform<Tensor, Tensor> for RandomSharpness {
    fn apply(&self, img: Tensor) -> Result<Tensor> {
        if !pipeline_gen_bool(self.p) {
            return Ok(img);
        }
        let factor = f64::from(pipeline_gen_range(0.0, self.max_factor.max(f32::EPSILON)));
        Self::sharpen(&img, factor)
    }
}

// ============================================================================
// RandomGaussianNoise
// ============================================================================

/// Adds zero-mean Gaussian noise with the configured standard deviation,
/// gated by probability `p`. Output stays clamped to [0, 1].
///
/// The noise itself is drawn from the torch RNG; seed it through
/// `tch::manual_seed` (the pipeline does this once per run).
#[derive(Debug)]
pub struct RandomGaussianNoise {
    p: f64,
    std: f64,
}

impl RandomGaussianNoise {
    pub fn new(p: f64, std: f64) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&p),
            "Probability must be in [0.0, 1.0] range (got {})",
            p
        );
        ensure!(std >= 0.0, "Noise std must be non-negative (got {})", std);
        Ok(Self { p, std })
    }
}

impl Transform<Tensor, Tensor> for RandomGaussianNoise {
    fn apply(&self, img: Tensor) -> Result<Tensor> {
        if self.std == 0.0 || !pipeline_gen_bool(self.p) {
            return Ok(img);
        }
        let noise = Tensor::randn(&img.size(), (Kind::Float, Device::Cpu)) * self.std;
        Ok((img + noise).clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seed_pipeline_rng;

    #[test]
    fn test_normalize_centers_data() -> Result<()> {
        let tensor = Tensor::ones(&[3, 32, 32], (Kind::Float, Device::Cpu));
        let norm = Normalize::new(&[1.0; 3], &[1.0; 3])?;

        let normalized = norm.apply(tensor)?;
        for c in 0..3 {
            let channel_mean = normalized.select(0, c).mean(Kind::Float);
            assert!(channel_mean.double_value(&[]).abs() < 1e-5);
        }
        Ok(())
    }

    #[test]
    fn test_normalize_single_channel() -> Result<()> {
        let tensor = Tensor::full(&[1, 4, 4], 0.5, (Kind::Float, Device::Cpu));
        let norm = Normalize::single(0.25, 0.5)?;

        let normalized = norm.apply(tensor)?;
        assert!((normalized.double_value(&[0, 0, 0]) - 0.5).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_normalize_rejects_channel_mismatch() -> Result<()> {
        let tensor = Tensor::ones(&[3, 4, 4], (Kind::Float, Device::Cpu));
        let norm = Normalize::single(0.0, 1.0)?;
        assert!(norm.apply(tensor).is_err());
        Ok(())
    }

    #[test]
    fn test_normalize_rejects_zero_std() {
        assert!(Normalize::new(&[0.0], &[0.0]).is_err());
    }

    #[test]
    fn test_sharpen_amplifies_contrast() -> Result<()> {
        // a bright dot on black gets brighter neighborhood contrast
        let img = Tensor::zeros(&[1, 5, 5], (Kind::Float, Device::Cpu));
        let _ = img.select(1, 2).select(1, 2).fill_(0.5);

        let sharpened = RandomSharpness::sharpen(&img, 1.0)?;
        assert_eq!(sharpened.size(), vec![1, 5, 5]);
        assert!(sharpened.double_value(&[0, 2, 2]) > 0.5);
        Ok(())
    }

    #[test]
    fn test_sharpen_identity_at_zero_factor() -> Result<()> {
        let img = Tensor::rand(&[3, 8, 8], (Kind::Float, Device::Cpu)).clamp(0.0, 1.0);
        let sharpened = RandomSharpness::sharpen(&img, 0.0)?;
        assert!(sharpened.allclose(&img, 1e-5, 1e-6, false));
        Ok(())
    }

    #[test]
    fn test_noise_respects_gate() -> Result<()> {
        seed_pipeline_rng(42);
        let img = Tensor::rand(&[1, 8, 8], (Kind::Float, Device::Cpu));

        let never = RandomGaussianNoise::new(0.0, 0.1)?;
        assert!(never.apply(img.shallow_clone())?.equal(&img));

        let always = RandomGaussianNoise::new(1.0, 0.1)?;
        assert!(!always.apply(img.shallow_clone())?.equal(&img));
        Ok(())
    }

    #[test]
    fn test_noise_stays_in_unit_range() -> Result<()> {
        seed_pipeline_rng(42);
        let img = Tensor::rand(&[1, 16, 16], (Kind::Float, Device::Cpu));
        let noise = RandomGaussianNoise::new(1.0, 0.5)?;

        let noisy = noise.apply(img)?;
        assert!(noisy.f_min()?.double_value(&[]) >= 0.0);
        assert!(noisy.f_max()?.double_value(&[]) <= 1.0);
        Ok(())
    }
}
