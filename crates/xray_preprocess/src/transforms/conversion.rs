use crate::transforms::Transform;
use anyhow::{ensure, Context, Result};
use image::{DynamicImage, GenericImageView};
use tch::{Kind, Tensor};

// ============================================================================
// ToTensor
// ============================================================================

/// Converts an image to a channel-first f32 tensor in [0.0, 1.0] range.
///
/// Channel Handling
/// | Input Format  | Output Shape |
/// |---------------|--------------|
/// | Grayscale (L) | `[1, H, W]`  |
/// | RGB           | `[3, H, W]`  |
/// | RGBA          | `[4, H, W]`  |
/// | Other         | `[3, H, W]`  |
/// Note: CMYK, BGR, etc. undergo implicit conversion to RGB. For precise
/// format control, pre-convert your images.
#[derive(Debug)]
pub struct ToTensor;

impl ToTensor {
    /// Interleaved `H*W*C` bytes to a contiguous `[C, H, W]` tensor.
    fn chw_from_raw(raw: &[u8], channels: i64, height: i64, width: i64) -> Tensor {
        Tensor::from_slice(raw)
            .reshape(&[height, width, channels])
            .permute(&[2, 0, 1])
            .contiguous()
    }
}

impl Transform<DynamicImage, Tensor> for ToTensor {
    fn apply(&self, img: DynamicImage) -> Result<Tensor> {
        let (width, height) = img.dimensions();
        ensure!(
            width > 0 && height > 0,
            "Image dimensions must be positive (got {}x{})",
            width,
            height
        );
        let (h, w) = (height as i64, width as i64);

        let tensor = match img {
            DynamicImage::ImageLuma8(img) => Tensor::from_slice(img.as_raw()).reshape(&[1, h, w]),
            DynamicImage::ImageRgb8(img) => Self::chw_from_raw(img.as_raw(), 3, h, w),
            DynamicImage::ImageRgba8(img) => Self::chw_from_raw(img.as_raw(), 4, h, w),
            // Everything else goes through RGB conversion
            _ => Self::chw_from_raw(img.to_rgb8().as_raw(), 3, h, w),
        };

        // Scale to [0,1] range
        tensor
            .to_kind(Kind::Float)
            .f_div_scalar(255.0)
            .context("Failed to scale tensor values")
    }
}

// ============================================================================
// SelectNonConstantChannels
// ============================================================================

/// Channel-selection policy for malformed multi-layer images.
///
/// Some scans in the wild carry dead layers (a channel where every pixel has
/// the same value, typically an alpha plane or an export artifact). This
/// policy keeps the first `max` channels whose content is non-constant,
/// where "constant" means every pixel equals that channel's top-left pixel.
/// If no channel qualifies, channel 0 is kept so the image stays
/// representable.
#[derive(Debug, Clone)]
pub struct SelectNonConstantChannels {
    max: usize,
}

impl SelectNonConstantChannels {
    pub fn new(max: usize) -> Result<Self> {
        ensure!(max > 0, "Channel cap must be positive (got {})", max);
        Ok(Self { max })
    }
}

impl Default for SelectNonConstantChannels {
    fn default() -> Self {
        Self { max: 3 }
    }
}

impl Transform<Tensor, Tensor> for SelectNonConstantChannels {
    fn apply(&self, img: Tensor) -> Result<Tensor> {
        let (channels, _h, _w) = img
            .size3()
            .context("Channel selection expects a [C, H, W] tensor")?;

        let mut keep: Vec<i64> = Vec::new();
        for c in 0..channels {
            let channel = img.select(0, c);
            let reference = channel.double_value(&[0, 0]);
            let constant = channel.eq(reference).all().int64_value(&[]) != 0;
            if !constant {
                keep.push(c);
            }
            if keep.len() == self.max {
                break;
            }
        }
        if keep.is_empty() {
            keep.push(0);
        }

        Ok(img.index_select(0, &Tensor::from_slice(&keep)))
    }
}

// ============================================================================
// ToGrayscale
// ============================================================================

/// Reduces a `[C, H, W]` tensor to a single intensity channel `[1, H, W]`.
///
/// - 3 channels: Rec.601 luma (`0.299 R + 0.587 G + 0.114 B`)
/// - 1 channel: passed through unchanged
/// - any other count: [`SelectNonConstantChannels`] picks up to 3 live
///   channels first; if exactly 3 remain the luma reduction applies,
///   otherwise the surviving channels are averaged.
#[derive(Debug, Clone, Default)]
pub struct ToGrayscale {
    channel_policy: SelectNonConstantChannels,
}

impl ToGrayscale {
    pub fn new(channel_policy: SelectNonConstantChannels) -> Self {
        Self { channel_policy }
    }

    fn luma(rgb: &Tensor) -> Tensor {
        (rgb.select(0, 0) * 0.299 + rgb.select(0, 1) * 0.587 + rgb.select(0, 2) * 0.114)
            .unsqueeze(0)
    }
}

impl Transform<Tensor, Tensor> for ToGrayscale {
    fn apply(&self, img: Tensor) -> Result<Tensor> {
        let (channels, _h, _w) = img
            .size3()
            .context("Grayscale reduction expects a [C, H, W] tensor")?;

        match channels {
            1 => Ok(img),
            3 => Ok(Self::luma(&img)),
            _ => {
                let kept = self.channel_policy.apply(img)?;
                let (kept_channels, _, _) = kept.size3()?;
                if kept_channels == 3 {
                    Ok(Self::luma(&kept))
                } else {
                    Ok(kept.mean_dim(&[0i64][..], true, Kind::Float))
                }
            }
        }
    }
}

// ============================================================================
// GrayToRgb
// ============================================================================

/// Expands `[1, H, W]` to `[3, H, W]` by channel repetition. The randomized
/// augmentations operate on RGB; this is the bridge in and the luma
/// reduction is the bridge back out.
#[derive(Debug)]
pub struct GrayToRgb;

impl Transform<Tensor, Tensor> for GrayToRgb {
    fn apply(&self, img: Tensor) -> Result<Tensor> {
        let (channels, _h, _w) = img
            .size3()
            .context("Gray-to-RGB expects a [C, H, W] tensor")?;
        ensure!(
            channels == 1,
            "Gray-to-RGB expects a single channel (got {})",
            channels
        );
        Ok(img.repeat(&[3, 1, 1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use tch::Device;

    fn test_rgb_image() -> DynamicImage {
        let mut img = RgbImage::new(3, 3);
        for x in 0..3 {
            for y in 0..3 {
                img.put_pixel(x, y, Rgb([(x * 85) as u8, (y * 85) as u8, 128]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_to_tensor_shape_and_range() -> Result<()> {
        let tensor = ToTensor.apply(test_rgb_image())?;
        assert_eq!(tensor.size(), vec![3, 3, 3]);
        assert_eq!(tensor.kind(), Kind::Float);

        let min = tensor.f_min()?.double_value(&[]);
        let max = tensor.f_max()?.double_value(&[]);
        assert!(min >= 0.0 && max <= 1.0);
        Ok(())
    }

    #[test]
    fn test_to_tensor_channel_layout() -> Result<()> {
        // a single red pixel must land in channel 0 only
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 0, 255]));

        let tensor = ToTensor.apply(DynamicImage::ImageRgb8(img))?;
        assert_eq!(tensor.double_value(&[0, 0, 0]), 1.0); // R at x=0
        assert_eq!(tensor.double_value(&[2, 0, 1]), 1.0); // B at x=1
        assert_eq!(tensor.double_value(&[1, 0, 0]), 0.0);
        Ok(())
    }

    #[test]
    fn test_to_tensor_grayscale() -> Result<()> {
        let mut img = GrayImage::new(2, 2);
        img.put_pixel(0, 0, Luma([255]));

        let tensor = ToTensor.apply(DynamicImage::ImageLuma8(img))?;
        assert_eq!(tensor.size(), vec![1, 2, 2]);
        assert_eq!(tensor.double_value(&[0, 0, 0]), 1.0);
        Ok(())
    }

    #[test]
    fn test_grayscale_passthrough_on_single_channel() -> Result<()> {
        let img = Tensor::rand(&[1, 4, 4], (Kind::Float, Device::Cpu));
        let gray = ToGrayscale::default().apply(img.shallow_clone())?;
        assert!(gray.equal(&img));
        Ok(())
    }

    #[test]
    fn test_grayscale_luma_weights() -> Result<()> {
        // pure green: luma must be exactly the green coefficient
        let green = Tensor::zeros(&[3, 2, 2], (Kind::Float, Device::Cpu));
        let _ = green.select(0, 1).fill_(1.0);

        let gray = ToGrayscale::default().apply(green)?;
        assert_eq!(gray.size(), vec![1, 2, 2]);
        let value = gray.double_value(&[0, 0, 0]);
        assert!((value - 0.587).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_grayscale_rgba_drops_constant_alpha() -> Result<()> {
        // opaque alpha is constant, so RGBA reduces over the three live
        // colour channels with luma weights
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 1, Rgba([0, 255, 0, 255]));
        img.put_pixel(0, 1, Rgba([0, 0, 255, 255]));

        let tensor = ToTensor.apply(DynamicImage::ImageRgba8(img))?;
        let gray = ToGrayscale::default().apply(tensor)?;
        assert_eq!(gray.size(), vec![1, 2, 2]);
        assert!((gray.double_value(&[0, 0, 0]) - 0.299).abs() < 1e-6);
        assert!((gray.double_value(&[0, 1, 1]) - 0.587).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_select_channels_keeps_live_ones() -> Result<()> {
        let img = Tensor::zeros(&[4, 2, 2], (Kind::Float, Device::Cpu));
        // channels 1 and 3 vary, 0 and 2 stay flat
        let _ = img.select(0, 1).select(0, 0).fill_(0.5);
        let _ = img.select(0, 3).select(0, 1).fill_(0.25);

        let kept = SelectNonConstantChannels::default().apply(img)?;
        assert_eq!(kept.size(), vec![2, 2, 2]);
        Ok(())
    }

    #[test]
    fn test_select_channels_caps_at_max() -> Result<()> {
        // all five channels vary; only the first three survive
        let img = Tensor::rand(&[5, 2, 2], (Kind::Float, Device::Cpu));
        let kept = SelectNonConstantChannels::default().apply(img.shallow_clone())?;
        assert_eq!(kept.size(), vec![3, 2, 2]);
        assert!(kept.equal(&img.narrow(0, 0, 3)));
        Ok(())
    }

    #[test]
    fn test_select_channels_zero_qualifying_falls_back() -> Result<()> {
        // fully constant image: nothing qualifies, channel 0 is kept
        let img = Tensor::full(&[4, 2, 2], 0.5, (Kind::Float, Device::Cpu));
        let kept = SelectNonConstantChannels::default().apply(img)?;
        assert_eq!(kept.size(), vec![1, 2, 2]);
        Ok(())
    }

    #[test]
    fn test_gray_to_rgb_round_trip() -> Result<()> {
        let img = Tensor::rand(&[1, 4, 4], (Kind::Float, Device::Cpu));
        let rgb = GrayToRgb.apply(img.shallow_clone())?;
        assert_eq!(rgb.size(), vec![3, 4, 4]);

        let back = ToGrayscale::default().apply(rgb)?;
        assert!(back.allclose(&img, 1e-5, 1e-6, false));
        Ok(())
    }
}
