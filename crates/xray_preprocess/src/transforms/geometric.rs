use crate::rng::{pipeline_gen_bool, pipeline_gen_range};
use crate::transforms::Transform;
use anyhow::{ensure, Result};
use image::{imageops::FilterType, DynamicImage};
use tch::{Device, Kind, Tensor};

// ============================================================================
// Resize
// ============================================================================

/// Resizes an image to an exact square frame, ignoring aspect ratio.
///
/// Every sample ends up in the same `size x size` canonical frame so the
/// whole dataset stacks into a single dense tensor. Resizing an image that
/// is already `size x size` is a no-op up to resampling rounding.
///
/// # Filter Types
/// - `Nearest`: nearest neighbour, fastest
/// - `Triangle`: bilinear, good all-round default
/// - `CatmullRom`: bicubic sharpening
/// - `Lanczos3`: highest quality, slowest
#[derive(Debug)]
pub struct Resize {
    size: u32,
    filter: FilterType,
}

impl Resize {
    /// Creates a new exact-resize transform.
    pub fn new(size: u32, filter: FilterType) -> Result<Self> {
        ensure!(size > 0, "Target size must be positive (got {})", size);
        Ok(Self { size, filter })
    }
}

impl Transform<DynamicImage, DynamicImage> for Resize {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        Ok(img.resize_exact(self.size, self.size, self.filter))
    }
}

// ============================================================================
// RandomThinPlateSpline
// ============================================================================

/// Randomly warps an image with a thin-plate spline, gated by probability `p`.
///
/// A 3x3 grid of control points in normalized coordinates is jittered by up
/// to `scale` in each axis; the spline interpolating those displacements is
/// evaluated at every output pixel and the image is resampled bilinearly.
/// Control-point jitter comes from the seeded pipeline RNG, so a seeded run
/// produces identical warps.
#[derive(Debug)]
pub struct RandomThinPlateSpline {
    p: f64,
    scale: f32,
    grid: i64,
}

impl RandomThinPlateSpline {
    pub fn new(p: f64, scale: f32) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&p),
            "Probability must be in [0.0, 1.0] range (got {})",
            p
        );
        ensure!(scale >= 0.0, "Warp scale must be non-negative (got {})", scale);
        Ok(Self { p, scale, grid: 3 })
    }

    /// Control points on a regular `grid x grid` lattice over `[-1, 1]^2`,
    /// as a `[grid^2, 2]` tensor of (x, y) pairs.
    fn lattice(&self) -> Tensor {
        let step = 2.0 / (self.grid - 1) as f32;
        let mut coords = Vec::with_capacity((self.grid * self.grid * 2) as usize);
        for gy in 0..self.grid {
            for gx in 0..self.grid {
                coords.push(-1.0 + gx as f32 * step);
                coords.push(-1.0 + gy as f32 * step);
            }
        }
        Tensor::from_slice(&coords).reshape(&[self.grid * self.grid, 2])
    }

    /// Radial basis term of the thin-plate kernel, `U(r^2) = r^2 log(r^2)`,
    /// for all pairwise squared distances in `d2`.
    fn kernel(d2: &Tensor) -> Tensor {
        d2 * (d2 + 1e-6).log()
    }

    /// Warps `img` (`[C, H, W]`, float) by sampling each output pixel from
    /// the spline-displaced source location.
    fn warp(&self, img: &Tensor) -> Result<Tensor> {
        let (_c, h, w) = img.size3()?;
        let n = self.grid * self.grid;
        let opts = (Kind::Float, Device::Cpu);

        let src = self.lattice();
        let jitter: Vec<f32> = (0..n * 2)
            .map(|_| pipeline_gen_range(-self.scale, self.scale))
            .collect();
        let dst = &src + Tensor::from_slice(&jitter).reshape(&[n, 2]);

        // Solve the spline that maps the jittered points back onto the
        // lattice; warping then samples source coordinates per output pixel.
        let diff = dst.unsqueeze(1) - dst.unsqueeze(0);
        let d2 = (&diff * &diff).sum_dim_intlist(&[-1i64][..], false, Kind::Float);
        let k = Self::kernel(&d2);

        let ones = Tensor::ones(&[n, 1], opts);
        let p = Tensor::cat(&[ones, dst.shallow_clone()], 1);
        let top = Tensor::cat(&[k, p.shallow_clone()], 1);
        let bottom = Tensor::cat(&[p.transpose(0, 1), Tensor::zeros(&[3, 3], opts)], 1);
        let l = Tensor::cat(&[top, bottom], 0);
        let v = Tensor::cat(&[src, Tensor::zeros(&[3, 2], opts)], 0);

        let params = l.inverse().matmul(&v);
        let w_coef = params.narrow(0, 0, n);
        let a_coef = params.narrow(0, n, 3);

        // Evaluate at every output pixel in normalized coordinates.
        let xs = Tensor::linspace(-1.0, 1.0, w, opts);
        let ys = Tensor::linspace(-1.0, 1.0, h, opts);
        let gx = xs.unsqueeze(0).repeat(&[h, 1]).reshape(&[h * w, 1]);
        let gy = ys.unsqueeze(1).repeat(&[1, w]).reshape(&[h * w, 1]);
        let pts = Tensor::cat(&[gx, gy], 1);

        let diff = pts.unsqueeze(1) - dst.unsqueeze(0);
        let d2 = (&diff * &diff).sum_dim_intlist(&[-1i64][..], false, Kind::Float);
        let basis = Self::kernel(&d2);

        let affine = Tensor::cat(&[Tensor::ones(&[h * w, 1], opts), pts], 1).matmul(&a_coef);
        let sample_at = (affine + basis.matmul(&w_coef)).reshape(&[1, h, w, 2]);

        // bilinear interpolation, zero padding outside the frame
        let warped = img
            .unsqueeze(0)
            .grid_sampler(&sample_at, 0, 0, true)
            .squeeze_dim(0);
        Ok(warped)
    }
}

impl Transform<Tensor, Tensor> for RandomThinPlateSpline {
    fn apply(&self, img: Tensor) -> Result<Tensor> {
        if self.scale == 0.0 || !pipeline_gen_bool(self.p) {
            return Ok(img);
        }
        self.warp(&img)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seed_pipeline_rng;
    use image::{GenericImageView, Rgb, RgbImage};

    fn test_gradient_image(width: u32, height: u32) -> DynamicImage {
        let mut img = RgbImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let r = (x * 255 / width) as u8;
                let g = (y * 255 / height) as u8;
                img.put_pixel(x, y, Rgb([r, g, 128]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_resize_to_square() -> Result<()> {
        let img = test_gradient_image(100, 60);
        let resize = Resize::new(50, FilterType::Nearest)?;
        let resized = resize.apply(img)?;
        assert_eq!(resized.dimensions(), (50, 50));
        Ok(())
    }

    #[test]
    fn test_resize_rejects_zero() {
        assert!(Resize::new(0, FilterType::Nearest).is_err());
    }

    #[test]
    fn test_warp_preserves_shape() -> Result<()> {
        seed_pipeline_rng(42);
        let img = Tensor::rand(&[1, 16, 16], (Kind::Float, Device::Cpu));
        let warp = RandomThinPlateSpline::new(1.0, 0.2)?;

        let warped = warp.apply(img.shallow_clone())?;
        assert_eq!(warped.size(), vec![1, 16, 16]);
        // a non-trivial warp actually moves pixels
        assert!(!warped.allclose(&img, 1e-5, 1e-5, false));
        Ok(())
    }

    #[test]
    fn test_warp_is_seed_deterministic() -> Result<()> {
        let img = Tensor::rand(&[1, 16, 16], (Kind::Float, Device::Cpu));
        let warp = RandomThinPlateSpline::new(1.0, 0.2)?;

        seed_pipeline_rng(7);
        let first = warp.apply(img.shallow_clone())?;
        seed_pipeline_rng(7);
        let second = warp.apply(img.shallow_clone())?;

        assert!(first.equal(&second));
        Ok(())
    }

    #[test]
    fn test_warp_never_fires_at_zero_probability() -> Result<()> {
        seed_pipeline_rng(42);
        let img = Tensor::rand(&[1, 8, 8], (Kind::Float, Device::Cpu));
        let warp = RandomThinPlateSpline::new(0.0, 0.2)?;

        let out = warp.apply(img.shallow_clone())?;
        assert!(out.equal(&img));
        Ok(())
    }
}
