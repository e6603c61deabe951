//! Image transforms for canonicalization and augmentation.
//!
//! # Module Organization
//!
//! ```text
//! transforms/
//! ├── core.rs          → Transform trait + Chain combinator
//! ├── io.rs            → Image loading
//! ├── geometric.rs     → Spatial transforms (resize, thin-plate warp)
//! ├── conversion.rs    → Format conversions (image → tensor, grayscale)
//! ├── photometric.rs   → Intensity transforms (normalize, sharpen, noise)
//! └── augmentation.rs  → The composed randomized augmentation stage
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use xray_preprocess::transforms::{
//!     LoadImage, Normalize, Resize, ToGrayscale, ToTensor, Transform,
//! };
//! use image::imageops::FilterType;
//!
//! // the canonical per-image chain
//! let pipeline = LoadImage::new()
//!     .then(Resize::new(512, FilterType::Triangle)?)
//!     .then(ToTensor)
//!     .then(ToGrayscale::default())
//!     .then(Normalize::single(0.0, 1.0)?);
//! ```

pub mod augmentation;
pub mod conversion;
pub mod core;
pub mod geometric;
pub mod io;
pub mod photometric;

pub use augmentation::{Augmentation, RandomHorizontalFlip};
pub use conversion::{GrayToRgb, SelectNonConstantChannels, ToGrayscale, ToTensor};
pub use core::{Chain, Transform};
pub use geometric::{RandomThinPlateSpline, Resize};
pub use io::LoadImage;
pub use photometric::{Normalize, RandomGaussianNoise, RandomSharpness};
