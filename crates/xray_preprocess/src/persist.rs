//! On-disk layout of the preprocessed splits.
//!
//! Each split owns two artifacts with fixed names:
//! `<split>_images.pt` — float tensor of shape `[count, 1, S, S]`
//! `<split>_labels.pt` — int64 tensor of shape `[count]`
//! for split in {train, test, valid}. Writes create the output directory if
//! absent and overwrite unconditionally; this pipeline runs as a single
//! offline batch job, so there is no atomic-write or rollback story.

use crate::error::PipelineError;
use std::fs;
use std::path::{Path, PathBuf};
use tch::Tensor;

/// The three split names in their on-disk spelling.
pub const SPLIT_NAMES: [&str; 3] = ["train", "test", "valid"];

/// Path of a split's image tensor artifact.
pub fn images_path(dir: &Path, split: &str) -> PathBuf {
    dir.join(format!("{split}_images.pt"))
}

/// Path of a split's label vector artifact.
pub fn labels_path(dir: &Path, split: &str) -> PathBuf {
    dir.join(format!("{split}_labels.pt"))
}

fn persist_error(path: &Path, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::Persist {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Writes one split's image and label tensors.
pub fn write_split(
    dir: &Path,
    split: &str,
    images: &Tensor,
    labels: &Tensor,
) -> Result<(), PipelineError> {
    fs::create_dir_all(dir).map_err(|e| persist_error(dir, e))?;

    let img_path = images_path(dir, split);
    images.save(&img_path).map_err(|e| persist_error(&img_path, e))?;

    let lab_path = labels_path(dir, split);
    labels.save(&lab_path).map_err(|e| persist_error(&lab_path, e))?;

    Ok(())
}

/// Reads one split back as `(images, labels)`.
pub fn read_split(dir: &Path, split: &str) -> Result<(Tensor, Tensor), PipelineError> {
    let img_path = images_path(dir, split);
    let images = Tensor::load(&img_path).map_err(|e| persist_error(&img_path, e))?;

    let lab_path = labels_path(dir, split);
    let labels = Tensor::load(&lab_path).map_err(|e| persist_error(&lab_path, e))?;

    Ok((images, labels))
}
