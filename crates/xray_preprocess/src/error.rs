use std::path::PathBuf;
use thiserror::Error;

/// Error classes surfaced by the preprocessing pipeline.
///
/// Every variant is fatal to the run that produced it: the pipeline does not
/// retry or skip individual inputs. Callers that want per-image resilience
/// should filter their input listing before handing it to the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The dataset root is missing, unreadable, or contains no class
    /// subdirectories.
    #[error("input not found: {path}")]
    InputNotFound { path: PathBuf },

    /// An image file could not be read or decoded.
    #[error("failed to decode image {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Degenerate stratification: empty label set, an out-of-range split
    /// fraction, or a holdout that rounds down to nothing.
    #[error("stratified split failed: {0}")]
    Split(String),

    /// Invalid configuration value (bad probability, zero frame size,
    /// malformed normalization statistics).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O or serialization failure while writing or reading a tensor
    /// artifact. Partial output files may remain on disk.
    #[error("failed to persist artifact {path}: {message}")]
    Persist { path: PathBuf, message: String },
}
