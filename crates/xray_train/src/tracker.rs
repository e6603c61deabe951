//! Experiment tracking.
//!
//! The training loop reports scalar metrics (loss, accuracy) per epoch
//! through the [`ExperimentTracker`] interface. The default implementation
//! appends JSON lines to a run file; anything that can receive scalars
//! (a metrics service, a test capture) can stand in.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Receiver for per-epoch scalar metrics.
pub trait ExperimentTracker {
    fn log_scalar(&mut self, epoch: usize, name: &str, value: f64) -> Result<()>;
}

#[derive(Serialize)]
struct ScalarRecord<'a> {
    epoch: usize,
    metric: &'a str,
    value: f64,
}

/// Appends one JSON object per scalar to a `.jsonl` run file.
pub struct JsonlTracker {
    writer: BufWriter<File>,
}

impl JsonlTracker {
    /// Creates (or truncates) the run file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create metrics file: {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl ExperimentTracker for JsonlTracker {
    fn log_scalar(&mut self, epoch: usize, name: &str, value: f64) -> Result<()> {
        let record = ScalarRecord {
            epoch,
            metric: name,
            value,
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Discards every metric. Useful for tests and smoke runs.
pub struct NoopTracker;

impl ExperimentTracker for NoopTracker {
    fn log_scalar(&mut self, _epoch: usize, _name: &str, _value: f64) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_jsonl_records_are_parseable() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("run.jsonl");

        let mut tracker = JsonlTracker::create(&path)?;
        tracker.log_scalar(0, "train_loss", 1.25)?;
        tracker.log_scalar(0, "train_acc", 0.5)?;
        tracker.log_scalar(1, "train_loss", 0.75)?;
        drop(tracker);

        let content = fs::read_to_string(&path)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);

        let record: serde_json::Value = serde_json::from_str(lines[2])?;
        assert_eq!(record["epoch"], 1);
        assert_eq!(record["metric"], "train_loss");
        assert_eq!(record["value"], 0.75);
        Ok(())
    }
}
