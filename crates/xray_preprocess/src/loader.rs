//! Dataset scanning: turns a `root/<class_name>/<image_file>` directory tree
//! into an ordered list of (path, label) pairs.
//!
//! Label assignment is a pure function of the sorted class-directory names:
//! sorting lexicographically and enumerating 0..K-1 keeps labels stable
//! across runs and machines. Files within a class are sorted by file name
//! for the same reason; filesystem enumeration order is not portable.

use crate::error::PipelineError;
use std::fs;
use std::path::{Path, PathBuf};

/// The class set of a dataset root. The label of a class is its position in
/// the sorted name list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMap {
    names: Vec<String>,
}

impl ClassMap {
    /// Number of classes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Class name for a label, if the label is in range.
    pub fn name(&self, label: i64) -> Option<&str> {
        usize::try_from(label)
            .ok()
            .and_then(|i| self.names.get(i))
            .map(String::as_str)
    }

    /// All class names in label order.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// The result of scanning a dataset root: the class set plus the ordered
/// sample listing.
#[derive(Debug)]
pub struct ScanResult {
    pub classes: ClassMap,
    pub samples: Vec<(PathBuf, i64)>,
}

/// Discovers the class subdirectories of `root`, sorted lexicographically.
///
/// Fails with [`PipelineError::InputNotFound`] when `root` does not exist or
/// contains no subdirectories.
pub fn scan_classes(root: &Path) -> Result<ClassMap, PipelineError> {
    let entries = fs::read_dir(root).map_err(|_| PipelineError::InputNotFound {
        path: root.to_path_buf(),
    })?;

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();

    if names.is_empty() {
        return Err(PipelineError::InputNotFound {
            path: root.to_path_buf(),
        });
    }

    names.sort();
    Ok(ClassMap { names })
}

/// Scans `root` into an ordered list of (path, label) pairs, taking at most
/// `max_per_class` files per class in sorted-filename order.
pub fn scan_dataset(root: &Path, max_per_class: usize) -> Result<ScanResult, PipelineError> {
    let classes = scan_classes(root)?;

    let mut samples = Vec::new();
    for (label, name) in classes.names().iter().enumerate() {
        let class_dir = root.join(name);
        let entries = fs::read_dir(&class_dir).map_err(|_| PipelineError::InputNotFound {
            path: class_dir.clone(),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| !path.is_dir())
            .collect();
        files.sort();
        files.truncate(max_per_class);

        samples.extend(files.into_iter().map(|path| (path, label as i64)));
    }

    Ok(ScanResult { classes, samples })
}
