use crate::transforms::Transform;
use anyhow::{Context, Result};
use image::{DynamicImage, ImageReader};
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::PathBuf;

// ============================================================================
// LoadImage - Base image loader
// ============================================================================

/// Loads images from file paths.
///
/// Reads the whole file through a buffered reader, then decodes whatever
/// format the header announces. An unreadable or corrupt file is an error;
/// the preprocessing run treats that as fatal rather than skipping the image.
///
/// # Input/Output
/// - **Input**: `PathBuf` - file path to the image
/// - **Output**: `DynamicImage` - decoded image ready for processing
#[derive(Debug, Clone)]
pub struct LoadImage {
    buffer_size: usize,
}

impl LoadImage {
    /// Creates a new image loader with an 8KB read buffer.
    pub fn new() -> Self {
        Self { buffer_size: 8192 }
    }
}

impl Default for LoadImage {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform<PathBuf, DynamicImage> for LoadImage {
    fn apply(&self, path: PathBuf) -> Result<DynamicImage> {
        let file = File::open(&path)
            .with_context(|| format!("Failed to open image: {}", path.display()))?;

        let file_size = file.metadata()?.len() as usize;
        let mut reader = BufReader::with_capacity(self.buffer_size, file);
        let mut buffer = Vec::with_capacity(file_size);
        reader
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read image: {}", path.display()))?;

        let image = ImageReader::new(Cursor::new(buffer))
            .with_guessed_format()?
            .decode()
            .with_context(|| format!("Failed to decode image: {}", path.display()))?;

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_image() -> Result<NamedTempFile> {
        let mut img = RgbImage::new(3, 3);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 1, Rgb([0, 255, 0]));
        img.put_pixel(2, 2, Rgb([0, 0, 255]));

        let temp_file = NamedTempFile::with_suffix(".png")?;
        img.save(temp_file.path())?;
        Ok(temp_file)
    }

    #[test]
    fn test_load_image() -> Result<()> {
        let temp_file = create_test_image()?;

        let loader = LoadImage::new();
        let loaded = loader.apply(temp_file.path().to_path_buf())?;

        assert_eq!(loaded.dimensions(), (3, 3));
        let rgb = loaded.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(rgb.get_pixel(2, 2), &Rgb([0, 0, 255]));
        Ok(())
    }

    #[test]
    fn test_missing_file_errors() {
        let loader = LoadImage::new();
        assert!(loader.apply(PathBuf::from("nonexistent.jpg")).is_err());
    }

    #[test]
    fn test_corrupt_file_errors() -> Result<()> {
        let mut temp_file = NamedTempFile::with_suffix(".png")?;
        temp_file.write_all(b"this is not a png")?;

        let loader = LoadImage::new();
        assert!(loader.apply(temp_file.path().to_path_buf()).is_err());
        Ok(())
    }
}
