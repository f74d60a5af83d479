use std::path::Path;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Writes a single frame to an image file using the `image` crate; the
/// format follows the output path's extension.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("frame data does not match its dimensions")?;
        img.save(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..(width * height) {
            data.extend_from_slice(&rgb);
        }
        Frame::new(data, width, height, 3, 0)
    }

    #[test]
    fn test_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let writer = ImageFileWriter::new();
        writer.write(&path, &make_frame(64, 48, [10, 20, 30])).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_roundtrip_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let writer = ImageFileWriter::new();
        writer.write(&path, &make_frame(20, 20, [50, 100, 200])).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.width(), 20);
        assert_eq!(img.height(), 20);
        assert_eq!(img.get_pixel(5, 5).0, [50, 100, 200]);
    }

    #[test]
    fn test_write_to_unwritable_path_errors() {
        let writer = ImageFileWriter::new();
        let result = writer.write(Path::new("/proc/faceveil/out.png"), &make_frame(4, 4, [0; 3]));
        assert!(result.is_err());
    }
}
