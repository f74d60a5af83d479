use std::path::{Path, PathBuf};

use crate::redaction::frame_anonymizer::FrameAnonymizer;
use crate::redaction::region_redactor::{RedactionMode, RegionRedactor, RenderOptions};
use crate::shared::constants::OUTPUT_SUFFIX;

/// What one stream item reads from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputTarget {
    ImageFile(PathBuf),
    VideoFile(PathBuf),
    Camera(u32),
}

/// Immutable configuration bundle for one input item.
///
/// Built once by the batch driver or the CLI entry point; nothing in the
/// pipeline mutates it. `nested` is an explicit field rather than ambient
/// state so progress placement is decided where the job is created.
#[derive(Clone, Debug)]
pub struct StreamJob {
    pub input: InputTarget,
    pub output: Option<PathBuf>,
    pub threshold: f32,
    pub mode: RedactionMode,
    pub mask_scale: f32,
    pub ellipse: bool,
    pub annotate: bool,
    /// Render frames to a live preview window while streaming.
    pub preview: bool,
    /// Draw the frame progress bar as a non-persistent sub-line under an
    /// outer batch indicator.
    pub nested: bool,
}

impl StreamJob {
    /// Builds the anonymizer described by this job's redaction settings.
    pub fn anonymizer(&self) -> FrameAnonymizer {
        FrameAnonymizer::new(
            self.mask_scale,
            RegionRedactor::new(RenderOptions {
                mode: self.mode,
                ellipse: self.ellipse,
                annotate: self.annotate,
            }),
        )
    }
}

/// Default output path: the input path with [`OUTPUT_SUFFIX`] inserted
/// before the extension (`photo.jpg` → `photo_anonymized.jpg`).
pub fn derived_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    match input.extension().and_then(|e| e.to_str()) {
        Some(ext) => input.with_file_name(format!("{stem}{OUTPUT_SUFFIX}.{ext}")),
        None => input.with_file_name(format!("{stem}{OUTPUT_SUFFIX}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_output_path_keeps_extension() {
        assert_eq!(
            derived_output_path(Path::new("photo.jpg")),
            PathBuf::from("photo_anonymized.jpg")
        );
    }

    #[test]
    fn test_derived_output_path_keeps_directory() {
        assert_eq!(
            derived_output_path(Path::new("/data/in/clip.mp4")),
            PathBuf::from("/data/in/clip_anonymized.mp4")
        );
    }

    #[test]
    fn test_derived_output_path_without_extension() {
        assert_eq!(
            derived_output_path(Path::new("/data/capture")),
            PathBuf::from("/data/capture_anonymized")
        );
    }

    #[test]
    fn test_derived_output_path_with_dotted_stem() {
        assert_eq!(
            derived_output_path(Path::new("a.b.mkv")),
            PathBuf::from("a.b_anonymized.mkv")
        );
    }
}
