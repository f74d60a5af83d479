use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::item_error::ItemError;
use crate::pipeline::progress;
use crate::pipeline::stream_job::{derived_output_path, InputTarget, StreamJob};
use crate::pipeline::stream_processor::{CancelFlag, StreamProcessor};
use crate::redaction::region_redactor::RedactionMode;
use crate::video::infrastructure::ffmpeg_video_source::FfmpegVideoSource;
use crate::video::infrastructure::ffmpeg_video_writer::FfmpegVideoWriter;
use crate::video::infrastructure::image_file_source::ImageFileSource;
use crate::video::infrastructure::image_file_writer::ImageFileWriter;

/// Media classification of a discovered file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Unknown,
}

/// Classify a file by its guessed MIME type.
pub fn classify(path: &Path) -> MediaKind {
    match mime_guess::from_path(path).first() {
        Some(mime) if mime.type_() == mime_guess::mime::VIDEO => MediaKind::Video,
        Some(mime) if mime.type_() == mime_guess::mime::IMAGE => MediaKind::Image,
        _ => MediaKind::Unknown,
    }
}

/// Recursively enumerate candidate files under `root`, optionally
/// filtered by extension (case-insensitive). Sorted for stable
/// reporting.
pub fn discover(root: &Path, extension: Option<&str>) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| match extension {
            None => true,
            Some(ext) => e
                .path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|s| s.eq_ignore_ascii_case(ext))
                .unwrap_or(false),
        })
        .map(|e| e.path().to_path_buf())
        .collect()
}

/// Redaction settings shared by every item in a batch run.
#[derive(Clone, Debug)]
pub struct BatchConfig {
    pub threshold: f32,
    pub mode: RedactionMode,
    pub mask_scale: f32,
    pub ellipse: bool,
    pub annotate: bool,
    /// Only process files with this extension; `None` processes all.
    pub extension: Option<String>,
}

/// Per-batch outcome counts. The batch itself has no failure state:
/// it completes once every discovered item was attempted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Walks a directory input and runs the stream processor per item.
///
/// Items are strictly sequential and fully isolated: an unopenable
/// video, a corrupt image, or an unclassifiable file is reported and the
/// driver moves on. Outputs land next to their inputs with the
/// `_anonymized` suffix. Preview is never enabled in batch mode.
pub struct BatchDriver<'a> {
    detector: &'a mut dyn FaceDetector,
    cancelled: CancelFlag,
}

impl<'a> BatchDriver<'a> {
    pub fn new(detector: &'a mut dyn FaceDetector, cancelled: CancelFlag) -> Self {
        Self {
            detector,
            cancelled,
        }
    }

    pub fn run(&mut self, root: &Path, config: &BatchConfig) -> BatchSummary {
        let items = discover(root, config.extension.as_deref());
        let (multi, outer) = progress::batch_bars(items.len());

        let mut summary = BatchSummary::default();
        for path in items {
            if self.cancelled.load(std::sync::atomic::Ordering::Relaxed) {
                break;
            }
            outer.set_message(path.display().to_string());

            match self.run_item(&path, config, &multi) {
                Ok(()) => summary.completed += 1,
                Err(ItemError::UnknownContentType(p)) => {
                    log::warn!("File {} has an unknown content type. Skipping...", p.display());
                    summary.skipped += 1;
                }
                Err(e) => {
                    log::warn!("Could not process {}: {e}. Skipping...", path.display());
                    summary.failed += 1;
                }
            }
            outer.inc(1);
        }

        outer.finish_and_clear();
        log::info!(
            "Batch finished: {} completed, {} skipped, {} failed",
            summary.completed,
            summary.skipped,
            summary.failed
        );
        summary
    }

    fn run_item(
        &mut self,
        path: &Path,
        config: &BatchConfig,
        multi: &indicatif::MultiProgress,
    ) -> Result<(), ItemError> {
        let kind = classify(path);
        let output = derived_output_path(path);
        let job = |input: InputTarget| StreamJob {
            input,
            output: Some(output.clone()),
            threshold: config.threshold,
            mode: config.mode,
            mask_scale: config.mask_scale,
            ellipse: config.ellipse,
            annotate: config.annotate,
            preview: false,
            nested: true,
        };

        let mut processor = StreamProcessor::new(&mut *self.detector, self.cancelled.clone());
        match kind {
            MediaKind::Image => {
                let job = job(InputTarget::ImageFile(path.to_path_buf()));
                let mut source = ImageFileSource::new(path);
                let writer = ImageFileWriter::new();
                processor.process_image(&job, &mut source, &writer, &output)
            }
            MediaKind::Video => {
                let job = job(InputTarget::VideoFile(path.to_path_buf()));
                let mut source = FfmpegVideoSource::new(path);
                let mut writer = FfmpegVideoWriter::new();
                processor
                    .process_stream(&job, &mut source, Some(&mut writer), None, Some(multi))
                    .map(|_| ())
            }
            MediaKind::Unknown => Err(ItemError::UnknownContentType(path.to_path_buf())),
        }
    }
}
