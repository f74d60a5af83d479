use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indicatif::MultiProgress;

use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::item_error::ItemError;
use crate::pipeline::progress;
use crate::pipeline::stream_job::StreamJob;
use crate::video::domain::frame_source::FrameSource;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::preview_window::{PreviewControl, PreviewWindow};
use crate::video::domain::video_writer::VideoWriter;

/// Shared cancellation signal, checked once per frame. Set by the
/// Ctrl-C handler or by tests; the quit key sets the per-item outcome
/// instead.
pub type CancelFlag = Arc<AtomicBool>;

/// What one completed (or gracefully terminated) stream produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamOutcome {
    pub frames_processed: usize,
    pub frames_written: usize,
    /// The stream ended early via the quit key or the cancel flag.
    pub cancelled: bool,
}

/// Drives one input item end-to-end:
/// OPENING → STREAMING (read → detect → anonymize → write → preview) →
/// CLOSING.
///
/// CLOSING runs on every exit path — early quit, cancellation,
/// mid-stream errors — so reader/writer/preview/progress handles are
/// always released. The detector is borrowed, not owned: one expensive
/// detector serves every item of a batch in turn.
pub struct StreamProcessor<'a> {
    detector: &'a mut dyn FaceDetector,
    cancelled: CancelFlag,
}

impl<'a> StreamProcessor<'a> {
    pub fn new(detector: &'a mut dyn FaceDetector, cancelled: CancelFlag) -> Self {
        Self {
            detector,
            cancelled,
        }
    }

    /// Single image: read one frame, detect once, anonymize, write once.
    /// No progress semantics beyond pass/fail.
    pub fn process_image(
        &mut self,
        job: &StreamJob,
        source: &mut dyn FrameSource,
        writer: &dyn ImageWriter,
        output: &Path,
    ) -> Result<(), ItemError> {
        source.open()?;
        let result = self.image_inner(job, source, writer, output);
        source.close();
        result
    }

    fn image_inner(
        &mut self,
        job: &StreamJob,
        source: &mut dyn FrameSource,
        writer: &dyn ImageWriter,
        output: &Path,
    ) -> Result<(), ItemError> {
        let mut frame = source
            .frames()
            .next()
            .ok_or_else(|| ItemError::Read("source produced no frame".to_string()))?
            .map_err(|e| ItemError::Read(e.to_string()))?;

        let detections = self
            .detector
            .detect(&frame, job.threshold)
            .map_err(|e| ItemError::Detection(e.to_string()))?;
        job.anonymizer().anonymize(&mut frame, &detections);

        writer.write(output, &frame).map_err(|e| ItemError::Write {
            path: output.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// Video file or live camera: iterate frames until the source ends,
    /// the user quits, or the cancel flag is raised.
    pub fn process_stream(
        &mut self,
        job: &StreamJob,
        source: &mut dyn FrameSource,
        mut writer: Option<&mut dyn VideoWriter>,
        mut preview: Option<&mut dyn PreviewWindow>,
        multi: Option<&MultiProgress>,
    ) -> Result<StreamOutcome, ItemError> {
        // OPENING
        let metadata = source.open()?;

        if let (Some(w), Some(out)) = (writer.as_mut(), job.output.as_deref()) {
            if let Err(e) = w.open(out, &metadata) {
                source.close();
                return Err(ItemError::Write {
                    path: out.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        }

        let bar = progress::frame_bar(metadata.frame_count, multi);

        // STREAMING
        let result = self.stream_loop(job, source, &mut writer, &mut preview, &bar);

        // CLOSING — runs regardless of how the loop ended.
        source.close();
        if let Some(p) = preview.as_mut() {
            p.close();
        }
        let close_error = writer.as_mut().map(|w| w.close()).and_then(|r| r.err());
        if job.nested {
            bar.finish_and_clear();
        } else {
            bar.finish();
        }

        match (result, close_error) {
            (Err(e), maybe_close) => {
                if let Some(ce) = maybe_close {
                    log::warn!("Error closing output after failure: {ce}");
                }
                Err(e)
            }
            (Ok(_), Some(ce)) => Err(ItemError::Write {
                path: job.output.clone().unwrap_or_default(),
                reason: ce.to_string(),
            }),
            (Ok(outcome), None) => Ok(outcome),
        }
    }

    fn stream_loop(
        &mut self,
        job: &StreamJob,
        source: &mut dyn FrameSource,
        writer: &mut Option<&mut dyn VideoWriter>,
        preview: &mut Option<&mut dyn PreviewWindow>,
        bar: &indicatif::ProgressBar,
    ) -> Result<StreamOutcome, ItemError> {
        let anonymizer = job.anonymizer();
        let mut outcome = StreamOutcome::default();

        for frame_result in source.frames() {
            if self.cancelled.load(Ordering::Relaxed) {
                outcome.cancelled = true;
                break;
            }

            let mut frame = frame_result.map_err(|e| ItemError::Read(e.to_string()))?;

            let detections = self
                .detector
                .detect(&frame, job.threshold)
                .map_err(|e| ItemError::Detection(e.to_string()))?;
            anonymizer.anonymize(&mut frame, &detections);

            if let Some(w) = writer.as_mut() {
                w.write(&frame).map_err(|e| ItemError::Write {
                    path: job.output.clone().unwrap_or_default(),
                    reason: e.to_string(),
                })?;
                outcome.frames_written += 1;
            }

            let mut drop_preview = false;
            if let Some(p) = preview.as_mut() {
                match p.show(&frame) {
                    Ok(PreviewControl::Quit) => outcome.cancelled = true,
                    Ok(PreviewControl::Continue) => {}
                    Err(e) => {
                        log::warn!("Preview failed, continuing without it: {e}");
                        drop_preview = true;
                    }
                }
            }
            if drop_preview {
                if let Some(p) = preview.take() {
                    p.close();
                }
            }

            outcome.frames_processed += 1;
            bar.inc(1);

            if outcome.cancelled {
                break;
            }
        }

        Ok(outcome)
    }
}
