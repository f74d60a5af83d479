//! End-to-end batch run over a mixed directory: one valid image, one
//! valid video, one corrupt file, one unclassifiable file.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use faceveil_core::detection::domain::detection::Detection;
use faceveil_core::detection::domain::face_detector::FaceDetector;
use faceveil_core::pipeline::batch_driver::{BatchConfig, BatchDriver, BatchSummary};
use faceveil_core::redaction::region_redactor::RedactionMode;
use faceveil_core::shared::frame::Frame;
use faceveil_core::shared::media_metadata::MediaMetadata;
use faceveil_core::video::domain::video_writer::VideoWriter;
use faceveil_core::video::infrastructure::ffmpeg_video_writer::FfmpegVideoWriter;

/// Reports one face in the middle of every frame.
struct CenterFaceStub;

impl FaceDetector for CenterFaceStub {
    fn detect(
        &mut self,
        frame: &Frame,
        _threshold: f32,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let w = frame.width() as f32;
        let h = frame.height() as f32;
        Ok(vec![Detection::new(
            w * 0.25,
            h * 0.25,
            w * 0.75,
            h * 0.75,
            0.95,
        )])
    }
}

fn write_test_image(path: &Path) {
    let img = image::RgbImage::from_pixel(64, 64, image::Rgb([200, 200, 200]));
    img.save(path).unwrap();
}

fn write_test_video(path: &Path, frames: usize) {
    let metadata = MediaMetadata {
        width: 64,
        height: 48,
        fps: 25.0,
        frame_count: None,
        codec: String::new(),
        source_path: None,
    };
    let mut writer = FfmpegVideoWriter::new();
    writer.open(path, &metadata).unwrap();
    for i in 0..frames {
        let frame = Frame::new(vec![180u8; 64 * 48 * 3], 64, 48, 3, i);
        writer.write(&frame).unwrap();
    }
    writer.close().unwrap();
}

fn config() -> BatchConfig {
    BatchConfig {
        threshold: 0.2,
        mode: RedactionMode::Solid,
        mask_scale: 1.0,
        ellipse: false,
        annotate: false,
        extension: None,
    }
}

#[test]
fn test_mixed_directory_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    write_test_image(&dir.path().join("photo.png"));
    write_test_video(&dir.path().join("clip.mp4"), 8);
    std::fs::write(dir.path().join("broken.mp4"), b"definitely not mpeg4").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

    let mut detector = CenterFaceStub;
    let cancelled = Arc::new(AtomicBool::new(false));
    let summary = BatchDriver::new(&mut detector, cancelled).run(dir.path(), &config());

    assert_eq!(
        summary,
        BatchSummary {
            completed: 2,
            skipped: 1,
            failed: 1,
        }
    );

    // Exactly the two valid items produced outputs, suffixed in place
    assert!(dir.path().join("photo_anonymized.png").exists());
    assert!(dir.path().join("clip_anonymized.mp4").exists());
    assert!(!dir.path().join("broken_anonymized.mp4").exists());
    assert!(!dir.path().join("notes_anonymized.txt").exists());
}

#[test]
fn test_image_output_is_redacted() {
    let dir = tempfile::tempdir().unwrap();
    write_test_image(&dir.path().join("photo.png"));

    let mut detector = CenterFaceStub;
    let cancelled = Arc::new(AtomicBool::new(false));
    let summary = BatchDriver::new(&mut detector, cancelled).run(dir.path(), &config());
    assert_eq!(summary.completed, 1);

    let out = image::open(dir.path().join("photo_anonymized.png"))
        .unwrap()
        .to_rgb8();
    // Center solid-filled, corners untouched
    assert_eq!(out.get_pixel(32, 32).0, [0, 0, 0]);
    assert_eq!(out.get_pixel(2, 2).0, [200, 200, 200]);
}

#[test]
fn test_extension_filter_limits_batch() {
    let dir = tempfile::tempdir().unwrap();
    write_test_image(&dir.path().join("photo.png"));
    write_test_image(&dir.path().join("other.jpg"));

    let mut detector = CenterFaceStub;
    let cancelled = Arc::new(AtomicBool::new(false));
    let mut cfg = config();
    cfg.extension = Some("png".to_string());
    let summary = BatchDriver::new(&mut detector, cancelled).run(dir.path(), &cfg);

    assert_eq!(summary.completed, 1);
    assert!(dir.path().join("photo_anonymized.png").exists());
    assert!(!dir.path().join("other_anonymized.jpg").exists());
}
