use crate::detection::domain::detection::Detection;
use crate::redaction::bounding_box::BoundingBox;
use crate::redaction::region_redactor::RegionRedactor;
use crate::shared::frame::Frame;

/// Maps a detector's per-frame output onto region redactions.
///
/// Detections are processed in the detector's native order; annotation
/// numbering is 1-based over that order (handled by the redactor).
pub struct FrameAnonymizer {
    mask_scale: f32,
    redactor: RegionRedactor,
}

impl FrameAnonymizer {
    pub fn new(mask_scale: f32, redactor: RegionRedactor) -> Self {
        Self {
            mask_scale,
            redactor,
        }
    }

    /// For each detection: scale the box by the mask-scale factor, clip it
    /// to the frame bounds, and redact. The frame is mutated in place.
    pub fn anonymize(&self, frame: &mut Frame, detections: &[Detection]) {
        let fw = frame.width();
        let fh = frame.height();

        for (index, det) in detections.iter().enumerate() {
            let region = BoundingBox::from_detection(det)
                .scaled(self.mask_scale)
                .clip(fw, fh);
            self.redactor.redact(frame, &region, index, det.score);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redaction::region_redactor::{RedactionMode, RenderOptions};
    use crate::shared::constants::OVERLAY_COLOR;

    fn make_frame(width: u32, height: u32, value: u8) -> Frame {
        Frame::new(vec![value; (width * height * 3) as usize], width, height, 3, 0)
    }

    fn anonymizer(mode: RedactionMode, mask_scale: f32, annotate: bool) -> FrameAnonymizer {
        FrameAnonymizer::new(
            mask_scale,
            RegionRedactor::new(RenderOptions {
                mode,
                ellipse: false,
                annotate,
            }),
        )
    }

    fn detection(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection::new(x1, y1, x2, y2, 0.9)
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let idx = ((y * frame.width() + x) * 3) as usize;
        frame.data()[idx..idx + 3].try_into().unwrap()
    }

    #[test]
    fn test_none_without_annotation_is_identity() {
        let mut frame = make_frame(64, 64, 150);
        let before = frame.clone();
        let dets = vec![
            detection(5.0, 5.0, 20.0, 20.0),
            detection(30.0, 30.0, 60.0, 60.0),
            detection(-10.0, -10.0, 100.0, 100.0),
        ];
        anonymizer(RedactionMode::None, 1.3, false).anonymize(&mut frame, &dets);
        assert_eq!(frame, before);
    }

    #[test]
    fn test_solid_redacts_each_detection() {
        let mut frame = make_frame(100, 100, 200);
        let dets = vec![
            detection(10.0, 10.0, 20.0, 20.0),
            detection(60.0, 60.0, 80.0, 80.0),
        ];
        anonymizer(RedactionMode::Solid, 1.0, false).anonymize(&mut frame, &dets);

        assert_eq!(pixel(&frame, 15, 15), OVERLAY_COLOR);
        assert_eq!(pixel(&frame, 70, 70), OVERLAY_COLOR);
        // Between the two regions nothing changed
        assert_eq!(pixel(&frame, 40, 40), [200, 200, 200]);
    }

    #[test]
    fn test_mask_scale_expands_redacted_area() {
        let mut frame = make_frame(100, 100, 200);
        let dets = vec![detection(40.0, 40.0, 60.0, 60.0)];
        anonymizer(RedactionMode::Solid, 1.5, false).anonymize(&mut frame, &dets);

        // (35, 35) is outside the raw box but inside the 1.5x mask
        assert_eq!(pixel(&frame, 35, 35), OVERLAY_COLOR);
    }

    #[test]
    fn test_out_of_bounds_detection_is_clipped() {
        let mut frame = make_frame(50, 50, 200);
        let dets = vec![detection(-100.0, -100.0, 200.0, 200.0)];
        anonymizer(RedactionMode::Solid, 1.0, false).anonymize(&mut frame, &dets);

        // In-bounds portion redacted; no panic from the overhang
        assert_eq!(pixel(&frame, 0, 0), OVERLAY_COLOR);
        assert_eq!(pixel(&frame, 48, 48), OVERLAY_COLOR);
    }

    #[test]
    fn test_empty_detection_list_is_identity() {
        let mut frame = make_frame(32, 32, 99);
        let before = frame.clone();
        anonymizer(RedactionMode::Solid, 1.3, true).anonymize(&mut frame, &[]);
        assert_eq!(frame, before);
    }

    #[test]
    fn test_degenerate_detection_is_noop() {
        let mut frame = make_frame(32, 32, 99);
        let before = frame.clone();
        let dets = vec![detection(10.0, 10.0, 10.0, 25.0)];
        anonymizer(RedactionMode::Blur, 1.0, false).anonymize(&mut frame, &dets);
        assert_eq!(frame, before);
    }
}
