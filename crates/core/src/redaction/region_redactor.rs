use crate::redaction::annotation;
use crate::redaction::bounding_box::RedactionRegion;
use crate::shared::constants::{ANNOTATION_COLOR, BLUR_FACTOR, OVERLAY_COLOR};
use crate::shared::frame::Frame;

/// Vertical offset of the annotation label above the region.
const LABEL_OFFSET: i32 = 20;

/// Visual treatment applied to a detected region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedactionMode {
    /// Opaque fill with the overlay color.
    Solid,
    /// Pixelation: average coarse blocks of the region.
    Blur,
    /// No pixel modification; used to validate detection without redacting.
    None,
}

#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    pub mode: RedactionMode,
    /// Blur only inside the rectangle's inscribed ellipse.
    pub ellipse: bool,
    /// Draw `"{index+1}: {score:.2f}"` near the region's top-left.
    pub annotate: bool,
}

/// Applies one redaction to one clipped region of a frame, in place.
pub struct RegionRedactor {
    options: RenderOptions,
}

impl RegionRedactor {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Mutates the frame within `region` only. A zero-area region is a
    /// no-op. Annotation is drawn after redaction so it stays visible.
    pub fn redact(&self, frame: &mut Frame, region: &RedactionRegion, index: usize, score: f32) {
        if region.is_empty() {
            return;
        }

        match self.options.mode {
            RedactionMode::Solid => fill_solid(frame, region, OVERLAY_COLOR),
            RedactionMode::Blur => pixelate(frame, region, self.options.ellipse),
            RedactionMode::None => {}
        }

        if self.options.annotate {
            let label = format!("{}: {:.2}", index + 1, score);
            annotation::draw_label(
                frame,
                region.x1 as i32,
                region.y1 as i32 - LABEL_OFFSET,
                &label,
                ANNOTATION_COLOR,
            );
        }
    }
}

fn fill_solid(frame: &mut Frame, region: &RedactionRegion, color: [u8; 3]) {
    let fw = frame.width() as usize;
    let channels = frame.channels() as usize;
    let data = frame.data_mut();

    for y in region.y1..region.y2 {
        for x in region.x1..region.x2 {
            let idx = (y as usize * fw + x as usize) * channels;
            data[idx..idx + 3].copy_from_slice(&color);
        }
    }
}

/// Downsample-then-upsample: the region is divided into a
/// `BLUR_FACTOR` × `BLUR_FACTOR` grid of blocks, and every pixel is
/// replaced by its block average. With `ellipse` set, only pixels inside
/// the rectangle's inscribed ellipse receive the averaged content.
fn pixelate(frame: &mut Frame, region: &RedactionRegion, ellipse: bool) {
    let fw = frame.width() as usize;
    let channels = frame.channels() as usize;

    let rx = region.x1 as usize;
    let ry = region.y1 as usize;
    let rw = region.width() as usize;
    let rh = region.height() as usize;

    let mut roi = extract_roi(frame.data(), fw, channels, rx, ry, rw, rh);
    pixelate_roi(&mut roi, rw, rh, channels);

    let data = frame.data_mut();
    if ellipse {
        composite_ellipse(data, &roi, fw, channels, rx, ry, rw, rh);
    } else {
        write_roi(data, &roi, fw, channels, rx, ry, rw, rh);
    }
}

fn extract_roi(
    data: &[u8],
    frame_width: usize,
    channels: usize,
    rx: usize,
    ry: usize,
    rw: usize,
    rh: usize,
) -> Vec<u8> {
    let mut roi = vec![0u8; rw * rh * channels];
    for row in 0..rh {
        let src = ((ry + row) * frame_width + rx) * channels;
        let dst = row * rw * channels;
        roi[dst..dst + rw * channels].copy_from_slice(&data[src..src + rw * channels]);
    }
    roi
}

fn write_roi(
    data: &mut [u8],
    roi: &[u8],
    frame_width: usize,
    channels: usize,
    rx: usize,
    ry: usize,
    rw: usize,
    rh: usize,
) {
    for row in 0..rh {
        let dst = ((ry + row) * frame_width + rx) * channels;
        let src = row * rw * channels;
        data[dst..dst + rw * channels].copy_from_slice(&roi[src..src + rw * channels]);
    }
}

fn pixelate_roi(roi: &mut [u8], rw: usize, rh: usize, channels: usize) {
    let block_w = (rw / BLUR_FACTOR as usize).max(1);
    let block_h = (rh / BLUR_FACTOR as usize).max(1);

    let mut by = 0;
    while by < rh {
        let bh = block_h.min(rh - by);
        let mut bx = 0;
        while bx < rw {
            let bw = block_w.min(rw - bx);

            let mut sums = [0u64; 3];
            for y in by..by + bh {
                for x in bx..bx + bw {
                    let idx = (y * rw + x) * channels;
                    for c in 0..3 {
                        sums[c] += roi[idx + c] as u64;
                    }
                }
            }
            let count = (bw * bh) as u64;
            let avg = [
                (sums[0] / count) as u8,
                (sums[1] / count) as u8,
                (sums[2] / count) as u8,
            ];

            for y in by..by + bh {
                for x in bx..bx + bw {
                    let idx = (y * rw + x) * channels;
                    roi[idx..idx + 3].copy_from_slice(&avg);
                }
            }
            bx += bw;
        }
        by += bh;
    }
}

/// Write blurred pixels back only within the inscribed ellipse of the
/// region rectangle; everything outside the ellipse keeps its original
/// content.
fn composite_ellipse(
    data: &mut [u8],
    roi: &[u8],
    frame_width: usize,
    channels: usize,
    rx: usize,
    ry: usize,
    rw: usize,
    rh: usize,
) {
    let semi_a = rw as f64 / 2.0;
    let semi_b = rh as f64 / 2.0;
    if semi_a <= 0.0 || semi_b <= 0.0 {
        return;
    }
    let inv_a_sq = 1.0 / (semi_a * semi_a);
    let inv_b_sq = 1.0 / (semi_b * semi_b);

    for row in 0..rh {
        for col in 0..rw {
            let dx = col as f64 + 0.5 - semi_a;
            let dy = row as f64 + 0.5 - semi_b;
            if dx * dx * inv_a_sq + dy * dy * inv_b_sq <= 1.0 {
                let frame_offset = ((ry + row) * frame_width + (rx + col)) * channels;
                let roi_offset = (row * rw + col) * channels;
                data[frame_offset..frame_offset + channels]
                    .copy_from_slice(&roi[roi_offset..roi_offset + channels]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn make_frame(width: u32, height: u32, value: u8) -> Frame {
        Frame::new(vec![value; (width * height * 3) as usize], width, height, 3, 0)
    }

    fn region(x1: u32, y1: u32, x2: u32, y2: u32) -> RedactionRegion {
        RedactionRegion { x1, y1, x2, y2 }
    }

    fn redactor(mode: RedactionMode, ellipse: bool, annotate: bool) -> RegionRedactor {
        RegionRedactor::new(RenderOptions {
            mode,
            ellipse,
            annotate,
        })
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let idx = ((y * frame.width() + x) * 3) as usize;
        frame.data()[idx..idx + 3].try_into().unwrap()
    }

    // ── Solid ────────────────────────────────────────────────────────

    #[test]
    fn test_solid_fills_region_with_overlay_color() {
        let mut frame = make_frame(50, 50, 200);
        redactor(RedactionMode::Solid, false, false).redact(&mut frame, &region(10, 10, 30, 40), 0, 0.9);

        for y in 10..40 {
            for x in 10..30 {
                assert_eq!(pixel(&frame, x, y), OVERLAY_COLOR);
            }
        }
    }

    #[test]
    fn test_solid_leaves_outside_untouched() {
        let mut frame = make_frame(50, 50, 200);
        redactor(RedactionMode::Solid, false, false).redact(&mut frame, &region(10, 10, 30, 40), 0, 0.9);

        assert_eq!(pixel(&frame, 9, 10), [200, 200, 200]);
        assert_eq!(pixel(&frame, 30, 10), [200, 200, 200]);
        assert_eq!(pixel(&frame, 10, 9), [200, 200, 200]);
        assert_eq!(pixel(&frame, 10, 40), [200, 200, 200]);
    }

    // ── Blur ─────────────────────────────────────────────────────────

    #[test]
    fn test_blur_averages_region_content() {
        let mut frame = make_frame(40, 40, 0);
        // Columns 0..15 white: the region's left block straddles the
        // white/black boundary and must average to a mid gray
        let data = frame.data_mut();
        for y in 0..40 {
            for x in 0..15 {
                let idx = (y * 40 + x) * 3;
                data[idx..idx + 3].copy_from_slice(&[255, 255, 255]);
            }
        }

        redactor(RedactionMode::Blur, false, false).redact(&mut frame, &region(10, 10, 30, 30), 0, 0.5);

        let p = pixel(&frame, 19, 15);
        assert!(p[0] > 0 && p[0] < 255, "expected averaged value, got {:?}", p);
    }

    #[test]
    fn test_blur_uniform_region_is_stable() {
        let mut frame = make_frame(40, 40, 90);
        let before = frame.clone();
        redactor(RedactionMode::Blur, false, false).redact(&mut frame, &region(5, 5, 35, 35), 0, 0.5);
        assert_eq!(frame, before);
    }

    #[test]
    fn test_blur_does_not_touch_outside_region() {
        let mut frame = make_frame(40, 40, 0);
        frame.data_mut()[(12 * 40 + 12) * 3] = 255;
        redactor(RedactionMode::Blur, false, false).redact(&mut frame, &region(10, 10, 20, 20), 0, 0.5);

        assert_eq!(pixel(&frame, 5, 5), [0, 0, 0]);
        assert_eq!(pixel(&frame, 25, 25), [0, 0, 0]);
    }

    #[test]
    fn test_blur_ellipse_leaves_rectangle_corners() {
        let mut frame = make_frame(60, 60, 0);
        // Region content: all white so the pixelated average is white
        let data = frame.data_mut();
        for y in 10..50 {
            for x in 10..50 {
                let idx = (y * 60 + x) * 3;
                data[idx..idx + 3].copy_from_slice(&[255, 255, 255]);
            }
        }
        // Overwrite the corners with a marker the ellipse must not cover
        let marker = [1u8, 2, 3];
        for (x, y) in [(10u32, 10u32), (49, 10), (10, 49), (49, 49)] {
            let idx = ((y * 60 + x) * 3) as usize;
            frame.data_mut()[idx..idx + 3].copy_from_slice(&marker);
        }

        redactor(RedactionMode::Blur, true, false).redact(&mut frame, &region(10, 10, 50, 50), 0, 0.5);

        // Corner pixels lie outside the inscribed ellipse
        for (x, y) in [(10u32, 10u32), (49, 10), (10, 49), (49, 49)] {
            assert_eq!(pixel(&frame, x, y), marker);
        }
        // Center lies inside and was replaced by the average
        assert_ne!(pixel(&frame, 30, 30), [0, 0, 0]);
    }

    // ── None ─────────────────────────────────────────────────────────

    #[test]
    fn test_none_mode_is_identity() {
        let mut frame = make_frame(30, 30, 123);
        let before = frame.clone();
        redactor(RedactionMode::None, false, false).redact(&mut frame, &region(5, 5, 25, 25), 0, 0.5);
        assert_eq!(frame, before);
    }

    // ── Degenerate regions ───────────────────────────────────────────

    #[rstest]
    #[case::solid(RedactionMode::Solid)]
    #[case::blur(RedactionMode::Blur)]
    #[case::none(RedactionMode::None)]
    fn test_zero_area_region_is_noop(#[case] mode: RedactionMode) {
        let mut frame = make_frame(30, 30, 77);
        let before = frame.clone();
        redactor(mode, true, true).redact(&mut frame, &region(10, 5, 10, 25), 0, 0.5);
        redactor(mode, true, true).redact(&mut frame, &region(5, 10, 25, 10), 0, 0.5);
        assert_eq!(frame, before);
    }

    // ── Annotation ───────────────────────────────────────────────────

    #[test]
    fn test_annotation_drawn_after_redaction() {
        let mut frame = make_frame(100, 100, 200);
        redactor(RedactionMode::Solid, false, true).redact(&mut frame, &region(10, 40, 90, 90), 2, 0.87);

        let annotated = frame
            .data()
            .chunks(3)
            .filter(|p| p == &ANNOTATION_COLOR)
            .count();
        assert!(annotated > 0, "label pixels should be present");
    }

    #[test]
    fn test_annotation_near_top_edge_is_clipped() {
        let mut frame = make_frame(100, 100, 0);
        // Label anchor lands above the frame; must clip, not panic
        redactor(RedactionMode::None, false, true).redact(&mut frame, &region(0, 5, 50, 50), 0, 0.5);
    }
}
