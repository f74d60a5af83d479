//! CenterFace detector using ONNX Runtime via `ort`.
//!
//! Decodes the model's center heatmap + scale + offset feature maps into
//! scored boxes, applies greedy NMS, and maps coordinates back to the
//! original frame resolution.

use std::path::Path;

use ndarray::ArrayViewD;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;

use super::execution_provider::{execution_providers, ExecutionBackend};

/// Output feature maps are at 1/4 of the input resolution.
const STRIDE: usize = 4;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f32 = 0.3;

/// The network requires input dimensions divisible by this.
const DIM_ALIGN: u32 = 32;

/// CenterFace detector backed by an ONNX Runtime session.
///
/// `fixed_shape` pins the inference resolution; without it each frame is
/// resized to its own dimensions rounded up to the required alignment.
pub struct OnnxCenterfaceDetector {
    session: ort::session::Session,
    fixed_shape: Option<(u32, u32)>,
}

impl OnnxCenterfaceDetector {
    pub fn new(
        model_path: &Path,
        fixed_shape: Option<(u32, u32)>,
        backend: ExecutionBackend,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let providers = execution_providers(backend);
        let mut builder = ort::session::Session::builder()?;
        if !providers.is_empty() {
            builder = builder.with_execution_providers(providers)?;
        }
        let session = builder.commit_from_file(model_path)?;

        Ok(Self {
            session,
            fixed_shape: fixed_shape.map(|(w, h)| (align(w), align(h))),
        })
    }
}

impl FaceDetector for OnnxCenterfaceDetector {
    fn detect(
        &mut self,
        frame: &Frame,
        threshold: f32,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let (in_w, in_h) = self
            .fixed_shape
            .unwrap_or_else(|| (align(frame.width()), align(frame.height())));
        let scale_x = in_w as f32 / frame.width() as f32;
        let scale_y = in_h as f32 / frame.height() as f32;

        let input = preprocess(frame, in_w, in_h);
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() < 3 {
            return Err("CenterFace model produced too few outputs".into());
        }

        let heatmap = outputs[0].try_extract_array::<f32>()?;
        let scales = outputs[1].try_extract_array::<f32>()?;
        let offsets = outputs[2].try_extract_array::<f32>()?;

        let mut raw = decode(heatmap.view(), scales.view(), offsets.view(), threshold)?;
        let kept = nms(&mut raw, NMS_IOU_THRESH);

        Ok(kept
            .into_iter()
            .map(|d| {
                Detection::new(
                    d.x1 / scale_x,
                    d.y1 / scale_y,
                    d.x2 / scale_x,
                    d.y2 / scale_y,
                    d.score,
                )
            })
            .collect())
    }
}

fn align(dim: u32) -> u32 {
    dim.div_ceil(DIM_ALIGN) * DIM_ALIGN
}

/// Resize (nearest-neighbor) to `in_w` × `in_h` and lay out as NCHW
/// float32. CenterFace takes raw 0–255 channel values.
fn preprocess(frame: &Frame, in_w: u32, in_h: u32) -> ndarray::Array4<f32> {
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, in_h as usize, in_w as usize));

    let src = frame.as_ndarray();
    let src_w = frame.width() as usize;
    let src_h = frame.height() as usize;
    let step_x = frame.width() as f32 / in_w as f32;
    let step_y = frame.height() as f32 / in_h as f32;

    for y in 0..in_h as usize {
        let src_y = ((y as f32 * step_y) as usize).min(src_h - 1);
        for x in 0..in_w as usize {
            let src_x = ((x as f32 * step_x) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32;
            }
        }
    }

    tensor
}

#[derive(Clone, Debug)]
struct RawDetection {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
}

/// Decode feature maps into boxes in input-resolution coordinates.
///
/// Cells below `threshold` are dropped here — downstream never
/// re-filters. Malformed cells (non-finite values) are skipped.
fn decode(
    heatmap: ArrayViewD<f32>,
    scales: ArrayViewD<f32>,
    offsets: ArrayViewD<f32>,
    threshold: f32,
) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
    if heatmap.ndim() != 4 || scales.ndim() != 4 || offsets.ndim() != 4 {
        return Err(format!(
            "Unexpected CenterFace output ranks: {} / {} / {}",
            heatmap.ndim(),
            scales.ndim(),
            offsets.ndim()
        )
        .into());
    }

    let oh = heatmap.shape()[2];
    let ow = heatmap.shape()[3];
    if scales.shape()[1] < 2
        || offsets.shape()[1] < 2
        || scales.shape()[2] != oh
        || scales.shape()[3] != ow
        || offsets.shape()[2] != oh
        || offsets.shape()[3] != ow
    {
        return Err("CenterFace scale/offset maps do not match the heatmap".into());
    }

    let max_x = (ow * STRIDE) as f32;
    let max_y = (oh * STRIDE) as f32;
    let mut dets = Vec::new();

    for y in 0..oh {
        for x in 0..ow {
            let score = heatmap[[0, 0, y, x]];
            if !(score >= threshold) {
                continue;
            }

            let size_h = scales[[0, 0, y, x]].exp() * STRIDE as f32;
            let size_w = scales[[0, 1, y, x]].exp() * STRIDE as f32;
            let off_y = offsets[[0, 0, y, x]];
            let off_x = offsets[[0, 1, y, x]];

            let cx = (x as f32 + off_x + 0.5) * STRIDE as f32;
            let cy = (y as f32 + off_y + 0.5) * STRIDE as f32;

            let x1 = (cx - size_w / 2.0).max(0.0);
            let y1 = (cy - size_h / 2.0).max(0.0);
            let x2 = (x1 + size_w).min(max_x);
            let y2 = (y1 + size_h).min(max_y);

            if !(x1.is_finite() && y1.is_finite() && x2.is_finite() && y2.is_finite()) {
                continue;
            }

            dets.push(RawDetection {
                x1,
                y1,
                x2,
                y2,
                score,
            });
        }
    }

    Ok(dets)
}

/// Greedy NMS: sort by score descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f32) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if !suppressed[j] && iou(&dets[i], &dets[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn iou(a: &RawDetection, b: &RawDetection) -> f32 {
    let ix1 = a.x1.max(b.x1);
    let iy1 = a.y1.max(b.y1);
    let ix2 = a.x2.min(b.x2);
    let iy2 = a.y2.min(b.y2);

    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }

    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}
