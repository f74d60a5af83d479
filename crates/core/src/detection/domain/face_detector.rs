use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;

/// Domain interface for face detection.
///
/// The confidence threshold is applied inside the implementation: the
/// returned list contains only detections at or above `threshold`, in the
/// detector's native output order. Callers must not re-filter.
///
/// Implementations may be stateful, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(
        &mut self,
        frame: &Frame,
        threshold: f32,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
