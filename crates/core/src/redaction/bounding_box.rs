use crate::detection::domain::detection::Detection;

/// A detection box in pixel space, before clipping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_detection(det: &Detection) -> Self {
        Self::new(det.x1, det.y1, det.x2, det.y2)
    }

    /// Expands the box symmetrically about its center by `(factor - 1)`
    /// times its width/height per side, rounding to the nearest integer.
    ///
    /// `factor == 1.0` is the identity (within rounding), `factor < 1.0`
    /// shrinks the box. No clamping happens here; `factor <= 0.0` or a
    /// degenerate input may produce an empty or inverted box, which
    /// [`clip`](Self::clip) collapses to a zero-area region.
    pub fn scaled(&self, factor: f32) -> BoundingBox {
        let s = factor - 1.0;
        let w = self.x2 - self.x1;
        let h = self.y2 - self.y1;
        BoundingBox {
            x1: (self.x1 - w * s).round(),
            y1: (self.y1 - h * s).round(),
            x2: (self.x2 + w * s).round(),
            y2: (self.y2 + h * s).round(),
        }
    }

    /// Clips the box to the valid pixel range of a `frame_width` ×
    /// `frame_height` frame.
    ///
    /// Every coordinate lands in `[0, dim - 1]` and the result is ordered
    /// (`x1 <= x2`, `y1 <= y2`); inverted boxes collapse to zero area.
    pub fn clip(&self, frame_width: u32, frame_height: u32) -> RedactionRegion {
        let max_x = frame_width.saturating_sub(1) as f32;
        let max_y = frame_height.saturating_sub(1) as f32;

        let x1 = self.x1.clamp(0.0, max_x);
        let y1 = self.y1.clamp(0.0, max_y);
        let x2 = self.x2.clamp(x1, max_x);
        let y2 = self.y2.clamp(y1, max_y);

        RedactionRegion {
            x1: x1 as u32,
            y1: y1 as u32,
            x2: x2 as u32,
            y2: y2 as u32,
        }
    }
}

/// A scaled, clipped box ready for redaction.
///
/// Invariant: `0 <= x1 <= x2 < frame_width` and `0 <= y1 <= y2 <
/// frame_height`. Pixels covered are `x1..x2` × `y1..y2` (exclusive upper
/// bounds), so `x1 == x2` or `y1 == y2` means zero area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RedactionRegion {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl RedactionRegion {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn is_empty(&self) -> bool {
        self.x1 == self.x2 || self.y1 == self.y2
    }
}
