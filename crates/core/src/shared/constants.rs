pub const CENTERFACE_MODEL_NAME: &str = "centerface.onnx";
pub const CENTERFACE_MODEL_URL: &str =
    "https://github.com/faceveil/faceveil/releases/download/v0.1.0/centerface.onnx";

/// Pixelation strength: each region dimension is reduced to this many blocks.
pub const BLUR_FACTOR: u32 = 2;

/// Fill color for the `solid` redaction mode.
pub const OVERLAY_COLOR: [u8; 3] = [0, 0, 0];

/// Color of the detection-number annotation text.
pub const ANNOTATION_COLOR: [u8; 3] = [128, 255, 128];

/// Inserted before the file extension when deriving a default output path.
pub const OUTPUT_SUFFIX: &str = "_anonymized";
