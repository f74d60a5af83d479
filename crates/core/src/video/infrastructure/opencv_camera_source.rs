use opencv::prelude::*;
use opencv::{imgproc, videoio};

use crate::shared::frame::Frame;
use crate::shared::media_metadata::MediaMetadata;
use crate::video::domain::frame_source::{FrameSource, SourceOpenError};

/// Frame rate assumed when the capture device does not report one.
const FALLBACK_FPS: f64 = 30.0;

/// Live capture device as an unbounded [`FrameSource`].
///
/// Frames arrive in the device's BGR layout and are converted to RGB at
/// this boundary. The stream has no frame count and yields until the
/// device stops delivering or the pipeline cancels.
pub struct OpencvCameraSource {
    index: u32,
    capture: Option<videoio::VideoCapture>,
}

// Safety: OpencvCameraSource is only used from a single thread at a time.
// The capture handle is never shared across threads.
unsafe impl Send for OpencvCameraSource {}

impl OpencvCameraSource {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            capture: None,
        }
    }
}

impl FrameSource for OpencvCameraSource {
    fn open(&mut self) -> Result<MediaMetadata, SourceOpenError> {
        let index = self.index;
        let device = move || SourceOpenError::DeviceUnavailable { index };

        let capture = videoio::VideoCapture::new(self.index as i32, videoio::CAP_ANY)
            .map_err(|_| device())?;
        if !capture.is_opened().unwrap_or(false) {
            return Err(device());
        }

        let width = capture
            .get(videoio::CAP_PROP_FRAME_WIDTH)
            .unwrap_or(0.0) as u32;
        let height = capture
            .get(videoio::CAP_PROP_FRAME_HEIGHT)
            .unwrap_or(0.0) as u32;
        if width == 0 || height == 0 {
            return Err(device());
        }

        let reported_fps = capture.get(videoio::CAP_PROP_FPS).unwrap_or(0.0);
        let fps = if reported_fps > 0.0 {
            reported_fps
        } else {
            FALLBACK_FPS
        };

        self.capture = Some(capture);

        Ok(MediaMetadata {
            width,
            height,
            fps,
            frame_count: None,
            codec: String::new(),
            source_path: None,
        })
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let Some(capture) = self.capture.as_mut() else {
            return Box::new(std::iter::once(Err("camera not opened".into())));
        };

        Box::new(CaptureIter {
            capture,
            frame_index: 0,
        })
    }

    fn close(&mut self) {
        self.capture = None;
    }
}

struct CaptureIter<'a> {
    capture: &'a mut videoio::VideoCapture,
    frame_index: usize,
}

impl Iterator for CaptureIter<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut bgr = Mat::default();
        match self.capture.read(&mut bgr) {
            Ok(true) => {}
            // Device stopped delivering: end of stream, not an error
            Ok(false) => return None,
            Err(e) => return Some(Err(Box::new(e))),
        }
        if bgr.empty() {
            return None;
        }

        let result = (|| -> Result<Frame, Box<dyn std::error::Error>> {
            let mut rgb = Mat::default();
            imgproc::cvt_color(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

            let width = rgb.cols() as u32;
            let height = rgb.rows() as u32;
            let pixels = rgb.data_bytes()?.to_vec();
            Ok(Frame::new(pixels, width, height, 3, self.frame_index))
        })();

        self.frame_index += 1;
        Some(result)
    }
}
