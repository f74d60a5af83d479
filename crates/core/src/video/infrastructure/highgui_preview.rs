use opencv::prelude::*;
use opencv::{core, highgui, imgproc};

use crate::shared::frame::Frame;
use crate::video::domain::preview_window::{PreviewControl, PreviewWindow};

/// Keypress that ends the stream early.
const QUIT_KEY: i32 = 'q' as i32;

/// Poll duration for `wait_key`, in milliseconds.
const KEY_POLL_MS: i32 = 1;

/// Live preview backed by an OpenCV highgui window.
pub struct HighguiPreview {
    title: String,
    opened: bool,
}

// Safety: HighguiPreview is only used from a single thread at a time.
unsafe impl Send for HighguiPreview {}

impl HighguiPreview {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            opened: false,
        }
    }
}

impl PreviewWindow for HighguiPreview {
    fn show(&mut self, frame: &Frame) -> Result<PreviewControl, Box<dyn std::error::Error>> {
        let height = frame.height() as i32;
        let width = frame.width() as i32;

        let mut rgb = Mat::new_rows_cols_with_default(
            height,
            width,
            core::CV_8UC3,
            core::Scalar::all(0.0),
        )?;
        rgb.data_bytes_mut()?.copy_from_slice(frame.data());

        let mut bgr = Mat::default();
        imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;

        highgui::imshow(&self.title, &bgr)?;
        self.opened = true;

        if highgui::wait_key(KEY_POLL_MS)? == QUIT_KEY {
            return Ok(PreviewControl::Quit);
        }
        Ok(PreviewControl::Continue)
    }

    fn close(&mut self) {
        if self.opened {
            let _ = highgui::destroy_window(&self.title);
            self.opened = false;
        }
    }
}
