use crate::shared::frame::Frame;

/// Outcome of rendering one preview frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewControl {
    Continue,
    /// The user pressed the quit key; the stream should end gracefully.
    Quit,
}

/// A live preview surface.
///
/// `show` renders the frame and polls briefly for a quit keypress, so it
/// blocks for a bounded, short time.
pub trait PreviewWindow: Send {
    fn show(&mut self, frame: &Frame) -> Result<PreviewControl, Box<dyn std::error::Error>>;

    fn close(&mut self);
}
