use std::path::PathBuf;

use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::media_metadata::MediaMetadata;

/// Why a source could not be opened.
///
/// The variants keep "the file does not exist", "the capture device is
/// not there", and "the bytes are not decodable media" apart so the
/// operator can tell them apart too.
#[derive(Error, Debug)]
pub enum SourceOpenError {
    #[error("input not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("capture device {index} is unavailable")]
    DeviceUnavailable { index: u32 },
    #[error("could not read {} as media: {}", .path.display(), .reason)]
    Unreadable { path: PathBuf, reason: String },
}

/// A lazy, finite-or-infinite sequence of frames.
///
/// The closed set of implementations — single image, video file, live
/// camera — share this one capability, so the pipeline never branches on
/// the input modality. `close` must be safe to call exactly once on every
/// exit path.
pub trait FrameSource: Send {
    /// Opens the source and returns its metadata.
    fn open(&mut self) -> Result<MediaMetadata, SourceOpenError>;

    /// Returns an iterator over frames in decode order. Unbounded sources
    /// yield until cancelled externally.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases any resources held by the source.
    fn close(&mut self);
}
