use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::media_metadata::MediaMetadata;

/// Abstracts video encoding so the pipeline can write output without
/// depending on a specific codec library.
///
/// Opened once per item with the source's frame rate; `close` must be
/// safe on every exit path, including after a failed `open`.
pub trait VideoWriter: Send {
    fn open(
        &mut self,
        path: &Path,
        metadata: &MediaMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
