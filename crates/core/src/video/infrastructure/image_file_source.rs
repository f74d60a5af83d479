use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;
use crate::shared::media_metadata::MediaMetadata;
use crate::video::domain::frame_source::{FrameSource, SourceOpenError};

/// Adapts a single image file to the [`FrameSource`] interface: a
/// one-frame stream with `fps = 0`.
pub struct ImageFileSource {
    path: PathBuf,
    frame: Option<Frame>,
}

impl ImageFileSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            frame: None,
        }
    }
}

impl FrameSource for ImageFileSource {
    fn open(&mut self) -> Result<MediaMetadata, SourceOpenError> {
        if !self.path.exists() {
            return Err(SourceOpenError::NotFound(self.path.clone()));
        }

        let img = image::open(&self.path)
            .map_err(|e| SourceOpenError::Unreadable {
                path: self.path.clone(),
                reason: e.to_string(),
            })?
            .to_rgb8();

        let width = img.width();
        let height = img.height();
        self.frame = Some(Frame::new(img.into_raw(), width, height, 3, 0));

        Ok(MediaMetadata {
            width,
            height,
            fps: 0.0,
            frame_count: Some(1),
            codec: self
                .path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default()
                .to_lowercase(),
            source_path: Some(self.path.clone()),
        })
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        Box::new(self.frame.take().into_iter().map(Ok))
    }

    fn close(&mut self) {
        self.frame = None;
    }
}
