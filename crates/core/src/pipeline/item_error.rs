use std::path::PathBuf;

use thiserror::Error;

use crate::video::domain::frame_source::SourceOpenError;

/// Why processing one input item failed.
///
/// Item errors never abort a batch: the driver reports them and moves
/// on. In single-item mode they are fatal and reach the process exit
/// code.
#[derive(Error, Debug)]
pub enum ItemError {
    #[error(transparent)]
    SourceOpen(#[from] SourceOpenError),

    #[error("{} has an unknown content type", .0.display())]
    UnknownContentType(PathBuf),

    #[error("failed to read frame: {0}")]
    Read(String),

    /// Detector failures are surfaced verbatim, never masked: a silent
    /// mis-detection would produce wrong redactions.
    #[error("detection failed: {0}")]
    Detection(String),

    #[error("failed to write {}: {}", .path.display(), .reason)]
    Write { path: PathBuf, reason: String },
}
