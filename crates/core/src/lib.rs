//! Face anonymization pipeline: detect faces, redact them, stream the
//! result to an output sink.

pub mod detection;
pub mod pipeline;
pub mod redaction;
pub mod shared;
pub mod video;
