pub mod constants;
pub mod frame;
pub mod media_metadata;
