pub mod frame_source;
pub mod image_writer;
pub mod preview_window;
pub mod video_writer;
