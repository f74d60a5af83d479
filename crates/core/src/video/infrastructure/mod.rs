pub mod ffmpeg_video_source;
pub mod ffmpeg_video_writer;
pub mod image_file_source;
pub mod image_file_writer;

#[cfg(feature = "camera")]
pub mod opencv_camera_source;

#[cfg(feature = "gui")]
pub mod highgui_preview;
