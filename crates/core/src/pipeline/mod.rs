pub mod batch_driver;
pub mod item_error;
pub mod progress;
pub mod stream_job;
pub mod stream_processor;
