pub mod annotation;
pub mod bounding_box;
pub mod frame_anonymizer;
pub mod region_redactor;
