pub mod image_preparer;
pub mod prepared_payload;
pub mod raw_image;
pub mod size_limit;
