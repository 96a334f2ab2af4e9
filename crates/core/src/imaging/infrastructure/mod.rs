pub mod jpeg_image_preparer;
