use std::path::Path;

use crate::shared::constants::{IMAGE_EXTENSIONS, UPLOAD_MAX_BYTES};

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Please select a valid image file: {0}")]
    NotAnImage(String),
    #[error("Image size is too large ({size} bytes). Please select an image less than {} MB", .max / (1024 * 1024))]
    TooLarge { size: u64, max: u64 },
    #[error("Could not read {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

/// Checks an upload candidate before anything is read or sent: it must have
/// an image extension and be at most [`UPLOAD_MAX_BYTES`]. Returns the file
/// size on success.
pub fn check_upload(path: &Path) -> Result<u64, UploadError> {
    if !has_image_extension(path) {
        return Err(UploadError::NotAnImage(path.display().to_string()));
    }

    let size = std::fs::metadata(path)
        .map_err(|e| UploadError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?
        .len();
    if size > UPLOAD_MAX_BYTES {
        return Err(UploadError::TooLarge {
            size,
            max: UPLOAD_MAX_BYTES,
        });
    }
    Ok(size)
}

pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
