use thiserror::Error;

use crate::imaging::domain::prepared_payload::PreparedPayload;
use crate::imaging::domain::raw_image::RawImage;
use crate::imaging::domain::size_limit::SizeLimit;

#[derive(Error, Debug)]
pub enum PrepareError {
    #[error("failed to decode image: {0}")]
    ImageDecode(String),
    #[error("image dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("size limit must be positive, got {width}x{height}")]
    InvalidLimit { width: u32, height: u32 },
    #[error("quality must be in (0, 1], got {0}")]
    InvalidQuality(f32),
    #[error("failed to encode image: {0}")]
    Encode(String),
}

/// Turns a raw image into a size-bounded payload for the detection endpoint.
///
/// Implementations must not touch the network or the filesystem.
pub trait ImagePreparer: Send + Sync {
    fn prepare(
        &self,
        image: &RawImage,
        limit: SizeLimit,
        quality: f32,
    ) -> Result<PreparedPayload, PrepareError>;
}
