use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::RgbImage;

use crate::imaging::domain::image_preparer::{ImagePreparer, PrepareError};
use crate::imaging::domain::prepared_payload::{PayloadOrigin, PreparedPayload};
use crate::imaging::domain::raw_image::{EncodedImage, RawImage};
use crate::imaging::domain::size_limit::SizeLimit;
use crate::shared::constants::UPLOAD_FILE_NAME;

const JPEG_MIME: &str = "image/jpeg";
const FRAME_FILE_NAME: &str = "frame.jpg";

/// Prepares payloads with the `image` crate, re-encoding as lossy JPEG.
///
/// Encoded uploads that already fit are passed through byte-for-byte so a
/// small file is never degraded by a second lossy pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct JpegImagePreparer;

impl JpegImagePreparer {
    pub fn new() -> Self {
        Self
    }
}

impl ImagePreparer for JpegImagePreparer {
    fn prepare(
        &self,
        image: &RawImage,
        limit: SizeLimit,
        quality: f32,
    ) -> Result<PreparedPayload, PrepareError> {
        if !(quality > 0.0 && quality <= 1.0) {
            return Err(PrepareError::InvalidQuality(quality));
        }
        limit.validate()?;
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PrepareError::InvalidDimensions { width, height });
        }

        match image {
            RawImage::Encoded(encoded) => prepare_encoded(encoded, limit, quality),
            RawImage::Frame(frame) => {
                let rgb = frame.to_rgb_image().ok_or_else(|| {
                    PrepareError::ImageDecode("frame data does not match its dimensions".into())
                })?;
                let rgb = fit_within(rgb, limit);
                encode_payload(&rgb, quality, PayloadOrigin::Capture, FRAME_FILE_NAME)
            }
        }
    }
}

fn prepare_encoded(
    encoded: &EncodedImage,
    limit: SizeLimit,
    quality: f32,
) -> Result<PreparedPayload, PrepareError> {
    let decoded = image::load_from_memory_with_format(encoded.bytes(), encoded.format())
        .map_err(|e| PrepareError::ImageDecode(e.to_string()))?;

    if limit.contains(decoded.width(), decoded.height()) {
        return Ok(PreparedPayload {
            bytes: encoded.bytes().to_vec(),
            mime_type: encoded.format().to_mime_type().to_string(),
            width: decoded.width(),
            height: decoded.height(),
            origin: PayloadOrigin::Upload,
            file_name: encoded
                .file_name()
                .unwrap_or(UPLOAD_FILE_NAME)
                .to_string(),
            reencoded: false,
        });
    }

    let rgb = fit_within(decoded.to_rgb8(), limit);
    encode_payload(&rgb, quality, PayloadOrigin::Upload, UPLOAD_FILE_NAME)
}

fn fit_within(rgb: RgbImage, limit: SizeLimit) -> RgbImage {
    let (w, h) = limit.fit(rgb.width(), rgb.height());
    if (w, h) == rgb.dimensions() {
        rgb
    } else {
        image::imageops::resize(&rgb, w, h, FilterType::Triangle)
    }
}

fn encode_payload(
    rgb: &RgbImage,
    quality: f32,
    origin: PayloadOrigin,
    file_name: &str,
) -> Result<PreparedPayload, PrepareError> {
    let mut buffer = Vec::new();
    let quality_percent = ((quality * 100.0).round() as u8).clamp(1, 100);
    JpegEncoder::new_with_quality(&mut buffer, quality_percent)
        .encode_image(rgb)
        .map_err(|e| PrepareError::Encode(e.to_string()))?;

    Ok(PreparedPayload {
        bytes: buffer,
        mime_type: JPEG_MIME.to_string(),
        width: rgb.width(),
        height: rgb.height(),
        origin,
        file_name: file_name.to_string(),
        reencoded: true,
    })
}
