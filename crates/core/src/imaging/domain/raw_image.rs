use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, ImageReader};

use crate::imaging::domain::image_preparer::PrepareError;
use crate::shared::frame::Frame;

/// An image waiting to be prepared for detection.
///
/// Owned by whoever produced it (an upload or a camera tick) and dropped
/// once a payload has been prepared from it.
#[derive(Clone, Debug)]
pub enum RawImage {
    /// A file blob in its original encoding.
    Encoded(EncodedImage),
    /// A decoded frame read from a camera.
    Frame(Frame),
}

impl RawImage {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            RawImage::Encoded(encoded) => (encoded.width, encoded.height),
            RawImage::Frame(frame) => (frame.width(), frame.height()),
        }
    }
}

impl From<Frame> for RawImage {
    fn from(frame: Frame) -> Self {
        RawImage::Frame(frame)
    }
}

impl From<EncodedImage> for RawImage {
    fn from(encoded: EncodedImage) -> Self {
        RawImage::Encoded(encoded)
    }
}

#[derive(Clone, Debug)]
pub struct EncodedImage {
    bytes: Vec<u8>,
    format: ImageFormat,
    width: u32,
    height: u32,
    file_name: Option<String>,
}

impl EncodedImage {
    /// Sniffs the format and reads the dimensions from the header.
    ///
    /// Pixel data is not decoded here, so a truncated body only surfaces
    /// when the image is prepared.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, PrepareError> {
        let reader = ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(|e| PrepareError::ImageDecode(e.to_string()))?;
        let format = reader
            .format()
            .ok_or_else(|| PrepareError::ImageDecode("unrecognised image format".into()))?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| PrepareError::ImageDecode(e.to_string()))?;

        Ok(Self {
            bytes,
            format,
            width,
            height,
            file_name: None,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let bytes = std::fs::read(path)?;
        let encoded = Self::from_bytes(bytes)?;
        Ok(match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => encoded.with_file_name(name),
            None => encoded,
        })
    }

    /// Original file name, sent to the service when the bytes pass through.
    pub fn with_file_name(mut self, name: &str) -> Self {
        self.file_name = Some(name.to_string());
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }
}
