use image::imageops::FilterType;
use image::RgbImage;

/// A single captured frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the loop and the
/// preparer treat pixel data as opaque.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

impl Frame {
    pub const CHANNELS: usize = 3;

    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * Self::CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    pub fn from_rgb_image(image: RgbImage, index: usize) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sequence number assigned by the camera that produced the frame.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Returns a copy scaled to exactly `width`×`height`, or `self` unchanged
    /// when the dimensions already match.
    pub fn resized(self, width: u32, height: u32) -> Self {
        let expected = self.width as usize * self.height as usize * Self::CHANNELS;
        if (self.width, self.height) == (width, height) || self.data.len() != expected {
            return self;
        }
        let index = self.index;
        let scaled = match RgbImage::from_raw(self.width, self.height, self.data) {
            Some(img) => image::imageops::resize(&img, width, height, FilterType::Triangle),
            None => RgbImage::new(width, height),
        };
        Self::from_rgb_image(scaled, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * 3")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 0);
    }

    #[test]
    fn test_rgb_image_conversion_keeps_pixels() {
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(1, 1, image::Rgb([10, 20, 30]));
        let frame = Frame::from_rgb_image(img, 7);
        assert_eq!(frame.index(), 7);

        let back = frame.to_rgb_image().unwrap();
        assert_eq!(back.get_pixel(1, 1).0, [10, 20, 30]);
    }

    #[test]
    fn test_resized_changes_dimensions() {
        let frame = Frame::new(vec![90u8; 8 * 4 * 3], 8, 4, 3);
        let scaled = frame.resized(4, 2);
        assert_eq!((scaled.width(), scaled.height()), (4, 2));
        assert_eq!(scaled.index(), 3);
        assert_eq!(scaled.data()[0], 90);
    }

    #[test]
    fn test_resized_same_size_is_identity() {
        let frame = Frame::new(vec![1u8; 12], 2, 2, 0);
        let same = frame.clone().resized(2, 2);
        assert_eq!(same.data(), frame.data());
    }
}
