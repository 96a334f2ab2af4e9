use crate::imaging::domain::image_preparer::PrepareError;

/// Bounding box an image must fit inside before it is sent for detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeLimit {
    pub max_width: u32,
    pub max_height: u32,
}

impl SizeLimit {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }

    /// Same bound on both edges, i.e. a cap on the longer edge.
    pub fn square(max_dimension: u32) -> Self {
        Self::new(max_dimension, max_dimension)
    }

    pub fn validate(&self) -> Result<(), PrepareError> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(PrepareError::InvalidLimit {
                width: self.max_width,
                height: self.max_height,
            });
        }
        Ok(())
    }

    pub fn contains(&self, width: u32, height: u32) -> bool {
        width <= self.max_width && height <= self.max_height
    }

    /// Largest size with the same aspect ratio that fits inside the limit.
    ///
    /// The constrained edge lands exactly on the limit; the other edge is
    /// rounded to the nearest pixel and never drops below 1.
    pub fn fit(&self, width: u32, height: u32) -> (u32, u32) {
        if self.contains(width, height) || width == 0 || height == 0 {
            return (width, height);
        }
        let scale_w = self.max_width as f64 / width as f64;
        let scale_h = self.max_height as f64 / height as f64;
        if scale_w <= scale_h {
            let h = (height as f64 * scale_w).round() as u32;
            (self.max_width, h.clamp(1, self.max_height))
        } else {
            let w = (width as f64 * scale_h).round() as u32;
            (w.clamp(1, self.max_width), self.max_height)
        }
    }
}
