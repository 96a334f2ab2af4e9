use crate::shared::frame::Frame;

/// Errors raised by a [`Camera`].
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    /// The stream could not be acquired (missing device, permission, bad source).
    #[error("camera access failed: {0}")]
    Access(String),
    /// The stream is running but has not produced a usable frame.
    #[error("frame capture failed: {0}")]
    Capture(String),
    #[error("camera is not started")]
    NotStarted,
}

/// Resolution reported by a started stream. Zero means unknown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
}

impl StreamInfo {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The reported resolution, or `fallback` when either edge is unknown.
    pub fn resolution_or(&self, fallback: (u32, u32)) -> (u32, u32) {
        if self.width == 0 || self.height == 0 {
            fallback
        } else {
            (self.width, self.height)
        }
    }
}

/// A live video source.
///
/// `read_frame` returns the most recent frame without waiting for a new one,
/// so callers control the sampling rate.
pub trait Camera: Send {
    /// Acquires the stream.
    fn start(&mut self) -> Result<StreamInfo, CameraError>;

    /// Returns the current frame.
    fn read_frame(&mut self) -> Result<Frame, CameraError>;

    /// Releases the stream. Calling it on a stopped camera is a no-op.
    fn stop(&mut self);

    fn is_active(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_falls_back_when_unknown() {
        assert_eq!(StreamInfo::new(0, 0).resolution_or((640, 480)), (640, 480));
        assert_eq!(StreamInfo::new(1280, 0).resolution_or((640, 480)), (640, 480));
        assert_eq!(
            StreamInfo::new(1280, 720).resolution_or((640, 480)),
            (1280, 720)
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CameraError::Access("no device".into()).to_string(),
            "camera access failed: no device"
        );
        assert_eq!(CameraError::NotStarted.to_string(), "camera is not started");
    }
}
