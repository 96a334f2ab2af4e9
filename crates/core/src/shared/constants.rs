use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/detect_emotion";

/// Detection requests that take longer than this fail as transport errors.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const UPLOAD_MAX_DIMENSION: u32 = 1200;
pub const UPLOAD_QUALITY: f32 = 0.8;
/// Files above this size are rejected before any network traffic.
pub const UPLOAD_MAX_BYTES: u64 = 5 * 1024 * 1024;
pub const UPLOAD_FILE_NAME: &str = "resized-image.jpg";

pub const CAPTURE_MAX_WIDTH: u32 = 640;
pub const CAPTURE_MAX_HEIGHT: u32 = 480;
pub const CAPTURE_QUALITY: f32 = 0.8;

pub const REALTIME_QUALITY: f32 = 0.7;
/// Aim for roughly 5 submissions per second.
pub const REALTIME_TICK_INTERVAL: Duration = Duration::from_millis(200);
pub const FPS_WINDOW: Duration = Duration::from_millis(1000);

/// Overlay resolution used when the camera does not report one.
pub const DEFAULT_OVERLAY_WIDTH: u32 = 640;
pub const DEFAULT_OVERLAY_HEIGHT: u32 = 480;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff", "tif", "webp"];
