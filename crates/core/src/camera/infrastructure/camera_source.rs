use std::fmt;
use std::path::PathBuf;

/// Where an ffmpeg camera reads from.
///
/// `v4l2:/dev/video0`, `avfoundation:0` and `dshow:video=Integrated Camera`
/// name capture devices through an ffmpeg input device; anything else is
/// treated as a media file, which stands in for a camera in tests and demos.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CameraSource {
    Device { format: String, device: String },
    File(PathBuf),
}

const DEVICE_FORMATS: &[&str] = &["v4l2", "video4linux2", "avfoundation", "dshow"];

impl CameraSource {
    pub fn parse(spec: &str) -> Self {
        if let Some((format, device)) = spec.split_once(':') {
            if DEVICE_FORMATS.contains(&format) && !device.is_empty() {
                return Self::Device {
                    format: format.to_string(),
                    device: device.to_string(),
                };
            }
        }
        Self::File(PathBuf::from(spec))
    }

    /// The default capture device for this platform.
    pub fn platform_default() -> Self {
        let (format, device) = if cfg!(target_os = "windows") {
            ("dshow", "video=0")
        } else if cfg!(target_os = "macos") {
            ("avfoundation", "0")
        } else {
            ("v4l2", "/dev/video0")
        };
        Self::Device {
            format: format.to_string(),
            device: device.to_string(),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

impl fmt::Display for CameraSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device { format, device } => write!(f, "{format}:{device}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("v4l2:/dev/video0", "v4l2", "/dev/video0")]
    #[case("avfoundation:0", "avfoundation", "0")]
    #[case("dshow:video=Integrated Camera", "dshow", "video=Integrated Camera")]
    fn test_parse_device(#[case] spec: &str, #[case] format: &str, #[case] device: &str) {
        assert_eq!(
            CameraSource::parse(spec),
            CameraSource::Device {
                format: format.into(),
                device: device.into()
            }
        );
    }

    #[rstest]
    #[case("clip.mp4")]
    #[case("/tmp/clip.mkv")]
    #[case("C:/videos/clip.mp4")]
    #[case("v4l2:")]
    fn test_parse_file(#[case] spec: &str) {
        assert_eq!(CameraSource::parse(spec), CameraSource::File(spec.into()));
    }

    #[test]
    fn test_display_round_trips_device() {
        let source = CameraSource::parse("v4l2:/dev/video2");
        assert_eq!(source.to_string(), "v4l2:/dev/video2");
        assert!(!source.is_file());
    }

    #[test]
    fn test_platform_default_is_device() {
        assert!(!CameraSource::platform_default().is_file());
    }
}
