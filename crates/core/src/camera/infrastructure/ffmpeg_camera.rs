use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ffmpeg_next::format::context::{Context as FormatContext, Input};
use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;

use crate::camera::domain::camera::{Camera, CameraError, StreamInfo};
use crate::camera::infrastructure::camera_source::CameraSource;
use crate::shared::frame::Frame;

/// How long `read_frame` waits for the first decoded frame after start.
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(3);
const FALLBACK_FILE_FPS: f64 = 30.0;

/// Capture options forwarded to the input device.
#[derive(Clone, Copy, Debug, Default)]
pub struct CaptureOptions {
    pub resolution: Option<(u32, u32)>,
    pub framerate: Option<u32>,
}

/// Camera backed by ffmpeg-next (libavdevice + libavcodec).
///
/// A capture thread owns the demuxer and decoder, converts every decoded
/// frame to RGB24 and publishes it into a single latest-frame slot. Reads
/// never queue: a slow consumer simply sees fewer frames. File sources are
/// paced at their native frame rate and keep their last frame at end of
/// stream.
pub struct FfmpegCamera {
    source: CameraSource,
    options: CaptureOptions,
    latest: Arc<LatestFrame>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    info: Option<StreamInfo>,
}

impl FfmpegCamera {
    pub fn new(source: CameraSource) -> Self {
        Self {
            source,
            options: CaptureOptions::default(),
            latest: Arc::new(LatestFrame::default()),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            info: None,
        }
    }

    pub fn with_options(mut self, options: CaptureOptions) -> Self {
        self.options = options;
        self
    }

    pub fn source(&self) -> &CameraSource {
        &self.source
    }
}

impl Camera for FfmpegCamera {
    fn start(&mut self) -> Result<StreamInfo, CameraError> {
        if let (true, Some(info)) = (self.is_active(), self.info) {
            return Ok(info);
        }
        ffmpeg_next::init().map_err(|e| CameraError::Access(e.to_string()))?;

        self.latest.clear();
        self.running.store(true, Ordering::SeqCst);

        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<StreamInfo, String>>(1);
        let source = self.source.clone();
        let options = self.options;
        let latest = self.latest.clone();
        let running = self.running.clone();

        let handle = thread::spawn(move || {
            let stream = match CaptureStream::open(&source, &options) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(format!("{source}: {e}")));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(stream.info));
            stream.run(&latest, &running);
        });

        match ready_rx.recv() {
            Ok(Ok(info)) => {
                log::info!(
                    "Camera {} started ({}x{})",
                    self.source,
                    info.width,
                    info.height
                );
                self.worker = Some(handle);
                self.info = Some(info);
                Ok(info)
            }
            Ok(Err(message)) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(CameraError::Access(message))
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(CameraError::Access(format!(
                    "{}: capture thread exited before opening the stream",
                    self.source
                )))
            }
        }
    }

    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        if !self.is_active() {
            return Err(CameraError::NotStarted);
        }
        self.latest
            .wait(FIRST_FRAME_TIMEOUT)
            .ok_or_else(|| CameraError::Capture(format!("{}: no frame decoded yet", self.source)))
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::warn!("Camera capture thread panicked");
            }
            log::info!("Camera {} stopped", self.source);
        }
        self.latest.clear();
        self.info = None;
    }

    fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.worker.is_some()
    }
}

impl Drop for FfmpegCamera {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Single-slot frame mailbox shared between the capture thread and readers.
#[derive(Default)]
struct LatestFrame {
    frame: Mutex<Option<Frame>>,
    ready: Condvar,
}

impl LatestFrame {
    fn lock(&self) -> MutexGuard<'_, Option<Frame>> {
        self.frame.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, frame: Frame) {
        *self.lock() = Some(frame);
        self.ready.notify_all();
    }

    fn clear(&self) {
        *self.lock() = None;
    }

    fn wait(&self, timeout: Duration) -> Option<Frame> {
        let guard = self.lock();
        let (guard, _) = self
            .ready
            .wait_timeout_while(guard, timeout, |frame| frame.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }
}

/// Demuxer and decoder state, created and consumed on the capture thread.
struct CaptureStream {
    input: Input,
    decoder: ffmpeg_next::decoder::Video,
    stream_index: usize,
    frame_interval: Option<Duration>,
    info: StreamInfo,
}

impl CaptureStream {
    fn open(
        source: &CameraSource,
        options: &CaptureOptions,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let input = match source {
            CameraSource::File(path) => ffmpeg_next::format::input(path)?,
            CameraSource::Device { format, device } => open_device(format, device, options)?,
        };

        let (stream_index, decoder, rate) = {
            let stream = input
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or("no video stream found")?;
            let codec_ctx =
                ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
            (stream.index(), codec_ctx.decoder().video()?, stream.rate())
        };

        let frame_interval = source.is_file().then(|| frame_interval(rate));
        let info = StreamInfo::new(decoder.width(), decoder.height());

        Ok(Self {
            input,
            decoder,
            stream_index,
            frame_interval,
            info,
        })
    }

    fn run(self, latest: &LatestFrame, running: &AtomicBool) {
        let CaptureStream {
            mut input,
            mut decoder,
            stream_index,
            frame_interval,
            ..
        } = self;
        let mut sink = FrameSink {
            converter: RgbConverter::default(),
            latest,
            running,
            frame_interval,
            next_index: 0,
        };

        for (stream, packet) in input.packets() {
            if !running.load(Ordering::Relaxed) {
                return;
            }
            if stream.index() != stream_index {
                continue;
            }
            if let Err(e) = decoder.send_packet(&packet) {
                log::debug!("Skipping undecodable packet: {e}");
                continue;
            }
            if !sink.drain(&mut decoder) {
                return;
            }
        }

        let _ = decoder.send_eof();
        sink.drain(&mut decoder);
        log::debug!("Camera stream ended after {} frames", sink.next_index);
    }
}

struct FrameSink<'a> {
    converter: RgbConverter,
    latest: &'a LatestFrame,
    running: &'a AtomicBool,
    frame_interval: Option<Duration>,
    next_index: usize,
}

impl FrameSink<'_> {
    /// Publishes every frame the decoder has ready. Returns false once the
    /// camera has been stopped.
    fn drain(&mut self, decoder: &mut ffmpeg_next::decoder::Video) -> bool {
        let mut decoded = Video::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            match self.converter.convert(&decoded, self.next_index) {
                Ok(frame) => {
                    self.latest.publish(frame);
                    self.next_index += 1;
                }
                Err(e) => log::warn!("Dropping frame that failed RGB conversion: {e}"),
            }
            if let Some(interval) = self.frame_interval {
                thread::sleep(interval);
            }
            if !self.running.load(Ordering::Relaxed) {
                return false;
            }
        }
        true
    }
}

/// Converts decoded frames to packed RGB24, rebuilding the scaler when the
/// source geometry changes mid-stream.
#[derive(Default)]
struct RgbConverter {
    scaler: Option<(scaling::Context, (Pixel, u32, u32))>,
}

impl RgbConverter {
    fn convert(&mut self, decoded: &Video, index: usize) -> Result<Frame, ffmpeg_next::Error> {
        let key = (decoded.format(), decoded.width(), decoded.height());
        let (_, width, height) = key;
        let mut scaler = match self.scaler.take() {
            Some((scaler, cached)) if cached == key => scaler,
            _ => scaling::Context::get(
                key.0,
                width,
                height,
                Pixel::RGB24,
                width,
                height,
                scaling::Flags::BILINEAR,
            )?,
        };

        let mut rgb = Video::empty();
        scaler.run(decoded, &mut rgb)?;
        self.scaler = Some((scaler, key));

        Ok(Frame::new(packed_rgb(&rgb, width, height), width, height, index))
    }
}

fn open_device(
    format_name: &str,
    device: &str,
    options: &CaptureOptions,
) -> Result<Input, Box<dyn std::error::Error>> {
    ffmpeg_next::device::register_all();
    let format = ffmpeg_next::device::input::video()
        .find(|f| f.name() == format_name)
        .ok_or_else(|| format!("input device format '{format_name}' is not available"))?;

    let mut dict = ffmpeg_next::Dictionary::new();
    if let Some((w, h)) = options.resolution {
        dict.set("video_size", &format!("{w}x{h}"));
    }
    if let Some(fps) = options.framerate {
        dict.set("framerate", &fps.to_string());
    }

    let format = ffmpeg_next::format::format::Format::Input(format);
    match ffmpeg_next::format::open_with(device, &format, dict)? {
        FormatContext::Input(input) => Ok(input),
        FormatContext::Output(_) => Err(format!("{format_name} opened as an output").into()),
    }
}

fn frame_interval(rate: ffmpeg_next::Rational) -> Duration {
    let fps = if rate.denominator() != 0 {
        rate.numerator() as f64 / rate.denominator() as f64
    } else {
        0.0
    };
    let fps = if fps > 0.0 && fps <= 120.0 {
        fps
    } else {
        FALLBACK_FILE_FPS
    };
    Duration::from_secs_f64(1.0 / fps)
}

/// Strips per-row stride padding from an RGB24 frame.
fn packed_rgb(frame: &Video, width: u32, height: u32) -> Vec<u8> {
    let stride = frame.stride(0);
    let data = frame.data(0);
    let row_len = width as usize * Frame::CHANNELS;

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_len]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Rgba, RgbaImage};
    use std::fs::File;
    use std::path::{Path, PathBuf};

    fn write_test_gif(dir: &Path, frames: usize, width: u32, height: u32) -> PathBuf {
        let path = dir.join("clip.gif");
        let file = File::create(&path).unwrap();
        let mut encoder = GifEncoder::new(file);
        let frames = (0..frames).map(|i| {
            let shade = (i * 60 % 256) as u8;
            let img = RgbaImage::from_pixel(width, height, Rgba([shade, 128, 255 - shade, 255]));
            image::Frame::from_parts(img, 0, 0, Delay::from_numer_denom_ms(100, 1))
        });
        encoder.encode_frames(frames).unwrap();
        path
    }

    #[test]
    fn test_file_source_reports_resolution_and_yields_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_gif(dir.path(), 3, 64, 48);

        let mut camera = FfmpegCamera::new(CameraSource::File(path));
        let info = camera.start().unwrap();
        assert_eq!(info, StreamInfo::new(64, 48));
        assert!(camera.is_active());

        let frame = camera.read_frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (64, 48));
        assert_eq!(frame.data().len(), 64 * 48 * 3);

        camera.stop();
        assert!(!camera.is_active());
    }

    #[test]
    fn test_last_frame_survives_end_of_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_gif(dir.path(), 2, 32, 32);

        let mut camera = FfmpegCamera::new(CameraSource::File(path));
        camera.start().unwrap();
        thread::sleep(Duration::from_millis(600));

        assert!(camera.read_frame().is_ok());
    }

    #[test]
    fn test_missing_file_is_access_error() {
        let mut camera = FfmpegCamera::new(CameraSource::File("/nonexistent/clip.mp4".into()));
        let err = camera.start().unwrap_err();
        assert!(matches!(err, CameraError::Access(_)));
        assert!(!camera.is_active());
    }

    #[test]
    fn test_unknown_device_format_is_access_error() {
        let mut camera = FfmpegCamera::new(CameraSource::Device {
            format: "v4l2".into(),
            device: "/nonexistent/video99".into(),
        });
        assert!(matches!(camera.start(), Err(CameraError::Access(_))));
    }

    #[test]
    fn test_read_before_start_is_not_started() {
        let mut camera = FfmpegCamera::new(CameraSource::File("clip.mp4".into()));
        assert!(matches!(camera.read_frame(), Err(CameraError::NotStarted)));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut camera = FfmpegCamera::new(CameraSource::File("clip.mp4".into()));
        camera.stop();
        camera.stop();
        assert!(!camera.is_active());
    }

    #[test]
    fn test_frame_interval_falls_back_for_bogus_rates() {
        assert_eq!(
            frame_interval(ffmpeg_next::Rational(0, 0)),
            Duration::from_secs_f64(1.0 / FALLBACK_FILE_FPS)
        );
        let interval = frame_interval(ffmpeg_next::Rational(25, 1)).as_secs_f64();
        assert!((interval - 0.04).abs() < 1e-9);
    }
}
