mod settings;

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use emolens_core::camera::domain::camera::Camera;
use emolens_core::camera::infrastructure::camera_source::CameraSource;
use emolens_core::camera::infrastructure::ffmpeg_camera::{CaptureOptions, FfmpegCamera};
use emolens_core::detection::domain::detection_service::DetectionService;
use emolens_core::detection::infrastructure::http_detection_client::HttpDetectionClient;
use emolens_core::imaging::domain::image_preparer::ImagePreparer;
use emolens_core::imaging::domain::size_limit::SizeLimit;
use emolens_core::imaging::infrastructure::jpeg_image_preparer::JpegImagePreparer;
use emolens_core::pipeline::analyze_image_use_case::{AnalyzeImageUseCase, AnalyzeOutcome};
use emolens_core::pipeline::camera_session::CameraSession;
use emolens_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use emolens_core::pipeline::realtime_loop::{LoopConfig, LoopStats};
use emolens_core::pipeline::upload_guard::has_image_extension;
use emolens_core::rendering::infrastructure::annotated_image_writer::AnnotatedImageWriter;
use emolens_core::rendering::infrastructure::canvas_overlay::CanvasOverlay;
use emolens_core::rendering::infrastructure::report_renderer::ReportRenderer;
use emolens_core::rendering::infrastructure::text_chart_renderer::TextChartRenderer;

use settings::Settings;

/// Emotion detection for images and camera feeds.
#[derive(Parser)]
#[command(name = "emolens")]
struct Cli {
    /// Detection endpoint URL.
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Settings file to use instead of the per-user one.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Store the effective endpoint and timeout as the new defaults.
    #[arg(long, global = true)]
    save_settings: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect emotions in an image file.
    Analyze {
        /// Image to upload (at most 5 MB).
        image: PathBuf,

        /// Annotated image output (default: <image>-emotions.png).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Longest edge in pixels before the image is downscaled.
        #[arg(long)]
        max_dimension: Option<u32>,

        /// JPEG quality for resized uploads (0.0-1.0].
        #[arg(long)]
        quality: Option<f32>,
    },

    /// Capture one frame from a camera and detect emotions in it.
    Capture {
        #[command(flatten)]
        camera: CameraArgs,

        /// Annotated image output.
        #[arg(long, default_value = "capture-emotions.png")]
        output: PathBuf,
    },

    /// Run continuous detection on a camera feed until Enter is pressed.
    Live {
        #[command(flatten)]
        camera: CameraArgs,

        /// Milliseconds between capture ticks.
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Stop automatically after this many seconds.
        #[arg(long)]
        duration_secs: Option<u64>,

        /// Write the overlay to this PNG after every render.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

#[derive(Args, Clone, Debug, Default)]
struct CameraArgs {
    /// Camera spec, e.g. v4l2:/dev/video0, avfoundation:0 or a video file.
    #[arg(long)]
    camera: Option<String>,

    /// Requested capture size, e.g. 1280x720. Devices only.
    #[arg(long, value_parser = parse_resolution)]
    resolution: Option<(u32, u32)>,

    /// Requested capture frame rate. Devices only.
    #[arg(long)]
    framerate: Option<u32>,
}

impl CameraArgs {
    fn options(&self) -> CaptureOptions {
        CaptureOptions {
            resolution: self.resolution,
            framerate: self.framerate,
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.settings.as_deref());
    if let Some(endpoint) = &cli.endpoint {
        settings.endpoint = endpoint.clone();
    }
    if let Some(timeout) = cli.timeout_secs {
        settings.timeout_secs = timeout;
    }
    validate(&cli, &settings)?;

    if cli.save_settings {
        let path = settings.save(cli.settings.as_deref())?;
        log::info!("Settings saved to {}", path.display());
    }

    let timeout = Duration::from_secs(settings.timeout_secs);
    let client = HttpDetectionClient::new(&settings.endpoint, timeout)?;
    log::info!("Using detection endpoint {}", client.endpoint());
    let service: Arc<dyn DetectionService> = Arc::new(client);

    match cli.command {
        Command::Analyze {
            image,
            output,
            max_dimension,
            quality,
        } => {
            let output = output.unwrap_or_else(|| default_output(&image));
            run_analyze(
                &image,
                output,
                max_dimension.unwrap_or(settings.max_dimension),
                quality.unwrap_or(settings.quality),
                service,
            )
        }
        Command::Capture { camera, output } => {
            let camera = open_camera(&camera, settings.camera.as_deref());
            run_capture(camera, output, service)
        }
        Command::Live {
            camera,
            interval_ms,
            duration_secs,
            snapshot,
        } => {
            let camera = open_camera(&camera, settings.camera.as_deref());
            let interval = Duration::from_millis(interval_ms.unwrap_or(settings.interval_ms));
            run_live(
                camera,
                interval,
                duration_secs.map(Duration::from_secs),
                snapshot,
                service,
            )
        }
    }
}

fn run_analyze(
    image: &Path,
    output: PathBuf,
    max_dimension: u32,
    quality: f32,
    service: Arc<dyn DetectionService>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut use_case = AnalyzeImageUseCase::new(
        Arc::new(JpegImagePreparer::new()),
        service,
        Box::new(report_renderer(output.clone())),
    )
    .with_logger(Box::new(StdoutPipelineLogger::new()));

    let outcome = use_case.analyze_file(image, SizeLimit::square(max_dimension), quality)?;
    report_outcome(&outcome, &output);
    Ok(())
}

fn run_capture(
    camera: Box<dyn Camera>,
    output: PathBuf,
    service: Arc<dyn DetectionService>,
) -> Result<(), Box<dyn std::error::Error>> {
    let preparer: Arc<dyn ImagePreparer> = Arc::new(JpegImagePreparer::new());
    let mut session = CameraSession::new(camera, preparer.clone(), service.clone());
    session.enter_capture()?;
    let payload = session.capture_still()?;
    session.leave();
    log::info!(
        "Captured {}x{} frame ({} bytes)",
        payload.width,
        payload.height,
        payload.len()
    );

    let mut use_case = AnalyzeImageUseCase::new(
        preparer,
        service,
        Box::new(report_renderer(output.clone())),
    )
    .with_logger(Box::new(StdoutPipelineLogger::new()));
    let outcome = use_case.submit(&payload)?;
    report_outcome(&outcome, &output);
    Ok(())
}

fn run_live(
    camera: Box<dyn Camera>,
    interval: Duration,
    duration: Option<Duration>,
    snapshot: Option<PathBuf>,
    service: Arc<dyn DetectionService>,
) -> Result<(), Box<dyn std::error::Error>> {
    let preparer = Arc::new(JpegImagePreparer::new());
    let mut session = CameraSession::new(camera, preparer, service);

    let mut overlay = CanvasOverlay::default();
    if let Some(path) = snapshot {
        overlay = overlay.with_snapshot(path);
    }
    let config = LoopConfig {
        interval,
        ..LoopConfig::default()
    };
    let realtime =
        session.enter_realtime(Box::new(overlay), config, Box::new(StdoutPipelineLogger::new()))?;
    let (width, height) = realtime.overlay_size();
    realtime.start_detection()?;

    match duration {
        Some(d) => eprintln!(
            "Detecting on {width}x{height} frames for {}s (press Enter to stop early)",
            d.as_secs()
        ),
        None => eprintln!("Detecting on {width}x{height} frames (press Enter to stop)"),
    }
    wait_for_stop(duration);

    realtime.stop_detection();
    print_stats(&realtime.stats());
    session.leave();
    Ok(())
}

/// Blocks until Enter is pressed on stdin or `duration` elapses.
fn wait_for_stop(duration: Option<Duration>) {
    let (tx, rx) = crossbeam_channel::bounded::<()>(1);
    let spawned = thread::Builder::new()
        .name("stdin-stop".into())
        .spawn(move || {
            let mut line = String::new();
            let _ = io::stdin().lock().read_line(&mut line);
            let _ = tx.send(());
        });
    if let Err(e) = spawned {
        log::warn!("Cannot watch stdin: {e}");
    }

    match duration {
        Some(d) => {
            let _ = rx.recv_timeout(d);
        }
        None => {
            let _ = rx.recv();
        }
    }
}

fn print_stats(stats: &LoopStats) {
    println!(
        "{} ticks ({} skipped while a request was in flight), {} submissions",
        stats.ticks, stats.skipped_ticks, stats.submissions
    );
    println!(
        "{} renders, {} discarded, {} failed requests, {} failed captures",
        stats.renders, stats.discarded, stats.failures, stats.capture_failures
    );
    if let Some(fps) = stats.fps {
        println!("Last measured rate: {fps:.1} fps");
    }
}

fn report_renderer(output: PathBuf) -> ReportRenderer {
    ReportRenderer::new(
        Box::new(io::stdout()),
        Box::new(TextChartRenderer::new(io::stdout())),
    )
    .with_annotated_image(AnnotatedImageWriter::new(output))
}

fn report_outcome(outcome: &AnalyzeOutcome, output: &Path) {
    if let AnalyzeOutcome::Faces(result) = outcome {
        log::info!(
            "{} face(s); annotated image written to {}",
            result.len(),
            output.display()
        );
    }
}

/// Builds the camera from the command line, falling back to the stored
/// spec and then to the platform default device.
fn open_camera(args: &CameraArgs, stored: Option<&str>) -> Box<dyn Camera> {
    let source = args
        .camera
        .as_deref()
        .or(stored)
        .map(CameraSource::parse)
        .unwrap_or_else(CameraSource::platform_default);
    let camera = FfmpegCamera::new(source).with_options(args.options());
    log::info!("Opening camera {}", camera.source());
    Box::new(camera)
}

/// Parses `WIDTHxHEIGHT`, e.g. `1280x720`.
fn parse_resolution(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("'{part}' is not a positive pixel count"))
    };
    Ok((parse(width)?, parse(height)?))
}

fn default_output(image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    image.with_file_name(format!("{stem}-emotions.png"))
}

fn validate(cli: &Cli, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    if !settings.endpoint.starts_with("http://") && !settings.endpoint.starts_with("https://") {
        return Err(format!(
            "Endpoint must be an http:// or https:// URL, got '{}'",
            settings.endpoint
        )
        .into());
    }
    if settings.timeout_secs == 0 {
        return Err("Timeout must be at least 1 second".into());
    }

    match &cli.command {
        Command::Analyze {
            image,
            max_dimension,
            quality,
            ..
        } => {
            if !image.exists() {
                return Err(format!("Input file not found: {}", image.display()).into());
            }
            if !has_image_extension(image) {
                return Err(format!("Not an image file: {}", image.display()).into());
            }
            if max_dimension.unwrap_or(settings.max_dimension) == 0 {
                return Err("Max dimension must be positive".into());
            }
            let q = quality.unwrap_or(settings.quality);
            if !(q > 0.0 && q <= 1.0) {
                return Err(format!("Quality must be in (0.0, 1.0], got {q}").into());
            }
        }
        Command::Capture { camera, output } => {
            validate_camera(camera)?;
            if output.extension().and_then(|e| e.to_str()).is_none() {
                return Err(format!(
                    "Output needs an image extension, got {}",
                    output.display()
                )
                .into());
            }
        }
        Command::Live {
            camera,
            interval_ms,
            duration_secs,
            ..
        } => {
            validate_camera(camera)?;
            if interval_ms.unwrap_or(settings.interval_ms) == 0 {
                return Err("Interval must be at least 1 ms".into());
            }
            if *duration_secs == Some(0) {
                return Err("Duration must be at least 1 second".into());
            }
        }
    }
    Ok(())
}

fn validate_camera(args: &CameraArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.framerate == Some(0) {
        return Err("Frame rate must be at least 1".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("emolens").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["live", "--interval-ms", "500", "--endpoint", "http://x/detect"]);
        assert_eq!(cli.endpoint.as_deref(), Some("http://x/detect"));
        assert!(matches!(
            cli.command,
            Command::Live {
                interval_ms: Some(500),
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let cli = parse(&["live"]);
        let settings = Settings {
            endpoint: "ftp://detector".into(),
            ..Settings::default()
        };
        assert!(validate(&cli, &settings).is_err());
    }

    #[test]
    fn test_rejects_missing_image() {
        let cli = parse(&["analyze", "/nonexistent/photo.jpg"]);
        let err = validate(&cli, &Settings::default()).unwrap_err();
        assert!(err.to_string().contains("Input file not found"));
    }

    #[test]
    fn test_rejects_out_of_range_quality() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("photo.jpg");
        std::fs::write(&image, [0u8; 4]).unwrap();
        let cli = parse(&["analyze", image.to_str().unwrap(), "--quality", "1.5"]);
        assert!(validate(&cli, &Settings::default()).is_err());
    }

    #[test]
    fn test_rejects_zero_interval() {
        let cli = parse(&["live", "--interval-ms", "0"]);
        assert!(validate(&cli, &Settings::default()).is_err());
    }

    #[rstest]
    #[case::lowercase("1280x720", (1280, 720))]
    #[case::uppercase("640X480", (640, 480))]
    #[case::spaced(" 320 x 240 ", (320, 240))]
    fn test_parse_resolution(#[case] value: &str, #[case] expected: (u32, u32)) {
        assert_eq!(parse_resolution(value).unwrap(), expected);
    }

    #[rstest]
    #[case::no_separator("1280")]
    #[case::zero_width("0x720")]
    #[case::not_a_number("widexhigh")]
    fn test_parse_resolution_rejects(#[case] value: &str) {
        assert!(parse_resolution(value).is_err());
    }

    #[test]
    fn test_camera_flags_reach_capture_options() {
        let cli = parse(&[
            "capture",
            "--camera",
            "v4l2:/dev/video2",
            "--resolution",
            "1280x720",
            "--framerate",
            "15",
        ]);
        let Command::Capture { camera, .. } = cli.command else {
            panic!("expected capture");
        };
        let options = camera.options();
        assert_eq!(camera.camera.as_deref(), Some("v4l2:/dev/video2"));
        assert_eq!(options.resolution, Some((1280, 720)));
        assert_eq!(options.framerate, Some(15));
    }

    #[test]
    fn test_bad_resolution_fails_to_parse() {
        let parsed = Cli::try_parse_from(["emolens", "live", "--resolution", "big"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_rejects_zero_framerate() {
        let cli = parse(&["live", "--framerate", "0"]);
        assert!(validate(&cli, &Settings::default()).is_err());
    }

    #[test]
    fn test_default_output_sits_next_to_input() {
        assert_eq!(
            default_output(Path::new("/photos/group.jpg")),
            PathBuf::from("/photos/group-emotions.png")
        );
    }
}
