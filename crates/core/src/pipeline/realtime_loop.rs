use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender};

use crate::camera::domain::camera::{Camera, CameraError, StreamInfo};
use crate::detection::domain::detection_service::DetectionService;
use crate::imaging::domain::image_preparer::ImagePreparer;
use crate::imaging::domain::prepared_payload::PreparedPayload;
use crate::imaging::domain::raw_image::RawImage;
use crate::imaging::domain::size_limit::SizeLimit;
use crate::pipeline::fps_counter::FpsCounter;
use crate::pipeline::pipeline_logger::{
    NullPipelineLogger, PipelineLogger, METRIC_FACES, STAGE_CAPTURE, STAGE_DETECT,
    STAGE_PREPARE, STAGE_RENDER,
};
use crate::rendering::domain::overlay::Overlay;
use crate::shared::constants::{
    DEFAULT_OVERLAY_HEIGHT, DEFAULT_OVERLAY_WIDTH, FPS_WINDOW, REALTIME_QUALITY,
    REALTIME_TICK_INTERVAL,
};

/// Camera handle shared between its owner and the ticker thread.
pub type SharedCamera = Arc<Mutex<Box<dyn Camera>>>;
type SharedOverlay = Arc<Mutex<Box<dyn Overlay>>>;
type SharedLogger = Arc<Mutex<Box<dyn PipelineLogger>>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    CameraActive,
    Detecting,
}

/// Counters for one detection run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoopStats {
    pub ticks: u64,
    /// Ticks skipped because the previous submission was still in flight.
    pub skipped_ticks: u64,
    pub submissions: u64,
    pub renders: u64,
    /// Results that arrived after detection was stopped.
    pub discarded: u64,
    /// Failed preparations and detection requests.
    pub failures: u64,
    pub capture_failures: u64,
    pub fps: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("camera is not active")]
    CameraInactive,
    #[error("detection is already running")]
    AlreadyDetecting,
    #[error("failed to spawn {name} thread: {reason}")]
    Spawn { name: &'static str, reason: String },
}

#[derive(Clone, Copy, Debug)]
pub struct LoopConfig {
    pub interval: Duration,
    pub quality: f32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: REALTIME_TICK_INTERVAL,
            quality: REALTIME_QUALITY,
        }
    }
}

/// State shared by the ticker and the detection worker of one run.
struct DetectionRun {
    active: AtomicBool,
    in_flight: AtomicBool,
    stats: Mutex<LoopStats>,
    fps: Mutex<FpsCounter>,
}

impl DetectionRun {
    fn new() -> Self {
        let mut fps = FpsCounter::new(FPS_WINDOW);
        fps.start(Instant::now());
        Self {
            active: AtomicBool::new(true),
            in_flight: AtomicBool::new(false),
            stats: Mutex::new(LoopStats::default()),
            fps: Mutex::new(fps),
        }
    }

    fn update(&self, f: impl FnOnce(&mut LoopStats)) {
        f(&mut lock(&self.stats));
    }
}

struct ActiveRun {
    shared: Arc<DetectionRun>,
    stop_tx: Sender<()>,
    ticker: JoinHandle<()>,
}

/// Continuous capture → detect → overlay loop.
///
/// A ticker thread fires every `interval`. Each tick either skips (a request
/// is still in flight) or captures the current frame at overlay resolution,
/// prepares it and hands it to a worker thread that calls the detection
/// service. At most one request is in flight, so results arrive in
/// submission order. Results are drawn only while the run is active; the
/// check happens under the overlay lock, which is also what `stop_detection`
/// takes to clear the overlay, so a late result can never repaint it.
pub struct RealtimeLoop {
    camera: SharedCamera,
    overlay: SharedOverlay,
    preparer: Arc<dyn ImagePreparer>,
    service: Arc<dyn DetectionService>,
    logger: SharedLogger,
    config: LoopConfig,
    state: LoopState,
    overlay_size: (u32, u32),
    run: Option<ActiveRun>,
    last_run: Option<Arc<DetectionRun>>,
}

impl RealtimeLoop {
    pub fn new(
        camera: Box<dyn Camera>,
        overlay: Box<dyn Overlay>,
        preparer: Arc<dyn ImagePreparer>,
        service: Arc<dyn DetectionService>,
    ) -> Self {
        Self::with_shared_camera(Arc::new(Mutex::new(camera)), overlay, preparer, service)
    }

    pub fn with_shared_camera(
        camera: SharedCamera,
        overlay: Box<dyn Overlay>,
        preparer: Arc<dyn ImagePreparer>,
        service: Arc<dyn DetectionService>,
    ) -> Self {
        Self {
            camera,
            overlay: Arc::new(Mutex::new(overlay)),
            preparer,
            service,
            logger: Arc::new(Mutex::new(Box::new(NullPipelineLogger))),
            config: LoopConfig::default(),
            state: LoopState::Idle,
            overlay_size: (DEFAULT_OVERLAY_WIDTH, DEFAULT_OVERLAY_HEIGHT),
            run: None,
            last_run: None,
        }
    }

    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = Arc::new(Mutex::new(logger));
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_detecting(&self) -> bool {
        self.state == LoopState::Detecting
    }

    pub fn overlay_size(&self) -> (u32, u32) {
        self.overlay_size
    }

    /// Counters of the current run, or of the last one after a stop.
    pub fn stats(&self) -> LoopStats {
        let run = self
            .run
            .as_ref()
            .map(|r| &r.shared)
            .or(self.last_run.as_ref());
        run.map(|r| lock(&r.stats).clone()).unwrap_or_default()
    }

    /// `Idle → CameraActive`. Sizes the overlay to the stream resolution.
    pub fn start_camera(&mut self) -> Result<StreamInfo, LoopError> {
        if self.state != LoopState::Idle {
            let (width, height) = self.overlay_size;
            return Ok(StreamInfo::new(width, height));
        }

        let info = lock(&self.camera).start()?;
        let (width, height) = info.resolution_or((DEFAULT_OVERLAY_WIDTH, DEFAULT_OVERLAY_HEIGHT));
        self.overlay_size = (width, height);
        lock(&self.overlay).configure(width, height);
        self.state = LoopState::CameraActive;
        log::info!("Camera active, overlay {width}x{height}");
        Ok(info)
    }

    /// `CameraActive → Detecting`. Resets the counters and arms the ticker.
    pub fn start_detection(&mut self) -> Result<(), LoopError> {
        match self.state {
            LoopState::Idle => return Err(LoopError::CameraInactive),
            LoopState::Detecting => return Err(LoopError::AlreadyDetecting),
            LoopState::CameraActive => {}
        }

        let shared = Arc::new(DetectionRun::new());
        let (submit_tx, submit_rx) = crossbeam_channel::bounded::<PreparedPayload>(1);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);

        spawn_worker(
            submit_rx,
            self.service.clone(),
            self.overlay.clone(),
            self.logger.clone(),
            shared.clone(),
        )?;
        let ticker = spawn_ticker(
            TickContext {
                camera: self.camera.clone(),
                preparer: self.preparer.clone(),
                logger: self.logger.clone(),
                shared: shared.clone(),
                submit_tx,
                overlay_size: self.overlay_size,
                quality: self.config.quality,
            },
            self.config.interval,
            stop_rx,
        )?;

        self.run = Some(ActiveRun {
            shared,
            stop_tx,
            ticker,
        });
        self.state = LoopState::Detecting;
        log::info!(
            "Real-time detection started (every {} ms)",
            self.config.interval.as_millis()
        );
        Ok(())
    }

    /// `Detecting → CameraActive`. Disarms the ticker and clears the
    /// overlay. A request still in flight completes, but its result is
    /// discarded.
    pub fn stop_detection(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };

        {
            let mut overlay = lock(&self.overlay);
            run.shared.active.store(false, Ordering::SeqCst);
            overlay.clear();
            overlay.present();
        }

        drop(run.stop_tx);
        if run.ticker.join().is_err() {
            log::warn!("Real-time ticker thread panicked");
        }

        let stats = lock(&run.shared.stats).clone();
        log::info!(
            "Real-time detection stopped: {} ticks, {} skipped, {} renders, {} failures",
            stats.ticks,
            stats.skipped_ticks,
            stats.renders,
            stats.failures
        );
        lock(&self.logger).summary();

        self.last_run = Some(run.shared);
        if self.state == LoopState::Detecting {
            self.state = LoopState::CameraActive;
        }
    }

    /// Tears the stream down: `CameraActive/Detecting → Idle`.
    pub fn stop_camera(&mut self) {
        self.stop_detection();
        if self.state == LoopState::Idle {
            return;
        }
        lock(&self.camera).stop();
        lock(&self.overlay).clear();
        self.state = LoopState::Idle;
        log::info!("Camera released");
    }
}

impl Drop for RealtimeLoop {
    fn drop(&mut self) {
        self.stop_camera();
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

struct TickContext {
    camera: SharedCamera,
    preparer: Arc<dyn ImagePreparer>,
    logger: SharedLogger,
    shared: Arc<DetectionRun>,
    submit_tx: Sender<PreparedPayload>,
    overlay_size: (u32, u32),
    quality: f32,
}

impl TickContext {
    fn on_tick(&self) {
        self.shared.update(|s| s.ticks += 1);
        if !self.shared.active.load(Ordering::SeqCst) {
            return;
        }
        if self.shared.in_flight.load(Ordering::SeqCst) {
            self.shared.update(|s| s.skipped_ticks += 1);
            log::debug!("Previous request still in flight, skipping tick");
            return;
        }

        let start = Instant::now();
        let frame = match lock(&self.camera).read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                self.shared.update(|s| s.capture_failures += 1);
                log::warn!("Frame capture failed: {e}");
                return;
            }
        };
        lock(&self.logger).timing(STAGE_CAPTURE, elapsed_ms(start));

        let (width, height) = self.overlay_size;
        let start = Instant::now();
        let image = RawImage::Frame(frame.resized(width, height));
        let payload =
            match self
                .preparer
                .prepare(&image, SizeLimit::new(width, height), self.quality)
            {
                Ok(payload) => payload,
                Err(e) => {
                    self.shared.update(|s| s.failures += 1);
                    log::warn!("Frame preparation failed: {e}");
                    return;
                }
            };
        lock(&self.logger).timing(STAGE_PREPARE, elapsed_ms(start));

        if !self.shared.active.load(Ordering::SeqCst) {
            log::debug!("Detection stopped during the tick, frame not submitted");
            return;
        }
        self.shared.in_flight.store(true, Ordering::SeqCst);
        self.shared.update(|s| s.submissions += 1);
        log::debug!("Submitting frame ({} bytes)", payload.len());
        if self.submit_tx.send(payload).is_err() {
            self.shared.in_flight.store(false, Ordering::SeqCst);
            self.shared.update(|s| s.failures += 1);
            log::warn!("Detection worker is gone; frame dropped");
        }
    }
}

fn spawn_ticker(
    ctx: TickContext,
    interval: Duration,
    stop_rx: Receiver<()>,
) -> Result<JoinHandle<()>, LoopError> {
    thread::Builder::new()
        .name("realtime-ticker".into())
        .spawn(move || {
            let ticker = crossbeam_channel::tick(interval);
            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(ticker) -> _ => ctx.on_tick(),
                }
            }
        })
        .map_err(|e| LoopError::Spawn {
            name: "ticker",
            reason: e.to_string(),
        })
}

/// Clears the in-flight flag when a request is done with, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs detections one at a time until the ticker drops its sender.
fn spawn_worker(
    submit_rx: Receiver<PreparedPayload>,
    service: Arc<dyn DetectionService>,
    overlay: SharedOverlay,
    logger: SharedLogger,
    shared: Arc<DetectionRun>,
) -> Result<JoinHandle<()>, LoopError> {
    thread::Builder::new()
        .name("realtime-detect".into())
        .spawn(move || {
            for payload in submit_rx {
                let _in_flight = InFlightGuard(&shared.in_flight);
                let handled = panic::catch_unwind(AssertUnwindSafe(|| {
                    handle_payload(&payload, service.as_ref(), &overlay, &logger, &shared)
                }));
                if handled.is_err() {
                    shared.update(|s| s.failures += 1);
                    log::warn!("Real-time result handling panicked; waiting for the next tick");
                }
            }
        })
        .map_err(|e| LoopError::Spawn {
            name: "detection worker",
            reason: e.to_string(),
        })
}

fn handle_payload(
    payload: &PreparedPayload,
    service: &dyn DetectionService,
    overlay: &SharedOverlay,
    logger: &SharedLogger,
    shared: &DetectionRun,
) {
    let start = Instant::now();
    let outcome = service.detect(payload);
    lock(logger).timing(STAGE_DETECT, elapsed_ms(start));

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            shared.update(|s| s.failures += 1);
            log::warn!("Real-time detection failed: {e}");
            return;
        }
    };

    let start = Instant::now();
    let rendered = {
        let mut overlay = lock(overlay);
        if shared.active.load(Ordering::SeqCst) {
            overlay.clear();
            for face in result.faces() {
                overlay.draw_face(face);
            }
            overlay.present();
            true
        } else {
            false
        }
    };

    if !rendered {
        shared.update(|s| s.discarded += 1);
        log::debug!("Discarding result that arrived after stop");
        return;
    }

    let fps = lock(&shared.fps).record(Instant::now());
    shared.update(|s| {
        s.renders += 1;
        if fps.is_some() {
            s.fps = fps;
        }
    });
    let mut logger = lock(logger);
    logger.timing(STAGE_RENDER, elapsed_ms(start));
    logger.metric(METRIC_FACES, result.len() as f64);
    if let Some(fps) = fps {
        log::debug!("Real-time FPS: {fps:.0}");
    }
}
