use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::camera::domain::camera::{Camera, CameraError, StreamInfo};
use crate::detection::domain::detection_service::DetectionService;
use crate::imaging::domain::image_preparer::{ImagePreparer, PrepareError};
use crate::imaging::domain::prepared_payload::PreparedPayload;
use crate::imaging::domain::raw_image::RawImage;
use crate::imaging::domain::size_limit::SizeLimit;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::realtime_loop::{LoopConfig, LoopError, RealtimeLoop, SharedCamera};
use crate::rendering::domain::overlay::Overlay;
use crate::shared::constants::{CAPTURE_MAX_HEIGHT, CAPTURE_MAX_WIDTH, CAPTURE_QUALITY};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    Inactive,
    Capture,
    Realtime,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Prepare(#[from] PrepareError),
    #[error(transparent)]
    Loop(#[from] LoopError),
    #[error("camera is not in capture mode")]
    NotCapturing,
}

enum ActiveMode {
    Inactive,
    Capture(StreamInfo),
    Realtime(Box<RealtimeLoop>),
}

/// Owns the camera for whichever mode currently holds it.
///
/// Entering a mode always releases the previous one first, so the stream is
/// never opened twice.
pub struct CameraSession {
    camera: SharedCamera,
    preparer: Arc<dyn ImagePreparer>,
    service: Arc<dyn DetectionService>,
    mode: ActiveMode,
}

impl CameraSession {
    pub fn new(
        camera: Box<dyn Camera>,
        preparer: Arc<dyn ImagePreparer>,
        service: Arc<dyn DetectionService>,
    ) -> Self {
        Self {
            camera: Arc::new(Mutex::new(camera)),
            preparer,
            service,
            mode: ActiveMode::Inactive,
        }
    }

    pub fn mode(&self) -> SessionMode {
        match self.mode {
            ActiveMode::Inactive => SessionMode::Inactive,
            ActiveMode::Capture(_) => SessionMode::Capture,
            ActiveMode::Realtime(_) => SessionMode::Realtime,
        }
    }

    /// Starts the stream for single captures.
    pub fn enter_capture(&mut self) -> Result<StreamInfo, SessionError> {
        self.leave();
        let info = lock(&self.camera).start()?;
        self.mode = ActiveMode::Capture(info);
        log::info!("Capture mode active");
        Ok(info)
    }

    /// Reads the current frame and prepares it within the capture limit.
    pub fn capture_still(&mut self) -> Result<PreparedPayload, SessionError> {
        if !matches!(self.mode, ActiveMode::Capture(_)) {
            return Err(SessionError::NotCapturing);
        }
        let frame = lock(&self.camera).read_frame()?;
        let payload = self.preparer.prepare(
            &RawImage::Frame(frame),
            SizeLimit::new(CAPTURE_MAX_WIDTH, CAPTURE_MAX_HEIGHT),
            CAPTURE_QUALITY,
        )?;
        Ok(payload)
    }

    /// Starts the stream for continuous detection and returns the loop in
    /// `CameraActive` state. A camera failure leaves the session inactive.
    pub fn enter_realtime(
        &mut self,
        overlay: Box<dyn Overlay>,
        config: LoopConfig,
        logger: Box<dyn PipelineLogger>,
    ) -> Result<&mut RealtimeLoop, SessionError> {
        self.leave();
        let mut realtime = RealtimeLoop::with_shared_camera(
            self.camera.clone(),
            overlay,
            self.preparer.clone(),
            self.service.clone(),
        )
        .with_config(config)
        .with_logger(logger);
        realtime.start_camera()?;

        self.mode = ActiveMode::Realtime(Box::new(realtime));
        log::info!("Real-time mode active");
        Ok(self.realtime().ok_or(LoopError::CameraInactive)?)
    }

    pub fn realtime(&mut self) -> Option<&mut RealtimeLoop> {
        match &mut self.mode {
            ActiveMode::Realtime(realtime) => Some(realtime),
            _ => None,
        }
    }

    /// Stops detection and the stream, whatever mode holds them.
    pub fn leave(&mut self) {
        match std::mem::replace(&mut self.mode, ActiveMode::Inactive) {
            ActiveMode::Inactive => {}
            ActiveMode::Capture(_) => lock(&self.camera).stop(),
            ActiveMode::Realtime(mut realtime) => realtime.stop_camera(),
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.leave();
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection_result::{DetectionResult, FaceResult};
    use crate::detection::domain::detection_service::DetectionError;
    use crate::imaging::domain::prepared_payload::PayloadOrigin;
    use crate::imaging::infrastructure::jpeg_image_preparer::JpegImagePreparer;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::pipeline::realtime_loop::LoopState;
    use crate::shared::frame::Frame;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Counters {
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    struct StubCamera {
        counters: Arc<Counters>,
        fail_start: bool,
        active: bool,
    }

    impl Camera for StubCamera {
        fn start(&mut self) -> Result<StreamInfo, CameraError> {
            if self.fail_start {
                return Err(CameraError::Access("no device".into()));
            }
            self.counters.starts.fetch_add(1, Ordering::SeqCst);
            self.active = true;
            Ok(StreamInfo::new(1280, 960))
        }

        fn read_frame(&mut self) -> Result<Frame, CameraError> {
            if !self.active {
                return Err(CameraError::NotStarted);
            }
            Ok(Frame::new(vec![90; 1280 * 960 * 3], 1280, 960, 0))
        }

        fn stop(&mut self) {
            if self.active {
                self.counters.stops.fetch_add(1, Ordering::SeqCst);
            }
            self.active = false;
        }

        fn is_active(&self) -> bool {
            self.active
        }
    }

    struct EmptyService;

    impl DetectionService for EmptyService {
        fn detect(&self, _payload: &PreparedPayload) -> Result<DetectionResult, DetectionError> {
            Ok(DetectionResult::empty())
        }
    }

    #[derive(Default)]
    struct NoopOverlay {
        size: (u32, u32),
    }

    impl Overlay for NoopOverlay {
        fn configure(&mut self, width: u32, height: u32) {
            self.size = (width, height);
        }
        fn size(&self) -> (u32, u32) {
            self.size
        }
        fn clear(&mut self) {}
        fn draw_face(&mut self, _face: &FaceResult) {}
    }

    fn session(fail_start: bool) -> (CameraSession, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let camera = StubCamera {
            counters: counters.clone(),
            fail_start,
            active: false,
        };
        let session = CameraSession::new(
            Box::new(camera),
            Arc::new(JpegImagePreparer::new()),
            Arc::new(EmptyService),
        );
        (session, counters)
    }

    fn enter_realtime(session: &mut CameraSession) -> Result<&mut RealtimeLoop, SessionError> {
        session.enter_realtime(
            Box::new(NoopOverlay::default()),
            LoopConfig {
                interval: Duration::from_millis(10),
                ..LoopConfig::default()
            },
            Box::new(NullPipelineLogger),
        )
    }

    #[test]
    fn test_capture_still_fits_capture_limit() {
        let (mut session, _) = session(false);
        session.enter_capture().unwrap();

        let payload = session.capture_still().unwrap();

        assert_eq!((payload.width, payload.height), (640, 480));
        assert_eq!(payload.origin, PayloadOrigin::Capture);
        assert_eq!(payload.mime_type, "image/jpeg");
    }

    #[test]
    fn test_capture_still_requires_capture_mode() {
        let (mut session, _) = session(false);
        assert!(matches!(
            session.capture_still(),
            Err(SessionError::NotCapturing)
        ));
    }

    #[test]
    fn test_switching_modes_stops_previous_stream() {
        let (mut session, counters) = session(false);

        session.enter_capture().unwrap();
        let realtime = enter_realtime(&mut session).unwrap();
        assert_eq!(realtime.state(), LoopState::CameraActive);
        assert_eq!(realtime.overlay_size(), (1280, 960));

        assert_eq!(session.mode(), SessionMode::Realtime);
        assert_eq!(counters.starts.load(Ordering::SeqCst), 2);
        assert_eq!(counters.stops.load(Ordering::SeqCst), 1);

        session.enter_capture().unwrap();
        assert_eq!(counters.stops.load(Ordering::SeqCst), 2);
        assert!(session.realtime().is_none());
    }

    #[test]
    fn test_leaving_realtime_stops_detection() {
        let (mut session, counters) = session(false);
        let realtime = enter_realtime(&mut session).unwrap();
        realtime.start_detection().unwrap();

        session.leave();

        assert_eq!(session.mode(), SessionMode::Inactive);
        assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_camera_failure_leaves_session_inactive() {
        let (mut session, _) = session(true);

        let err = session.enter_capture().unwrap_err();
        assert!(matches!(err, SessionError::Camera(CameraError::Access(_))));
        assert_eq!(session.mode(), SessionMode::Inactive);

        assert!(enter_realtime(&mut session).is_err());
        assert_eq!(session.mode(), SessionMode::Inactive);
    }

    #[test]
    fn test_drop_releases_camera() {
        let (mut session, counters) = session(false);
        session.enter_capture().unwrap();
        drop(session);
        assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    }
}
