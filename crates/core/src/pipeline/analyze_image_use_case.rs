use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::detection::domain::detection_result::DetectionResult;
use crate::detection::domain::detection_service::{DetectionError, DetectionService};
use crate::imaging::domain::image_preparer::{ImagePreparer, PrepareError};
use crate::imaging::domain::prepared_payload::PreparedPayload;
use crate::imaging::domain::raw_image::{EncodedImage, RawImage};
use crate::imaging::domain::size_limit::SizeLimit;
use crate::pipeline::pipeline_logger::{
    NullPipelineLogger, PipelineLogger, METRIC_FACES, STAGE_DETECT, STAGE_PREPARE, STAGE_RENDER,
};
use crate::pipeline::upload_guard::{check_upload, UploadError};
use crate::rendering::domain::result_renderer::ResultRenderer;

/// What a single-shot submission produced.
#[derive(Clone, Debug, PartialEq)]
pub enum AnalyzeOutcome {
    Faces(DetectionResult),
    NoFaces,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Prepare(#[from] PrepareError),
    #[error(transparent)]
    Detection(#[from] DetectionError),
    #[error("failed to render results: {0}")]
    Render(String),
}

/// Single-shot pipeline: prepare once → detect once → render once.
///
/// Any failure returns before the renderer is touched, so a failed
/// submission leaves previous output as it was.
pub struct AnalyzeImageUseCase {
    preparer: Arc<dyn ImagePreparer>,
    service: Arc<dyn DetectionService>,
    renderer: Box<dyn ResultRenderer>,
    logger: Box<dyn PipelineLogger>,
}

impl AnalyzeImageUseCase {
    /// `preparer` can be the same instance a `CameraSession` uses, since
    /// captured payloads only go through [`submit`](Self::submit).
    pub fn new(
        preparer: Arc<dyn ImagePreparer>,
        service: Arc<dyn DetectionService>,
        renderer: Box<dyn ResultRenderer>,
    ) -> Self {
        Self {
            preparer,
            service,
            renderer,
            logger: Box::new(NullPipelineLogger),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Validates, reads and submits an image file.
    pub fn analyze_file(
        &mut self,
        path: &Path,
        limit: SizeLimit,
        quality: f32,
    ) -> Result<AnalyzeOutcome, AnalyzeError> {
        let size = check_upload(path)?;
        log::debug!("Uploading {} ({size} bytes)", path.display());

        let bytes = std::fs::read(path).map_err(|e| UploadError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut encoded = EncodedImage::from_bytes(bytes)?;
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            encoded = encoded.with_file_name(name);
        }

        self.execute(&RawImage::Encoded(encoded), limit, quality)
    }

    pub fn execute(
        &mut self,
        image: &RawImage,
        limit: SizeLimit,
        quality: f32,
    ) -> Result<AnalyzeOutcome, AnalyzeError> {
        let start = Instant::now();
        let payload = self.preparer.prepare(image, limit, quality)?;
        self.logger.timing(STAGE_PREPARE, elapsed_ms(start));
        log::debug!(
            "Prepared {}x{} payload ({} bytes, re-encoded: {})",
            payload.width,
            payload.height,
            payload.len(),
            payload.reencoded
        );

        self.submit(&payload)
    }

    /// Detects and renders an already prepared payload.
    pub fn submit(&mut self, payload: &PreparedPayload) -> Result<AnalyzeOutcome, AnalyzeError> {
        let start = Instant::now();
        let result = self.service.detect(payload)?;
        self.logger.timing(STAGE_DETECT, elapsed_ms(start));

        if result.is_empty() {
            self.renderer
                .render_no_faces()
                .map_err(|e| AnalyzeError::Render(e.to_string()))?;
            self.logger.info("No faces detected");
            return Ok(AnalyzeOutcome::NoFaces);
        }

        let start = Instant::now();
        self.renderer
            .render_faces(payload, &result)
            .map_err(|e| AnalyzeError::Render(e.to_string()))?;
        self.logger.timing(STAGE_RENDER, elapsed_ms(start));
        self.logger.metric(METRIC_FACES, result.len() as f64);
        self.logger.summary();

        Ok(AnalyzeOutcome::Faces(result))
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
