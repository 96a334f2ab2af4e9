use thiserror::Error;

use crate::detection::domain::detection_result::DetectionResult;
use crate::imaging::domain::prepared_payload::PreparedPayload;

/// Failures of a single detection request. None of them are retried here;
/// callers decide whether a failure is worth another attempt.
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("could not reach detection endpoint: {0}")]
    Transport(String),
    #[error("detection service reported an error: {0}")]
    Service(String),
    #[error("malformed detection response: {0}")]
    MalformedResponse(String),
}

/// Domain interface for the remote emotion detector.
///
/// Takes `&self` so one client can serve concurrent callers; a call blocks
/// only the thread that made it.
pub trait DetectionService: Send + Sync {
    fn detect(&self, payload: &PreparedPayload) -> Result<DetectionResult, DetectionError>;
}
