use crate::detection::domain::detection_result::DetectionResult;
use crate::imaging::domain::prepared_payload::PreparedPayload;

/// Presents the outcome of one single-shot submission.
pub trait ResultRenderer {
    /// Renders a non-empty result. Face boxes are in the pixel space of
    /// `payload`, which is the image the service saw.
    fn render_faces(
        &mut self,
        payload: &PreparedPayload,
        result: &DetectionResult,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Reports that the service found no faces.
    fn render_no_faces(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
