use std::io::Write;

use crate::detection::domain::detection_result::DetectionResult;
use crate::imaging::domain::prepared_payload::PreparedPayload;
use crate::rendering::domain::chart::{ChartKind, ChartRenderer, EmotionChart};
use crate::rendering::domain::result_renderer::ResultRenderer;
use crate::rendering::infrastructure::annotated_image_writer::AnnotatedImageWriter;

pub const NO_FACES_MESSAGE: &str = "No faces detected in the image.";

/// Single-shot result report: an optional annotated image plus, per face, a
/// heading, both chart views and the dominant emotion.
pub struct ReportRenderer {
    out: Box<dyn Write + Send>,
    charts: Box<dyn ChartRenderer>,
    annotated: Option<AnnotatedImageWriter>,
}

impl ReportRenderer {
    pub fn new(out: Box<dyn Write + Send>, charts: Box<dyn ChartRenderer>) -> Self {
        Self {
            out,
            charts,
            annotated: None,
        }
    }

    pub fn with_annotated_image(mut self, writer: AnnotatedImageWriter) -> Self {
        self.annotated = Some(writer);
        self
    }
}

/// Heading shown above the charts of face `index` (zero-based).
pub fn face_heading(index: usize, face_count: usize) -> String {
    if face_count > 1 {
        format!("Face #{}", index + 1)
    } else {
        "Detected Face".to_string()
    }
}

impl ResultRenderer for ReportRenderer {
    fn render_faces(
        &mut self,
        payload: &PreparedPayload,
        result: &DetectionResult,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(writer) = &self.annotated {
            writer.write(payload, result)?;
            log::info!("Annotated image written to {}", writer.output().display());
        }

        let count = result.len();
        for (index, face) in result.faces().iter().enumerate() {
            let b = face.face_box;
            writeln!(self.out, "{}", face_heading(index, count))?;
            writeln!(
                self.out,
                "  box: x={} y={} w={} h={}",
                b.x, b.y, b.width, b.height
            )?;
            self.out.flush()?;

            let chart = EmotionChart::from_face(face);
            for kind in [ChartKind::Doughnut, ChartKind::Bar] {
                self.charts.draw(&kind.surface_id(index), &chart, kind)?;
            }

            writeln!(self.out, "Dominant Emotion: {}", face.dominant_emotion)?;
            writeln!(self.out)?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn render_no_faces(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        writeln!(self.out, "{NO_FACES_MESSAGE}")?;
        self.out.flush()?;
        Ok(())
    }
}
