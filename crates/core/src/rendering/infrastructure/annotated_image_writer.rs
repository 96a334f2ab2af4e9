use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};

use crate::detection::domain::detection_result::DetectionResult;
use crate::imaging::domain::prepared_payload::PreparedPayload;
use crate::rendering::infrastructure::canvas::{
    draw_text, fill_rect, stroke_rect, text_width, Rect,
};

const BOX_COLOR: Rgba<u8> = Rgba([0x00, 0x7b, 0xff, 0xff]);
const BOX_THICKNESS: u32 = 3;
const LABEL_HEIGHT: u32 = 24;
const LABEL_PADDING: u32 = 5;
const LABEL_TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const LABEL_SCALE: u32 = 2;

/// Draws numbered face boxes onto a copy of the submitted image and saves it.
pub struct AnnotatedImageWriter {
    output: PathBuf,
}

impl AnnotatedImageWriter {
    pub fn new(output: PathBuf) -> Self {
        Self { output }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Decodes `payload`, annotates it with `result` and writes it to the
    /// output path. The format follows the output file extension.
    pub fn write(
        &self,
        payload: &PreparedPayload,
        result: &DetectionResult,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = self.output.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut image = image::load_from_memory(&payload.bytes)?.to_rgba8();
        annotate(&mut image, result);
        image::DynamicImage::ImageRgba8(image)
            .to_rgb8()
            .save(&self.output)?;
        Ok(())
    }
}

/// Draws a `#n: <emotion>` labelled box per face, numbered from 1.
pub fn annotate(image: &mut RgbaImage, result: &DetectionResult) {
    for (index, face) in result.faces().iter().enumerate() {
        let b = face.face_box;
        stroke_rect(
            image,
            Rect::new(b.x, b.y, b.width, b.height),
            BOX_THICKNESS,
            BOX_COLOR,
        );

        let label = format!("#{}: {}", index + 1, face.dominant_emotion);
        let label_top = b.y.saturating_sub(LABEL_HEIGHT as i32);
        let label_width = text_width(&label, LABEL_SCALE) + 2 * LABEL_PADDING;
        fill_rect(
            image,
            Rect::new(b.x, label_top, label_width, LABEL_HEIGHT),
            BOX_COLOR,
        );
        draw_text(
            image,
            b.x.saturating_add(LABEL_PADDING as i32),
            label_top.saturating_add(LABEL_PADDING as i32),
            &label,
            LABEL_TEXT_COLOR,
            LABEL_SCALE,
        );
    }
}
