use std::path::PathBuf;

use image::{Rgba, RgbaImage};

use crate::detection::domain::detection_result::FaceResult;
use crate::rendering::domain::overlay::Overlay;
use crate::rendering::infrastructure::canvas::{draw_text, fill_rect, stroke_rect, Rect};

const BOX_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
const BOX_THICKNESS: u32 = 2;
const LABEL_BAR_COLOR: Rgba<u8> = Rgba([0, 0, 0, 128]);
const LABEL_BAR_HEIGHT: u32 = 20;
const LABEL_TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const LABEL_PADDING: i32 = 5;
const LABEL_SCALE: u32 = 2;
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// In-memory RGBA overlay.
///
/// Each face gets a green box and a translucent label bar as wide as the box
/// sitting on its top edge. When a snapshot path is set, every `present`
/// writes the overlay to that file as PNG.
pub struct CanvasOverlay {
    canvas: RgbaImage,
    snapshot: Option<PathBuf>,
}

impl CanvasOverlay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbaImage::from_pixel(width, height, TRANSPARENT),
            snapshot: None,
        }
    }

    pub fn with_snapshot(mut self, path: PathBuf) -> Self {
        self.snapshot = Some(path);
        self
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }
}

impl Default for CanvasOverlay {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl Overlay for CanvasOverlay {
    fn configure(&mut self, width: u32, height: u32) {
        self.canvas = RgbaImage::from_pixel(width, height, TRANSPARENT);
    }

    fn size(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    fn clear(&mut self) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = TRANSPARENT;
        }
    }

    fn draw_face(&mut self, face: &FaceResult) {
        let b = face.face_box;
        let face_rect = Rect::new(b.x, b.y, b.width, b.height);
        stroke_rect(&mut self.canvas, face_rect, BOX_THICKNESS, BOX_COLOR);

        let bar_top = b.y.saturating_sub(LABEL_BAR_HEIGHT as i32);
        fill_rect(
            &mut self.canvas,
            Rect::new(b.x, bar_top, b.width, LABEL_BAR_HEIGHT),
            LABEL_BAR_COLOR,
        );
        draw_text(
            &mut self.canvas,
            b.x.saturating_add(LABEL_PADDING),
            bar_top.saturating_add(3),
            &face.dominant_emotion,
            LABEL_TEXT_COLOR,
            LABEL_SCALE,
        );
    }

    fn present(&mut self) {
        let Some(path) = &self.snapshot else {
            return;
        };
        if self.canvas.width() == 0 || self.canvas.height() == 0 {
            return;
        }
        if let Err(e) = self.canvas.save(path) {
            log::warn!("Failed to write overlay snapshot {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection_result::{EmotionScore, FaceBox};

    fn face(x: i32, y: i32, w: u32, h: u32) -> FaceResult {
        FaceResult {
            face_box: FaceBox::new(x, y, w, h),
            dominant_emotion: "happy".into(),
            emotions: vec![EmotionScore {
                emotion: "happy".into(),
                score: 0.9,
            }],
        }
    }

    #[test]
    fn test_configure_resizes_and_clears() {
        let mut overlay = CanvasOverlay::default();
        overlay.configure(64, 48);
        assert_eq!(overlay.size(), (64, 48));
        assert!(overlay.canvas().pixels().all(|p| *p == TRANSPARENT));
    }

    #[test]
    fn test_draw_face_strokes_green_box_and_translucent_bar() {
        let mut overlay = CanvasOverlay::new(200, 200);
        overlay.draw_face(&face(50, 60, 80, 80));

        let canvas = overlay.canvas();
        assert_eq!(*canvas.get_pixel(50, 100), BOX_COLOR);
        assert_eq!(*canvas.get_pixel(129, 100), BOX_COLOR);
        assert_eq!(*canvas.get_pixel(90, 100), TRANSPARENT);
        // right end of the bar is past the label text
        assert_eq!(*canvas.get_pixel(125, 41), LABEL_BAR_COLOR);
        assert_eq!(*canvas.get_pixel(90, 30), TRANSPARENT);
    }

    #[test]
    fn test_label_text_is_white() {
        let mut overlay = CanvasOverlay::new(200, 200);
        overlay.draw_face(&face(50, 60, 120, 80));
        let white = overlay
            .canvas()
            .pixels()
            .filter(|p| **p == LABEL_TEXT_COLOR)
            .count();
        assert!(white > 0);
    }

    #[test]
    fn test_clear_removes_drawing() {
        let mut overlay = CanvasOverlay::new(100, 100);
        overlay.draw_face(&face(10, 30, 40, 40));
        overlay.clear();
        assert!(overlay.canvas().pixels().all(|p| *p == TRANSPARENT));
    }

    #[test]
    fn test_face_partly_outside_canvas_is_clipped() {
        let mut overlay = CanvasOverlay::new(50, 50);
        overlay.draw_face(&face(-10, 5, 100, 100));
        assert_eq!(overlay.size(), (50, 50));
    }

    #[test]
    fn test_present_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.png");
        let mut overlay = CanvasOverlay::new(32, 32).with_snapshot(path.clone());

        overlay.draw_face(&face(4, 24, 8, 8));
        overlay.present();

        let saved = image::open(&path).unwrap();
        assert_eq!((saved.width(), saved.height()), (32, 32));
    }

    #[test]
    fn test_box_far_outside_canvas_draws_nothing() {
        let mut overlay = CanvasOverlay::new(64, 48);
        overlay.draw_face(&face(2_000_000_000, 10, 500_000_000, 10));
        overlay.draw_face(&face(10, i32::MIN, 40, 40));
        assert!(overlay.canvas().pixels().all(|p| *p == TRANSPARENT));
    }
}
