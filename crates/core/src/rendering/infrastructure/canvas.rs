use image::{Rgba, RgbaImage};

use crate::rendering::infrastructure::glyphs::{
    glyph_bits, is_lit, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH,
};

/// Integer-pixel rectangle in canvas space. May extend past the canvas edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn right(&self) -> i32 {
        self.x.saturating_add(to_i32(self.width))
    }

    fn bottom(&self) -> i32 {
        self.y.saturating_add(to_i32(self.height))
    }
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Composites `src` over `dst` (source-over).
pub fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let sa = src[3] as f32 / 255.0;
    if sa >= 1.0 {
        *dst = src;
        return;
    }
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for c in 0..3 {
        let value = (src[c] as f32 * sa + dst[c] as f32 * da * (1.0 - sa)) / out_a;
        dst[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

fn put(image: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>) {
    if x < 0 || y < 0 || x >= image.width() as i32 || y >= image.height() as i32 {
        return;
    }
    blend(image.get_pixel_mut(x as u32, y as u32), color);
}

/// Fills `rect`, clipped to the canvas, blending translucent colours.
pub fn fill_rect(image: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    let left = rect.x.max(0);
    let top = rect.y.max(0);
    let right = rect.right().min(image.width() as i32);
    let bottom = rect.bottom().min(image.height() as i32);
    for y in top..bottom {
        for x in left..right {
            put(image, x, y, color);
        }
    }
}

/// Outlines `rect` with a border `thickness` pixels wide, drawn inward.
pub fn stroke_rect(image: &mut RgbaImage, rect: Rect, thickness: u32, color: Rgba<u8>) {
    let t = thickness.min(rect.width.div_ceil(2)).min(rect.height.div_ceil(2)) as i32;
    let (left, top, right, bottom) = (rect.x, rect.y, rect.right(), rect.bottom());
    let w = rect.width;
    let h = rect.height;

    let inner_top = top.saturating_add(t);
    let inner_h = h.saturating_sub(2 * t as u32);
    fill_rect(image, Rect::new(left, top, w, t as u32), color);
    fill_rect(image, Rect::new(left, bottom.saturating_sub(t), w, t as u32), color);
    fill_rect(image, Rect::new(left, inner_top, t as u32, inner_h), color);
    fill_rect(image, Rect::new(right.saturating_sub(t), inner_top, t as u32, inner_h), color);
}

/// Pixel width of `text` rendered at `scale`.
pub fn text_width(text: &str, scale: u32) -> u32 {
    let count = text.chars().count() as u32;
    if count == 0 {
        return 0;
    }
    (count * GLYPH_ADVANCE - 1) * scale
}

pub fn text_height(scale: u32) -> u32 {
    GLYPH_HEIGHT * scale
}

/// Draws `text` with its top-left corner at (`x`, `y`).
pub fn draw_text(image: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>, scale: u32) {
    let scale = scale.max(1);
    let advance = to_i32(GLYPH_ADVANCE.saturating_mul(scale));
    let mut origin_x = x;
    for ch in text.chars() {
        if origin_x >= image.width() as i32 {
            break;
        }
        let bits = glyph_bits(ch);
        for row in 0..GLYPH_HEIGHT {
            for col in 0..GLYPH_WIDTH {
                if !is_lit(&bits, col, row) {
                    continue;
                }
                let px = origin_x.saturating_add(to_i32(col.saturating_mul(scale)));
                let py = y.saturating_add(to_i32(row.saturating_mul(scale)));
                fill_rect(image, Rect::new(px, py, scale, scale), color);
            }
        }
        origin_x = origin_x.saturating_add(advance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    #[test]
    fn test_blend_opaque_replaces() {
        let mut dst = Rgba([10, 20, 30, 255]);
        blend(&mut dst, RED);
        assert_eq!(dst, RED);
    }

    #[test]
    fn test_blend_half_black_over_white() {
        let mut dst = Rgba([255, 255, 255, 255]);
        blend(&mut dst, Rgba([0, 0, 0, 128]));
        assert!((126..=128).contains(&dst[0]));
        assert_eq!(dst[3], 255);
    }

    #[test]
    fn test_blend_onto_transparent_keeps_source_colour() {
        let mut dst = CLEAR;
        blend(&mut dst, Rgba([0, 0, 0, 128]));
        assert_eq!(dst, Rgba([0, 0, 0, 128]));
    }

    #[test]
    fn test_fill_rect_clips_to_canvas() {
        let mut img = RgbaImage::from_pixel(10, 10, CLEAR);
        fill_rect(&mut img, Rect::new(-5, -5, 8, 8), RED);
        assert_eq!(*img.get_pixel(0, 0), RED);
        assert_eq!(*img.get_pixel(2, 2), RED);
        assert_eq!(*img.get_pixel(3, 3), CLEAR);
    }

    #[test]
    fn test_stroke_rect_leaves_interior_untouched() {
        let mut img = RgbaImage::from_pixel(20, 20, CLEAR);
        stroke_rect(&mut img, Rect::new(2, 2, 10, 10), 2, RED);
        assert_eq!(*img.get_pixel(2, 2), RED);
        assert_eq!(*img.get_pixel(3, 6), RED);
        assert_eq!(*img.get_pixel(11, 11), RED);
        assert_eq!(*img.get_pixel(6, 6), CLEAR);
        assert_eq!(*img.get_pixel(12, 12), CLEAR);
    }

    #[test]
    fn test_text_width() {
        assert_eq!(text_width("", 2), 0);
        assert_eq!(text_width("a", 1), 5);
        assert_eq!(text_width("sad", 2), (3 * 6 - 1) * 2);
    }

    #[test]
    fn test_draw_text_marks_pixels_inside_its_box_only() {
        let mut img = RgbaImage::from_pixel(40, 20, CLEAR);
        draw_text(&mut img, 1, 1, "HI", RED, 1);
        let lit: Vec<_> = img
            .enumerate_pixels()
            .filter(|(_, _, p)| **p == RED)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!lit.is_empty());
        assert!(lit
            .iter()
            .all(|&(x, y)| (1..1 + text_width("HI", 1)).contains(&x) && (1..8).contains(&y)));
    }

    #[test]
    fn test_rect_near_i32_limits_is_clipped_away() {
        let mut img = RgbaImage::from_pixel(10, 10, CLEAR);
        stroke_rect(&mut img, Rect::new(2_000_000_000, 5, 500_000_000, 10), 3, RED);
        stroke_rect(&mut img, Rect::new(i32::MIN, i32::MIN, u32::MAX, 4), 3, RED);
        draw_text(&mut img, i32::MAX - 3, i32::MAX - 3, "HAPPY", RED, 2);
        assert!(img.pixels().all(|p| *p == CLEAR));
    }
}
