pub mod annotated_image_writer;
pub mod canvas;
pub mod canvas_overlay;
pub mod glyphs;
pub mod report_renderer;
pub mod text_chart_renderer;
