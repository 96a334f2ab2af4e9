pub mod chart;
pub mod overlay;
pub mod result_renderer;
