use crate::detection::domain::detection_result::FaceResult;

/// Transparent drawing surface laid over the live camera view.
///
/// The real-time loop clears it, draws every face of one result and then
/// presents it, all while holding the overlay lock, so viewers never see a
/// half-drawn result.
pub trait Overlay: Send {
    /// Resizes the surface to the stream resolution and clears it.
    fn configure(&mut self, width: u32, height: u32);

    fn size(&self) -> (u32, u32);

    fn clear(&mut self);

    /// Draws one face box with its dominant-emotion label.
    fn draw_face(&mut self, face: &FaceResult);

    /// Makes the drawn state visible. Default: no-op.
    fn present(&mut self) {}
}
