use std::time::{Duration, Instant};

/// Renders-per-second over fixed wall-clock windows.
///
/// The first window opens at `start`. Each `record` counts one render; once
/// at least `window` has elapsed the rate for that window is published and a
/// new window opens at that render.
#[derive(Clone, Debug)]
pub struct FpsCounter {
    window: Duration,
    window_start: Option<Instant>,
    count: u32,
}

impl FpsCounter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            window_start: None,
            count: 0,
        }
    }

    /// Opens the first window at `now`, discarding any partial count.
    pub fn start(&mut self, now: Instant) {
        self.window_start = Some(now);
        self.count = 0;
    }

    /// Counts one render at `now`. Returns the new rate when a window closes.
    ///
    /// Without a prior `start`, the first render only opens the window.
    pub fn record(&mut self, now: Instant) -> Option<f64> {
        let Some(start) = self.window_start else {
            self.start(now);
            return None;
        };
        self.count += 1;

        let elapsed = now.saturating_duration_since(start);
        if elapsed < self.window || elapsed.is_zero() {
            return None;
        }

        let fps = self.count as f64 / elapsed.as_secs_f64();
        self.start(now);
        Some(fps)
    }
}
