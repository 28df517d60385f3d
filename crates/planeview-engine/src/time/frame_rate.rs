use std::time::{Duration, Instant};

/// Averages frame rate over fixed reporting windows.
///
/// Frames are event-driven, so an idle viewer reports nothing rather than a
/// misleading low rate: a window only closes when a frame arrives after it.
#[derive(Debug, Clone)]
pub struct FrameRate {
    window: Duration,
    start: Option<Instant>,
    frames: u32,
}

impl FrameRate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            start: None,
            frames: 0,
        }
    }

    /// Records a frame at `now`. Returns the average rate once per elapsed window.
    pub fn record(&mut self, now: Instant) -> Option<f32> {
        let Some(start) = self.start else {
            self.start = Some(now);
            self.frames = 0;
            return None;
        };

        self.frames += 1;
        let elapsed = now.saturating_duration_since(start);
        if elapsed < self.window {
            return None;
        }

        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.start = Some(now);
        self.frames = 0;
        Some(fps)
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}
