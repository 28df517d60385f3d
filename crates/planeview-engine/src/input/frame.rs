use super::types::InputEvent;

/// Input queued since the last frame.
///
/// The app drains `events` in arrival order at the start of `on_frame`; the
/// runtime clears the queue once the frame returns.
#[derive(Debug, Default)]
pub struct InputFrame {
    pub events: Vec<InputEvent>,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn push_event(&mut self, ev: InputEvent) {
        self.events.push(ev);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
