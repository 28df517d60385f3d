use super::frame::InputFrame;
use super::types::{InputEvent, Modifiers, PointerButtonEvent, PointerMoveEvent};

/// What the translator needs to know between window events.
///
/// winit reports button presses without a position and keys without modifier
/// state, so both are tracked here and stamped onto the translated events.
#[derive(Debug, Default)]
pub struct InputState {
    pub modifiers: Modifiers,

    /// Last cursor position in logical pixels. Kept after the cursor leaves
    /// the window so a release outside still reports where it happened.
    pub pointer_pos: Option<(f32, f32)>,
}

impl InputState {
    /// Folds `ev` into the tracked state and queues it on `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match &ev {
            InputEvent::ModifiersChanged(m) => self.modifiers = *m,
            InputEvent::PointerMoved(PointerMoveEvent { x, y }) => {
                self.pointer_pos = Some((*x, *y));
            }
            InputEvent::PointerButton(PointerButtonEvent { position, modifiers, .. }) => {
                if position.is_some() {
                    self.pointer_pos = *position;
                }
                self.modifiers = *modifiers;
            }
            InputEvent::Key { modifiers, .. } => self.modifiers = *modifiers,
            InputEvent::Focused(_) => {}
        }

        frame.push_event(ev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Key, KeyState, MouseButton, MouseButtonState};

    fn button(state: MouseButtonState, position: Option<(f32, f32)>) -> InputEvent {
        InputEvent::PointerButton(PointerButtonEvent {
            button: MouseButton::Left,
            state,
            position,
            modifiers: Modifiers::default(),
        })
    }

    fn moved(x: f32, y: f32) -> InputEvent {
        InputEvent::PointerMoved(PointerMoveEvent { x, y })
    }

    #[test]
    fn events_are_queued_in_arrival_order() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        let events = [
            button(MouseButtonState::Pressed, Some((10.0, 20.0))),
            moved(15.0, 25.0),
            moved(30.0, 40.0),
            button(MouseButtonState::Released, Some((30.0, 40.0))),
        ];
        for ev in events.iter().cloned() {
            state.apply_event(&mut frame, ev);
        }

        assert_eq!(frame.events, events);
        assert_eq!(state.pointer_pos, Some((30.0, 40.0)));
    }

    #[test]
    fn key_events_carry_modifier_state_forward() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        let shift = Modifiers { shift: true, ..Modifiers::default() };
        state.apply_event(&mut frame, InputEvent::ModifiersChanged(shift));
        assert_eq!(state.modifiers, shift);

        state.apply_event(
            &mut frame,
            InputEvent::Key {
                key: Key::Space,
                state: KeyState::Pressed,
                modifiers: Modifiers::default(),
                code: 0,
                repeat: false,
            },
        );
        assert_eq!(state.modifiers, Modifiers::default());
        assert_eq!(frame.events.len(), 2);
    }

    #[test]
    fn unknown_press_position_keeps_last_known() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, moved(1.0, 2.0));
        state.apply_event(&mut frame, button(MouseButtonState::Pressed, None));
        assert_eq!(state.pointer_pos, Some((1.0, 2.0)));

        frame.clear();
        assert!(frame.is_empty());
    }
}
