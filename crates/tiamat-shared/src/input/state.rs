/// Digital button state crossing the module boundary.
///
/// `half_transitions` counts press/release edges since the host last cleared
/// it, so logic catches taps shorter than a frame.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ButtonState {
    /// 1 when the button is currently held, 0 otherwise.
    pub ended_down: u32,
    /// Press/release edges since the last frame reset.
    pub half_transitions: u32,
}

impl ButtonState {
    /// Applies a platform edge. Repeated events with the same state are
    /// ignored, so OS key repeat does not inflate the transition count.
    pub fn process(&mut self, is_down: bool) {
        let down = is_down as u32;
        if self.ended_down != down {
            self.ended_down = down;
            self.half_transitions += 1;
        }
    }

    #[inline]
    pub fn is_down(&self) -> bool {
        self.ended_down != 0
    }

    /// True when the button is down and at least one edge happened this
    /// frame — a fresh press rather than a hold.
    #[inline]
    pub fn pressed(&self) -> bool {
        self.is_down() && self.half_transitions > 0
    }

    #[inline]
    pub fn clear_transitions(&mut self) {
        self.half_transitions = 0;
    }
}

/// Mouse buttons tracked in the snapshot: left, right, middle.
pub const MOUSE_BUTTON_COUNT: usize = 3;

/// Per-frame input snapshot handed to game logic.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct GameInput {
    /// Seconds since the previous update.
    pub dt: f32,

    pub move_up: ButtonState,
    pub move_down: ButtonState,
    pub move_left: ButtonState,
    pub move_right: ButtonState,
    pub action: ButtonState,

    /// Pointer position in window pixels.
    pub mouse_x: i32,
    pub mouse_y: i32,
    /// Indexed left, right, middle.
    pub mouse_buttons: [ButtonState; MOUSE_BUTTON_COUNT],
}

impl GameInput {
    /// Clears every half-transition counter. The host calls this after the
    /// frame's update has consumed the snapshot.
    pub fn clear_transitions(&mut self) {
        self.move_up.clear_transitions();
        self.move_down.clear_transitions();
        self.move_left.clear_transitions();
        self.move_right.clear_transitions();
        self.action.clear_transitions();
        for button in &mut self.mouse_buttons {
            button.clear_transitions();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_counts_edges() {
        let mut b = ButtonState::default();
        b.process(true);
        assert!(b.is_down());
        assert_eq!(b.half_transitions, 1);

        b.process(false);
        b.process(true);
        assert_eq!(b.half_transitions, 3);
    }

    #[test]
    fn repeated_state_is_ignored() {
        let mut b = ButtonState::default();
        b.process(true);
        b.process(true);
        b.process(true);
        assert_eq!(b.half_transitions, 1);
    }

    #[test]
    fn pressed_requires_an_edge_this_frame() {
        let mut b = ButtonState::default();
        b.process(true);
        assert!(b.pressed());

        // Still held after the frame reset: a hold, not a press.
        b.clear_transitions();
        assert!(b.is_down());
        assert!(!b.pressed());
    }

    #[test]
    fn clear_transitions_clears_every_button() {
        let mut input = GameInput::default();
        input.action.process(true);
        input.move_left.process(true);
        input.mouse_buttons[0].process(true);

        input.clear_transitions();
        assert_eq!(input.action.half_transitions, 0);
        assert_eq!(input.move_left.half_transitions, 0);
        assert_eq!(input.mouse_buttons[0].half_transitions, 0);
        // Held state survives the reset.
        assert!(input.action.is_down());
    }
}
