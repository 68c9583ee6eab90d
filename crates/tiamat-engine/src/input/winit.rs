use tiamat_shared::input::GameInput;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Applies one window event to the input snapshot.
///
/// WASD and the arrow keys steer, Space is the action button, and the first
/// three mouse buttons map to the snapshot's slots. Cursor position lands in
/// window pixels. OS key repeat is filtered by `ButtonState::process`, which
/// counts only genuine edges.
pub fn apply_window_event(input: &mut GameInput, event: &WindowEvent) {
    match event {
        WindowEvent::KeyboardInput { event, .. } => {
            let is_down = event.state == ElementState::Pressed;
            let PhysicalKey::Code(code) = event.physical_key else {
                return;
            };
            match code {
                KeyCode::KeyW | KeyCode::ArrowUp => input.move_up.process(is_down),
                KeyCode::KeyS | KeyCode::ArrowDown => input.move_down.process(is_down),
                KeyCode::KeyA | KeyCode::ArrowLeft => input.move_left.process(is_down),
                KeyCode::KeyD | KeyCode::ArrowRight => input.move_right.process(is_down),
                KeyCode::Space => input.action.process(is_down),
                _ => {}
            }
        }

        WindowEvent::CursorMoved { position, .. } => {
            input.mouse_x = position.x as i32;
            input.mouse_y = position.y as i32;
        }

        WindowEvent::MouseInput { state, button, .. } => {
            let is_down = *state == ElementState::Pressed;
            let index = match button {
                MouseButton::Left => 0,
                MouseButton::Right => 1,
                MouseButton::Middle => 2,
                _ => return,
            };
            input.mouse_buttons[index].process(is_down);
        }

        _ => {}
    }
}
