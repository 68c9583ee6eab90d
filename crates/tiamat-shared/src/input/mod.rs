//! Input snapshot handed to game logic each frame.

mod state;

pub use state::{ButtonState, GameInput, MOUSE_BUTTON_COUNT};
