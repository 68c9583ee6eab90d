//! Tiamat engine crate.
//!
//! Host-side runtime for the hot-reloadable game: GPU device and surface
//! management, the immediate-mode sprite renderer with its virtual
//! framebuffer, the window loop, input translation, and the machinery that
//! watches and reloads the game logic module.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod logic;
pub mod render;
