//! Window runtime: the winit event loop driving a single game window.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
