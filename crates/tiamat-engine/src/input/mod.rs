//! Platform input translation.
//!
//! The snapshot types live in `tiamat-shared` (they cross the module
//! boundary); this module only maps winit events onto them.

mod winit;

pub use self::winit::apply_window_event;
