//! Hot-reload machinery for the game logic module.
//!
//! The host watches the module's build output and swaps it in at runtime.
//! [`ModuleLoader`] is the seam: production injects the `libloading`-backed
//! [`DylibLoader`], tests inject a fake. The command-buffer protocol in
//! `tiamat-shared` is the only data contract crossing the boundary, so a
//! swapped module needs nothing from the renderer.

mod dylib;
mod loader;
mod reload;

pub use dylib::{DylibLoader, DylibModule};
pub use loader::{LoadedLogic, LogicEntryPoints, ModuleLoader};
pub use reload::{HotReloader, ReloadConfig};
