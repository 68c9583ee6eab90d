//! Engine-facing contracts between the window runtime and the host app.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::FrameCtx;
