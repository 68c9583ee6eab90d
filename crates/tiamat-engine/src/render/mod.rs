//! Immediate-mode sprite rendering.
//!
//! Draws land in a fixed low-resolution virtual framebuffer, batched per
//! texture; end-of-frame scales it onto the window with aspect-preserving
//! bars. The CPU half ([`QuadBatcher`], [`fit_virtual_to_window`]) is pure
//! and unit-tested; [`Renderer`] owns the wgpu half.

mod batch;
mod ctx;
mod letterbox;
mod renderer;
mod textures;
mod vertex;

pub use batch::{QuadBatch, QuadBatcher};
pub use ctx::{RenderCtx, RenderTarget};
pub use letterbox::fit_virtual_to_window;
pub use renderer::{Renderer, RendererConfig};
pub use textures::TextureTable;
pub use vertex::{BlitVertex, SpriteVertex};
