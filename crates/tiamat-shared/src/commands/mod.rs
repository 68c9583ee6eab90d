//! Render-command protocol.
//!
//! Game logic records tagged draw instructions into an arena-backed buffer
//! each frame; the host replays them against the renderer. The byte stream is
//! the contract across the hot-reload boundary, so every payload is
//! `#[repr(C)]` with 4-byte fields only: records pack back-to-back with no
//! padding, and a reader derives each record's size from its tag alone.
//!
//! The stream encodes both data and order. Later commands draw on top of
//! earlier ones; there is no explicit depth.
//!
//! Extending the protocol:
//! - add a payload struct and a [`CommandTag`] variant here
//! - add a push helper to [`CommandRecorder`]
//! - add the decode arm to [`CommandCursor`] and the dispatch arm to [`replay`]
//! - add the matching operation to [`DrawSink`]

mod buffer;
mod record;
mod replay;

pub use buffer::RenderCommandBuffer;
pub use record::{CommandRecorder, RawCommandBuffer};
pub use replay::{CommandCursor, DrawSink, replay};

use bytemuck::{Pod, Zeroable};

use crate::color::Color;

/// Size of the `u32` tag prefixing every record.
pub(crate) const TAG_SIZE: usize = std::mem::size_of::<u32>();

/// Handle to a GPU texture owned by the renderer.
///
/// Id 0 is the reserved 1x1 opaque white texture; untextured rectangles draw
/// through it so every quad takes the same textured path. It doubles as the
/// sentinel returned when texture loading fails.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Pod, Zeroable)]
pub struct TextureId(pub u32);

impl TextureId {
    pub const WHITE: TextureId = TextureId(0);
}

/// Command tag, written as a `u32` before each payload.
#[repr(u32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CommandTag {
    Clear = 0,
    Rect = 1,
    Sprite = 2,
    AtlasSprite = 3,
}

impl CommandTag {
    pub fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Clear),
            1 => Some(Self::Rect),
            2 => Some(Self::Sprite),
            3 => Some(Self::AtlasSprite),
            _ => None,
        }
    }

    /// Payload size in bytes for this tag.
    pub fn payload_size(self) -> usize {
        match self {
            Self::Clear => std::mem::size_of::<ClearCmd>(),
            Self::Rect => std::mem::size_of::<RectCmd>(),
            Self::Sprite => std::mem::size_of::<SpriteCmd>(),
            Self::AtlasSprite => std::mem::size_of::<AtlasSpriteCmd>(),
        }
    }
}

/// Sets the clear color of the frame's offscreen pass.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ClearCmd {
    pub color: Color,
}

/// Solid rectangle in virtual-resolution pixels.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct RectCmd {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub color: Color,
}

/// Full-texture sprite.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SpriteCmd {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub texture: TextureId,
    pub tint: Color,
}

/// Sprite sampling the `[u0, v0]..[u1, v1]` region of an atlas texture.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct AtlasSpriteCmd {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
    pub texture: TextureId,
    pub tint: Color,
}

/// One decoded render command.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RenderCommand {
    Clear(ClearCmd),
    Rect(RectCmd),
    Sprite(SpriteCmd),
    AtlasSprite(AtlasSpriteCmd),
}
