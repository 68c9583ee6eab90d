use crate::color::Color;

use super::{CommandTag, RenderCommand, TAG_SIZE, TextureId};

/// Consumer side of the command protocol.
///
/// The renderer implements this; tests substitute a recording sink.
pub trait DrawSink {
    fn clear(&mut self, color: Color);
    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color);
    fn sprite(&mut self, x: f32, y: f32, w: f32, h: f32, texture: TextureId, tint: Color);
    #[allow(clippy::too_many_arguments)]
    fn atlas_sprite(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        u0: f32,
        v0: f32,
        u1: f32,
        v1: f32,
        texture: TextureId,
        tint: Color,
    );
}

/// Bounds-checked reader over a recorded command stream.
///
/// Yields commands in recording order. A tag the reader does not know, or a
/// record extending past the end of the stream, is a protocol violation and
/// panics: either the buffer is corrupt or host and module disagree on the
/// format version.
pub struct CommandCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> CommandCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }
}

impl Iterator for CommandCursor<'_> {
    type Item = RenderCommand;

    fn next(&mut self) -> Option<RenderCommand> {
        if self.offset == self.bytes.len() {
            return None;
        }

        let tag_end = self.offset + TAG_SIZE;
        assert!(
            tag_end <= self.bytes.len(),
            "truncated render command stream at byte {}",
            self.offset,
        );
        let raw_tag: u32 = bytemuck::pod_read_unaligned(&self.bytes[self.offset..tag_end]);
        let Some(tag) = CommandTag::from_u32(raw_tag) else {
            panic!(
                "unknown render command tag {raw_tag} at byte {}",
                self.offset,
            );
        };

        let end = tag_end + tag.payload_size();
        assert!(
            end <= self.bytes.len(),
            "truncated {tag:?} command at byte {tag_end}",
        );
        let payload = &self.bytes[tag_end..end];
        self.offset = end;

        Some(match tag {
            CommandTag::Clear => RenderCommand::Clear(bytemuck::pod_read_unaligned(payload)),
            CommandTag::Rect => RenderCommand::Rect(bytemuck::pod_read_unaligned(payload)),
            CommandTag::Sprite => RenderCommand::Sprite(bytemuck::pod_read_unaligned(payload)),
            CommandTag::AtlasSprite => {
                RenderCommand::AtlasSprite(bytemuck::pod_read_unaligned(payload))
            }
        })
    }
}

/// Replays a recorded stream against `sink`, first byte to last.
///
/// Pure dispatch: no allocation, no GPU work. The stream order is the
/// execution order.
pub fn replay(bytes: &[u8], sink: &mut dyn DrawSink) {
    for cmd in CommandCursor::new(bytes) {
        match cmd {
            RenderCommand::Clear(c) => sink.clear(c.color),
            RenderCommand::Rect(c) => sink.rect(c.x, c.y, c.w, c.h, c.color),
            RenderCommand::Sprite(c) => sink.sprite(c.x, c.y, c.w, c.h, c.texture, c.tint),
            RenderCommand::AtlasSprite(c) => {
                sink.atlas_sprite(c.x, c.y, c.w, c.h, c.u0, c.v0, c.u1, c.v1, c.texture, c.tint)
            }
        }
    }
}
