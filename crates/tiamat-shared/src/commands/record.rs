use bytemuck::Pod;

use crate::color::Color;

use super::{AtlasSpriteCmd, ClearCmd, CommandTag, RectCmd, SpriteCmd, TAG_SIZE, TextureId};

/// Raw command-buffer view handed across the module boundary.
///
/// `base` and `capacity` describe the arena's storage; `used` is the write
/// cursor, advanced by the recorder inside the module and read back by the
/// host after the update call returns.
#[repr(C)]
#[derive(Debug)]
pub struct RawCommandBuffer {
    pub base: *mut u8,
    pub capacity: usize,
    pub used: usize,
    pub width: u32,
    pub height: u32,
}

/// Append-only writer for render commands.
///
/// The single write path on both sides of the boundary: the host-side
/// [`RenderCommandBuffer`](super::RenderCommandBuffer) and the game-side raw
/// view both record through it. The buffer is write-only during an update
/// call; commands land in the exact order they must execute.
///
/// Recording into a full buffer panics — overflow means the arena was
/// undersized, not a condition to recover from. Size it generously; a few
/// megabytes holds thousands of quads per frame.
pub struct CommandRecorder<'a> {
    buf: &'a mut [u8],
    used: &'a mut usize,
    width: u32,
    height: u32,
}

impl<'a> CommandRecorder<'a> {
    pub(crate) fn new(buf: &'a mut [u8], used: &'a mut usize, width: u32, height: u32) -> Self {
        debug_assert!(*used <= buf.len());
        Self {
            buf,
            used,
            width,
            height,
        }
    }

    /// Rebuilds a recorder from the raw boundary view.
    ///
    /// # Safety
    /// `raw.base` must point to a live buffer of `raw.capacity` bytes that the
    /// caller exclusively borrows for `'a`, with `raw.used <= raw.capacity`.
    pub unsafe fn from_raw(raw: &'a mut RawCommandBuffer) -> Self {
        let buf = unsafe { std::slice::from_raw_parts_mut(raw.base, raw.capacity) };
        Self::new(buf, &mut raw.used, raw.width, raw.height)
    }

    /// Virtual-resolution width the commands are authored against.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Virtual-resolution height the commands are authored against.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn push_clear(&mut self, color: Color) {
        self.push(CommandTag::Clear, &ClearCmd { color });
    }

    pub fn push_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.push(CommandTag::Rect, &RectCmd { x, y, w, h, color });
    }

    pub fn push_sprite(&mut self, x: f32, y: f32, w: f32, h: f32, texture: TextureId, tint: Color) {
        self.push(
            CommandTag::Sprite,
            &SpriteCmd {
                x,
                y,
                w,
                h,
                texture,
                tint,
            },
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn push_atlas_sprite(
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
    ) {
        self.push(
            CommandTag::AtlasSprite,
            &AtlasSpriteCmd {
                x,
                y,
                w,
                h,
                u0,
                v0,
                u1,
                v1,
                texture,
                tint,
            },
        );
    }

    fn push<T: Pod>(&mut self, tag: CommandTag, payload: &T) {
        let payload_size = std::mem::size_of::<T>();
        debug_assert_eq!(payload_size, tag.payload_size());
        // Every payload is built from 4-byte fields, so records stay aligned
        // with no padding between them.
        debug_assert_eq!(payload_size % TAG_SIZE, 0);

        let start = *self.used;
        let end = start + TAG_SIZE + payload_size;
        assert!(
            end <= self.buf.len(),
            "render command buffer full: {start} of {} bytes used",
            self.buf.len(),
        );

        self.buf[start..start + TAG_SIZE].copy_from_slice(&(tag as u32).to_ne_bytes());
        self.buf[start + TAG_SIZE..end].copy_from_slice(bytemuck::bytes_of(payload));
        *self.used = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_pack_back_to_back() {
        let mut buf = [0u8; 256];
        let mut used = 0usize;
        let mut rec = CommandRecorder::new(&mut buf, &mut used, 320, 180);

        rec.push_clear(Color::BLACK);
        assert_eq!(used, TAG_SIZE + std::mem::size_of::<ClearCmd>());

        let mut rec = CommandRecorder::new(&mut buf, &mut used, 320, 180);
        rec.push_rect(1.0, 2.0, 3.0, 4.0, Color::RED);
        assert_eq!(
            used,
            2 * TAG_SIZE + std::mem::size_of::<ClearCmd>() + std::mem::size_of::<RectCmd>(),
        );
    }

    #[test]
    fn reports_virtual_resolution() {
        let mut buf = [0u8; 16];
        let mut used = 0usize;
        let rec = CommandRecorder::new(&mut buf, &mut used, 320, 180);
        assert_eq!((rec.width(), rec.height()), (320, 180));
    }

    #[test]
    #[should_panic(expected = "render command buffer full")]
    fn overflow_panics() {
        let mut buf = [0u8; 16];
        let mut used = 0usize;
        let mut rec = CommandRecorder::new(&mut buf, &mut used, 320, 180);
        rec.push_rect(0.0, 0.0, 1.0, 1.0, Color::WHITE);
    }
}
