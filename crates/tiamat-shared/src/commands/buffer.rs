use super::record::{CommandRecorder, RawCommandBuffer};
use super::replay::{CommandCursor, DrawSink};

/// Host-side render command buffer: a byte arena paired with the virtual
/// resolution the commands are authored against.
///
/// Lifecycle per frame: the host `reset`s it, game logic records into it
/// once (via the raw view across the module boundary, or [`recorder`] for
/// in-process callers), and the renderer consumes it once via [`replay`].
/// The renderer never mutates it.
///
/// [`recorder`]: Self::recorder
/// [`replay`]: Self::replay
pub struct RenderCommandBuffer {
    storage: Box<[u8]>,
    used: usize,
    width: u32,
    height: u32,
}

impl RenderCommandBuffer {
    /// `capacity` is the arena size in bytes. A few megabytes holds thousands
    /// of quads per frame; recording past the end is fatal, so size it
    /// generously.
    pub fn new(capacity: usize, width: u32, height: u32) -> Self {
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            used: 0,
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Empties the buffer. The host calls this at the start of every frame.
    #[inline]
    pub fn reset(&mut self) {
        self.used = 0;
    }

    /// Write handle for recording commands in-process.
    pub fn recorder(&mut self) -> CommandRecorder<'_> {
        CommandRecorder::new(&mut self.storage, &mut self.used, self.width, self.height)
    }

    /// Raw view for the module boundary.
    ///
    /// After the module call returns, adopt the advanced write cursor with
    /// [`sync_from_raw`](Self::sync_from_raw).
    pub fn as_raw(&mut self) -> RawCommandBuffer {
        RawCommandBuffer {
            base: self.storage.as_mut_ptr(),
            capacity: self.storage.len(),
            used: self.used,
            width: self.width,
            height: self.height,
        }
    }

    /// Adopts the write cursor from a raw view produced by
    /// [`as_raw`](Self::as_raw).
    ///
    /// # Panics
    /// Panics when `used` exceeds the capacity — the module corrupted the
    /// view.
    pub fn sync_from_raw(&mut self, raw: &RawCommandBuffer) {
        assert!(
            raw.used <= self.storage.len(),
            "command buffer cursor out of bounds: {} > {}",
            raw.used,
            self.storage.len(),
        );
        self.used = raw.used;
    }

    /// Decoded commands in recording order.
    pub fn iter(&self) -> CommandCursor<'_> {
        CommandCursor::new(&self.storage[..self.used])
    }

    /// Dispatches every recorded command, in order, to `sink`.
    pub fn replay(&self, sink: &mut dyn DrawSink) {
        super::replay::replay(&self.storage[..self.used], sink);
    }
}

#[cfg(test)]
mod tests {
    use super::super::replay::tests::RecordingSink;
    use super::super::{RenderCommand, TextureId};
    use super::*;
    use crate::color::Color;

    #[test]
    fn reset_then_record_then_replay() {
        let mut buf = RenderCommandBuffer::new(4096, 320, 180);

        let mut rec = buf.recorder();
        rec.push_clear(Color::rgba(0x1A, 0x1A, 0x1A, 0xFF));
        rec.push_rect(10.0, 10.0, 5.0, 5.0, Color::BLUE);
        assert!(!buf.is_empty());

        let mut sink = RecordingSink::default();
        buf.replay(&mut sink);
        assert_eq!(sink.calls.len(), 2);
        assert!(
            matches!(sink.calls[0], RenderCommand::Clear(c) if c.color == Color::rgba(0x1A, 0x1A, 0x1A, 0xFF))
        );
        assert!(
            matches!(sink.calls[1], RenderCommand::Rect(c) if (c.x, c.y, c.w, c.h) == (10.0, 10.0, 5.0, 5.0))
        );

        buf.reset();
        assert!(buf.is_empty());
        let mut sink = RecordingSink::default();
        buf.replay(&mut sink);
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn raw_round_trip_adopts_cursor() {
        let mut buf = RenderCommandBuffer::new(4096, 320, 180);

        let mut raw = buf.as_raw();
        assert_eq!(raw.width, 320);
        assert_eq!(raw.used, 0);

        // What the game module does on its side of the boundary.
        let mut rec = unsafe { CommandRecorder::from_raw(&mut raw) };
        rec.push_sprite(1.0, 2.0, 3.0, 4.0, TextureId(2), Color::WHITE);
        buf.sync_from_raw(&raw);

        let cmds: Vec<_> = buf.iter().collect();
        assert_eq!(cmds.len(), 1);
        assert!(matches!(cmds[0], RenderCommand::Sprite(c) if c.texture == TextureId(2)));
    }

    #[test]
    #[should_panic(expected = "command buffer cursor out of bounds")]
    fn corrupt_cursor_panics() {
        let mut buf = RenderCommandBuffer::new(64, 320, 180);
        let mut raw = buf.as_raw();
        raw.used = 65;
        buf.sync_from_raw(&raw);
    }
}
