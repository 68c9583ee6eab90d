use tiamat_shared::color::Color;
use tiamat_shared::commands::TextureId;

use super::vertex::SpriteVertex;

/// One renderer flush: a contiguous run of quads sharing a texture, drawn
/// with a single indexed draw call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct QuadBatch {
    pub texture: TextureId,
    /// First quad of the run, indexing into the frame's vertex list at
    /// `first_quad * 4`.
    pub first_quad: u32,
    pub quad_count: u32,
}

/// CPU-side quad batcher.
///
/// Draw calls append four vertices per quad behind a staging watermark. A
/// flush closes the open run into a [`QuadBatch`], and happens only when the
/// staging region would overflow or the requested texture differs from the
/// currently bound one — so consecutive same-texture quads always share one
/// GPU draw call.
///
/// Vertex corners are emitted clockwise from the top-left:
/// `(x,y) (x+w,y) (x+w,y+h) (x,y+h)`, matching the shared quad index pattern
/// `0,1,2, 0,2,3`.
pub struct QuadBatcher {
    vertices: Vec<SpriteVertex>,
    batches: Vec<QuadBatch>,
    /// First quad of the open (unflushed) run.
    batch_start: u32,
    current_texture: TextureId,
    max_vertices: u32,
}

impl QuadBatcher {
    /// `max_quads` bounds one flush, not the frame: a full staging region
    /// flushes and keeps going.
    pub fn new(max_quads: u32) -> Self {
        Self {
            vertices: Vec::new(),
            batches: Vec::new(),
            batch_start: 0,
            current_texture: TextureId::WHITE,
            max_vertices: max_quads * 4,
        }
    }

    /// Starts a new frame: drops last frame's geometry and rebinds the white
    /// texture.
    pub fn begin(&mut self) {
        self.vertices.clear();
        self.batches.clear();
        self.batch_start = 0;
        self.current_texture = TextureId::WHITE;
    }

    /// Total vertices recorded this frame, flushed or staged.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Vertices staged since the last flush.
    #[inline]
    fn staged(&self) -> u32 {
        self.vertices.len() as u32 - self.batch_start * 4
    }

    /// Closes the open run, if it holds any quads.
    pub fn flush(&mut self) {
        let staged = self.staged();
        if staged == 0 {
            return;
        }
        self.batches.push(QuadBatch {
            texture: self.current_texture,
            first_quad: self.batch_start,
            quad_count: staged / 4,
        });
        self.batch_start = self.vertices.len() as u32 / 4;
    }

    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.push_quad(TextureId::WHITE, x, y, w, h, [0.0, 0.0, 1.0, 1.0], color);
    }

    pub fn sprite(&mut self, x: f32, y: f32, w: f32, h: f32, texture: TextureId, tint: Color) {
        self.push_quad(texture, x, y, w, h, [0.0, 0.0, 1.0, 1.0], tint);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn atlas_sprite(
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
        self.push_quad(texture, x, y, w, h, [u0, v0, u1, v1], tint);
    }

    fn push_quad(&mut self, texture: TextureId, x: f32, y: f32, w: f32, h: f32, uv: [f32; 4], color: Color) {
        if self.staged() + 4 > self.max_vertices {
            self.flush();
        }
        if texture != self.current_texture {
            self.flush();
            self.current_texture = texture;
        }

        let [u0, v0, u1, v1] = uv;
        let c = color.to_linear();
        self.vertices.push(SpriteVertex { pos: [x, y], uv: [u0, v0], color: c });
        self.vertices.push(SpriteVertex { pos: [x + w, y], uv: [u1, v0], color: c });
        self.vertices.push(SpriteVertex { pos: [x + w, y + h], uv: [u1, v1], color: c });
        self.vertices.push(SpriteVertex { pos: [x, y + h], uv: [u0, v1], color: c });
    }

    /// Ends the frame: flushes the tail and exposes the recorded geometry.
    pub fn finish(&mut self) -> (&[SpriteVertex], &[QuadBatch]) {
        self.flush();
        (&self.vertices, &self.batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batcher(max_quads: u32) -> QuadBatcher {
        let mut b = QuadBatcher::new(max_quads);
        b.begin();
        b
    }

    // ── batching ──────────────────────────────────────────────────────────

    #[test]
    fn same_texture_quads_share_one_batch() {
        let mut b = batcher(16);
        for i in 0..10 {
            b.sprite(i as f32, 0.0, 1.0, 1.0, TextureId(3), Color::WHITE);
        }
        let (vertices, batches) = b.finish();
        assert_eq!(vertices.len(), 40);
        assert_eq!(
            batches,
            &[QuadBatch { texture: TextureId(3), first_quad: 0, quad_count: 10 }],
        );
    }

    #[test]
    fn texture_change_forces_a_flush() {
        let mut b = batcher(16);
        b.sprite(0.0, 0.0, 1.0, 1.0, TextureId(1), Color::WHITE);
        b.sprite(1.0, 0.0, 1.0, 1.0, TextureId(1), Color::WHITE);
        b.sprite(2.0, 0.0, 1.0, 1.0, TextureId(2), Color::WHITE);
        b.sprite(3.0, 0.0, 1.0, 1.0, TextureId(1), Color::WHITE);

        let (_, batches) = b.finish();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0], QuadBatch { texture: TextureId(1), first_quad: 0, quad_count: 2 });
        assert_eq!(batches[1], QuadBatch { texture: TextureId(2), first_quad: 2, quad_count: 1 });
        assert_eq!(batches[2], QuadBatch { texture: TextureId(1), first_quad: 3, quad_count: 1 });
    }

    #[test]
    fn rects_and_sprites_batch_through_the_white_texture() {
        let mut b = batcher(16);
        b.rect(0.0, 0.0, 1.0, 1.0, Color::RED);
        b.sprite(1.0, 0.0, 1.0, 1.0, TextureId::WHITE, Color::WHITE);
        b.rect(2.0, 0.0, 1.0, 1.0, Color::GREEN);

        let (_, batches) = b.finish();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].quad_count, 3);
    }

    #[test]
    fn full_staging_region_flushes_and_continues() {
        let mut b = batcher(2);
        for i in 0..5 {
            b.rect(i as f32, 0.0, 1.0, 1.0, Color::WHITE);
        }
        let (vertices, batches) = b.finish();
        assert_eq!(vertices.len(), 20);
        assert_eq!(
            batches
                .iter()
                .map(|batch| batch.quad_count)
                .collect::<Vec<_>>(),
            vec![2, 2, 1],
        );
        // Runs stay contiguous across capacity flushes.
        assert_eq!(
            batches
                .iter()
                .map(|batch| batch.first_quad)
                .collect::<Vec<_>>(),
            vec![0, 2, 4],
        );
    }

    #[test]
    fn empty_frame_yields_nothing() {
        let mut b = batcher(4);
        let (vertices, batches) = b.finish();
        assert!(vertices.is_empty());
        assert!(batches.is_empty());
    }

    #[test]
    fn begin_resets_the_frame() {
        let mut b = batcher(4);
        b.sprite(0.0, 0.0, 1.0, 1.0, TextureId(5), Color::WHITE);
        b.begin();
        b.rect(0.0, 0.0, 1.0, 1.0, Color::WHITE);
        let (_, batches) = b.finish();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].texture, TextureId::WHITE);
    }

    // ── vertex lowering ───────────────────────────────────────────────────

    #[test]
    fn rect_lowers_to_pixel_corner_quad() {
        let mut b = batcher(4);
        b.rect(10.0, 10.0, 5.0, 5.0, Color::BLUE);
        let (vertices, _) = b.finish();

        let corners: Vec<[f32; 2]> = vertices.iter().map(|v| v.pos).collect();
        assert_eq!(
            corners,
            vec![[10.0, 10.0], [15.0, 10.0], [15.0, 15.0], [10.0, 15.0]],
        );
        let blue = Color::BLUE.to_linear();
        assert!(vertices.iter().all(|v| v.color == blue));
    }

    #[test]
    fn atlas_sprite_carries_its_uv_region() {
        let mut b = batcher(4);
        b.atlas_sprite(0.0, 0.0, 8.0, 8.0, 0.5, 0.0, 1.0, 0.5, TextureId(1), Color::WHITE);
        let (vertices, _) = b.finish();

        let uvs: Vec<[f32; 2]> = vertices.iter().map(|v| v.uv).collect();
        assert_eq!(uvs, vec![[0.5, 0.0], [1.0, 0.0], [1.0, 0.5], [0.5, 0.5]]);
    }
}
