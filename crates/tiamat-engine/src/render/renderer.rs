use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use tiamat_shared::color::Color;
use tiamat_shared::commands::{DrawSink, TextureId};

use super::batch::QuadBatcher;
use super::ctx::{RenderCtx, RenderTarget};
use super::letterbox::fit_virtual_to_window;
use super::textures::TextureTable;
use super::vertex::{BlitVertex, SpriteVertex};

/// Renderer limits and virtual-framebuffer size.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Virtual framebuffer size in game pixels.
    pub virtual_width: u32,
    pub virtual_height: u32,
    /// Staging capacity in quads; one flush never exceeds this.
    pub max_quads: u32,
    /// Texture table capacity, the reserved white entry included.
    pub max_textures: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            virtual_width: 320,
            virtual_height: 180,
            max_quads: 10_000,
            max_textures: 256,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ResolutionUniform {
    resolution: [f32; 2],
    _pad: [f32; 2], // 16-byte UBO alignment
}

/// Immediate-mode sprite renderer.
///
/// Per-frame protocol:
/// - [`begin_frame`] resets the batcher and records the window size
/// - [`DrawSink`] calls accumulate quads, batched per texture
/// - [`end_frame`] uploads the frame's vertices once, encodes the offscreen
///   pass into the virtual framebuffer (cleared with the sticky clear color,
///   one indexed draw call per batch), then blits the framebuffer onto the
///   window with aspect-preserving bars
///
/// `clear` applies to the current frame: the offscreen pass is encoded at
/// end-frame, after replay, so a `Clear` recorded anywhere in the stream sets
/// that frame's clear color. The color then sticks until overwritten.
///
/// Coordinate convention, held through the whole pipeline: virtual pixels
/// with the origin at the top-left and Y growing downward; the vertex shader
/// flips Y into NDC.
///
/// [`begin_frame`]: Self::begin_frame
/// [`end_frame`]: Self::end_frame
pub struct Renderer {
    config: RendererConfig,
    batcher: QuadBatcher,
    textures: TextureTable,

    clear_color: Color,
    window_width: u32,
    window_height: u32,
    warned_unknown_texture: bool,

    sprite_pipeline: wgpu::RenderPipeline,
    resolution_ubo: wgpu::Buffer,
    resolution_bind_group: wgpu::BindGroup,
    index_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    vertex_capacity: usize,

    offscreen_view: wgpu::TextureView,
    blit_pipeline: wgpu::RenderPipeline,
    blit_bind_group: wgpu::BindGroup,
    blit_vbo: wgpu::Buffer,
}

impl Renderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        config: RendererConfig,
    ) -> Self {
        // The quad index buffer is u16; the largest index is 4 * max_quads - 1.
        assert!(
            config.max_quads >= 1 && config.max_quads * 4 <= u16::MAX as u32 + 1,
            "max_quads must be in 1..=16384",
        );

        let textures = TextureTable::new(device, queue, config.max_textures);

        // ── resolution uniform ────────────────────────────────────────────
        let resolution_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tiamat resolution ubo"),
            size: std::mem::size_of::<ResolutionUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let resolution_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tiamat resolution bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: Some(resolution_ubo_min_binding_size()),
                },
                count: None,
            }],
        });

        let resolution_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tiamat resolution bind group"),
            layout: &resolution_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: resolution_ubo.as_entire_binding(),
            }],
        });

        // ── sprite pipeline ───────────────────────────────────────────────
        let sprite_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tiamat sprite shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sprite.wgsl").into()),
        });

        let sprite_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tiamat sprite pipeline layout"),
            bind_group_layouts: &[&resolution_bgl, textures.layout()],
            immediate_size: 0,
        });

        // The offscreen target is linear RGBA8; sRGB conversion happens once
        // at the blit into the surface format.
        let offscreen_format = wgpu::TextureFormat::Rgba8Unorm;

        let sprite_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("tiamat sprite pipeline"),
            layout: Some(&sprite_layout),

            vertex: wgpu::VertexState {
                module: &sprite_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[SpriteVertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &sprite_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: offscreen_format,
                    blend: Some(straight_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        // ── geometry buffers ──────────────────────────────────────────────
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tiamat quad ibo"),
            contents: bytemuck::cast_slice(&quad_indices(config.max_quads)),
            usage: wgpu::BufferUsages::INDEX,
        });

        let vertex_capacity = (config.max_quads as usize) * 4;
        let vertex_buffer = create_vertex_buffer(device, vertex_capacity);

        // ── offscreen target ──────────────────────────────────────────────
        let offscreen = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tiamat virtual framebuffer"),
            size: wgpu::Extent3d {
                width: config.virtual_width.max(1),
                height: config.virtual_height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: offscreen_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let offscreen_view = offscreen.create_view(&wgpu::TextureViewDescriptor::default());

        // ── blit pipeline ─────────────────────────────────────────────────
        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tiamat blit shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
        });

        let blit_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tiamat blit bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        // Nearest sampling keeps virtual pixels crisp at any window size.
        let blit_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tiamat blit sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let blit_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tiamat blit bind group"),
            layout: &blit_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&offscreen_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&blit_sampler),
                },
            ],
        });

        let blit_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tiamat blit pipeline layout"),
            bind_group_layouts: &[&blit_bgl],
            immediate_size: 0,
        });

        let blit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("tiamat blit pipeline"),
            layout: Some(&blit_layout),

            vertex: wgpu::VertexState {
                module: &blit_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[BlitVertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &blit_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let blit_vbo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tiamat blit vbo"),
            size: (4 * std::mem::size_of::<BlitVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            batcher: QuadBatcher::new(config.max_quads),
            textures,
            clear_color: Color::BLACK,
            window_width: 0,
            window_height: 0,
            warned_unknown_texture: false,
            sprite_pipeline,
            resolution_ubo,
            resolution_bind_group,
            index_buffer,
            vertex_buffer,
            vertex_capacity,
            offscreen_view,
            blit_pipeline,
            blit_bind_group,
            blit_vbo,
            config,
        }
    }

    /// Starts a frame: resets the staging state and rebinds the white
    /// texture. `window_width`/`window_height` are the drawable size in
    /// physical pixels, used for the end-of-frame letterbox fit.
    pub fn begin_frame(&mut self, window_width: u32, window_height: u32) {
        self.window_width = window_width;
        self.window_height = window_height;
        self.batcher.begin();
    }

    /// Uploads `pixels` as a new texture; see [`TextureTable::load`].
    pub fn load_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pixels: &[u8],
        width: u32,
        height: u32,
        channels: u32,
    ) -> TextureId {
        self.textures.load(device, queue, pixels, width, height, channels)
    }

    /// Ends the frame: encodes the offscreen pass and the letterbox blit.
    /// The caller submits the encoder afterwards.
    pub fn end_frame(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) {
        // Uploads must be sized before finish() pins the geometry borrow.
        let vertex_count = self.batcher.vertex_count();
        if vertex_count > self.vertex_capacity {
            self.vertex_capacity = vertex_count.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(ctx.device, self.vertex_capacity);
        }

        let uniform = ResolutionUniform {
            resolution: [
                self.config.virtual_width.max(1) as f32,
                self.config.virtual_height.max(1) as f32,
            ],
            _pad: [0.0; 2],
        };
        ctx.queue.write_buffer(&self.resolution_ubo, 0, bytemuck::bytes_of(&uniform));

        let (vertices, batches) = self.batcher.finish();
        if !vertices.is_empty() {
            ctx.queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(vertices));
        }

        // ── offscreen pass: batched quads into the virtual framebuffer ────
        {
            let clear = self.clear_color.to_linear();
            let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tiamat offscreen pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.offscreen_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear[0] as f64,
                            g: clear[1] as f64,
                            b: clear[2] as f64,
                            a: clear[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if !batches.is_empty() {
                rpass.set_pipeline(&self.sprite_pipeline);
                rpass.set_bind_group(0, &self.resolution_bind_group, &[]);
                rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                rpass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);

                for batch in batches {
                    rpass.set_bind_group(1, self.textures.bind_group(batch.texture), &[]);
                    // Indices carry the in-batch quad pattern; base_vertex
                    // positions the batch inside the frame's vertex list.
                    rpass.draw_indexed(
                        0..batch.quad_count * 6,
                        (batch.first_quad * 4) as i32,
                        0..1,
                    );
                }
            }
        }

        // ── blit pass: virtual framebuffer onto the window ────────────────
        let (quad_w, quad_h) = fit_virtual_to_window(
            self.config.virtual_width,
            self.config.virtual_height,
            self.window_width,
            self.window_height,
        );

        let quad = [
            BlitVertex { pos: [-quad_w, quad_h], uv: [0.0, 0.0] },
            BlitVertex { pos: [quad_w, quad_h], uv: [1.0, 0.0] },
            BlitVertex { pos: [quad_w, -quad_h], uv: [1.0, 1.0] },
            BlitVertex { pos: [-quad_w, -quad_h], uv: [0.0, 1.0] },
        ];
        ctx.queue.write_buffer(&self.blit_vbo, 0, bytemuck::cast_slice(&quad));

        {
            let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tiamat blit pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        // The bars are whatever this clear leaves behind.
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_pipeline(&self.blit_pipeline);
            rpass.set_bind_group(0, &self.blit_bind_group, &[]);
            rpass.set_vertex_buffer(0, self.blit_vbo.slice(..));
            rpass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            rpass.draw_indexed(0..6, 0, 0..1);
        }
    }

    /// Substitutes white for ids the texture table never handed out, with a
    /// one-time diagnostic. A stale id is stale module data, not a protocol
    /// violation.
    fn resolve_texture(&mut self, id: TextureId) -> TextureId {
        if self.textures.contains(id) {
            return id;
        }
        if !self.warned_unknown_texture {
            log::warn!("draw references unknown texture id {}; using white", id.0);
            self.warned_unknown_texture = true;
        }
        TextureId::WHITE
    }
}

impl DrawSink for Renderer {
    fn clear(&mut self, color: Color) {
        self.clear_color = color;
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.batcher.rect(x, y, w, h, color);
    }

    fn sprite(&mut self, x: f32, y: f32, w: f32, h: f32, texture: TextureId, tint: Color) {
        let texture = self.resolve_texture(texture);
        self.batcher.sprite(x, y, w, h, texture, tint);
    }

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
    ) {
        let texture = self.resolve_texture(texture);
        self.batcher.atlas_sprite(x, y, w, h, u0, v0, u1, v1, texture, tint);
    }
}

fn straight_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

/// `0,1,2, 0,2,3` per quad. With `max_quads` capped at 10k the largest index
/// (4 * max_quads - 1) stays within `u16`.
fn quad_indices(max_quads: u32) -> Vec<u16> {
    let mut indices = Vec::with_capacity(max_quads as usize * 6);
    for quad in 0..max_quads {
        let base = (quad * 4) as u16;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    indices
}

fn create_vertex_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("tiamat sprite vbo"),
        size: (capacity * std::mem::size_of::<SpriteVertex>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// `ResolutionUniform` is 16 bytes by construction, so the size is non-zero.
fn resolution_ubo_min_binding_size() -> std::num::NonZeroU64 {
    std::num::NonZeroU64::new(std::mem::size_of::<ResolutionUniform>() as u64)
        .expect("ResolutionUniform has non-zero size by construction")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_indices_follow_the_shared_pattern() {
        let indices = quad_indices(3);
        assert_eq!(indices.len(), 18);
        assert_eq!(&indices[0..6], &[0, 1, 2, 0, 2, 3]);
        assert_eq!(&indices[6..12], &[4, 5, 6, 4, 6, 7]);
        assert_eq!(&indices[12..18], &[8, 9, 10, 8, 10, 11]);
    }

    #[test]
    fn max_quads_fits_u16_indices() {
        let config = RendererConfig::default();
        let largest = config.max_quads * 4 - 1;
        assert!(largest <= u16::MAX as u32);
    }
}
