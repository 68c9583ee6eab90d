use tiamat_shared::commands::TextureId;

/// Fixed-capacity table of GPU images addressable by [`TextureId`].
///
/// Entry 0 is a 1x1 opaque white texture, so untextured rectangles draw
/// through the same textured path as sprites. `load` hands out sequential
/// ids and returns the white sentinel instead of failing when the table is
/// full or the input is malformed — texture exhaustion must not crash the
/// frame loop.
pub struct TextureTable {
    entries: Vec<TextureEntry>,
    capacity: usize,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

struct TextureEntry {
    // Kept alive for the bind group; never read back.
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

impl TextureTable {
    /// `capacity` includes the reserved white entry.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, capacity: usize) -> Self {
        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("tiamat texture bgl"),
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

        // Nearest filtering: the virtual framebuffer is pixel art scaled up.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tiamat sprite sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let mut table = Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
            bind_group_layout,
            sampler,
        };
        let white = table.create_entry(device, queue, &[255, 255, 255, 255], 1, 1, 4);
        table.entries.push(white);
        table
    }

    /// Layout shared by every entry's bind group (group 1 of the sprite
    /// pipeline).
    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    /// Number of live entries, the reserved white one included.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false // entry 0 always exists
    }

    /// True when `id` was handed out by this table.
    #[inline]
    pub fn contains(&self, id: TextureId) -> bool {
        (id.0 as usize) < self.entries.len()
    }

    /// Uploads `pixels` and returns a new sequential id.
    ///
    /// `channels` 4 means RGBA8; 1 means a single-channel image. Returns
    /// [`TextureId::WHITE`] when the table is full, the channel count is
    /// unsupported, or `pixels` does not match `width * height * channels`.
    pub fn load(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pixels: &[u8],
        width: u32,
        height: u32,
        channels: u32,
    ) -> TextureId {
        if self.entries.len() >= self.capacity {
            log::warn!("texture table full ({} entries); load rejected", self.capacity);
            return TextureId::WHITE;
        }
        if channels != 1 && channels != 4 {
            log::warn!("unsupported texture channel count {channels}; load rejected");
            return TextureId::WHITE;
        }
        if width == 0 || height == 0 || pixels.len() != (width * height * channels) as usize {
            log::warn!("texture data does not match {width}x{height}x{channels}; load rejected");
            return TextureId::WHITE;
        }

        let entry = self.create_entry(device, queue, pixels, width, height, channels);
        let id = TextureId(self.entries.len() as u32);
        self.entries.push(entry);
        id
    }

    /// Bind group for `id`. Falls back to the white entry for ids this table
    /// never handed out; [`Renderer`](super::Renderer) warns about those at
    /// draw time.
    pub fn bind_group(&self, id: TextureId) -> &wgpu::BindGroup {
        let idx = id.0 as usize;
        let entry = self.entries.get(idx).unwrap_or(&self.entries[0]);
        &entry.bind_group
    }

    fn create_entry(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pixels: &[u8],
        width: u32,
        height: u32,
        channels: u32,
    ) -> TextureEntry {
        let format = if channels == 4 {
            wgpu::TextureFormat::Rgba8Unorm
        } else {
            wgpu::TextureFormat::R8Unorm
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tiamat sprite texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * channels),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tiamat sprite bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        TextureEntry {
            _texture: texture,
            bind_group,
        }
    }
}
