//! Sprite atlas for the game module.
//!
//! Tries `assets/atlas.png` first; any failure falls back to a generated 2x2
//! placeholder, so texture id 1 is always populated and a missing or broken
//! asset never stops the host.

use tiamat_engine::render::Renderer;
use tiamat_shared::commands::TextureId;

const ATLAS_PATH: &str = "assets/atlas.png";

/// Fallback tile size in pixels; the atlas is a 2x2 grid of tiles.
const TILE: u32 = 16;

pub fn load_atlas(renderer: &mut Renderer, device: &wgpu::Device, queue: &wgpu::Queue) -> TextureId {
    match image::open(ATLAS_PATH) {
        Ok(img) => {
            let rgba = img.to_rgba8();
            let (width, height) = rgba.dimensions();
            let id = renderer.load_texture(device, queue, rgba.as_raw(), width, height, 4);
            if id == TextureId::WHITE {
                log::warn!("atlas upload rejected; using the generated atlas");
                generated_atlas(renderer, device, queue)
            } else {
                log::info!("loaded sprite atlas {ATLAS_PATH} ({width}x{height})");
                id
            }
        }
        Err(err) => {
            log::warn!("could not open {ATLAS_PATH} ({err}); using the generated atlas");
            generated_atlas(renderer, device, queue)
        }
    }
}

/// Four solid tiles with darkened borders, one per atlas quadrant.
fn generated_atlas(
    renderer: &mut Renderer,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> TextureId {
    let size = TILE * 2;
    let mut pixels = vec![0u8; (size * size * 4) as usize];

    for y in 0..size {
        for x in 0..size {
            let tile = (y / TILE) * 2 + x / TILE;
            let base: [u8; 4] = match tile {
                0 => [232, 93, 76, 255],
                1 => [108, 198, 74, 255],
                2 => [85, 132, 238, 255],
                _ => [240, 206, 83, 255],
            };

            let on_border =
                x % TILE == 0 || y % TILE == 0 || x % TILE == TILE - 1 || y % TILE == TILE - 1;
            let color = if on_border {
                [base[0] / 2, base[1] / 2, base[2] / 2, 255]
            } else {
                base
            };

            let offset = ((y * size + x) * 4) as usize;
            pixels[offset..offset + 4].copy_from_slice(&color);
        }
    }

    renderer.load_texture(device, queue, &pixels, size, size, 4)
}
