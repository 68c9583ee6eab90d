//! Hot-reloadable game logic.
//!
//! Compiled as a `cdylib` and loaded by the host at runtime. All state lives
//! in the host-owned permanent region, so a reload picks up new code without
//! losing the world. Everything crossing the boundary goes through
//! `tiamat-shared`, and panics are caught before they can unwind into the
//! host.
//!
//! The demo: a steerable bouncing square over a field of drifting atlas
//! sprites. WASD/arrows push the square, Space cycles its color, a left
//! click rescatters the drifters.

use std::panic;

use bytemuck::{Pod, Zeroable};

use tiamat_shared::abi::{ABI_VERSION, GameMemory};
use tiamat_shared::color::Color;
use tiamat_shared::commands::{CommandRecorder, RawCommandBuffer, TextureId};
use tiamat_shared::input::GameInput;
use tiamat_shared::memory::Arena;

const PLAYER_SIZE: f32 = 16.0;
const PLAYER_IMPULSE: f32 = 50.0;
const PLAYER_COLORS: [Color; 3] = [Color::BLUE, Color::GREEN, Color::RED];

const DRIFTER_COUNT: usize = 64;
const DRIFTER_SIZE: f32 = 8.0;
const DRIFTER_SPEED: f32 = 24.0;

/// The host loads the sprite atlas first, so it lands on the id right after
/// the reserved white texture.
const ATLAS_TEXTURE: TextureId = TextureId(1);

const CLEAR_COLOR: Color = Color::rgb(0x1A, 0x1A, 0x1A);

// ── persistent state ───────────────────────────────────────────────────────

/// Game state, stored at the head of the permanent region.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct GameState {
    player_x: f32,
    player_y: f32,
    player_vx: f32,
    player_vy: f32,
    player_color: u32,
    rng: u32,
}

/// One drifting atlas sprite.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct Drifter {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    /// Which quadrant of the 2x2 atlas.
    variant: u32,
}

/// Reads a copy of the state header at the head of the permanent region.
fn read_state(permanent: &[u8]) -> GameState {
    *bytemuck::from_bytes(&permanent[..std::mem::size_of::<GameState>()])
}

// ── exported entry points ──────────────────────────────────────────────────

/// Required host entry point. One call per frame.
///
/// # Safety
/// The host passes exclusive, live pointers for the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn game_update_and_render(
    memory: *mut GameMemory,
    input: *const GameInput,
    commands: *mut RawCommandBuffer,
) {
    if memory.is_null() || input.is_null() || commands.is_null() {
        return;
    }

    // A panic must not unwind across the C boundary; a caught one turns the
    // frame into a partial no-op instead.
    let _ = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        let memory = unsafe { &mut *memory };
        let input = unsafe { &*input };
        let commands = unsafe { &mut *commands };

        let permanent =
            unsafe { std::slice::from_raw_parts_mut(memory.permanent_ptr, memory.permanent_len) };
        let mut recorder = unsafe { CommandRecorder::from_raw(commands) };

        let first_call = memory.is_initialized == 0;
        run_frame(permanent, first_call, input, &mut recorder);
        memory.is_initialized = 1;
    }));
}

/// Optional version query; the host logs it on load.
#[unsafe(no_mangle)]
pub extern "C" fn game_abi_version() -> u32 {
    ABI_VERSION
}

// ── per-frame logic ────────────────────────────────────────────────────────

fn run_frame(
    permanent: &mut [u8],
    first_call: bool,
    input: &GameInput,
    rec: &mut CommandRecorder<'_>,
) {
    let width = rec.width() as f32;
    let height = rec.height() as f32;

    // The permanent region is carved the same way every frame: state header
    // first, then a sub-arena holding the drifter pool. Deterministic offsets
    // are what let the data survive frames and module reloads alike.
    let (header, rest) = permanent.split_at_mut(std::mem::size_of::<GameState>());
    let state: &mut GameState = bytemuck::from_bytes_mut(header);
    let mut pool = Arena::new(rest);
    let drifters: &mut [Drifter] = pool.alloc_array(DRIFTER_COUNT);

    if first_call {
        *state = GameState {
            player_x: (width - PLAYER_SIZE) * 0.5,
            player_y: (height - PLAYER_SIZE) * 0.5,
            player_vx: 70.0,
            player_vy: 45.0,
            player_color: 0,
            rng: 0x2F6E_2B1D,
        };
        scatter_drifters(&mut state.rng, drifters, width, height);
    }

    let dt = input.dt;

    if input.action.pressed() {
        state.player_color = (state.player_color + 1) % PLAYER_COLORS.len() as u32;
    }

    if input.mouse_buttons[0].pressed() {
        scatter_drifters(&mut state.rng, drifters, width, height);
    }

    // Steering adds impulse; the square keeps its momentum.
    if input.move_up.is_down() {
        state.player_vy -= PLAYER_IMPULSE * dt;
    }
    if input.move_down.is_down() {
        state.player_vy += PLAYER_IMPULSE * dt;
    }
    if input.move_left.is_down() {
        state.player_vx -= PLAYER_IMPULSE * dt;
    }
    if input.move_right.is_down() {
        state.player_vx += PLAYER_IMPULSE * dt;
    }

    state.player_x += state.player_vx * dt;
    state.player_y += state.player_vy * dt;

    if state.player_x < 0.0 {
        state.player_x = 0.0;
        state.player_vx = -state.player_vx;
    }
    if state.player_x + PLAYER_SIZE > width {
        state.player_x = width - PLAYER_SIZE;
        state.player_vx = -state.player_vx;
    }
    if state.player_y < 0.0 {
        state.player_y = 0.0;
        state.player_vy = -state.player_vy;
    }
    if state.player_y + PLAYER_SIZE > height {
        state.player_y = height - PLAYER_SIZE;
        state.player_vy = -state.player_vy;
    }

    for d in drifters.iter_mut() {
        d.x = wrap(d.x + d.vx * dt, -DRIFTER_SIZE, width);
        d.y = wrap(d.y + d.vy * dt, -DRIFTER_SIZE, height);
    }

    // Recording order is draw order: clear state, drifters, player on top.
    rec.push_clear(CLEAR_COLOR);
    for d in drifters.iter() {
        let (u0, v0, u1, v1) = atlas_uv(d.variant);
        rec.push_atlas_sprite(
            d.x,
            d.y,
            DRIFTER_SIZE,
            DRIFTER_SIZE,
            u0,
            v0,
            u1,
            v1,
            ATLAS_TEXTURE,
            Color::WHITE,
        );
    }
    rec.push_rect(
        state.player_x,
        state.player_y,
        PLAYER_SIZE,
        PLAYER_SIZE,
        PLAYER_COLORS[state.player_color as usize % PLAYER_COLORS.len()],
    );
}

fn scatter_drifters(rng: &mut u32, drifters: &mut [Drifter], width: f32, height: f32) {
    for d in drifters.iter_mut() {
        *d = Drifter {
            x: rand_unit(rng) * width,
            y: rand_unit(rng) * height,
            vx: (rand_unit(rng) * 2.0 - 1.0) * DRIFTER_SPEED,
            vy: (rand_unit(rng) * 2.0 - 1.0) * DRIFTER_SPEED,
            variant: xorshift(rng) & 3,
        };
    }
}

/// UV rectangle of one quadrant in the 2x2 atlas.
fn atlas_uv(variant: u32) -> (f32, f32, f32, f32) {
    let col = (variant & 1) as f32;
    let row = ((variant >> 1) & 1) as f32;
    (col * 0.5, row * 0.5, col * 0.5 + 0.5, row * 0.5 + 0.5)
}

/// Clamps `value` into `[min, max]` by teleporting across the opposite edge.
fn wrap(value: f32, min: f32, max: f32) -> f32 {
    if value > max {
        min
    } else if value < min {
        max
    } else {
        value
    }
}

fn xorshift(rng: &mut u32) -> u32 {
    let mut x = *rng;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *rng = x;
    x
}

/// Uniform float in `[0, 1)`.
fn rand_unit(rng: &mut u32) -> f32 {
    (xorshift(rng) >> 8) as f32 / 16_777_216.0
}

#[cfg(test)]
mod tests {
    use super::*;

    use tiamat_shared::commands::{CommandCursor, RenderCommand};

    const W: u32 = 320;
    const H: u32 = 180;

    struct Harness {
        // u64 backing keeps the region aligned for the state header.
        permanent: Vec<u64>,
        initialized: bool,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                permanent: vec![0u64; 8192],
                initialized: false,
            }
        }

        fn frame(&mut self, input: &GameInput) -> Vec<RenderCommand> {
            let permanent: &mut [u8] = bytemuck::cast_slice_mut(&mut self.permanent);
            let mut buf = vec![0u8; 64 * 1024];
            let mut raw = RawCommandBuffer {
                base: buf.as_mut_ptr(),
                capacity: buf.len(),
                used: 0,
                width: W,
                height: H,
            };

            {
                let mut rec = unsafe { CommandRecorder::from_raw(&mut raw) };
                run_frame(permanent, !self.initialized, input, &mut rec);
            }
            self.initialized = true;

            CommandCursor::new(&buf[..raw.used]).collect()
        }

        fn state(&self) -> GameState {
            read_state(bytemuck::cast_slice(&self.permanent))
        }
    }

    fn input_with_dt(dt: f32) -> GameInput {
        GameInput {
            dt,
            ..GameInput::default()
        }
    }

    #[test]
    fn first_frame_initializes_and_records_the_scene() {
        let mut h = Harness::new();
        let cmds = h.frame(&input_with_dt(0.0));

        // Clear first, one sprite per drifter, player rect on top.
        assert_eq!(cmds.len(), 2 + DRIFTER_COUNT);
        assert!(matches!(cmds[0], RenderCommand::Clear(c) if c.color == CLEAR_COLOR));
        assert!(
            cmds[1..=DRIFTER_COUNT]
                .iter()
                .all(|c| matches!(c, RenderCommand::AtlasSprite(s) if s.texture == ATLAS_TEXTURE))
        );
        assert!(
            matches!(cmds[cmds.len() - 1], RenderCommand::Rect(r) if r.color == PLAYER_COLORS[0])
        );
    }

    #[test]
    fn player_moves_by_velocity_times_dt() {
        let mut h = Harness::new();
        h.frame(&input_with_dt(0.0));
        let before = h.state();

        h.frame(&input_with_dt(0.5));
        let after = h.state();

        assert_eq!(after.player_x, before.player_x + before.player_vx * 0.5);
        assert_eq!(after.player_y, before.player_y + before.player_vy * 0.5);
    }

    #[test]
    fn player_bounces_off_the_right_wall() {
        let mut h = Harness::new();
        h.frame(&input_with_dt(0.0));

        // Run long enough to cross the right edge.
        for _ in 0..20 {
            h.frame(&input_with_dt(0.25));
        }
        let s = h.state();
        assert!(s.player_x >= 0.0);
        assert!(s.player_x + PLAYER_SIZE <= W as f32);
    }

    #[test]
    fn action_press_cycles_the_player_color() {
        let mut h = Harness::new();
        h.frame(&input_with_dt(0.0));
        assert_eq!(h.state().player_color, 0);

        let mut input = input_with_dt(0.016);
        input.action.process(true);
        h.frame(&input);
        assert_eq!(h.state().player_color, 1);

        // Held without a new edge: no further cycling.
        input.clear_transitions();
        h.frame(&input);
        assert_eq!(h.state().player_color, 1);
    }

    #[test]
    fn left_click_rescatters_the_drifters() {
        let mut h = Harness::new();
        h.frame(&input_with_dt(0.0));
        let rng_before = h.state().rng;

        let mut input = input_with_dt(0.0);
        input.mouse_buttons[0].process(true);
        h.frame(&input);

        // A rescatter burns RNG state.
        assert_ne!(h.state().rng, rng_before);
    }

    #[test]
    fn state_survives_across_frames() {
        let mut h = Harness::new();
        h.frame(&input_with_dt(0.0));
        let first = h.state();

        h.frame(&input_with_dt(0.016));
        let second = h.state();

        // Same velocities, advanced position: the region persisted.
        assert_eq!(first.player_vx, second.player_vx);
        assert_ne!(first.player_x, second.player_x);
    }

    #[test]
    fn atlas_uv_covers_the_four_quadrants() {
        assert_eq!(atlas_uv(0), (0.0, 0.0, 0.5, 0.5));
        assert_eq!(atlas_uv(1), (0.5, 0.0, 1.0, 0.5));
        assert_eq!(atlas_uv(2), (0.0, 0.5, 0.5, 1.0));
        assert_eq!(atlas_uv(3), (0.5, 0.5, 1.0, 1.0));
    }
}
