use tiamat_engine::core::{App, AppControl, FrameCtx};
use tiamat_engine::input::apply_window_event;
use tiamat_engine::logic::{DylibLoader, HotReloader};
use tiamat_engine::render::{Renderer, RendererConfig};
use tiamat_shared::abi::MemoryBlock;
use tiamat_shared::commands::RenderCommandBuffer;
use tiamat_shared::input::GameInput;

use winit::event::WindowEvent;
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::atlas;

/// Long-lived region: game state plus the game-owned sub-arena.
const PERMANENT_BYTES: usize = 64 * 1024 * 1024;
/// Frame-scoped scratch, reserved for the module.
const TRANSIENT_BYTES: usize = 256 * 1024 * 1024;
/// Render-command arena. A few megabytes holds thousands of quads per frame;
/// overflowing it is fatal by design, so keep it roomy.
const COMMAND_BYTES: usize = 4 * 1024 * 1024;

/// The host application: owns everything the game module is not allowed to.
///
/// Per frame, in order: poll the reloader, reset the command arena, run the
/// module's update (which records commands), replay the commands into the
/// renderer, composite the virtual framebuffer onto the window, clear the
/// input transition counters.
pub struct HostApp {
    reloader: HotReloader<DylibLoader>,
    renderer_config: RendererConfig,
    /// Created on the first frame; the GPU device does not exist before.
    renderer: Option<Renderer>,
    memory: MemoryBlock,
    input: GameInput,
    commands: RenderCommandBuffer,
}

impl HostApp {
    pub fn new(reloader: HotReloader<DylibLoader>, renderer_config: RendererConfig) -> Self {
        let commands = RenderCommandBuffer::new(
            COMMAND_BYTES,
            renderer_config.virtual_width,
            renderer_config.virtual_height,
        );

        Self {
            reloader,
            renderer_config,
            renderer: None,
            memory: MemoryBlock::new(PERMANENT_BYTES, TRANSIENT_BYTES),
            input: GameInput::default(),
            commands,
        }
    }
}

impl App for HostApp {
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        if let WindowEvent::KeyboardInput { event, .. } = event
            && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
        {
            return AppControl::Exit;
        }

        apply_window_event(&mut self.input, event);
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        self.reloader.poll();

        self.input.dt = ctx.time.dt;
        self.commands.reset();

        let renderer_config = &self.renderer_config;
        let renderer = self.renderer.get_or_insert_with(|| {
            let mut renderer = Renderer::new(
                ctx.gpu.device(),
                ctx.gpu.queue(),
                ctx.gpu.surface_format(),
                renderer_config.clone(),
            );
            atlas::load_atlas(&mut renderer, ctx.gpu.device(), ctx.gpu.queue());
            renderer
        });

        // No module yet (or a reload in flight that never succeeded): the
        // frame records nothing and the window shows the bare clear color.
        self.reloader.update(&mut self.memory, &self.input, &mut self.commands);

        let (width, height) = ctx.window_size();
        let commands = &self.commands;
        let control = ctx.render(|rctx, target| {
            renderer.begin_frame(width, height);
            commands.replay(renderer);
            renderer.end_frame(rctx, target);
        });

        self.input.clear_transitions();
        control
    }
}
