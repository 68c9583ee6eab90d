//! Tiamat host binary.
//!
//! Owns the window, the GPU, the memory regions, and the reloader; the game
//! itself lives in the `tiamat-game` cdylib and can be rebuilt while this
//! process keeps running:
//!
//! ```text
//! cargo run -p tiamat-host     # terminal 1
//! cargo build -p tiamat-game   # terminal 2, repeat after editing
//! ```

use std::path::PathBuf;

use anyhow::Result;

use tiamat_engine::device::GpuInit;
use tiamat_engine::logging::{LoggingConfig, init_logging};
use tiamat_engine::logic::{DylibLoader, HotReloader, ReloadConfig};
use tiamat_engine::render::RendererConfig;
use tiamat_engine::window::{Runtime, RuntimeConfig};

mod app;
mod atlas;

use app::HostApp;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let reloader = HotReloader::new(DylibLoader, reload_config());
    let app = HostApp::new(reloader, RendererConfig::default());

    Runtime::run(
        RuntimeConfig {
            title: "Tiamat".to_string(),
            ..RuntimeConfig::default()
        },
        GpuInit::default(),
        app,
    )
}

fn reload_config() -> ReloadConfig {
    let out_dir = PathBuf::from("target/debug");
    ReloadConfig {
        module_path: out_dir.join(module_file_name()),
        temp_base: out_dir.join("tiamat_game_live"),
        lock_path: out_dir.join("tiamat_game.lock"),
    }
}

/// Cargo's cdylib naming per platform.
fn module_file_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "tiamat_game.dll"
    } else if cfg!(target_os = "macos") {
        "libtiamat_game.dylib"
    } else {
        "libtiamat_game.so"
    }
}
