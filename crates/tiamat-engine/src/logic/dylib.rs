use std::path::Path;

use anyhow::{Context, Result};
use libloading::Library;

use tiamat_shared::abi::{GameUpdateFn, GameVersionFn, UPDATE_SYMBOL, VERSION_SYMBOL};

use super::loader::{LoadedLogic, LogicEntryPoints, ModuleLoader};

/// Loads logic modules through `libloading` (`dlopen`/`LoadLibrary`).
#[derive(Debug, Default)]
pub struct DylibLoader;

/// A logic module backed by an open dynamic library.
pub struct DylibModule {
    lib: Library,
}

impl ModuleLoader for DylibLoader {
    type Module = DylibModule;

    fn load(&mut self, path: &Path) -> Result<DylibModule> {
        // Safety: the module is our own build artifact; loading runs only
        // its static initializers.
        let lib = unsafe { Library::new(path) }
            .with_context(|| format!("failed to load logic module {}", path.display()))?;
        Ok(DylibModule { lib })
    }
}

impl LoadedLogic for DylibModule {
    fn entry_points(&self) -> Option<LogicEntryPoints> {
        // Safety: symbol signatures are pinned by the shared ABI crate both
        // binaries compile against; version skew is guarded by the tag-stream
        // protocol, not by these casts. The returned fn pointers are used
        // only while `self` keeps the library mapped.
        let update: GameUpdateFn = match unsafe { self.lib.get::<GameUpdateFn>(UPDATE_SYMBOL) } {
            Ok(symbol) => *symbol,
            Err(err) => {
                log::warn!("logic module is missing its update entry point: {err}");
                return None;
            }
        };

        let version = unsafe { self.lib.get::<GameVersionFn>(VERSION_SYMBOL) }
            .map(|symbol| unsafe { symbol() })
            .unwrap_or(0);

        Some(LogicEntryPoints { update, version })
    }
}
