use std::path::Path;

use anyhow::Result;

use tiamat_shared::abi::GameUpdateFn;

/// Entry points resolved from one loaded module.
#[derive(Copy, Clone)]
pub struct LogicEntryPoints {
    pub update: GameUpdateFn,
    /// Version the module reports, 0 when it does not export one.
    /// Diagnostics only.
    pub version: u32,
}

/// A loaded logic module. Resolved entry points stay valid until the module
/// is dropped.
pub trait LoadedLogic {
    /// Resolves the required update entry point plus the optional version
    /// query.
    ///
    /// `None` marks the module invalid for this load attempt — the required
    /// symbol is missing, typically a stale or foreign binary.
    fn entry_points(&self) -> Option<LogicEntryPoints>;
}

/// Plugin-loader seam injected into the reload orchestrator.
pub trait ModuleLoader {
    type Module: LoadedLogic;

    fn load(&mut self, path: &Path) -> Result<Self::Module>;
}
