use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tiamat_shared::abi::MemoryBlock;
use tiamat_shared::commands::RenderCommandBuffer;
use tiamat_shared::input::GameInput;

use super::loader::{LoadedLogic, LogicEntryPoints, ModuleLoader};

/// Paths coordinating the reload handshake with the build system.
#[derive(Debug, Clone)]
pub struct ReloadConfig {
    /// The build output to watch and load.
    pub module_path: PathBuf,
    /// Base path for temp copies; the reloader appends `_<counter>` plus the
    /// module's extension. The counter only ever grows, so a copy never
    /// collides with one an in-progress rebuild or the OS loader still holds.
    pub temp_base: PathBuf,
    /// While this file exists a build is in progress and reloads are skipped.
    pub lock_path: PathBuf,
}

struct ActiveModule<M> {
    // Keeps the library mapped while `entry` is callable.
    _module: M,
    entry: LogicEntryPoints,
    temp_path: PathBuf,
}

impl<M> Drop for ActiveModule<M> {
    fn drop(&mut self) {
        // Temp copies would otherwise accumulate across reloads.
        let _ = std::fs::remove_file(&self.temp_path);
    }
}

/// Watches the logic module's build output and swaps it in when it changes.
///
/// Failure policy: a missing module file, a present lock file, a failed
/// load, or a missing entry point never kills the host. The previous module
/// (if any) stays active and callable; the failure is logged and the frame
/// simply runs with old code — or no update at all when nothing has loaded
/// yet.
pub struct HotReloader<L: ModuleLoader> {
    loader: L,
    config: ReloadConfig,
    copy_counter: u32,
    loaded_write_time: Option<SystemTime>,
    failed_write_time: Option<SystemTime>,
    active: Option<ActiveModule<L::Module>>,
}

impl<L: ModuleLoader> HotReloader<L> {
    pub fn new(loader: L, config: ReloadConfig) -> Self {
        Self {
            loader,
            config,
            copy_counter: 0,
            loaded_write_time: None,
            failed_write_time: None,
            active: None,
        }
    }

    /// True when a module is loaded and its entry point is callable.
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.active.is_some()
    }

    /// Version reported by the active module; 0 when none is loaded or the
    /// module exports no version query.
    pub fn module_version(&self) -> u32 {
        self.active.as_ref().map_or(0, |m| m.entry.version)
    }

    /// Checks the module file and reloads when it changed since the last
    /// successful load. Call once per tick; the very first call performs the
    /// initial load.
    pub fn poll(&mut self) {
        let Some(write_time) = module_write_time(&self.config.module_path) else {
            return;
        };
        if Some(write_time) == self.loaded_write_time {
            return;
        }
        // A build output that already failed will not load better a frame
        // later; wait for the next write.
        if Some(write_time) == self.failed_write_time {
            return;
        }
        self.try_load(write_time);
    }

    fn try_load(&mut self, write_time: SystemTime) {
        if self.config.lock_path.exists() {
            // Build in progress. Not a failure: retry every tick until the
            // lock disappears.
            return;
        }

        let temp_path = self.next_temp_path();
        if let Err(err) = std::fs::copy(&self.config.module_path, &temp_path) {
            log::warn!(
                "failed to copy logic module to {}: {err}",
                temp_path.display(),
            );
            self.failed_write_time = Some(write_time);
            return;
        }

        let module = match self.loader.load(&temp_path) {
            Ok(module) => module,
            Err(err) => {
                log::warn!("logic module load failed: {err:#}");
                let _ = std::fs::remove_file(&temp_path);
                self.failed_write_time = Some(write_time);
                return;
            }
        };

        let Some(entry) = module.entry_points() else {
            // entry_points logged the specifics.
            let _ = std::fs::remove_file(&temp_path);
            self.failed_write_time = Some(write_time);
            return;
        };

        log::info!(
            "logic module loaded (version {}, copy #{})",
            entry.version,
            self.copy_counter.wrapping_sub(1),
        );

        // Swap only now: any earlier failure left the old module active.
        self.active = Some(ActiveModule {
            _module: module,
            entry,
            temp_path,
        });
        self.loaded_write_time = Some(write_time);
        self.failed_write_time = None;
    }

    fn next_temp_path(&mut self) -> PathBuf {
        let counter = self.copy_counter;
        self.copy_counter = self.copy_counter.wrapping_add(1);

        let ext = self
            .config
            .module_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("so");
        PathBuf::from(format!(
            "{}_{counter}.{ext}",
            self.config.temp_base.display(),
        ))
    }

    /// Runs one game update through the module boundary.
    ///
    /// Builds the raw views, invokes the entry point, then adopts the write
    /// cursor and the initialization flag back into the safe owners. Returns
    /// false — a no-op frame — when no module is active.
    pub fn update(
        &self,
        memory: &mut MemoryBlock,
        input: &GameInput,
        commands: &mut RenderCommandBuffer,
    ) -> bool {
        let Some(active) = &self.active else {
            return false;
        };

        let mut abi_memory = memory.as_abi();
        let mut raw_commands = commands.as_raw();

        // Safety: the views point into allocations owned by `memory` and
        // `commands`, which outlive the call; the protocol forbids the module
        // from retaining them past its return.
        unsafe { (active.entry.update)(&mut abi_memory, input, &mut raw_commands) };

        memory.sync_from_abi(&abi_memory);
        commands.sync_from_raw(&raw_commands);
        true
    }
}

fn module_write_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, SystemTime};

    use anyhow::bail;

    use tiamat_shared::abi::GameMemory;
    use tiamat_shared::commands::RawCommandBuffer as RawBuf;

    unsafe extern "C" fn stub_update(
        _memory: *mut GameMemory,
        _input: *const tiamat_shared::input::GameInput,
        _commands: *mut RawBuf,
    ) {
    }

    #[derive(Default)]
    struct FakeState {
        loads: Vec<PathBuf>,
        fail_load: bool,
        missing_entry: bool,
    }

    struct FakeModule {
        valid: bool,
        version: u32,
    }

    impl LoadedLogic for FakeModule {
        fn entry_points(&self) -> Option<LogicEntryPoints> {
            self.valid.then_some(LogicEntryPoints {
                update: stub_update,
                version: self.version,
            })
        }
    }

    #[derive(Clone, Default)]
    struct FakeLoader {
        state: Arc<Mutex<FakeState>>,
    }

    impl ModuleLoader for FakeLoader {
        type Module = FakeModule;

        fn load(&mut self, path: &Path) -> anyhow::Result<FakeModule> {
            let mut state = self.state.lock().unwrap();
            state.loads.push(path.to_path_buf());
            if state.fail_load {
                bail!("forced load failure");
            }
            Ok(FakeModule {
                valid: !state.missing_entry,
                version: state.loads.len() as u32,
            })
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        loader: FakeLoader,
        reloader: HotReloader<FakeLoader>,
        module_path: PathBuf,
        lock_path: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let module_path = dir.path().join("libgame.so");
        let lock_path = dir.path().join("build.lock");
        fs::write(&module_path, b"module v1").unwrap();

        let loader = FakeLoader::default();
        let reloader = HotReloader::new(
            loader.clone(),
            ReloadConfig {
                module_path: module_path.clone(),
                temp_base: dir.path().join("game_live"),
                lock_path: lock_path.clone(),
            },
        );

        Fixture {
            _dir: dir,
            loader,
            reloader,
            module_path,
            lock_path,
        }
    }

    fn bump_mtime(path: &Path, seconds: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(seconds))
            .unwrap();
    }

    fn load_count(loader: &FakeLoader) -> usize {
        loader.state.lock().unwrap().loads.len()
    }

    #[test]
    fn first_poll_loads_the_module() {
        let mut fx = fixture();
        assert!(!fx.reloader.is_loaded());

        fx.reloader.poll();
        assert!(fx.reloader.is_loaded());
        assert_eq!(fx.reloader.module_version(), 1);
        assert_eq!(load_count(&fx.loader), 1);
    }

    #[test]
    fn unchanged_module_is_not_reloaded() {
        let mut fx = fixture();
        fx.reloader.poll();
        fx.reloader.poll();
        fx.reloader.poll();
        assert_eq!(load_count(&fx.loader), 1);
    }

    #[test]
    fn mtime_change_triggers_exactly_one_reload() {
        let mut fx = fixture();
        fx.reloader.poll();

        bump_mtime(&fx.module_path, 10_000);
        fx.reloader.poll();
        fx.reloader.poll();

        assert_eq!(load_count(&fx.loader), 2);
        assert_eq!(fx.reloader.module_version(), 2);
    }

    #[test]
    fn temp_copies_use_an_incrementing_counter() {
        let mut fx = fixture();
        fx.reloader.poll();
        bump_mtime(&fx.module_path, 10_000);
        fx.reloader.poll();

        let loads = fx.loader.state.lock().unwrap().loads.clone();
        assert_eq!(loads.len(), 2);
        assert!(loads[0].to_string_lossy().ends_with("game_live_0.so"));
        assert!(loads[1].to_string_lossy().ends_with("game_live_1.so"));
    }

    #[test]
    fn lock_file_keeps_the_previous_module() {
        let mut fx = fixture();
        fx.reloader.poll();
        assert_eq!(fx.reloader.module_version(), 1);

        bump_mtime(&fx.module_path, 10_000);
        fs::write(&fx.lock_path, b"").unwrap();
        fx.reloader.poll();

        // No load attempt while the lock exists; the old module stays active.
        assert_eq!(load_count(&fx.loader), 1);
        assert!(fx.reloader.is_loaded());
        assert_eq!(fx.reloader.module_version(), 1);

        // Lock removed: the pending change loads on the next tick.
        fs::remove_file(&fx.lock_path).unwrap();
        fx.reloader.poll();
        assert_eq!(fx.reloader.module_version(), 2);
    }

    #[test]
    fn lock_file_blocks_the_initial_load_without_failing() {
        let mut fx = fixture();
        fs::write(&fx.lock_path, b"").unwrap();

        fx.reloader.poll();
        assert!(!fx.reloader.is_loaded());
        assert_eq!(load_count(&fx.loader), 0);

        fs::remove_file(&fx.lock_path).unwrap();
        fx.reloader.poll();
        assert!(fx.reloader.is_loaded());
    }

    #[test]
    fn failed_load_keeps_the_previous_module() {
        let mut fx = fixture();
        fx.reloader.poll();
        assert_eq!(fx.reloader.module_version(), 1);

        fx.loader.state.lock().unwrap().fail_load = true;
        bump_mtime(&fx.module_path, 10_000);
        fx.reloader.poll();

        assert!(fx.reloader.is_loaded());
        assert_eq!(fx.reloader.module_version(), 1);

        // The same broken output is not retried every tick.
        fx.reloader.poll();
        assert_eq!(load_count(&fx.loader), 2);

        // A fresh write is retried.
        fx.loader.state.lock().unwrap().fail_load = false;
        bump_mtime(&fx.module_path, 20_000);
        fx.reloader.poll();
        assert_eq!(fx.reloader.module_version(), 3);
    }

    #[test]
    fn missing_entry_point_keeps_the_previous_module() {
        let mut fx = fixture();
        fx.reloader.poll();

        fx.loader.state.lock().unwrap().missing_entry = true;
        bump_mtime(&fx.module_path, 10_000);
        fx.reloader.poll();

        assert!(fx.reloader.is_loaded());
        assert_eq!(fx.reloader.module_version(), 1);
    }

    #[test]
    fn update_without_a_module_is_a_no_op() {
        let fx = fixture();
        let mut memory = MemoryBlock::new(1024, 1024);
        let input = GameInput::default();
        let mut commands = RenderCommandBuffer::new(1024, 320, 180);

        assert!(!fx.reloader.update(&mut memory, &input, &mut commands));
        assert!(commands.is_empty());
    }

    #[test]
    fn update_runs_the_entry_point_once_loaded() {
        let mut fx = fixture();
        fx.reloader.poll();

        let mut memory = MemoryBlock::new(1024, 1024);
        let input = GameInput::default();
        let mut commands = RenderCommandBuffer::new(1024, 320, 180);

        assert!(fx.reloader.update(&mut memory, &input, &mut commands));
    }
}
