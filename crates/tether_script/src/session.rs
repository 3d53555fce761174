//! Runtime session
//!
//! Everything the host needs between init and process exit: the engine, the
//! application task and the frame bridge that drives it. Created once by the
//! init entry point and handed back by pointer on every later call.

use crate::bridge::{BridgeState, FrameBridge};
use crate::modules::{EventQueue, ModuleEnv, ModuleRegistry};
use crate::runtime::{ScriptArgs, ScriptRuntime, BOOT_SCRIPT};
use crate::task::ScriptTask;
use crate::{FrameError, SessionError};
use std::path::PathBuf;
use tether_asset::AssetSynchronizer;
use tether_core::frame::{
    DisplayDimensions, EyeRenderer, FrameDrawData, FrameUpdateData, SharedFrame,
};
use tether_core::time::FrameClock;
use tether_services::Settings;

/// Host-supplied init parameters
#[derive(Debug, Clone)]
pub struct InitParams {
    /// Root of the app's private writable storage
    pub writable_root: PathBuf,
    /// Application package, zip archive or directory
    pub package: PathBuf,
    pub display: DisplayDimensions,
    /// Display time the host considers frame zero
    pub zero_display_time: f64,
}

pub struct RuntimeSession {
    // Field order is drop order: the task's persistent handles must go
    // before the runtime that owns their context
    bridge: FrameBridge<ScriptTask>,
    events: EventQueue,
    runtime: ScriptRuntime,
}

impl RuntimeSession {
    /// Synchronize assets, bootstrap the script runtime and build the bridge.
    pub fn init(
        params: &InitParams,
        settings: &Settings,
        renderer: Box<dyn EyeRenderer>,
    ) -> Result<Self, SessionError> {
        Self::init_with_modules(params, settings, renderer, |_, _| {})
    }

    /// Like [`RuntimeSession::init`], letting the host add native modules on
    /// top of the built-in set before bootstrap.
    pub fn init_with_modules(
        params: &InitParams,
        settings: &Settings,
        renderer: Box<dyn EyeRenderer>,
        register: impl FnOnce(&mut ModuleRegistry, &ModuleEnv),
    ) -> Result<Self, SessionError> {
        settings.validate()?;
        let root = &params.writable_root;
        let save_dir = settings.save_dir(root);
        std::fs::create_dir_all(&save_dir).map_err(|source| SessionError::Storage {
            path: save_dir.clone(),
            source,
        })?;

        let sync = AssetSynchronizer::new(
            &params.package,
            settings.program_dir(root),
            settings.token_path(root),
        )
        .with_program_root(settings.package.program_root.as_str())
        .with_chunk_size(settings.package.copy_chunk_size);
        let outcome = sync.synchronize()?;
        tracing::info!(?outcome, "Assets ready");

        let runtime = ScriptRuntime::new()?;

        let frame = SharedFrame::new(FrameUpdateData {
            display_time: params.zero_display_time,
            ..FrameUpdateData::default()
        });
        let env = ModuleEnv {
            frame: frame.clone(),
            clock: FrameClock::start(),
            events: EventQueue::default(),
            display: params.display,
            program_root: sync.mirror_dir().to_path_buf(),
            save_dir,
        };

        let mut modules = ModuleRegistry::standard(&env);
        register(&mut modules, &env);

        let args = ScriptArgs {
            program_name: settings.script.program_name.clone(),
            program_root: env.program_root.clone(),
        };
        let task = runtime.bootstrap(BOOT_SCRIPT, &args, modules)?;

        tracing::info!(
            width = params.display.width,
            height = params.display.height,
            "Runtime session initialized"
        );
        Ok(Self {
            bridge: FrameBridge::new(task, frame, params.display, renderer),
            events: env.events,
            runtime,
        })
    }

    pub fn update(&mut self, data: &FrameUpdateData) -> Result<(), FrameError> {
        self.bridge.update(data)
    }

    pub fn draw(&mut self, data: &FrameDrawData) -> Result<(), FrameError> {
        self.bridge.draw(data)
    }

    /// Queue the host pushes events into, e.g. `quit` on shutdown
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn runtime(&self) -> &ScriptRuntime {
        &self.runtime
    }

    pub fn state(&self) -> BridgeState {
        self.bridge.state()
    }

    pub fn frames(&self) -> u64 {
        self.bridge.frames()
    }
}
