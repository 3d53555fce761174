//! Native modules exposed to scripts
//!
//! Modules are registered by name and built lazily: `require(name)` calls the
//! factory on first reference and caches the result in the global `modules`
//! object, so a module nobody asks for is never constructed.

mod event;
mod filesystem;
mod headset;
mod json;
mod root;
mod timer;

pub use event::EventQueue;

use rquickjs::{Ctx, Exception, Function, Object};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;
use tether_core::frame::{DisplayDimensions, SharedFrame};
use tether_core::time::FrameClock;

/// Global object caching every loaded module by name
pub const LOADED_GLOBAL: &str = "modules";

/// Property of `require` listing every registered module name
pub const AVAILABLE_PROPERTY: &str = "available";

/// Factory for one native module
pub trait NativeModule {
    fn load<'js>(&self, ctx: &Ctx<'js>) -> rquickjs::Result<Object<'js>>;
}

/// Host state the built-in modules read from
#[derive(Debug, Clone)]
pub struct ModuleEnv {
    pub frame: SharedFrame,
    pub clock: FrameClock,
    pub events: EventQueue,
    pub display: DisplayDimensions,
    /// Mirrored program directory
    pub program_root: PathBuf,
    pub save_dir: PathBuf,
}

/// Name -> factory mapping, built before bootstrap
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    factories: BTreeMap<String, Rc<dyn NativeModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in module.
    pub fn standard(env: &ModuleEnv) -> Self {
        let mut registry = Self::new();
        registry
            .register("tether", root::RootModule)
            .register("tether.timer", timer::TimerModule::new(env.clock))
            .register(
                "tether.headset",
                headset::HeadsetModule::new(env.frame.clone(), env.display),
            )
            .register("tether.event", event::EventModule::new(env.events.clone()))
            .register(
                "tether.filesystem",
                filesystem::FilesystemModule::new(env.program_root.clone(), env.save_dir.clone()),
            )
            .register("json", json::JsonModule);
        registry
    }

    /// Register `module` under `name`, replacing any earlier registration.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        module: impl NativeModule + 'static,
    ) -> &mut Self {
        let name = name.into();
        if self.factories.insert(name.clone(), Rc::new(module)).is_some() {
            tracing::debug!(module = %name, "Replacing native module");
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Publish `require` and the module cache into the context's globals.
    pub(crate) fn install<'js>(self, ctx: &Ctx<'js>) -> rquickjs::Result<()> {
        tracing::debug!(
            modules = ?self.names().collect::<Vec<_>>(),
            "Registering native modules"
        );

        let globals = ctx.globals();
        globals.set(LOADED_GLOBAL, Object::new(ctx.clone())?)?;
        let available: Vec<String> = self.factories.keys().cloned().collect();

        let registry = Rc::new(self);
        let require = Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, name: String| -> rquickjs::Result<Object<'js>> {
                let loaded: Object = ctx.globals().get(LOADED_GLOBAL)?;
                if let Some(module) = loaded.get::<_, Option<Object>>(name.as_str())? {
                    return Ok(module);
                }

                let Some(factory) = registry.factories.get(&name) else {
                    return Err(Exception::throw_message(
                        &ctx,
                        &format!("module '{name}' not found"),
                    ));
                };

                tracing::debug!(module = %name, "Loading native module");
                let module = factory.load(&ctx)?;
                loaded.set(name.as_str(), module.clone())?;
                Ok(module)
            },
        )?;
        require.set(AVAILABLE_PROPERTY, available)?;
        globals.set("require", require)
    }
}

/// Throw a JS `Error` for an out-of-range eye or hand index.
pub(crate) fn index_error(ctx: &Ctx<'_>, what: &str, index: i32) -> rquickjs::Error {
    Exception::throw_range(ctx, &format!("invalid {what} index {index}"))
}
