use super::{NativeModule, AVAILABLE_PROPERTY};
use rquickjs::{Ctx, Function, Object};

/// The `tether` namespace; boot.js hangs the other modules off it
pub(crate) struct RootModule;

impl NativeModule for RootModule {
    fn load<'js>(&self, ctx: &Ctx<'js>) -> rquickjs::Result<Object<'js>> {
        let module = Object::new(ctx.clone())?;
        module.set("version", tether_core::VERSION)?;
        module.set("os", std::env::consts::OS)?;

        let require: Function = ctx.globals().get("require")?;
        let available: Vec<String> = require.get(AVAILABLE_PROPERTY)?;
        module.set("modules", available)?;
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use crate::modules::ModuleRegistry;
    use crate::runtime::ScriptRuntime;

    #[test]
    fn root_lists_registered_modules() {
        let runtime = ScriptRuntime::new().unwrap();
        let mut registry = ModuleRegistry::new();
        registry.register("tether", super::RootModule);
        runtime.context().with(|ctx| registry.install(&ctx)).unwrap();

        assert_eq!(
            runtime
                .evaluate_to_string("require('tether').modules.join(',')")
                .unwrap(),
            "tether"
        );
        assert_eq!(
            runtime.evaluate_to_string("require('tether').version").unwrap(),
            tether_core::VERSION
        );
    }
}
