use super::NativeModule;
use rquickjs::{Ctx, Function, Object};
use tether_core::time::FrameClock;

pub(crate) struct TimerModule {
    clock: FrameClock,
}

impl TimerModule {
    pub fn new(clock: FrameClock) -> Self {
        Self { clock }
    }
}

impl NativeModule for TimerModule {
    fn load<'js>(&self, ctx: &Ctx<'js>) -> rquickjs::Result<Object<'js>> {
        let clock = self.clock;
        let module = Object::new(ctx.clone())?;
        module.set(
            "getTime",
            Function::new(ctx.clone(), move || clock.seconds())?,
        )?;
        Ok(module)
    }
}
