use super::NativeModule;
use rquickjs::{Ctx, Function, Object};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Event name the boot loop treats as a request to end the application
pub const QUIT_EVENT: &str = "quit";

/// Pending events, pushed by the host or by scripts and drained once a frame
#[derive(Debug, Clone, Default)]
pub struct EventQueue(Rc<RefCell<VecDeque<String>>>);

impl EventQueue {
    pub fn push(&self, name: impl Into<String>) {
        self.0.borrow_mut().push_back(name.into());
    }

    pub fn quit(&self) {
        self.push(QUIT_EVENT);
    }

    pub fn drain(&self) -> Vec<String> {
        self.0.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

pub(crate) struct EventModule {
    events: EventQueue,
}

impl EventModule {
    pub fn new(events: EventQueue) -> Self {
        Self { events }
    }
}

impl NativeModule for EventModule {
    fn load<'js>(&self, ctx: &Ctx<'js>) -> rquickjs::Result<Object<'js>> {
        let module = Object::new(ctx.clone())?;

        let events = self.events.clone();
        module.set(
            "push",
            Function::new(ctx.clone(), move |name: String| events.push(name))?,
        )?;

        let events = self.events.clone();
        module.set("quit", Function::new(ctx.clone(), move || events.quit())?)?;

        let events = self.events.clone();
        module.set("poll", Function::new(ctx.clone(), move || events.drain())?)?;

        Ok(module)
    }
}
