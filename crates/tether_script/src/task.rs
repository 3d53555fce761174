//! Cooperative execution context
//!
//! The application runs as one long-lived task that suspends itself once per
//! frame. With QuickJS the task is a generator: the boot script hands back a
//! generator function (the entry task), starting it creates the generator,
//! and each resume is one `next()` call.

use crate::runtime::describe_error;
use crate::ScriptError;
use rquickjs::function::This;
use rquickjs::{Context, Ctx, FromJs, Function, Object, Persistent, Value};

/// What a resume reported back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resume {
    /// Suspended, waiting for the next frame
    Yielded,
    /// Ran to completion instead of suspending
    Completed,
    /// Raised an error that nothing in the script caught
    Errored(String),
}

/// A resumable unit of script execution driven one step per frame
pub trait CooperativeTask {
    /// Push the entry task into the execution context.
    ///
    /// The entry is consumed: a second call fails with
    /// [`ScriptError::EntryConsumed`].
    fn start(&mut self) -> Result<(), ScriptError>;

    fn resume(&mut self) -> Resume;
}

enum TaskState {
    /// Holding the entry task until the first frame
    Pending(Persistent<Function<'static>>),
    Suspended(Persistent<Object<'static>>),
    Finished,
}

/// Generator-backed application task
pub struct ScriptTask {
    // Persistent handles must go before the context they belong to
    state: TaskState,
    context: Context,
}

impl ScriptTask {
    pub(crate) fn new(context: Context, entry: Persistent<Function<'static>>) -> Self {
        Self {
            state: TaskState::Pending(entry),
            context,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, TaskState::Finished)
    }
}

impl CooperativeTask for ScriptTask {
    fn start(&mut self) -> Result<(), ScriptError> {
        let entry = match std::mem::replace(&mut self.state, TaskState::Finished) {
            TaskState::Pending(entry) => entry,
            other => {
                self.state = other;
                return Err(ScriptError::EntryConsumed);
            }
        };

        let generator = self.context.with(|ctx| -> Result<_, ScriptError> {
            let entry = entry.restore(&ctx)?;
            let value = entry
                .call::<_, Value>(())
                .map_err(|err| ScriptError::Script {
                    script: "entry task".to_string(),
                    message: describe_error(&ctx, err),
                })?;
            Ok(as_generator(&ctx, value).map(|iter| Persistent::save(&ctx, iter)))
        })?;

        // A plain function already ran to completion during the call
        if let Some(generator) = generator {
            self.state = TaskState::Suspended(generator);
        }
        Ok(())
    }

    fn resume(&mut self) -> Resume {
        let generator = match &self.state {
            TaskState::Suspended(generator) => generator.clone(),
            TaskState::Finished => return Resume::Completed,
            TaskState::Pending(_) => {
                return Resume::Errored("task resumed before it was started".to_string())
            }
        };

        let outcome = self.context.with(|ctx| match step(&ctx, generator) {
            Ok(false) => Resume::Yielded,
            Ok(true) => Resume::Completed,
            Err(err) => Resume::Errored(describe_error(&ctx, err)),
        });

        if outcome != Resume::Yielded {
            self.state = TaskState::Finished;
        }
        outcome
    }
}

/// The value as an iterator object, if it has a callable `next`.
fn as_generator<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> Option<Object<'js>> {
    let object = Object::from_js(ctx, value).ok()?;
    let next = object.get::<_, Value>("next").ok()?;
    Function::from_js(ctx, next).ok()?;
    Some(object)
}

/// One `next()` call; returns the iterator's `done` flag.
fn step<'js>(ctx: &Ctx<'js>, generator: Persistent<Object<'static>>) -> rquickjs::Result<bool> {
    let generator = generator.restore(ctx)?;
    let next: Function = generator.get("next")?;
    let result: Object = next.call((This(generator),))?;
    Ok(result.get::<_, Option<bool>>("done")?.unwrap_or(false))
}
