//! Script runtime management
//!
//! Owns the single QuickJS runtime of the process and performs the one-time
//! bootstrap: host `print`, the `arg` global, native module registration and
//! evaluation of the embedded boot script.

use crate::modules::ModuleRegistry;
use crate::task::ScriptTask;
use crate::ScriptError;
use rquickjs::convert::Coerced;
use rquickjs::function::Rest;
use rquickjs::{Context, Ctx, FromJs, Function, Persistent, Runtime, Value};
use std::path::PathBuf;

/// Embedded bootstrap script
pub const BOOT_SCRIPT: &[u8] = include_bytes!("boot.js");

/// Name used for the boot script in diagnostics
pub const BOOT_SCRIPT_NAME: &str = "boot.js";

/// Values published to scripts as the global `arg` array
#[derive(Debug, Clone)]
pub struct ScriptArgs {
    pub program_name: String,
    /// Where the program's files live on disk
    pub program_root: PathBuf,
}

/// Script execution context
pub struct ScriptRuntime {
    context: Context,
    #[allow(dead_code)] // Kept alive for context lifetime
    runtime: Runtime,
}

impl ScriptRuntime {
    pub fn new() -> Result<Self, ScriptError> {
        let runtime = Runtime::new().map_err(ScriptError::Engine)?;
        let context = Context::full(&runtime).map_err(ScriptError::Engine)?;

        Ok(Self { context, runtime })
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Evaluate `source` for its side effects.
    pub fn execute(&self, source: &str) -> Result<(), ScriptError> {
        self.context.with(|ctx| {
            ctx.eval::<(), _>(source)
                .map_err(|err| script_error(&ctx, "<eval>", err))
        })
    }

    /// Evaluate `source` and convert the result with JS string coercion.
    pub fn evaluate_to_string(&self, source: &str) -> Result<String, ScriptError> {
        self.context.with(|ctx| {
            ctx.eval::<Coerced<String>, _>(source)
                .map(|Coerced(text)| text)
                .map_err(|err| script_error(&ctx, "<eval>", err))
        })
    }

    /// Prepare the globals, run `boot` and capture the entry task it returns.
    ///
    /// Runs once per process; the returned task is the application's
    /// execution context and has not started yet.
    pub fn bootstrap(
        &self,
        boot: &[u8],
        args: &ScriptArgs,
        modules: ModuleRegistry,
    ) -> Result<ScriptTask, ScriptError> {
        self.context
            .with(|ctx| {
                install_print(&ctx)?;
                publish_args(&ctx, args)?;
                modules.install(&ctx)
            })
            .map_err(ScriptError::Setup)?;

        let entry = self.context.with(|ctx| {
            let value = ctx
                .eval::<Value, _>(boot)
                .map_err(|err| script_error(&ctx, BOOT_SCRIPT_NAME, err))?;

            let found = format!("{:?}", value.type_of());
            let entry = Function::from_js(&ctx, value).map_err(|_| {
                ScriptError::MissingEntryTask {
                    script: BOOT_SCRIPT_NAME.to_string(),
                    found,
                }
            })?;
            Ok::<_, ScriptError>(Persistent::save(&ctx, entry))
        })?;

        tracing::debug!(program = %args.program_root.display(), "Bootstrap complete");
        Ok(ScriptTask::new(self.context.clone(), entry))
    }
}

/// Route `print` to the host log, tab-joining its arguments.
fn install_print(ctx: &Ctx<'_>) -> rquickjs::Result<()> {
    let print = Function::new(ctx.clone(), |args: Rest<Coerced<String>>| {
        let line = args
            .0
            .into_iter()
            .map(|Coerced(text)| text)
            .collect::<Vec<_>>()
            .join("\t");
        tracing::info!(target: "script", "{}", line);
    })?;
    ctx.globals().set("print", print)
}

fn publish_args(ctx: &Ctx<'_>, args: &ScriptArgs) -> rquickjs::Result<()> {
    let arg = vec![
        args.program_name.clone(),
        args.program_root.to_string_lossy().into_owned(),
    ];
    ctx.globals().set("arg", arg)
}

/// Turn an engine error into readable text, pulling the pending exception's
/// message and stack trace when there is one.
pub(crate) fn describe_error(ctx: &Ctx<'_>, err: rquickjs::Error) -> String {
    if !matches!(err, rquickjs::Error::Exception) {
        return err.to_string();
    }

    let thrown = ctx.catch();
    if let Some(exception) = thrown.as_exception() {
        let message = exception
            .message()
            .unwrap_or_else(|| "unknown error".to_string());
        return match exception.stack() {
            Some(stack) if !stack.trim().is_empty() => format!("{message}\n{}", stack.trim_end()),
            _ => message,
        };
    }

    match Coerced::<String>::from_js(ctx, thrown) {
        Ok(Coerced(text)) => text,
        Err(_) => "uncaught exception".to_string(),
    }
}

fn script_error(ctx: &Ctx<'_>, script: &str, err: rquickjs::Error) -> ScriptError {
    ScriptError::Script {
        script: script.to_string(),
        message: describe_error(ctx, err),
    }
}
