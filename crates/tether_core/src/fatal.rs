//! Fatal-termination policy
//!
//! A render loop cannot run on top of a broken script runtime, so setup
//! failures and a dead frame task end the process. Entry points decide that
//! explicitly by calling [`terminate`]; the panic hook covers native code that
//! fails inside a script call.

use std::error::Error;
use std::fmt::{self, Write as _};

/// Upper bound on a fatal diagnostic, in bytes
pub const MAX_FATAL_MESSAGE_LEN: usize = 1024;

/// Build the diagnostic line for a fatal condition, truncated to
/// [`MAX_FATAL_MESSAGE_LEN`] bytes on a char boundary.
pub fn format_fatal(args: fmt::Arguments<'_>) -> String {
    let mut message = String::new();
    // Writing into a String cannot fail
    let _ = message.write_fmt(args);

    if message.len() > MAX_FATAL_MESSAGE_LEN {
        let mut cut = MAX_FATAL_MESSAGE_LEN;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }
    message
}

/// Render an error with its whole `source()` chain, outermost first.
pub fn describe(error: &(dyn Error + 'static)) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// Log `error` as fatal for `stage` and abort the process.
pub fn terminate(stage: &str, error: &(dyn Error + 'static)) -> ! {
    let message = format_fatal(format_args!("{stage}: {}", describe(error)));
    tracing::error!(target: "tether::fatal", "Error: {}", message);
    std::process::abort()
}

/// Route panics through the fatal formatter and abort instead of unwinding
/// into the host.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let message = format_fatal(format_args!("{info}"));
        tracing::error!(target: "tether::fatal", "Error: {}", message);
        std::process::abort()
    }));
}
