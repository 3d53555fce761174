//! Tether Script Host
//!
//! JavaScript application runtime for a VR headset host, via QuickJS
//!
//! ## Architecture
//!
//! - **Bootstrap:** one engine per process; `boot.js` is compiled in and
//!   returns the application's entry task
//! - **Task:** a JS generator resumed once per update tick
//! - **Modules:** native modules resolved lazily through `require(name)`
//! - **FFI:** C entry points for init, update and draw; the session crosses
//!   the boundary as an opaque pointer

pub mod bridge;
pub mod error;
pub mod ffi;
pub mod modules;
pub mod runtime;
pub mod session;
pub mod task;

pub use bridge::{BridgeState, FrameBridge};
pub use error::{FrameError, ScriptError, SessionError};
pub use modules::{EventQueue, ModuleEnv, ModuleRegistry, NativeModule};
pub use runtime::{ScriptArgs, ScriptRuntime};
pub use session::{InitParams, RuntimeSession};
pub use task::{CooperativeTask, Resume, ScriptTask};

pub use rquickjs;
