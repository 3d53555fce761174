use std::io;
use std::path::PathBuf;
use tether_asset::AssetError;
use tether_services::SettingsError;
use thiserror::Error;

/// Script engine and bootstrap failures
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to create script engine")]
    Engine(#[source] rquickjs::Error),

    #[error("failed to prepare script globals")]
    Setup(#[source] rquickjs::Error),

    /// A script threw; `message` carries the engine's text and stack trace
    #[error("{script} failed: {message}")]
    Script { script: String, message: String },

    #[error("{script} produced {found} instead of an entry task")]
    MissingEntryTask { script: String, found: String },

    #[error("entry task already consumed")]
    EntryConsumed,

    #[error("script engine error")]
    Js(#[from] rquickjs::Error),
}

/// Outcome of an update tick that did not yield back normally
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("application task returned after {frames} frames")]
    Finished { frames: u64 },

    #[error("application task failed: {message}")]
    Failed { message: String },

    #[error("frame bridge halted, application task is no longer running")]
    Halted,

    #[error("invalid eye index {eye}")]
    InvalidEye { eye: i32 },
}

/// Setup failures; every one of these is fatal to the host
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unusable settings")]
    Settings(#[from] SettingsError),

    #[error("failed to prepare '{}'", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("asset synchronization failed")]
    Asset(#[from] AssetError),

    #[error("script bootstrap failed")]
    Script(#[from] ScriptError),
}
