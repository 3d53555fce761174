//! Tether Services Layer
//!
//! Configuration and logging setup shared by every host entry point.

pub mod logging;
pub mod settings;

pub use logging::init_logging;
pub use settings::{Settings, SettingsError, SETTINGS_FILE};
