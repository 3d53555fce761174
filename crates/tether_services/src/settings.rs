//! Bridge settings
//!
//! Every field has a default, so a settings file only needs the keys it
//! changes.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Settings file looked up under the writable root on device
pub const SETTINGS_FILE: &str = "tether.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings '{}'", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage.{key} = '{value}' {reason}")]
    Storage {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Bridge settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub storage: StorageSettings,
    pub package: PackageSettings,
    pub script: ScriptSettings,
    pub logging: LoggingSettings,
}

/// Layout of the writable root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Where the package's program subtree is mirrored
    pub program_dir: String,
    /// Save directory handed to scripts
    pub save_dir: String,
    /// Persisted package change token
    pub token_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageSettings {
    /// Subtree of the package that holds the program
    pub program_root: String,
    pub copy_chunk_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSettings {
    /// Program name published to scripts as `arg[0]`
    pub program_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            program_dir: "program".to_string(),
            save_dir: "data".to_string(),
            token_file: "lastprogram.dat".to_string(),
        }
    }
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            program_root: "assets".to_string(),
            copy_chunk_size: 8 * 1024,
        }
    }
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            program_name: "tether".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self =
            serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Like [`Settings::load`], but a missing file means defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Check the writable-root layout.
    ///
    /// The mirror directory is deleted and rebuilt whenever the package
    /// changes, so it must be a proper subdirectory that holds neither the
    /// save directory nor the change token.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let storage = &self.storage;
        let program = storage_path("program_dir", &storage.program_dir)?;
        let save = storage_path("save_dir", &storage.save_dir)?;
        let token = storage_path("token_file", &storage.token_file)?;

        for (key, value, other) in [
            ("save_dir", &storage.save_dir, save),
            ("token_file", &storage.token_file, token),
        ] {
            if other.starts_with(program) || program.starts_with(other) {
                return Err(SettingsError::Storage {
                    key,
                    value: value.clone(),
                    reason: "overlaps storage.program_dir",
                });
            }
        }
        Ok(())
    }

    pub fn program_dir(&self, writable_root: &Path) -> PathBuf {
        writable_root.join(&self.storage.program_dir)
    }

    pub fn save_dir(&self, writable_root: &Path) -> PathBuf {
        writable_root.join(&self.storage.save_dir)
    }

    pub fn token_path(&self, writable_root: &Path) -> PathBuf {
        writable_root.join(&self.storage.token_file)
    }
}

/// A non-empty relative path made only of plain components.
fn storage_path<'a>(key: &'static str, value: &'a str) -> Result<&'a Path, SettingsError> {
    let path = Path::new(value);
    let plain = path
        .components()
        .all(|part| matches!(part, Component::Normal(_)));
    if value.is_empty() || !plain {
        return Err(SettingsError::Storage {
            key,
            value: value.to_string(),
            reason: "must be a relative path below the writable root",
        });
    }
    Ok(path)
}
