//! Durable storage for the settings record.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::model::Settings;
use crate::error::ConfigError;

/// Fixed namespace of the settings record; keeps it apart from any other
/// application data in the same directory.
pub const SETTINGS_FILE_NAME: &str = "tired-eyes-settings.toml";

/// Where the settings record lives.
///
/// `persist` must replace the whole record atomically: a concurrent `load`
/// sees either the complete old record or the complete new one.
pub trait SettingsBackend: Send + Sync {
    /// Load the record. `Ok(None)` means no record has been written yet.
    fn load(&self) -> Result<Option<Settings>, ConfigError>;

    /// Replace the record.
    fn persist(&self, settings: &Settings) -> Result<(), ConfigError>;
}

/// TOML file backend.
#[derive(Debug, Clone)]
pub struct TomlFileBackend {
    path: PathBuf,
}

impl TomlFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backend at `<data_dir>/tired-eyes-settings.toml`.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn default_location() -> Result<Self, ConfigError> {
        let dir = super::data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from(SETTINGS_FILE_NAME),
            message: e.to_string(),
        })?;
        Ok(Self::new(dir.join(SETTINGS_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SettingsBackend for TomlFileBackend {
    fn load(&self) -> Result<Option<Settings>, ConfigError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: self.path.clone(),
                    message: e.to_string(),
                })
            }
        };
        let settings: Settings = toml::from_str(&content)?;
        Ok(Some(settings))
    }

    fn persist(&self, settings: &Settings) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: self.path.clone(),
            message,
        };

        let content = toml::to_string_pretty(settings).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }

        // Rename over the old record so readers never see a half-written file.
        let tmp = self.temp_path();
        std::fs::write(&tmp, content).map_err(|e| save_failed(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            save_failed(e.to_string())
        })?;
        Ok(())
    }
}

/// In-process backend for tests and ephemeral shells.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    record: Mutex<Option<Settings>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that already holds a record.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            record: Mutex::new(Some(settings)),
        }
    }
}

impl SettingsBackend for MemoryBackend {
    fn load(&self) -> Result<Option<Settings>, ConfigError> {
        Ok(*self.record.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn persist(&self, settings: &Settings) -> Result<(), ConfigError> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = Some(*settings);
        Ok(())
    }
}
