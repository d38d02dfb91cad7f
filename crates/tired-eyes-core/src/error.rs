//! Core error types for tired-eyes-core.
//!
//! Most of the core degrades gracefully instead of failing (defaults for a
//! broken settings record, silent drops for duplicate notifications). The
//! errors below cover the operations that can legitimately be refused:
//! settings writes and the shell collaborators.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for tired-eyes-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Break surface errors
    #[error("Break surface error: {0}")]
    Surface(#[from] SurfaceError),

    /// Inline notification delivery failed
    #[error("Notification delivery failed: {message}")]
    Notification {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load the settings record
    #[error("Failed to load settings from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to persist the settings record
    #[error("Failed to save settings to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid settings value
    #[error("Invalid settings value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown settings key
    #[error("Unknown settings key: {0}")]
    UnknownKey(String),

    /// Failed to parse the settings record
    #[error("Failed to parse settings: {0}")]
    ParseFailed(String),
}

/// Break surface errors.
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// The shell could not create the fullscreen surface
    #[error("Failed to create fullscreen surface: {0}")]
    CreateFailed(String),

    /// Surface timers need a tokio runtime
    #[error("No tokio runtime available to drive the break surface timers")]
    NoRuntime,
}

impl CoreError {
    /// Wrap a shell notification failure.
    pub fn notification<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CoreError::Notification {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
