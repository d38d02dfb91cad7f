mod backend;
mod model;
mod store;

pub use backend::{MemoryBackend, SettingsBackend, TomlFileBackend, SETTINGS_FILE_NAME};
pub use model::{
    NotificationType, Settings, ThemePreference, MIN_BREAK_DURATION_SECS, MIN_WORK_DURATION_MIN,
};
pub use store::{ListenerId, SettingsStore};

use std::path::PathBuf;

/// Returns the data directory for settings.
///
/// `TIRED_EYES_HOME` overrides the location outright. Otherwise this is
/// `~/.config/tired-eyes[-dev]/`, with the `-dev` suffix selected by
/// `TIRED_EYES_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("TIRED_EYES_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("TIRED_EYES_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("tired-eyes-dev")
            } else {
                base_dir.join("tired-eyes")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
