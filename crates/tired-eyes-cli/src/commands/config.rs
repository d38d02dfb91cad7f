use clap::Subcommand;
use tired_eyes_core::{ConfigError, Settings, SettingsStore, TomlFileBackend};

use super::CommandResult;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a settings value
    Get {
        /// Settings key (e.g. "workDurationMinutes", "theme")
        key: String,
    },
    /// Set a settings value
    Set {
        /// Settings key
        key: String,
        /// New value
        value: String,
    },
    /// List all settings
    List,
    /// Reset settings to defaults
    Reset,
    /// Print the settings file location
    Path,
}

/// Store over the settings file in the data directory. Errors if the
/// directory cannot be created.
fn open_store() -> Result<(SettingsStore, TomlFileBackend), ConfigError> {
    let backend = TomlFileBackend::default_location()?;
    Ok((SettingsStore::new(backend.clone()), backend))
}

pub fn run(action: ConfigAction) -> CommandResult {
    match action {
        ConfigAction::Get { key } => {
            let settings = open_store()?.0.read();
            match settings.get(&key) {
                Some(value) => println!("{value}"),
                None => {
                    eprintln!("unknown key: {key}");
                    eprintln!("known keys: {}", Settings::keys().join(", "));
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let (store, _) = open_store()?;
            let updated = store.set_key(&key, &value)?;
            // Echo the stored form, which may differ in case.
            println!("{key} = {}", updated.get(&key).unwrap_or(value));
        }
        ConfigAction::List => {
            let settings = open_store()?.0.read();
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        ConfigAction::Reset => {
            open_store()?.0.reset()?;
            println!("settings reset to defaults");
        }
        ConfigAction::Path => {
            let (_, backend) = open_store()?;
            println!("{}", backend.path().display());
        }
    }
    Ok(())
}
