//! Light/dark resolution.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::settings::{Settings, ThemePreference};

/// The appearance presentation surfaces should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    Light,
    Dark,
}

impl Appearance {
    pub fn from_is_dark(is_dark: bool) -> Self {
        if is_dark {
            Appearance::Dark
        } else {
            Appearance::Light
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Appearance::Light => "light",
            Appearance::Dark => "dark",
        }
    }
}

impl std::fmt::Display for Appearance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shell collaborator answering "is the OS currently in dark mode?".
pub trait SystemAppearance: Send + Sync {
    fn is_dark(&self) -> bool;
}

/// Fixed answer, for shells that cannot query the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedAppearance(pub bool);

impl SystemAppearance for FixedAppearance {
    fn is_dark(&self) -> bool {
        self.0
    }
}

pub fn resolve(preference: ThemePreference, system_is_dark: bool) -> Appearance {
    match preference {
        ThemePreference::Light => Appearance::Light,
        ThemePreference::Dark => Appearance::Dark,
        ThemePreference::System => Appearance::from_is_dark(system_is_dark),
    }
}

/// Tracks both inputs and publishes the effective appearance whenever it
/// changes.
#[derive(Debug)]
pub struct ThemeResolver {
    preference: ThemePreference,
    system_is_dark: bool,
    tx: watch::Sender<Appearance>,
}

impl ThemeResolver {
    pub fn new(preference: ThemePreference, system_is_dark: bool) -> Self {
        let (tx, _rx) = watch::channel(resolve(preference, system_is_dark));
        Self {
            preference,
            system_is_dark,
            tx,
        }
    }

    pub fn current(&self) -> Appearance {
        *self.tx.borrow()
    }

    pub fn preference(&self) -> ThemePreference {
        self.preference
    }

    pub fn subscribe(&self) -> watch::Receiver<Appearance> {
        self.tx.subscribe()
    }

    pub fn set_preference(&mut self, preference: ThemePreference) -> Appearance {
        self.preference = preference;
        self.publish()
    }

    pub fn set_system_dark(&mut self, is_dark: bool) -> Appearance {
        self.system_is_dark = is_dark;
        self.publish()
    }

    /// Re-resolve from a freshly read settings record.
    pub fn apply_settings(&mut self, settings: &Settings) -> Appearance {
        self.set_preference(settings.theme)
    }

    fn publish(&self) -> Appearance {
        let appearance = resolve(self.preference, self.system_is_dark);
        self.tx.send_if_modified(|current| {
            if *current == appearance {
                return false;
            }
            debug!(%appearance, "appearance changed");
            *current = appearance;
            true
        });
        appearance
    }
}
