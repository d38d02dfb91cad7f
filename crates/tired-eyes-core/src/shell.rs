//! Window-close policy shared by shells.

use serde::{Deserialize, Serialize};

use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CloseAction {
    /// Keep running in the background; reminders continue.
    HideToTray,
    Quit,
}

/// Decide what closing the main window does. An explicit quit always quits.
pub fn close_action(settings: &Settings, quitting: bool) -> CloseAction {
    if settings.close_to_tray && !quitting {
        CloseAction::HideToTray
    } else {
        CloseAction::Quit
    }
}
