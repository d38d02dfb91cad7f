//! The user preferences record.
//!
//! Stores:
//! - Notification style (inline or fullscreen break surface)
//! - Break and work durations
//! - Theme preference
//! - Close-to-tray window behaviour
//!
//! Field names are camelCase on disk so the record stays readable by the
//! settings editor surfaces.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Shortest break a user may configure, in seconds.
pub const MIN_BREAK_DURATION_SECS: u32 = 20;
/// Shortest work period a user may configure, in minutes.
pub const MIN_WORK_DURATION_MIN: u32 = 1;

/// How a break is announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    /// Transient OS notification.
    #[default]
    Normal,
    /// Fullscreen break surface that cannot be dismissed early.
    Fullscreen,
}

/// Theme preference as chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Light,
    Dark,
    /// Follow the operating system.
    #[default]
    System,
}

/// Application settings.
///
/// Exactly one record exists per installation; see
/// [`SettingsStore`](super::SettingsStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub notification_type: NotificationType,
    #[serde(default = "default_break_duration")]
    pub break_duration_seconds: u32,
    #[serde(default = "default_work_duration")]
    pub work_duration_minutes: u32,
    #[serde(default)]
    pub theme: ThemePreference,
    #[serde(default = "default_true")]
    pub close_to_tray: bool,
}

fn default_break_duration() -> u32 {
    20
}
fn default_work_duration() -> u32 {
    20
}
fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notification_type: NotificationType::Normal,
            break_duration_seconds: default_break_duration(),
            work_duration_minutes: default_work_duration(),
            theme: ThemePreference::System,
            close_to_tray: true,
        }
    }
}

impl Settings {
    /// Work period length in seconds.
    pub fn work_duration_secs(&self) -> u64 {
        u64::from(self.work_duration_minutes) * 60
    }

    /// Break length in seconds.
    pub fn break_duration_secs(&self) -> u64 {
        u64::from(self.break_duration_seconds)
    }

    /// Check the duration bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.break_duration_seconds < MIN_BREAK_DURATION_SECS {
            return Err(ConfigError::InvalidValue {
                key: "breakDurationSeconds".into(),
                message: format!(
                    "must be at least {MIN_BREAK_DURATION_SECS}, got {}",
                    self.break_duration_seconds
                ),
            });
        }
        if self.work_duration_minutes < MIN_WORK_DURATION_MIN {
            return Err(ConfigError::InvalidValue {
                key: "workDurationMinutes".into(),
                message: format!(
                    "must be at least {MIN_WORK_DURATION_MIN}, got {}",
                    self.work_duration_minutes
                ),
            });
        }
        Ok(())
    }

    /// Clamp out-of-range durations up to their minimum.
    ///
    /// Used for records coming back from storage, which are repaired rather
    /// than rejected.
    pub fn sanitized(mut self) -> Self {
        self.break_duration_seconds = self.break_duration_seconds.max(MIN_BREAK_DURATION_SECS);
        self.work_duration_minutes = self.work_duration_minutes.max(MIN_WORK_DURATION_MIN);
        self
    }

    /// Get a settings value as string by its camelCase key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match json.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a settings value by key, parsing `value` according to the type of
    /// the existing field. Does not persist anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed, or
    /// the resulting record fails validation.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        let obj = json
            .as_object_mut()
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        let existing = obj
            .get(key)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .trim()
                    .parse::<bool>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
            ),
            serde_json::Value::Number(_) => {
                let n = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?;
                serde_json::Value::Number(n.into())
            }
            _ => serde_json::Value::String(value.trim().to_lowercase()),
        };
        obj.insert(key.to_string(), new_value);

        let updated: Settings =
            serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// All camelCase keys, in record order.
    pub fn keys() -> &'static [&'static str] {
        &[
            "notificationType",
            "breakDurationSeconds",
            "workDurationMinutes",
            "theme",
            "closeToTray",
        ]
    }
}
