//! Duplicate-notification guard.

use std::time::Duration;

use tokio::time::Instant;

/// Window within which repeated notification requests are dropped.
pub const NOTIFICATION_COOLDOWN: Duration = Duration::from_millis(500);

/// Collapses bursts of notification requests into at most one delivery per
/// window. The only state is the instant of the last admission; rejected
/// calls do not extend the window.
#[derive(Debug, Clone)]
pub struct NotificationCooldown {
    window: Duration,
    last_admitted: Option<Instant>,
}

impl Default for NotificationCooldown {
    fn default() -> Self {
        Self::new(NOTIFICATION_COOLDOWN)
    }
}

impl NotificationCooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_admitted: None,
        }
    }

    /// Returns `true` if a notification may be delivered at `now`.
    pub fn admit(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_admitted {
            if now.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last_admitted = Some(now);
        true
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
