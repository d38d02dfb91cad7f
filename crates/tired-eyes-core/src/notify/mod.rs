mod cooldown;
mod dispatcher;

pub use cooldown::{NotificationCooldown, NOTIFICATION_COOLDOWN};
pub use dispatcher::{
    DispatchOutcome, InlineNotification, InlineNotifier, LogNotifier, NotificationChannel,
    NotificationDispatcher, NotificationRequest, APP_NAME, BREAK_MESSAGE,
};
