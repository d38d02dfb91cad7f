use notify_rust::Notification;
use tired_eyes_core::error::Result;
use tired_eyes_core::{CoreError, InlineNotification, InlineNotifier, APP_NAME};

/// Desktop notification through the OS notification service.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl InlineNotifier for DesktopNotifier {
    fn deliver(&self, notification: &InlineNotification) -> Result<()> {
        Notification::new()
            .appname(APP_NAME)
            .summary(&notification.title)
            .body(&notification.body)
            .show()
            .map_err(CoreError::notification)?;
        Ok(())
    }
}
