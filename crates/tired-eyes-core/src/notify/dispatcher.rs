//! Notification routing.
//!
//! A [`NotificationRequest`] goes to exactly one channel: the inline OS
//! notification or the fullscreen break surface. Both channels share one
//! [`NotificationCooldown`], so a timer boundary and a stray duplicate
//! trigger can never produce two deliveries.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::cooldown::NotificationCooldown;
use crate::error::Result;
use crate::settings::NotificationType;
use crate::surface::BreakSurfaceController;

/// Fixed title of inline notifications.
pub const APP_NAME: &str = "Tired Eyes";

/// Message sent when a work period ends.
pub const BREAK_MESSAGE: &str = "Time to take a break!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Normal,
    Fullscreen,
}

impl From<NotificationType> for NotificationChannel {
    fn from(value: NotificationType) -> Self {
        match value {
            NotificationType::Normal => NotificationChannel::Normal,
            NotificationType::Fullscreen => NotificationChannel::Fullscreen,
        }
    }
}

/// A single request to announce a break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub channel: NotificationChannel,
    pub message: String,
    pub duration_seconds: u32,
}

impl NotificationRequest {
    /// The request sent at the end of a work period.
    pub fn break_reminder(channel: NotificationChannel, duration_seconds: u32) -> Self {
        Self {
            channel,
            message: BREAK_MESSAGE.to_string(),
            duration_seconds,
        }
    }
}

/// Payload handed to the shell's inline notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineNotification {
    pub title: String,
    pub body: String,
}

/// Shell collaborator that shows a transient OS notification.
pub trait InlineNotifier: Send + Sync {
    /// Fire-and-forget delivery. Errors are logged by the dispatcher and
    /// never reach the caller of `dispatch`.
    fn deliver(&self, notification: &InlineNotification) -> Result<()>;
}

/// Notifier that only writes to the log. Used when the shell has no OS
/// notification service.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl InlineNotifier for LogNotifier {
    fn deliver(&self, notification: &InlineNotification) -> Result<()> {
        info!("[{}] {}", notification.title, notification.body);
        Ok(())
    }
}

/// What `dispatch` did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Shown on this channel. For fullscreen this includes a surface that
    /// was already open.
    Delivered(NotificationChannel),
    /// Admitted but nothing could be shown on this channel.
    Failed(NotificationChannel),
    /// Dropped by the cooldown.
    Suppressed,
}

pub struct NotificationDispatcher {
    cooldown: Mutex<NotificationCooldown>,
    inline: Arc<dyn InlineNotifier>,
    surface: BreakSurfaceController,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("surface", &self.surface)
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    pub fn new(inline: Arc<dyn InlineNotifier>, surface: BreakSurfaceController) -> Self {
        Self {
            cooldown: Mutex::new(NotificationCooldown::default()),
            inline,
            surface,
        }
    }

    pub fn with_cooldown(mut self, cooldown: NotificationCooldown) -> Self {
        self.cooldown = Mutex::new(cooldown);
        self
    }

    pub fn surface(&self) -> &BreakSurfaceController {
        &self.surface
    }

    pub fn dispatch(&self, request: &NotificationRequest) -> DispatchOutcome {
        self.dispatch_at(request, Instant::now())
    }

    /// Route `request` as if it arrived at `now`.
    pub fn dispatch_at(&self, request: &NotificationRequest, now: Instant) -> DispatchOutcome {
        let admitted = self
            .cooldown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .admit(now);
        if !admitted {
            debug!(channel = ?request.channel, "suppressing duplicate notification");
            return DispatchOutcome::Suppressed;
        }

        let shown = match request.channel {
            NotificationChannel::Normal => {
                let notification = InlineNotification {
                    title: APP_NAME.to_string(),
                    body: request.message.clone(),
                };
                match self.inline.deliver(&notification) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("inline notification failed: {e}");
                        false
                    }
                }
            }
            NotificationChannel::Fullscreen => {
                let shown =
                    self.surface.open(request.duration_seconds) || self.surface.is_active();
                if !shown {
                    warn!("break surface could not be opened");
                }
                shown
            }
        };
        if shown {
            DispatchOutcome::Delivered(request.channel)
        } else {
            DispatchOutcome::Failed(request.channel)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::testing::RecordingHost;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingNotifier {
        delivered: Mutex<Vec<InlineNotification>>,
    }

    impl InlineNotifier for RecordingNotifier {
        fn deliver(&self, notification: &InlineNotification) -> Result<()> {
            self.delivered.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    struct FailingNotifier;

    impl InlineNotifier for FailingNotifier {
        fn deliver(&self, _: &InlineNotification) -> Result<()> {
            Err(crate::error::CoreError::notification(std::io::Error::new(
                std::io::ErrorKind::Other,
                "no notification daemon",
            )))
        }
    }

    fn dispatcher() -> (NotificationDispatcher, Arc<RecordingNotifier>, Arc<RecordingHost>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let host = Arc::new(RecordingHost::default());
        let surface = BreakSurfaceController::new(host.clone());
        (
            NotificationDispatcher::new(notifier.clone(), surface),
            notifier,
            host,
        )
    }

    #[test]
    fn normal_request_goes_inline_with_app_title() {
        let (dispatcher, notifier, host) = dispatcher();
        let request = NotificationRequest::break_reminder(NotificationChannel::Normal, 20);

        let outcome = dispatcher.dispatch(&request);

        assert_eq!(outcome, DispatchOutcome::Delivered(NotificationChannel::Normal));
        let delivered = notifier.delivered.lock().unwrap();
        assert_eq!(
            *delivered,
            vec![InlineNotification {
                title: "Tired Eyes".into(),
                body: "Time to take a break!".into(),
            }]
        );
        assert_eq!(host.created(), 0);
    }

    #[test]
    fn requests_closer_than_cooldown_deliver_once() {
        let (dispatcher, notifier, _) = dispatcher();
        let request = NotificationRequest::break_reminder(NotificationChannel::Normal, 20);
        let t0 = Instant::now();

        dispatcher.dispatch_at(&request, t0);
        let second = dispatcher.dispatch_at(&request, t0 + Duration::from_millis(499));

        assert_eq!(second, DispatchOutcome::Suppressed);
        assert_eq!(notifier.delivered.lock().unwrap().len(), 1);
    }

    #[test]
    fn requests_at_least_cooldown_apart_deliver_twice() {
        let (dispatcher, notifier, _) = dispatcher();
        let request = NotificationRequest::break_reminder(NotificationChannel::Normal, 20);
        let t0 = Instant::now();

        dispatcher.dispatch_at(&request, t0);
        dispatcher.dispatch_at(&request, t0 + Duration::from_millis(500));

        assert_eq!(notifier.delivered.lock().unwrap().len(), 2);
    }

    #[test]
    fn cooldown_is_shared_across_channels() {
        let (dispatcher, notifier, host) = dispatcher();
        let t0 = Instant::now();
        dispatcher.dispatch_at(
            &NotificationRequest::break_reminder(NotificationChannel::Normal, 20),
            t0,
        );
        let outcome = dispatcher.dispatch_at(
            &NotificationRequest::break_reminder(NotificationChannel::Fullscreen, 20),
            t0 + Duration::from_millis(100),
        );
        assert_eq!(outcome, DispatchOutcome::Suppressed);
        assert_eq!(notifier.delivered.lock().unwrap().len(), 1);
        assert_eq!(host.created(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fullscreen_request_opens_surface_only() {
        let (dispatcher, notifier, host) = dispatcher();
        let request = NotificationRequest::break_reminder(NotificationChannel::Fullscreen, 30);

        let outcome = dispatcher.dispatch(&request);

        assert_eq!(
            outcome,
            DispatchOutcome::Delivered(NotificationChannel::Fullscreen)
        );
        assert!(dispatcher.surface().is_active());
        assert_eq!(host.created(), 1);
        assert!(notifier.delivered.lock().unwrap().is_empty());
        dispatcher.surface().close();
    }

    #[test]
    fn inline_failure_is_reported_not_raised() {
        let host = Arc::new(RecordingHost::default());
        let dispatcher =
            NotificationDispatcher::new(Arc::new(FailingNotifier), BreakSurfaceController::new(host));
        let outcome =
            dispatcher.dispatch(&NotificationRequest::break_reminder(NotificationChannel::Normal, 20));
        assert_eq!(outcome, DispatchOutcome::Failed(NotificationChannel::Normal));
    }

    #[tokio::test(start_paused = true)]
    async fn surface_creation_failure_is_reported() {
        let host = Arc::new(RecordingHost::failing());
        let dispatcher = NotificationDispatcher::new(
            Arc::new(RecordingNotifier::default()),
            BreakSurfaceController::new(host),
        );
        let outcome = dispatcher
            .dispatch(&NotificationRequest::break_reminder(NotificationChannel::Fullscreen, 20));
        assert_eq!(outcome, DispatchOutcome::Failed(NotificationChannel::Fullscreen));
        assert!(!dispatcher.surface().is_active());
    }

    #[test]
    fn fullscreen_without_runtime_is_reported() {
        let (dispatcher, _, host) = dispatcher();
        let outcome = dispatcher
            .dispatch(&NotificationRequest::break_reminder(NotificationChannel::Fullscreen, 20));
        assert_eq!(outcome, DispatchOutcome::Failed(NotificationChannel::Fullscreen));
        assert_eq!(host.created(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn already_open_surface_counts_as_delivered() {
        let (dispatcher, _, host) = dispatcher();
        let request = NotificationRequest::break_reminder(NotificationChannel::Fullscreen, 30);
        let t0 = Instant::now();

        dispatcher.dispatch_at(&request, t0);
        let second = dispatcher.dispatch_at(&request, t0 + Duration::from_secs(1));

        assert_eq!(second, DispatchOutcome::Delivered(NotificationChannel::Fullscreen));
        assert_eq!(host.created(), 1);
        dispatcher.surface().close();
    }
}
