use std::sync::Arc;
use std::time::Duration;

use clap::{Args, ValueEnum};
use tired_eyes_core::{
    BreakSurfaceController, DispatchOutcome, NotificationChannel, NotificationDispatcher,
    NotificationRequest, SettingsStore, BREAK_MESSAGE,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::CommandResult;
use crate::shell::{DesktopNotifier, TerminalHost};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ChannelArg {
    Normal,
    Fullscreen,
}

impl From<ChannelArg> for NotificationChannel {
    fn from(value: ChannelArg) -> Self {
        match value {
            ChannelArg::Normal => NotificationChannel::Normal,
            ChannelArg::Fullscreen => NotificationChannel::Fullscreen,
        }
    }
}

#[derive(Args)]
pub struct NotifyArgs {
    /// Delivery channel (defaults to the configured notification type)
    #[arg(long = "type", value_enum)]
    kind: Option<ChannelArg>,

    /// Notification text
    #[arg(long)]
    message: Option<String>,

    /// Break length in seconds for the fullscreen surface (defaults to the
    /// configured break duration)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    duration: Option<u32>,
}

pub async fn run(args: NotifyArgs) -> CommandResult {
    let settings = SettingsStore::open_default().read();
    let request = NotificationRequest {
        channel: args
            .kind
            .map(NotificationChannel::from)
            .unwrap_or_else(|| settings.notification_type.into()),
        message: args.message.unwrap_or_else(|| BREAK_MESSAGE.to_string()),
        duration_seconds: args.duration.unwrap_or(settings.break_duration_seconds),
    };

    let surface = BreakSurfaceController::new(Arc::new(TerminalHost::new()));
    let dispatcher = NotificationDispatcher::new(Arc::new(DesktopNotifier), surface);

    match dispatcher.dispatch(&request) {
        DispatchOutcome::Delivered(NotificationChannel::Normal) => {
            println!("notification sent");
        }
        DispatchOutcome::Delivered(NotificationChannel::Fullscreen) => {
            wait_for_close(dispatcher.surface()).await?;
            println!("break finished");
        }
        DispatchOutcome::Failed(NotificationChannel::Normal) => {
            return Err("desktop notification could not be shown".into());
        }
        DispatchOutcome::Failed(NotificationChannel::Fullscreen) => {
            return Err("break surface could not be opened".into());
        }
        DispatchOutcome::Suppressed => {
            println!("notification suppressed");
        }
    }
    Ok(())
}

/// Block until the surface is gone: dismissed with `continue` once the
/// countdown is over, or closed by its failsafe.
async fn wait_for_close(surface: &BreakSurfaceController) -> CommandResult {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut poll = tokio::time::interval(Duration::from_millis(200));

    while surface.is_active() {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(line) if line.trim() == "continue" => {
                        surface.request_close();
                    }
                    Some(_) => {}
                    None => stdin_open = false,
                }
            }
            _ = poll.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                surface.close();
            }
        }
    }
    Ok(())
}
