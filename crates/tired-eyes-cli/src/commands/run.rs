//! Foreground reminder loop driven by line commands on stdin.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tired_eyes_core::{
    close_action, format_clock, CloseAction, CycleState, Event, Runtime, RuntimeHandle,
    SettingsStore,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use super::CommandResult;
use crate::shell::{DesktopNotifier, SystemTheme, SystemThemeFlag, TerminalHost};

const HELP: &str = "commands: pause, resume, toggle, reset, skip, continue, status, \
                    system <light|dark>, hide, show, quit";

#[derive(Args)]
pub struct RunArgs {
    /// Current OS appearance
    #[arg(long, value_enum, env = "TIRED_EYES_SYSTEM_THEME")]
    system_theme: Option<SystemTheme>,

    /// Seconds between re-reads of the settings file; 0 disables
    #[arg(long, default_value_t = 2)]
    poll_settings_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineCommand {
    Pause,
    Resume,
    Toggle,
    Reset,
    Skip,
    Continue,
    Status,
    System(SystemTheme),
    Hide,
    Show,
    Quit,
    Help,
}

fn parse_line(line: &str) -> Result<LineCommand, String> {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default().to_lowercase();
    let parsed = match command.as_str() {
        "pause" => LineCommand::Pause,
        "resume" => LineCommand::Resume,
        "toggle" | "p" => LineCommand::Toggle,
        "reset" => LineCommand::Reset,
        "skip" => LineCommand::Skip,
        "continue" | "c" => LineCommand::Continue,
        "status" | "s" => LineCommand::Status,
        "system" => {
            let value = words.next().unwrap_or_default();
            let theme = SystemTheme::parse(value)
                .ok_or_else(|| format!("expected `system light` or `system dark`, got `{line}`"))?;
            LineCommand::System(theme)
        }
        "hide" => LineCommand::Hide,
        "show" => LineCommand::Show,
        "quit" | "q" | "exit" => LineCommand::Quit,
        "help" | "?" => LineCommand::Help,
        _ => return Err(format!("unknown command `{}`; {HELP}", line.trim())),
    };
    Ok(parsed)
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct Console {
    handle: RuntimeHandle,
    /// Output is muted while hidden, as a tray app would be.
    visible: bool,
    /// A close request already hid the console; the next one quits.
    hidden_by_close: bool,
}

impl Console {
    /// Stdout belongs to the break screen while it is up.
    fn can_print(&self) -> bool {
        self.visible && !self.handle.surface().is_active()
    }

    fn apply(&mut self, command: LineCommand) -> Flow {
        match command {
            LineCommand::Pause => self.handle.pause(),
            LineCommand::Resume => self.handle.resume(),
            LineCommand::Toggle => self.handle.toggle_pause(),
            LineCommand::Reset => self.handle.reset(),
            LineCommand::Skip => self.handle.skip_to_break(),
            LineCommand::Continue => {
                if !self.handle.request_close_break_surface() {
                    debug!("break surface not dismissible yet");
                }
            }
            LineCommand::Status => {
                if self.can_print() {
                    println!("{}", status_line(&self.handle.current_state()));
                }
            }
            LineCommand::System(theme) => self.handle.set_system_dark(theme.is_dark()),
            LineCommand::Hide => return self.close_requested(),
            LineCommand::Show => {
                self.visible = true;
                self.hidden_by_close = false;
                if self.can_print() {
                    println!("{}", status_line(&self.handle.current_state()));
                }
            }
            LineCommand::Quit => return Flow::Quit,
            LineCommand::Help => {
                if self.can_print() {
                    println!("{HELP}");
                }
            }
        }
        Flow::Continue
    }

    fn close_requested(&mut self) -> Flow {
        let settings = self.handle.settings().read();
        match close_action(&settings, self.hidden_by_close) {
            CloseAction::HideToTray => {
                if self.can_print() {
                    println!("hidden; reminders continue (type `show` to come back, Ctrl-C again to quit)");
                }
                self.visible = false;
                self.hidden_by_close = true;
                Flow::Continue
            }
            CloseAction::Quit => Flow::Quit,
        }
    }

    fn on_event(&self, event: &Event) {
        if self.can_print() {
            println!("{}", describe(event));
        }
    }
}

fn status_line(state: &CycleState) -> String {
    let paused = if state.paused { " [paused]" } else { "" };
    format!(
        "{} {} ({}% left){paused}",
        state.phase.label(),
        state.clock(),
        state.remaining_pct()
    )
}

fn describe(event: &Event) -> String {
    match event {
        Event::BreakStarted { duration_secs, .. } => {
            format!("break started ({})", format_clock(*duration_secs))
        }
        Event::WorkStarted { duration_secs, .. } => {
            format!("back to work ({})", format_clock(*duration_secs))
        }
        Event::CyclePaused { remaining_secs, .. } => {
            format!("paused at {}", format_clock(*remaining_secs))
        }
        Event::CycleResumed { remaining_secs, .. } => {
            format!("resumed at {}", format_clock(*remaining_secs))
        }
        Event::CycleReset {
            phase,
            remaining_secs,
            ..
        } => format!("{} reset to {}", phase.label(), format_clock(*remaining_secs)),
    }
}

pub async fn run(args: RunArgs) -> CommandResult {
    let mut builder = Runtime::builder(SettingsStore::open_default())
        .inline_notifier(Arc::new(DesktopNotifier))
        .surface_host(Arc::new(TerminalHost::new()))
        .system_appearance(Arc::new(SystemThemeFlag(args.system_theme)));
    if args.poll_settings_secs > 0 {
        builder = builder.settings_poll(Duration::from_secs(args.poll_settings_secs));
    }
    let handle = builder.spawn();

    let mut events = handle.events();
    let mut appearance = handle.appearance();
    let mut appearance_open = true;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let mut console = Console {
        handle,
        visible: true,
        hidden_by_close: false,
    };
    let initial = *appearance.borrow_and_update();
    info!(appearance = %initial, "reminder running");
    println!("{}", status_line(&console.handle.current_state()));
    println!("{HELP}");

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    // Keep running without a console, like a tray app.
                    stdin_open = false;
                    continue;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_line(&line) {
                    Ok(command) => {
                        if console.apply(command) == Flow::Quit {
                            break;
                        }
                    }
                    Err(message) => eprintln!("{message}"),
                }
            }
            event = events.recv() => match event {
                Ok(event) => console.on_event(&event),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "event stream lagged"),
                Err(RecvError::Closed) => break,
            },
            changed = appearance.changed(), if appearance_open => {
                if changed.is_err() {
                    appearance_open = false;
                    continue;
                }
                let current = *appearance.borrow_and_update();
                info!(appearance = %current, "appearance changed");
            }
            _ = tokio::signal::ctrl_c() => {
                if console.close_requested() == Flow::Quit {
                    break;
                }
            }
        }
    }

    console.handle.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tired_eyes_core::Phase;

    #[test]
    fn parses_line_commands() {
        assert_eq!(parse_line("pause"), Ok(LineCommand::Pause));
        assert_eq!(parse_line("  Toggle "), Ok(LineCommand::Toggle));
        assert_eq!(parse_line("continue"), Ok(LineCommand::Continue));
        assert_eq!(parse_line("q"), Ok(LineCommand::Quit));
        assert_eq!(
            parse_line("system dark"),
            Ok(LineCommand::System(SystemTheme::Dark))
        );
    }

    #[test]
    fn rejects_unknown_and_malformed_commands() {
        assert!(parse_line("snooze").unwrap_err().contains("unknown command"));
        assert!(parse_line("system").is_err());
        assert!(parse_line("system blue").is_err());
    }

    #[test]
    fn status_line_shows_phase_clock_and_pause() {
        let state = CycleState {
            phase: Phase::OnBreak,
            remaining_seconds: 15,
            paused: true,
            phase_total_seconds: 20,
        };
        assert_eq!(status_line(&state), "On break 00:15 (75% left) [paused]");
    }

    fn console() -> Console {
        Console {
            handle: Runtime::builder(SettingsStore::in_memory()).spawn(),
            visible: true,
            hidden_by_close: false,
        }
    }

    #[tokio::test]
    async fn first_close_hides_and_second_quits() {
        let mut console = console();

        assert_eq!(console.close_requested(), Flow::Continue);
        assert!(!console.visible);
        assert!(console.hidden_by_close);

        assert_eq!(console.close_requested(), Flow::Quit);
        console.handle.shutdown().await;
    }

    #[tokio::test]
    async fn show_restores_console_and_rearms_hide() {
        let mut console = console();

        assert_eq!(console.apply(LineCommand::Hide), Flow::Continue);
        assert!(!console.can_print());

        assert_eq!(console.apply(LineCommand::Show), Flow::Continue);
        assert!(console.visible);
        assert!(!console.hidden_by_close);

        assert_eq!(console.close_requested(), Flow::Continue);
        assert!(!console.visible);
        console.handle.shutdown().await;
    }

    #[tokio::test]
    async fn close_quits_at_once_without_close_to_tray() {
        let mut console = console();
        console
            .handle
            .settings()
            .set_key("closeToTray", "false")
            .unwrap();

        assert_eq!(console.apply(LineCommand::Hide), Flow::Quit);
        assert!(console.visible);
        console.handle.shutdown().await;
    }

    #[tokio::test]
    async fn hidden_console_still_takes_commands() {
        let mut console = console();
        console.close_requested();

        assert_eq!(console.apply(LineCommand::Pause), Flow::Continue);
        assert_eq!(console.apply(LineCommand::Quit), Flow::Quit);
        console.handle.shutdown().await;
    }
}
