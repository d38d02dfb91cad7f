//! Tokio driver wiring the core for a shell.
//!
//! One task owns the [`WorkBreakCycle`] and is the only place it is ticked or
//! commanded, so ticks never overlap. A second task follows settings changes
//! into the [`ThemeResolver`] and, when configured, polls the durable record
//! for writes made by other processes.
//!
//! ```ignore
//! let handle = Runtime::builder(store)
//!     .inline_notifier(Arc::new(DesktopNotifier))
//!     .surface_host(Arc::new(TerminalHost::new()))
//!     .settings_poll(Duration::from_secs(2))
//!     .spawn();
//! let mut state = handle.state();
//! handle.skip_to_break();
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::debug;

use crate::cycle::{CycleState, WorkBreakCycle};
use crate::events::Event;
use crate::notify::{
    DispatchOutcome, InlineNotifier, LogNotifier, NotificationDispatcher, NotificationRequest,
};
use crate::settings::SettingsStore;
use crate::surface::{BreakSurfaceController, LogSurfaceHost, SurfaceHost};
use crate::theme::{Appearance, FixedAppearance, SystemAppearance, ThemeResolver};

/// Cycle clock period.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy)]
enum Command {
    Pause,
    Resume,
    TogglePause,
    Reset,
    SkipToBreak,
}

pub struct RuntimeBuilder {
    store: SettingsStore,
    inline: Arc<dyn InlineNotifier>,
    host: Arc<dyn SurfaceHost>,
    system: Arc<dyn SystemAppearance>,
    settings_poll: Option<Duration>,
}

impl RuntimeBuilder {
    /// OS notification service for the normal channel. Defaults to the log.
    pub fn inline_notifier(mut self, inline: Arc<dyn InlineNotifier>) -> Self {
        self.inline = inline;
        self
    }

    /// Window system for the fullscreen channel. Defaults to the log.
    pub fn surface_host(mut self, host: Arc<dyn SurfaceHost>) -> Self {
        self.host = host;
        self
    }

    /// Where the initial "is the OS dark?" answer comes from. Later changes
    /// are pushed with [`RuntimeHandle::set_system_dark`].
    pub fn system_appearance(mut self, system: Arc<dyn SystemAppearance>) -> Self {
        self.system = system;
        self
    }

    /// Re-read the durable settings record on this interval so writes from
    /// other processes reach the cycle and the theme.
    pub fn settings_poll(mut self, every: Duration) -> Self {
        self.settings_poll = Some(every);
        self
    }

    /// Start the runtime tasks.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(self) -> RuntimeHandle {
        let surface = BreakSurfaceController::new(self.host);
        let dispatcher = Arc::new(NotificationDispatcher::new(self.inline, surface));
        let cycle = WorkBreakCycle::new(self.store.clone(), Arc::clone(&dispatcher));

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(cycle.state());
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let initial = self.store.read();
        let system_dark = self.system.is_dark();
        let theme = ThemeResolver::new(initial.theme, system_dark);
        let appearance_rx = theme.subscribe();
        let (system_tx, system_rx) = watch::channel(system_dark);

        let runtime = Runtime {
            cycle,
            commands: commands_rx,
            state_tx,
            events_tx: events_tx.clone(),
            shutdown: shutdown_rx.clone(),
        };
        let follower = SettingsFollower {
            store: self.store.clone(),
            settings: self.store.subscribe(),
            theme,
            system: system_rx,
            poll: self.settings_poll.map(|every| {
                let mut poll = interval_at(Instant::now() + every, every);
                poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
                poll
            }),
            shutdown: shutdown_rx,
        };

        let tasks = vec![tokio::spawn(runtime.run()), tokio::spawn(follower.run())];

        RuntimeHandle {
            commands: commands_tx,
            state: state_rx,
            events: events_tx,
            appearance: appearance_rx,
            system_dark: system_tx,
            shutdown: shutdown_tx,
            store: self.store,
            dispatcher,
            tasks,
        }
    }
}

/// The cycle loop. Built through [`Runtime::builder`].
pub struct Runtime {
    cycle: WorkBreakCycle,
    commands: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<CycleState>,
    events_tx: broadcast::Sender<Event>,
    shutdown: watch::Receiver<bool>,
}

impl Runtime {
    pub fn builder(store: SettingsStore) -> RuntimeBuilder {
        RuntimeBuilder {
            store,
            inline: Arc::new(LogNotifier),
            host: Arc::new(LogSurfaceHost::default()),
            system: Arc::new(FixedAppearance(false)),
            settings_poll: None,
        }
    }

    async fn run(mut self) {
        let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick(), if !self.cycle.is_paused() => {
                    let event = self.cycle.tick();
                    self.publish(event);
                }
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    let event = self.apply(command);
                    // A fresh full second after any command that re-arms or
                    // restarts the countdown.
                    if event.is_some() && !matches!(command, Command::Pause) {
                        ticker.reset();
                    }
                    self.publish(event);
                }
                _ = self.shutdown.changed() => break,
            }
        }
        debug!("cycle loop stopped");
    }

    fn apply(&mut self, command: Command) -> Option<Event> {
        match command {
            Command::Pause => self.cycle.pause(),
            Command::Resume => self.cycle.resume(),
            Command::TogglePause => self.cycle.toggle_pause(),
            Command::Reset => Some(self.cycle.reset()),
            Command::SkipToBreak => self.cycle.skip_to_break(),
        }
    }

    fn publish(&self, event: Option<Event>) {
        self.state_tx.send_replace(self.cycle.state());
        if let Some(event) = event {
            // No subscribers is fine.
            let _ = self.events_tx.send(event);
        }
    }
}

struct SettingsFollower {
    store: SettingsStore,
    settings: watch::Receiver<crate::settings::Settings>,
    theme: ThemeResolver,
    system: watch::Receiver<bool>,
    poll: Option<Interval>,
    shutdown: watch::Receiver<bool>,
}

impl SettingsFollower {
    async fn run(mut self) {
        loop {
            tokio::select! {
                changed = self.settings.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    // Re-read the full record instead of trusting the payload.
                    let settings = self.store.read();
                    self.theme.apply_settings(&settings);
                }
                changed = self.system.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let is_dark = *self.system.borrow_and_update();
                    self.theme.set_system_dark(is_dark);
                }
                _ = next_poll(&mut self.poll) => {
                    self.store.refresh();
                }
                _ = self.shutdown.changed() => break,
            }
        }
        debug!("settings follower stopped");
    }
}

async fn next_poll(poll: &mut Option<Interval>) {
    match poll {
        Some(poll) => {
            poll.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Shell-facing handle to a running core.
pub struct RuntimeHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<CycleState>,
    events: broadcast::Sender<Event>,
    appearance: watch::Receiver<Appearance>,
    system_dark: watch::Sender<bool>,
    shutdown: watch::Sender<bool>,
    store: SettingsStore,
    dispatcher: Arc<NotificationDispatcher>,
    tasks: Vec<JoinHandle<()>>,
}

impl RuntimeHandle {
    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    pub fn toggle_pause(&self) {
        self.send(Command::TogglePause);
    }

    pub fn reset(&self) {
        self.send(Command::Reset);
    }

    pub fn skip_to_break(&self) {
        self.send(Command::SkipToBreak);
    }

    /// User dismissal of the break surface; accepted only after its
    /// countdown finished.
    pub fn request_close_break_surface(&self) -> bool {
        self.dispatcher.surface().request_close()
    }

    /// Explicit user-triggered notification, through the same cooldown as
    /// the cycle's own.
    pub fn notify(&self, request: &NotificationRequest) -> DispatchOutcome {
        self.dispatcher.dispatch(request)
    }

    /// Push an OS theme change.
    pub fn set_system_dark(&self, is_dark: bool) {
        self.system_dark.send_replace(is_dark);
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.store
    }

    pub fn surface(&self) -> &BreakSurfaceController {
        self.dispatcher.surface()
    }

    /// Stream of cycle state, updated every tick and after every command.
    pub fn state(&self) -> watch::Receiver<CycleState> {
        self.state.clone()
    }

    pub fn current_state(&self) -> CycleState {
        *self.state.borrow()
    }

    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn appearance(&self) -> watch::Receiver<Appearance> {
        self.appearance.clone()
    }

    /// Stop all tasks and close any break surface. The countdown is not
    /// persisted.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);
        for task in self.tasks {
            let _ = task.await;
        }
        self.dispatcher.surface().close();
        debug!("runtime shut down");
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!(?command, "cycle loop gone, dropping command");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::Phase;
    use crate::events::BreakTrigger;
    use crate::notify::{InlineNotification, NotificationChannel};
    use crate::settings::{NotificationType, Settings};
    use crate::surface::testing::RecordingHost;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier(Mutex<Vec<InlineNotification>>);

    impl InlineNotifier for RecordingNotifier {
        fn deliver(&self, notification: &InlineNotification) -> crate::error::Result<()> {
            self.0.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn spawn_with(settings: Settings) -> (RuntimeHandle, Arc<RecordingNotifier>, Arc<RecordingHost>) {
        let store = SettingsStore::in_memory();
        store.write(settings).unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let host = Arc::new(RecordingHost::default());
        let handle = Runtime::builder(store)
            .inline_notifier(notifier.clone())
            .surface_host(host.clone())
            .spawn();
        (handle, notifier, host)
    }

    fn short_work(notification_type: NotificationType) -> Settings {
        Settings {
            work_duration_minutes: 1,
            notification_type,
            ..Settings::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn work_period_runs_out_into_break() {
        let (handle, notifier, _host) = spawn_with(short_work(NotificationType::Normal));
        let mut events = handle.events();

        tokio::time::sleep(Duration::from_millis(60_500)).await;

        let state = handle.current_state();
        assert_eq!(state.phase, Phase::OnBreak);
        assert_eq!(state.remaining_seconds, 20);
        assert!(matches!(
            events.recv().await.unwrap(),
            Event::BreakStarted {
                trigger: BreakTrigger::Natural,
                delivered: true,
                ..
            }
        ));
        assert_eq!(notifier.0.lock().unwrap().len(), 1);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn paused_runtime_holds_remaining_time() {
        let (handle, _, _) = spawn_with(short_work(NotificationType::Normal));
        let mut state = handle.state();

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(handle.current_state().remaining_seconds, 50);

        handle.pause();
        state.wait_for(|s| s.paused).await.unwrap();

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(handle.current_state().remaining_seconds, 50);

        handle.toggle_pause();
        state.wait_for(|s| !s.paused).await.unwrap();

        // A full second must pass after resuming before the next tick.
        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(handle.current_state().remaining_seconds, 50);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(handle.current_state().remaining_seconds, 49);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn skip_opens_fullscreen_surface() {
        let (handle, notifier, host) = spawn_with(short_work(NotificationType::Fullscreen));
        let mut state = handle.state();

        handle.skip_to_break();
        state.wait_for(|s| s.phase == Phase::OnBreak).await.unwrap();
        assert!(handle.surface().is_active());
        assert_eq!(host.created(), 1);
        assert!(notifier.0.lock().unwrap().is_empty());

        // Not dismissible before the countdown finishes.
        assert!(!handle.request_close_break_surface());
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(handle.request_close_break_surface());
        assert!(!handle.surface().is_active());
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_notify_shares_cooldown_with_cycle() {
        let (handle, notifier, _) = spawn_with(short_work(NotificationType::Normal));
        let mut state = handle.state();

        handle.skip_to_break();
        state.wait_for(|s| s.phase == Phase::OnBreak).await.unwrap();

        let request = NotificationRequest::break_reminder(NotificationChannel::Normal, 20);
        assert_eq!(handle.notify(&request), DispatchOutcome::Suppressed);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(
            handle.notify(&request),
            DispatchOutcome::Delivered(NotificationChannel::Normal)
        );
        assert_eq!(notifier.0.lock().unwrap().len(), 2);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn reset_rearms_current_phase() {
        let (handle, _, _) = spawn_with(short_work(NotificationType::Normal));
        let mut state = handle.state();

        tokio::time::sleep(Duration::from_millis(30_500)).await;
        handle.pause();
        state.wait_for(|s| s.paused).await.unwrap();
        assert_eq!(handle.current_state().remaining_seconds, 30);

        handle.reset();
        let current = *state.wait_for(|s| !s.paused).await.unwrap();
        assert_eq!(current.remaining_seconds, 60);
        assert_eq!(current.phase, Phase::Working);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn appearance_follows_settings_and_system() {
        let (handle, _, _) = spawn_with(Settings::default());
        let mut appearance = handle.appearance();
        assert_eq!(*appearance.borrow(), Appearance::Light);

        handle.set_system_dark(true);
        appearance.changed().await.unwrap();
        assert_eq!(*appearance.borrow_and_update(), Appearance::Dark);

        handle.settings().set_key("theme", "light").unwrap();
        appearance.changed().await.unwrap();
        assert_eq!(*appearance.borrow_and_update(), Appearance::Light);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_open_surface() {
        let (handle, _, host) = spawn_with(short_work(NotificationType::Fullscreen));
        let mut state = handle.state();
        handle.skip_to_break();
        state.wait_for(|s| s.phase == Phase::OnBreak).await.unwrap();

        handle.shutdown().await;
        assert_eq!(host.closed().len(), 1);
    }
}
