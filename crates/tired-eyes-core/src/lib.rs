//! # Tired Eyes Core Library
//!
//! Core business logic for the Tired Eyes break reminder. The desktop or
//! terminal shell is a thin layer over this crate: it implements a handful of
//! collaborator traits and binds its UI to the streams the runtime exposes.
//!
//! ## Architecture
//!
//! - **Work/break cycle**: a tick-driven state machine; the caller (normally
//!   the [`runtime`]) calls `tick()` once per second
//! - **Notifications**: one dispatcher routes each request to exactly one
//!   channel, gated by a process-wide cooldown
//! - **Break surface**: the fullscreen overlay lifecycle, with a visible
//!   countdown and an unconditional failsafe close
//! - **Settings**: a single durable record with change notification
//! - **Theme**: light/dark resolution from preference and OS signal
//!
//! ## Key Components
//!
//! - [`WorkBreakCycle`]: phase state machine
//! - [`NotificationDispatcher`] and [`NotificationCooldown`]
//! - [`BreakSurfaceController`]: fullscreen surface state machine
//! - [`SettingsStore`]: durable settings with `on_change` listeners
//! - [`ThemeResolver`]: effective appearance
//! - [`Runtime`]: tokio driver wiring all of the above for a shell

pub mod cycle;
pub mod error;
pub mod events;
pub mod notify;
pub mod runtime;
pub mod settings;
pub mod shell;
pub mod surface;
pub mod theme;

pub use cycle::{format_clock, CycleState, Phase, WorkBreakCycle};
pub use error::{ConfigError, CoreError, SurfaceError};
pub use events::{BreakTrigger, Event};
pub use notify::{
    DispatchOutcome, InlineNotification, InlineNotifier, LogNotifier, NotificationChannel,
    NotificationCooldown, NotificationDispatcher, NotificationRequest, APP_NAME, BREAK_MESSAGE,
};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeHandle};
pub use settings::{
    ListenerId, MemoryBackend, NotificationType, Settings, SettingsBackend, SettingsStore,
    ThemePreference, TomlFileBackend,
};
pub use shell::{close_action, CloseAction};
pub use surface::{
    BreakSurfaceController, LogSurfaceHost, SurfaceHandle, SurfaceHost, SurfaceStatus,
};
pub use theme::{resolve, Appearance, FixedAppearance, SystemAppearance, ThemeResolver};
