//! Work/break cycle engine.
//!
//! The engine is a tick-driven state machine. It does not use internal
//! threads or timers - the caller is responsible for calling `tick()` once
//! per second while the cycle runs (the [`runtime`](crate::runtime) does this
//! for shells).
//!
//! ## State Transitions
//!
//! ```text
//! Working --(remaining hits 0 | skip_to_break)--> OnBreak --(remaining hits 0)--> Working
//! ```
//!
//! `paused` is orthogonal to the phase. Durations are read from the
//! [`SettingsStore`] at the moment a phase begins, so a settings edit made in
//! the middle of a phase only takes effect at the next boundary.
//!
//! ## Usage
//!
//! ```ignore
//! let mut cycle = WorkBreakCycle::new(store, dispatcher);
//! // Once per second:
//! if let Some(event) = cycle.tick() { /* phase changed */ }
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::events::{BreakTrigger, Event};
use crate::notify::{NotificationDispatcher, NotificationRequest};
use crate::settings::{Settings, SettingsStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Working,
    OnBreak,
}

impl Phase {
    /// Full length of this phase under `settings`, in seconds.
    pub fn duration_secs(self, settings: &Settings) -> u64 {
        match self {
            Phase::Working => settings.work_duration_secs(),
            Phase::OnBreak => settings.break_duration_secs(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Working => "Working",
            Phase::OnBreak => "On break",
        }
    }
}

/// Countdown state exposed to shells. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleState {
    pub phase: Phase,
    pub remaining_seconds: u64,
    pub paused: bool,
    /// Length the current phase was armed with.
    pub phase_total_seconds: u64,
}

impl CycleState {
    fn armed(phase: Phase, total: u64) -> Self {
        Self {
            phase,
            remaining_seconds: total,
            paused: false,
            phase_total_seconds: total,
        }
    }

    /// Remaining share of the current phase, 0..=100.
    pub fn remaining_pct(&self) -> u8 {
        if self.phase_total_seconds == 0 {
            return 0;
        }
        let pct = (self.remaining_seconds as f64 / self.phase_total_seconds as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }

    pub fn clock(&self) -> String {
        format_clock(self.remaining_seconds)
    }
}

/// Format seconds as `MM:SS`.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// The work/break state machine.
#[derive(Debug)]
pub struct WorkBreakCycle {
    store: SettingsStore,
    dispatcher: Arc<NotificationDispatcher>,
    state: CycleState,
}

impl WorkBreakCycle {
    /// Start in `Working` with the configured work duration, not paused.
    pub fn new(store: SettingsStore, dispatcher: Arc<NotificationDispatcher>) -> Self {
        let settings = store.read();
        Self {
            state: CycleState::armed(Phase::Working, Phase::Working.duration_secs(&settings)),
            store,
            dispatcher,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.state.remaining_seconds
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Advance one second. Returns an event when the phase flips.
    pub fn tick(&mut self) -> Option<Event> {
        if self.state.paused {
            return None;
        }
        if self.state.remaining_seconds > 1 {
            self.state.remaining_seconds -= 1;
            return None;
        }
        Some(match self.state.phase {
            Phase::Working => self.start_break(BreakTrigger::Natural),
            Phase::OnBreak => self.start_work(),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.state.paused {
            return None;
        }
        self.state.paused = true;
        Some(Event::CyclePaused {
            phase: self.state.phase,
            remaining_secs: self.state.remaining_seconds,
            at: Utc::now(),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        if !self.state.paused {
            return None;
        }
        self.state.paused = false;
        Some(Event::CycleResumed {
            phase: self.state.phase,
            remaining_secs: self.state.remaining_seconds,
            at: Utc::now(),
        })
    }

    pub fn toggle_pause(&mut self) -> Option<Event> {
        if self.state.paused {
            self.resume()
        } else {
            self.pause()
        }
    }

    /// Jump straight to the break, notifying exactly as the natural boundary
    /// would. Ignored while already on break.
    pub fn skip_to_break(&mut self) -> Option<Event> {
        if self.state.phase != Phase::Working {
            debug!("already on break, ignoring skip");
            return None;
        }
        Some(self.start_break(BreakTrigger::Skipped))
    }

    /// Re-arm the current phase with its full duration and clear `paused`.
    pub fn reset(&mut self) -> Event {
        let settings = self.store.read();
        let phase = self.state.phase;
        self.state = CycleState::armed(phase, phase.duration_secs(&settings));
        Event::CycleReset {
            phase,
            remaining_secs: self.state.remaining_seconds,
            at: Utc::now(),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn start_break(&mut self, trigger: BreakTrigger) -> Event {
        let settings = self.store.read();
        let request = NotificationRequest::break_reminder(
            settings.notification_type.into(),
            settings.break_duration_seconds,
        );
        let outcome = self.dispatcher.dispatch(&request);

        let total = Phase::OnBreak.duration_secs(&settings);
        self.state = CycleState {
            paused: self.state.paused,
            ..CycleState::armed(Phase::OnBreak, total)
        };
        info!(?trigger, duration_secs = total, "break started");
        Event::break_started(trigger, request, outcome, total)
    }

    fn start_work(&mut self) -> Event {
        let settings = self.store.read();
        let total = Phase::Working.duration_secs(&settings);
        self.state = CycleState {
            paused: self.state.paused,
            ..CycleState::armed(Phase::Working, total)
        };
        info!(duration_secs = total, "work period started");
        Event::WorkStarted {
            duration_secs: total,
            at: Utc::now(),
        }
    }
}
