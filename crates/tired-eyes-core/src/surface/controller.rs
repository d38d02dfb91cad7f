//! Fullscreen break surface lifecycle.
//!
//! ## State Transitions
//!
//! ```text
//! Absent --open(d)--> Active --request_close (after countdown) | close | failsafe--> Absent
//! ```
//!
//! Opening spawns two tokio tasks keyed to the new surface instance: the
//! visible countdown pushes the remaining seconds to the shell once per
//! second, and the failsafe closes that instance `d + 5` seconds after it was
//! created no matter what the UI is doing. A failsafe left over from an
//! earlier surface never closes a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::SurfaceError;

/// Extra time after the countdown before the surface is closed regardless.
pub const FAILSAFE_GRACE: Duration = Duration::from_secs(5);

/// Opaque identifier the shell hands back for a created surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceHandle(pub u64);

/// Shell collaborator that owns the actual fullscreen window.
///
/// Calls are made outside the controller's lock, except `create_fullscreen`,
/// which must not call back into the controller.
pub trait SurfaceHost: Send + Sync {
    fn create_fullscreen(&self, duration_secs: u32) -> Result<SurfaceHandle, SurfaceError>;

    /// Present the remaining break time. Called once on open and then once
    /// per second down to zero.
    fn show_countdown(&self, handle: SurfaceHandle, remaining_secs: u32);

    fn close_surface(&self, handle: SurfaceHandle);
}

/// Snapshot of the controller for UI binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SurfaceStatus {
    Absent,
    Active {
        duration_secs: u32,
        remaining_secs: u32,
        /// The countdown has reached zero; a user close will be accepted.
        dismissible: bool,
    },
}

/// Host with no window system behind it; every call is logged.
#[derive(Debug, Default)]
pub struct LogSurfaceHost {
    next: AtomicU64,
}

impl SurfaceHost for LogSurfaceHost {
    fn create_fullscreen(&self, duration_secs: u32) -> Result<SurfaceHandle, SurfaceError> {
        let handle = SurfaceHandle(self.next.fetch_add(1, Ordering::Relaxed));
        debug!(?handle, duration_secs, "headless break surface created");
        Ok(handle)
    }

    fn show_countdown(&self, handle: SurfaceHandle, remaining_secs: u32) {
        debug!(?handle, remaining_secs, "break countdown");
    }

    fn close_surface(&self, handle: SurfaceHandle) {
        debug!(?handle, "headless break surface released");
    }
}

struct ActiveSurface {
    instance: u64,
    handle: SurfaceHandle,
    duration_secs: u32,
    created_at: Instant,
    countdown: JoinHandle<()>,
    failsafe: JoinHandle<()>,
}

impl ActiveSurface {
    fn countdown_end(&self) -> Instant {
        self.created_at + Duration::from_secs(u64::from(self.duration_secs))
    }

    fn remaining_secs(&self, now: Instant) -> u32 {
        let left = self.countdown_end().saturating_duration_since(now);
        let secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);
        u32::try_from(secs).unwrap_or(u32::MAX)
    }
}

enum SurfaceState {
    Absent,
    Active(ActiveSurface),
}

struct Inner {
    host: Arc<dyn SurfaceHost>,
    state: Mutex<SurfaceState>,
    next_instance: AtomicU64,
}

/// Shared handle to the break surface state machine. Cloning is cheap.
#[derive(Clone)]
pub struct BreakSurfaceController {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for BreakSurfaceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BreakSurfaceController")
            .field("status", &self.status())
            .finish()
    }
}

impl BreakSurfaceController {
    pub fn new(host: Arc<dyn SurfaceHost>) -> Self {
        Self {
            inner: Arc::new(Inner {
                host,
                state: Mutex::new(SurfaceState::Absent),
                next_instance: AtomicU64::new(1),
            }),
        }
    }

    /// Create the surface and start its timers.
    ///
    /// Returns `false` without doing anything when a surface is already
    /// active. Also returns `false`, leaving the controller Absent, when the
    /// shell fails to create the surface or no tokio runtime is available.
    pub fn open(&self, duration_secs: u32) -> bool {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("{}", SurfaceError::NoRuntime);
                return false;
            }
        };

        let mut state = self.inner.lock_state();
        if matches!(*state, SurfaceState::Active(_)) {
            debug!("break surface already active, ignoring open");
            return false;
        }

        let handle = match self.inner.host.create_fullscreen(duration_secs) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("{e}");
                return false;
            }
        };

        let instance = self.inner.next_instance.fetch_add(1, Ordering::Relaxed);
        let created_at = Instant::now();
        let failsafe_at =
            created_at + Duration::from_secs(u64::from(duration_secs)) + FAILSAFE_GRACE;
        let weak = Arc::downgrade(&self.inner);

        let countdown = runtime.spawn(run_countdown(
            weak.clone(),
            instance,
            handle,
            duration_secs,
            created_at,
        ));
        let failsafe = runtime.spawn(run_failsafe(weak, instance, failsafe_at));

        *state = SurfaceState::Active(ActiveSurface {
            instance,
            handle,
            duration_secs,
            created_at,
            countdown,
            failsafe,
        });
        drop(state);

        info!(duration_secs, "break surface opened");
        self.inner.host.show_countdown(handle, duration_secs);
        true
    }

    /// User-initiated dismissal. Accepted only once the visible countdown has
    /// reached zero; earlier attempts are ignored.
    pub fn request_close(&self) -> bool {
        let instance = {
            let state = self.inner.lock_state();
            match &*state {
                SurfaceState::Active(active) if Instant::now() >= active.countdown_end() => {
                    active.instance
                }
                SurfaceState::Active(active) => {
                    debug!(
                        remaining_secs = active.remaining_secs(Instant::now()),
                        "break not finished, ignoring close request"
                    );
                    return false;
                }
                SurfaceState::Absent => return false,
            }
        };
        self.inner.close_instance(Some(instance))
    }

    /// Close unconditionally. Idempotent: returns `false` when already Absent.
    pub fn close(&self) -> bool {
        self.inner.close_instance(None)
    }

    pub fn is_active(&self) -> bool {
        matches!(*self.inner.lock_state(), SurfaceState::Active(_))
    }

    /// Seconds left on the visible countdown, or `None` when Absent.
    pub fn remaining_seconds(&self) -> Option<u32> {
        match &*self.inner.lock_state() {
            SurfaceState::Active(active) => Some(active.remaining_secs(Instant::now())),
            SurfaceState::Absent => None,
        }
    }

    pub fn status(&self) -> SurfaceStatus {
        let now = Instant::now();
        match &*self.inner.lock_state() {
            SurfaceState::Absent => SurfaceStatus::Absent,
            SurfaceState::Active(active) => SurfaceStatus::Active {
                duration_secs: active.duration_secs,
                remaining_secs: active.remaining_secs(now),
                dismissible: now >= active.countdown_end(),
            },
        }
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_instance_active(&self, instance: u64) -> bool {
        matches!(&*self.lock_state(), SurfaceState::Active(a) if a.instance == instance)
    }

    /// Close the active surface if it matches `instance` (any surface when
    /// `None`).
    fn close_instance(&self, instance: Option<u64>) -> bool {
        let active = {
            let mut state = self.lock_state();
            match &*state {
                SurfaceState::Active(a) if instance.map_or(true, |i| i == a.instance) => {}
                _ => return false,
            }
            match std::mem::replace(&mut *state, SurfaceState::Absent) {
                SurfaceState::Active(active) => active,
                SurfaceState::Absent => return false,
            }
        };

        active.countdown.abort();
        active.failsafe.abort();
        self.host.close_surface(active.handle);
        info!("break surface closed");
        true
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = std::mem::replace(
            self.state.get_mut().unwrap_or_else(PoisonError::into_inner),
            SurfaceState::Absent,
        );
        if let SurfaceState::Active(active) = state {
            active.countdown.abort();
            active.failsafe.abort();
            self.host.close_surface(active.handle);
        }
    }
}

async fn run_countdown(
    inner: Weak<Inner>,
    instance: u64,
    handle: SurfaceHandle,
    duration_secs: u32,
    created_at: Instant,
) {
    let period = Duration::from_secs(1);
    let mut ticker = tokio::time::interval_at(created_at + period, period);
    let mut remaining = duration_secs;
    while remaining > 0 {
        ticker.tick().await;
        remaining -= 1;
        let Some(inner) = inner.upgrade() else {
            return;
        };
        if !inner.is_instance_active(instance) {
            return;
        }
        inner.host.show_countdown(handle, remaining);
    }
    debug!("break countdown finished");
}

async fn run_failsafe(inner: Weak<Inner>, instance: u64, deadline: Instant) {
    tokio::time::sleep_until(deadline).await;
    if let Some(inner) = inner.upgrade() {
        if inner.close_instance(Some(instance)) {
            info!("failsafe closed break surface");
        }
    }
}
