use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cycle::Phase;
use crate::notify::{DispatchOutcome, NotificationRequest};

/// What started a break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakTrigger {
    /// The work countdown ran out.
    Natural,
    /// The user skipped ahead.
    Skipped,
}

/// Every state change of the cycle produces an Event.
/// Shells subscribe to them to drive their views.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    BreakStarted {
        trigger: BreakTrigger,
        request: NotificationRequest,
        /// Whether the request got past the cooldown.
        delivered: bool,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    WorkStarted {
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    CyclePaused {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    CycleResumed {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    CycleReset {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub(crate) fn break_started(
        trigger: BreakTrigger,
        request: NotificationRequest,
        outcome: DispatchOutcome,
        duration_secs: u64,
    ) -> Self {
        Event::BreakStarted {
            trigger,
            request,
            delivered: matches!(outcome, DispatchOutcome::Delivered(_)),
            duration_secs,
            at: Utc::now(),
        }
    }
}
