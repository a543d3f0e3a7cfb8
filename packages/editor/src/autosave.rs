//! # Autosave Scheduling
//!
//! Debounce state machine deciding when a document is written. It performs
//! no I/O and reads no clock: the session feeds it events and the current
//! time, and asks for the next deadline.
//!
//! ```text
//!            edit                 deadline / manual
//!   Idle ───────────▶ Armed ─────────────────────────▶ InFlight
//!    ▲                 ▲  │ edit (restart window)          │
//!    │                 │  └──────┘                         │
//!    │                 └───────── failed, or edited ───────┤
//!    └──────────────────────── succeeded, clean ───────────┘
//! ```
//!
//! "Settled" is transient: applying an outcome moves straight back to
//! `Idle` or `Armed`.

use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};

/// Observable scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveState {
    Idle,
    Armed,
    InFlight,
}

/// Why a persist was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveTrigger {
    /// Quiet period elapsed
    Autosave,
    /// Explicit user action
    Manual,
    /// Final write while closing the session
    Close,
}

/// Outcome of a persist, as far as scheduling is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Succeeded { still_dirty: bool },
    Failed,
}

/// The debounced unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveTask {
    /// Start of the current debounce window
    pub scheduled_at: Instant,
    pub quiet_period: Duration,
}

impl SaveTask {
    pub fn deadline(&self) -> Instant {
        self.scheduled_at + self.quiet_period
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchedulerState {
    Idle,
    Armed(SaveTask),
    InFlight {
        trigger: SaveTrigger,
        /// Last edit seen while the write was running
        edited_at: Option<Instant>,
    },
}

#[derive(Debug)]
pub struct AutosaveScheduler {
    quiet_period: Duration,
    state: SchedulerState,
}

impl AutosaveScheduler {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            state: SchedulerState::Idle,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    pub fn state(&self) -> SaveState {
        match self.state {
            SchedulerState::Idle => SaveState::Idle,
            SchedulerState::Armed(_) => SaveState::Armed,
            SchedulerState::InFlight { .. } => SaveState::InFlight,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, SchedulerState::InFlight { .. })
    }

    /// Trigger of the running persist, if any
    pub fn in_flight_trigger(&self) -> Option<SaveTrigger> {
        match self.state {
            SchedulerState::InFlight { trigger, .. } => Some(trigger),
            _ => None,
        }
    }

    /// Pending debounce window, if armed
    pub fn pending_task(&self) -> Option<SaveTask> {
        match self.state {
            SchedulerState::Armed(task) => Some(task),
            _ => None,
        }
    }

    /// When the timer should fire, if armed
    pub fn deadline(&self) -> Option<Instant> {
        self.pending_task().map(|task| task.deadline())
    }

    /// A content-changing edit happened at `now`.
    ///
    /// Restarts the debounce window. While a write is running the edit is
    /// remembered and the window starts once the write settles.
    pub fn on_edit(&mut self, now: Instant) {
        self.state = match self.state {
            SchedulerState::Idle | SchedulerState::Armed(_) => SchedulerState::Armed(self.task_at(now)),
            SchedulerState::InFlight { trigger, .. } => SchedulerState::InFlight {
                trigger,
                edited_at: Some(now),
            },
        };
        tracing::trace!(state = ?self.state(), "autosave window restarted");
    }

    /// Fire the timer if the window has elapsed. Returns true when the
    /// caller must start an autosave.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.state {
            SchedulerState::Armed(task) if task.deadline() <= now => {
                self.state = SchedulerState::InFlight {
                    trigger: SaveTrigger::Autosave,
                    edited_at: None,
                };
                true
            }
            _ => false,
        }
    }

    /// Start a write outside the timer (manual save, close). Cancels any
    /// pending window. Returns false when a write is already running; the
    /// caller has to wait for it to settle.
    pub fn begin(&mut self, trigger: SaveTrigger) -> bool {
        if self.is_in_flight() {
            return false;
        }
        self.state = SchedulerState::InFlight {
            trigger,
            edited_at: None,
        };
        true
    }

    /// Apply the outcome of the running write
    pub fn settle(&mut self, outcome: SaveOutcome, now: Instant) {
        let edited_at = match self.state {
            SchedulerState::InFlight { edited_at, .. } => edited_at,
            // Nothing running: keep whatever window is pending
            _ => return,
        };

        self.state = match outcome {
            SaveOutcome::Succeeded { still_dirty: false } => SchedulerState::Idle,
            SaveOutcome::Succeeded { still_dirty: true } | SaveOutcome::Failed => {
                SchedulerState::Armed(self.task_at(edited_at.unwrap_or(now)))
            }
        };
    }

    /// Forget pending work after the document was reloaded. A running write
    /// stays accounted for until it settles.
    pub fn reset(&mut self) {
        self.state = match self.state {
            SchedulerState::InFlight { trigger, .. } => SchedulerState::InFlight {
                trigger,
                edited_at: None,
            },
            _ => SchedulerState::Idle,
        };
    }

    fn task_at(&self, scheduled_at: Instant) -> SaveTask {
        SaveTask {
            scheduled_at,
            quiet_period: self.quiet_period,
        }
    }
}
