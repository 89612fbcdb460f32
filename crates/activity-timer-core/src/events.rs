use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::{FinishedRun, TimerMode, TimerSnapshot};

/// Every state change and tick produces an Event.
/// Displays subscribe to them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        run_id: Uuid,
        subject_label: String,
        reminder_interval_secs: Option<u64>,
        at: DateTime<Utc>,
    },
    TimerPaused {
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    TimerEnded {
        run: FinishedRun,
    },
    TimerCancelled {
        at: DateTime<Utc>,
    },
    /// A run survived a restart.
    TimerRecovered {
        mode: TimerMode,
        subject_label: String,
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    /// Periodic elapsed-time reading from the tick driver.
    Tick {
        mode: TimerMode,
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        snapshot: TimerSnapshot,
        elapsed_ms: u64,
        at: DateTime<Utc>,
    },
}

pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.num_milliseconds()).unwrap_or(0)
}
