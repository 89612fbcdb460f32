//! Timer state value types and their persisted form.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    #[default]
    Idle,
    Running,
    Paused,
}

impl TimerMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerMode::Idle => "idle",
            TimerMode::Running => "running",
            TimerMode::Paused => "paused",
        }
    }

    pub fn is_active(self) -> bool {
        self != TimerMode::Idle
    }
}

impl std::fmt::Display for TimerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stopwatch data owned by [`TimerStateMachine`](super::TimerStateMachine).
///
/// Elapsed time is always derived as `now - reference_start + accumulated`,
/// so there is no frozen-elapsed field. Pausing records `paused_at`; resuming
/// shifts `reference_start` forward by the length of the pause.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerState {
    pub mode: TimerMode,
    /// What is being timed. Present whenever `mode` is not `Idle`.
    pub subject_label: Option<String>,
    pub reference_start: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    /// Banked duration from earlier segments. Never negative.
    pub accumulated: Duration,
    /// "Still running" reminder interval for this run.
    pub reminder_interval: Option<std::time::Duration>,
    /// Identifies one run from `start` until `end`/`cancel`.
    pub run_id: Option<Uuid>,
    /// When the run was started. Unlike `reference_start` this never moves.
    pub started_at: Option<DateTime<Utc>>,
}

impl Default for TimerState {
    fn default() -> Self {
        Self::idle()
    }
}

impl TimerState {
    pub fn idle() -> Self {
        Self {
            mode: TimerMode::Idle,
            subject_label: None,
            reference_start: None,
            paused_at: None,
            accumulated: Duration::zero(),
            reminder_interval: None,
            run_id: None,
            started_at: None,
        }
    }

    /// Elapsed time at `now`. Never negative; frozen while paused.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let segment = match (self.mode, self.reference_start) {
            (TimerMode::Idle, _) | (_, None) => return Duration::zero(),
            (TimerMode::Running, Some(start)) => now - start,
            (TimerMode::Paused, Some(start)) => self.paused_at.unwrap_or(start) - start,
        };
        segment
            .max(Duration::zero())
            .checked_add(&self.accumulated)
            .unwrap_or(Duration::MAX)
    }

    /// Build the persisted form of this state.
    pub fn to_snapshot(&self, saved_at: DateTime<Utc>) -> TimerSnapshot {
        TimerSnapshot {
            mode: self.mode,
            subject_label: self.subject_label.clone(),
            reference_start: self.reference_start,
            paused_at: self.paused_at,
            accumulated_secs: duration_to_secs(self.accumulated),
            notification_interval_secs: self.reminder_interval.map(|d| d.as_secs_f64()),
            run_id: self.run_id,
            started_at: self.started_at,
            saved_at,
        }
    }
}

/// Persisted representation of [`TimerState`].
///
/// Instants are stored in absolute wall-clock form so that a recovered
/// running timer can fast-forward through the time the process was dead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub mode: TimerMode,
    #[serde(default)]
    pub subject_label: Option<String>,
    #[serde(default)]
    pub reference_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub paused_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accumulated_secs: f64,
    #[serde(default)]
    pub notification_interval_secs: Option<f64>,
    #[serde(default)]
    pub run_id: Option<Uuid>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    pub saved_at: DateTime<Utc>,
}

impl TryFrom<&TimerSnapshot> for TimerState {
    type Error = ValidationError;

    fn try_from(snap: &TimerSnapshot) -> Result<Self, Self::Error> {
        let corrupt = |msg: &str| ValidationError::CorruptSnapshot(msg.to_string());

        if snap.mode == TimerMode::Idle {
            return Ok(TimerState::idle());
        }

        let subject = snap
            .subject_label
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| corrupt("missing subject label"))?;
        let reference_start = snap
            .reference_start
            .ok_or_else(|| corrupt("missing reference start"))?;
        let accumulated = secs_to_duration(snap.accumulated_secs)
            .ok_or_else(|| corrupt("accumulated duration is out of range"))?;
        let reminder_interval = match snap.notification_interval_secs {
            None => None,
            Some(secs) => Some(interval_from_secs(secs).ok_or_else(|| corrupt("reminder interval is out of range"))?),
        };

        let paused_at = match snap.mode {
            TimerMode::Paused => {
                let paused_at = snap.paused_at.ok_or_else(|| corrupt("paused without pause instant"))?;
                if paused_at < reference_start {
                    return Err(corrupt("pause instant precedes reference start"));
                }
                Some(paused_at)
            }
            _ => None,
        };

        Ok(TimerState {
            mode: snap.mode,
            subject_label: Some(subject.to_string()),
            reference_start: Some(reference_start),
            paused_at,
            accumulated,
            reminder_interval,
            run_id: Some(snap.run_id.unwrap_or_else(Uuid::new_v4)),
            started_at: Some(snap.started_at.unwrap_or(reference_start)),
        })
    }
}

/// Record handed to the caller when a run ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedRun {
    pub run_id: Uuid,
    pub subject_label: String,
    #[serde(rename = "elapsed_ms", with = "duration_ms")]
    pub elapsed: Duration,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

pub(crate) fn duration_to_secs(d: Duration) -> f64 {
    d.num_milliseconds() as f64 / 1000.0
}

/// Longest duration a snapshot may carry; anything larger is corrupt.
const MAX_SNAPSHOT_SECS: f64 = 100.0 * 366.0 * 24.0 * 3600.0;

/// Longest reminder interval a run may be started with.
pub const MAX_REMINDER_INTERVAL: std::time::Duration = std::time::Duration::from_secs(366 * 24 * 3600);

pub(crate) fn secs_to_duration(secs: f64) -> Option<Duration> {
    if !secs.is_finite() || !(0.0..=MAX_SNAPSHOT_SECS).contains(&secs) {
        return None;
    }
    Duration::try_milliseconds((secs * 1000.0).round() as i64)
}

pub(crate) fn interval_from_secs(secs: f64) -> Option<std::time::Duration> {
    if !secs.is_finite() || secs <= 0.0 || secs > MAX_REMINDER_INTERVAL.as_secs_f64() {
        return None;
    }
    std::time::Duration::try_from_secs_f64(secs).ok()
}

mod duration_ms {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_milliseconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        i64::deserialize(d).map(Duration::milliseconds)
    }
}
