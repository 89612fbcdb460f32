//! Timer state machine implementation.
//!
//! The state machine is wall-clock based. It does not use internal threads
//! and never reads a clock itself: every operation takes `now`, which keeps
//! elapsed-time math reproducible in tests and after recovery.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -start-> Running -pause-> Paused -resume-> Running
//! Running | Paused -end/cancel-> Idle
//! ```
//!
//! Any other call is a no-op. Applied transitions persist a snapshot (or
//! clear it, for `end`/`cancel`) before returning.
//!
//! ## Usage
//!
//! ```ignore
//! let mut machine = TimerStateMachine::new(Box::new(store));
//! machine.start("Reading", None, now);
//! machine.pause(now + Duration::seconds(30));
//! let run = machine.end(now + Duration::seconds(60)).finished;
//! ```

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::state::{FinishedRun, TimerMode, TimerSnapshot, TimerState, MAX_REMINDER_INTERVAL};
use crate::error::{CoreError, ValidationError};
use crate::notify::NotificationInstruction;
use crate::storage::PersistenceStore;

/// Result of a transition request.
#[derive(Debug)]
pub struct Transition {
    /// State after the request.
    pub state: TimerState,
    /// `false` when the request was a no-op.
    pub changed: bool,
    pub notification: NotificationInstruction,
    /// Set only by an applied `end`.
    pub finished: Option<FinishedRun>,
    /// Non-fatal problem encountered while handling the request.
    pub diagnostic: Option<CoreError>,
}

impl Transition {
    fn unchanged(state: &TimerState) -> Self {
        Self {
            state: state.clone(),
            changed: false,
            notification: NotificationInstruction::None,
            finished: None,
            diagnostic: None,
        }
    }

    fn rejected(state: &TimerState, reason: ValidationError) -> Self {
        Self {
            diagnostic: Some(CoreError::Validation(reason)),
            ..Self::unchanged(state)
        }
    }
}

/// The single live timer.
pub struct TimerStateMachine {
    state: TimerState,
    store: Box<dyn PersistenceStore>,
}

impl TimerStateMachine {
    /// Create an idle machine writing snapshots to `store`.
    pub fn new(store: Box<dyn PersistenceStore>) -> Self {
        Self {
            state: TimerState::idle(),
            store,
        }
    }

    /// Rebuild a machine around an already validated state.
    pub(crate) fn from_state(state: TimerState, store: Box<dyn PersistenceStore>) -> Self {
        Self { state, store }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn mode(&self) -> TimerMode {
        self.state.mode
    }

    pub fn is_running(&self) -> bool {
        self.state.mode == TimerMode::Running
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        self.state.elapsed(now)
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> TimerSnapshot {
        self.state.to_snapshot(now)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a new run. Only valid from `Idle`; a live run is never ended
    /// implicitly, so starting over is the caller's explicit two-step choice.
    pub fn start(
        &mut self,
        subject_label: &str,
        reminder_interval: Option<std::time::Duration>,
        now: DateTime<Utc>,
    ) -> Transition {
        if self.state.mode != TimerMode::Idle {
            tracing::warn!(mode = %self.state.mode, "start ignored: a run is already active");
            return Transition::rejected(
                &self.state,
                ValidationError::AlreadyActive {
                    mode: self.state.mode.to_string(),
                },
            );
        }
        let subject = subject_label.trim();
        if subject.is_empty() {
            return Transition::rejected(&self.state, ValidationError::EmptySubject);
        }
        if reminder_interval.is_some_and(|d| d.is_zero() || d > MAX_REMINDER_INTERVAL) {
            return Transition::rejected(&self.state, ValidationError::InvalidInterval);
        }

        self.state = TimerState {
            mode: TimerMode::Running,
            subject_label: Some(subject.to_string()),
            reference_start: Some(now),
            paused_at: None,
            accumulated: Duration::zero(),
            reminder_interval,
            run_id: Some(Uuid::new_v4()),
            started_at: Some(now),
        };
        tracing::info!(subject, "timer started");

        let notification = match reminder_interval {
            Some(after) => NotificationInstruction::Schedule { after },
            None => NotificationInstruction::None,
        };
        self.applied(notification, None, self.persist(now))
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Transition {
        let Some(reference_start) = self.running_reference() else {
            tracing::debug!(mode = %self.state.mode, "pause ignored");
            return Transition::unchanged(&self.state);
        };

        self.state.mode = TimerMode::Paused;
        self.state.paused_at = Some(now.max(reference_start));
        tracing::info!(elapsed_secs = self.elapsed(now).num_seconds(), "timer paused");
        self.applied(NotificationInstruction::Cancel, None, self.persist(now))
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Transition {
        let (TimerMode::Paused, Some(reference_start), Some(paused_at)) =
            (self.state.mode, self.state.reference_start, self.state.paused_at)
        else {
            tracing::debug!(mode = %self.state.mode, "resume ignored");
            return Transition::unchanged(&self.state);
        };

        // Shift the reference forward so the pause window contributes nothing.
        let pause_duration = (now - paused_at).max(Duration::zero());
        self.state.reference_start = Some(reference_start + pause_duration);
        self.state.paused_at = None;
        self.state.mode = TimerMode::Running;
        tracing::info!(paused_secs = pause_duration.num_seconds(), "timer resumed");

        let notification = match self.state.reminder_interval {
            Some(after) => NotificationInstruction::Schedule { after },
            None => NotificationInstruction::None,
        };
        self.applied(notification, None, self.persist(now))
    }

    /// Finish the run and hand back its record.
    pub fn end(&mut self, now: DateTime<Utc>) -> Transition {
        if !self.state.mode.is_active() {
            tracing::debug!("end ignored: timer is idle");
            return Transition::unchanged(&self.state);
        }

        let elapsed = self.elapsed(now);
        let finished = FinishedRun {
            run_id: self.state.run_id.unwrap_or_else(Uuid::new_v4),
            subject_label: self.state.subject_label.clone().unwrap_or_default(),
            elapsed,
            started_at: self
                .state
                .started_at
                .or(self.state.reference_start)
                .unwrap_or(now),
            ended_at: now,
        };
        self.state = TimerState::idle();
        tracing::info!(
            subject = %finished.subject_label,
            elapsed_secs = elapsed.num_seconds(),
            "timer ended"
        );
        self.applied(NotificationInstruction::Cancel, Some(finished), self.clear())
    }

    /// Discard the run without producing a record.
    pub fn cancel(&mut self) -> Transition {
        if !self.state.mode.is_active() {
            tracing::debug!("cancel ignored: timer is idle");
            return Transition::unchanged(&self.state);
        }

        self.state = TimerState::idle();
        tracing::info!("timer cancelled");
        self.applied(NotificationInstruction::Cancel, None, self.clear())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn running_reference(&self) -> Option<DateTime<Utc>> {
        match self.state.mode {
            TimerMode::Running => self.state.reference_start,
            _ => None,
        }
    }

    fn applied(
        &self,
        notification: NotificationInstruction,
        finished: Option<FinishedRun>,
        diagnostic: Option<CoreError>,
    ) -> Transition {
        Transition {
            state: self.state.clone(),
            changed: true,
            notification,
            finished,
            diagnostic,
        }
    }

    /// Write the current state. A failed write never undoes the transition.
    fn persist(&self, now: DateTime<Utc>) -> Option<CoreError> {
        match self.store.write_snapshot(&self.state.to_snapshot(now)) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist timer snapshot");
                Some(CoreError::Store(e))
            }
        }
    }

    fn clear(&self) -> Option<CoreError> {
        match self.store.clear_snapshot() {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to clear timer snapshot");
                Some(CoreError::Store(e))
            }
        }
    }
}

impl std::fmt::Debug for TimerStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerStateMachine")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
