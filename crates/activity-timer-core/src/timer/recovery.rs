//! Cold-start recovery of the live timer.
//!
//! A running timer is restored from its absolute reference instant, so the
//! time the process spent dead or suspended is counted without ever having
//! ticked. Anything unusable in the store is discarded and the timer starts
//! idle; recovery can lose a run but never fails.

use chrono::{DateTime, Duration, Utc};

use super::engine::TimerStateMachine;
use super::state::{TimerMode, TimerState};
use crate::error::{CoreError, StoreError, ValidationError};
use crate::notify::NotificationInstruction;
use crate::storage::PersistenceStore;

/// What recovery found in the store.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryOutcome {
    /// Nothing to restore (no snapshot, an idle one, or an unreadable store).
    Fresh,
    /// A snapshot existed but was unusable and has been cleared.
    Discarded { reason: String },
    /// A run was restored.
    Restored { mode: TimerMode, elapsed: Duration },
}

/// A rebuilt machine plus what the caller still has to do with it.
#[derive(Debug)]
pub struct Recovery {
    pub machine: TimerStateMachine,
    pub outcome: RecoveryOutcome,
    /// Any reminder pending before the restart was lost with the process.
    pub notification: NotificationInstruction,
    pub diagnostic: Option<CoreError>,
}

pub struct RecoveryProcedure;

impl RecoveryProcedure {
    /// Rebuild the live timer from `store` as of `now`.
    pub fn run(store: Box<dyn PersistenceStore>, now: DateTime<Utc>) -> Recovery {
        let snapshot = match store.read_snapshot() {
            Ok(snapshot) => snapshot,
            Err(StoreError::Serialize(e)) => {
                return Self::discard(store, format!("unreadable snapshot: {e}"));
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not read timer snapshot; starting idle");
                return Recovery {
                    machine: TimerStateMachine::new(store),
                    outcome: RecoveryOutcome::Fresh,
                    notification: NotificationInstruction::None,
                    diagnostic: Some(CoreError::Store(e)),
                };
            }
        };

        let Some(snapshot) = snapshot else {
            tracing::debug!("no timer snapshot; starting idle");
            return Self::fresh(store, None);
        };

        let state = match TimerState::try_from(&snapshot) {
            Ok(state) => state,
            Err(ValidationError::CorruptSnapshot(reason)) => return Self::discard(store, reason),
            Err(other) => return Self::discard(store, other.to_string()),
        };

        if state.mode == TimerMode::Idle {
            // A leftover idle snapshot carries nothing; drop it.
            let diagnostic = store.clear_snapshot().err().map(CoreError::Store);
            return Self::fresh(store, diagnostic);
        }

        let mode = state.mode;
        let elapsed = state.elapsed(now);
        let notification = match (mode, state.reminder_interval) {
            (TimerMode::Running, Some(after)) => NotificationInstruction::Schedule { after },
            _ => NotificationInstruction::None,
        };
        tracing::info!(
            %mode,
            subject = state.subject_label.as_deref().unwrap_or_default(),
            elapsed_secs = elapsed.num_seconds(),
            "timer recovered"
        );

        Recovery {
            machine: TimerStateMachine::from_state(state, store),
            outcome: RecoveryOutcome::Restored { mode, elapsed },
            notification,
            diagnostic: None,
        }
    }

    fn fresh(store: Box<dyn PersistenceStore>, diagnostic: Option<CoreError>) -> Recovery {
        Recovery {
            machine: TimerStateMachine::new(store),
            outcome: RecoveryOutcome::Fresh,
            notification: NotificationInstruction::None,
            diagnostic,
        }
    }

    fn discard(store: Box<dyn PersistenceStore>, reason: String) -> Recovery {
        tracing::warn!(%reason, "discarding timer snapshot");
        let diagnostic = match store.clear_snapshot() {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to clear discarded snapshot");
                Some(CoreError::Store(e))
            }
        };
        Recovery {
            machine: TimerStateMachine::new(store),
            outcome: RecoveryOutcome::Discarded { reason },
            notification: NotificationInstruction::None,
            diagnostic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::timer::TimerSnapshot;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn snapshot(mode: TimerMode) -> TimerSnapshot {
        TimerSnapshot {
            mode,
            subject_label: Some("Reading".into()),
            reference_start: Some(t0()),
            paused_at: (mode == TimerMode::Paused).then(|| t0() + Duration::seconds(30)),
            accumulated_secs: 5.0,
            notification_interval_secs: Some(600.0),
            run_id: None,
            started_at: None,
            saved_at: t0(),
        }
    }

    fn store_with(snap: &TimerSnapshot) -> MemoryStore {
        let store = MemoryStore::new();
        store.put_raw(serde_json::to_string(snap).unwrap());
        store
    }

    #[test]
    fn empty_store_recovers_idle() {
        let r = RecoveryProcedure::run(Box::new(MemoryStore::new()), t0());
        assert_eq!(r.outcome, RecoveryOutcome::Fresh);
        assert_eq!(r.machine.mode(), TimerMode::Idle);
        assert!(r.diagnostic.is_none());
    }

    #[test]
    fn running_snapshot_fast_forwards() {
        let store = store_with(&snapshot(TimerMode::Running));
        let now = t0() + Duration::hours(2);
        let r = RecoveryProcedure::run(Box::new(store), now);

        let expected = Duration::hours(2) + Duration::seconds(5);
        assert_eq!(
            r.outcome,
            RecoveryOutcome::Restored {
                mode: TimerMode::Running,
                elapsed: expected
            }
        );
        assert_eq!(r.machine.elapsed(now), expected);
        assert_eq!(
            r.notification,
            NotificationInstruction::Schedule {
                after: std::time::Duration::from_secs(600)
            }
        );
    }

    #[test]
    fn paused_snapshot_uses_persisted_pause_instant() {
        let store = store_with(&snapshot(TimerMode::Paused));
        let r = RecoveryProcedure::run(Box::new(store), t0() + Duration::days(1));

        assert_eq!(r.machine.mode(), TimerMode::Paused);
        assert_eq!(r.machine.state().paused_at, Some(t0() + Duration::seconds(30)));
        assert_eq!(r.machine.elapsed(t0() + Duration::days(3)), Duration::seconds(35));
        assert_eq!(r.notification, NotificationInstruction::None);
    }

    #[test]
    fn missing_subject_is_discarded_and_cleared() {
        let mut snap = snapshot(TimerMode::Running);
        snap.subject_label = None;
        let store = store_with(&snap);
        let r = RecoveryProcedure::run(Box::new(store.clone()), t0());

        assert!(matches!(r.outcome, RecoveryOutcome::Discarded { .. }));
        assert_eq!(r.machine.mode(), TimerMode::Idle);
        assert!(r.diagnostic.is_none());
        assert!(store.raw().is_none());
    }

    #[test]
    fn huge_accumulated_duration_is_discarded() {
        let mut snap = snapshot(TimerMode::Running);
        snap.accumulated_secs = 1e300;
        let store = store_with(&snap);
        let r = RecoveryProcedure::run(Box::new(store.clone()), t0() + Duration::seconds(10));

        assert!(matches!(r.outcome, RecoveryOutcome::Discarded { .. }));
        assert_eq!(r.machine.mode(), TimerMode::Idle);
        assert!(store.raw().is_none());
    }

    #[test]
    fn longest_reminder_interval_survives_restart() {
        let store = MemoryStore::new();
        let mut m = TimerStateMachine::new(Box::new(store.clone()));
        assert!(m.start("Reading", Some(crate::timer::MAX_REMINDER_INTERVAL), t0()).changed);

        let r = RecoveryProcedure::run(Box::new(store), t0() + Duration::seconds(10));
        assert!(matches!(r.outcome, RecoveryOutcome::Restored { .. }));
        assert_eq!(
            r.notification,
            NotificationInstruction::Schedule {
                after: crate::timer::MAX_REMINDER_INTERVAL
            }
        );
    }

    #[test]
    fn truncated_payload_is_discarded() {
        let store = MemoryStore::new();
        store.put_raw(r#"{"mode":"running","subject_la"#);
        let r = RecoveryProcedure::run(Box::new(store.clone()), t0());
        assert!(matches!(r.outcome, RecoveryOutcome::Discarded { .. }));
        assert!(store.raw().is_none());
    }

    #[test]
    fn unreadable_store_starts_idle_with_diagnostic() {
        let store = store_with(&snapshot(TimerMode::Running));
        store.set_failing(true);
        let r = RecoveryProcedure::run(Box::new(store), t0());
        assert_eq!(r.outcome, RecoveryOutcome::Fresh);
        assert_eq!(r.machine.mode(), TimerMode::Idle);
        assert!(matches!(r.diagnostic, Some(CoreError::Store(_))));
    }

    #[test]
    fn idle_snapshot_is_dropped() {
        let store = store_with(&snapshot(TimerMode::Idle));
        let r = RecoveryProcedure::run(Box::new(store.clone()), t0());
        assert_eq!(r.outcome, RecoveryOutcome::Fresh);
        assert!(store.raw().is_none());
    }

    #[test]
    fn recovered_machine_keeps_working() {
        let store = store_with(&snapshot(TimerMode::Paused));
        let mut machine = RecoveryProcedure::run(Box::new(store), t0() + Duration::minutes(10)).machine;
        machine.resume(t0() + Duration::minutes(10));
        let run = machine
            .end(t0() + Duration::minutes(11))
            .finished
            .unwrap();
        assert_eq!(run.elapsed, Duration::seconds(35 + 60));
        assert_eq!(run.subject_label, "Reading");
        assert_eq!(run.started_at, t0());
    }
}
