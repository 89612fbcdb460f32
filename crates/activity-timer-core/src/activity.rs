//! The caller-facing timer.
//!
//! [`ActivityTimer`] owns the one live [`TimerStateMachine`], reads the
//! injected clock for every request, forwards reminder instructions to the
//! [`NotificationCoordinator`], and broadcasts an [`Event`] for each applied
//! transition. It is an ordinary owned value; share it as a [`SharedTimer`]
//! when a tick driver runs alongside the caller.

use std::sync::{Arc, Mutex};

use chrono::Duration;
use tokio::sync::broadcast;

use crate::clock::Clock;
use crate::error::CoreError;
use crate::events::{millis, Event};
use crate::notify::{NotificationCoordinator, NotificationService};
use crate::storage::{Config, PersistenceStore};
use crate::timer::{RecoveryOutcome, RecoveryProcedure, TimerMode, TimerState, TimerStateMachine, Transition};

const EVENT_CAPACITY: usize = 64;

pub type SharedTimer = Arc<Mutex<ActivityTimer>>;

pub struct ActivityTimer {
    machine: TimerStateMachine,
    notifier: NotificationCoordinator,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<Event>,
    default_interval: Option<std::time::Duration>,
}

/// A timer rebuilt at cold start.
pub struct Recovered {
    pub timer: ActivityTimer,
    pub outcome: RecoveryOutcome,
    /// Problems met while recovering; none of them stop the timer.
    pub diagnostics: Vec<CoreError>,
}

impl Recovered {
    /// The event describing a restored run, if one was restored.
    pub fn event(&self) -> Option<Event> {
        let RecoveryOutcome::Restored { mode, elapsed } = &self.outcome else {
            return None;
        };
        Some(Event::TimerRecovered {
            mode: *mode,
            subject_label: self.timer.state().subject_label.clone().unwrap_or_default(),
            elapsed_ms: millis(*elapsed),
            at: self.timer.clock.now(),
        })
    }
}

impl ActivityTimer {
    pub fn new(machine: TimerStateMachine, notifier: NotificationCoordinator, clock: Arc<dyn Clock>, config: &Config) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            machine,
            notifier,
            clock,
            events,
            default_interval: config.reminder.default_interval(),
        }
    }

    /// Rebuild the timer from `store` and re-arm its reminder.
    pub fn recover(
        store: Box<dyn PersistenceStore>,
        service: Box<dyn NotificationService>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Recovered {
        let recovery = RecoveryProcedure::run(store, clock.now());
        let notifier = NotificationCoordinator::new(service, &config.reminder);

        let mut diagnostics: Vec<CoreError> = recovery.diagnostic.into_iter().collect();
        let subject = recovery.machine.state().subject_label.clone();
        if let Err(e) = notifier.apply(recovery.notification, subject.as_deref()) {
            tracing::warn!(error = %e, "failed to re-arm reminder after recovery");
            diagnostics.push(e.into());
        }

        Recovered {
            timer: Self::new(recovery.machine, notifier, clock, config),
            outcome: recovery.outcome,
            diagnostics,
        }
    }

    pub fn into_shared(self) -> SharedTimer {
        Arc::new(Mutex::new(self))
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        self.machine.state()
    }

    pub fn mode(&self) -> TimerMode {
        self.machine.mode()
    }

    pub fn elapsed(&self) -> Duration {
        self.machine.elapsed(self.clock.now())
    }

    /// Full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let now = self.clock.now();
        Event::StateSnapshot {
            snapshot: self.machine.snapshot(now),
            elapsed_ms: millis(self.machine.elapsed(now)),
            at: now,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Read the elapsed time and publish it. Never changes state.
    pub fn tick(&self) -> Event {
        let now = self.clock.now();
        let event = Event::Tick {
            mode: self.machine.mode(),
            elapsed_ms: millis(self.machine.elapsed(now)),
            at: now,
        };
        self.publish(event.clone());
        event
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a run. Without an explicit interval the configured default
    /// reminder interval (if any) applies.
    pub fn start(&mut self, subject_label: &str, reminder_interval: Option<std::time::Duration>) -> Transition {
        let now = self.clock.now();
        let transition = self
            .machine
            .start(subject_label, reminder_interval.or(self.default_interval), now);
        let event = Event::TimerStarted {
            run_id: transition.state.run_id.unwrap_or_default(),
            subject_label: transition.state.subject_label.clone().unwrap_or_default(),
            reminder_interval_secs: transition.state.reminder_interval.map(|d| d.as_secs()),
            at: now,
        };
        self.dispatch(transition, event)
    }

    pub fn pause(&mut self) -> Transition {
        let now = self.clock.now();
        let transition = self.machine.pause(now);
        let event = Event::TimerPaused {
            elapsed_ms: millis(self.machine.elapsed(now)),
            at: now,
        };
        self.dispatch(transition, event)
    }

    pub fn resume(&mut self) -> Transition {
        let now = self.clock.now();
        let transition = self.machine.resume(now);
        let event = Event::TimerResumed {
            elapsed_ms: millis(self.machine.elapsed(now)),
            at: now,
        };
        self.dispatch(transition, event)
    }

    pub fn end(&mut self) -> Transition {
        let now = self.clock.now();
        let transition = self.machine.end(now);
        let event = transition
            .finished
            .clone()
            .map(|run| Event::TimerEnded { run })
            .unwrap_or(Event::TimerCancelled { at: now });
        self.dispatch(transition, event)
    }

    pub fn cancel(&mut self) -> Transition {
        let now = self.clock.now();
        let transition = self.machine.cancel();
        self.dispatch(transition, Event::TimerCancelled { at: now })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn dispatch(&mut self, mut transition: Transition, event: Event) -> Transition {
        if !transition.changed {
            return transition;
        }

        let subject = transition.state.subject_label.as_deref();
        if let Err(e) = self.notifier.apply(transition.notification, subject) {
            // A missed reminder never affects the timer itself.
            tracing::warn!(error = %e, "reminder request failed");
            if transition.diagnostic.is_none() {
                transition.diagnostic = Some(e.into());
            }
        }

        self.publish(event);
        transition
    }

    fn publish(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for ActivityTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityTimer")
            .field("machine", &self.machine)
            .field("notifier", &self.notifier)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::notify::{NotificationRequest, RecordingNotifier};
    use crate::storage::MemoryStore;
    use chrono::{DateTime, Utc};
    use std::time::Duration as StdDuration;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    struct Rig {
        timer: ActivityTimer,
        clock: Arc<ManualClock>,
        store: MemoryStore,
        notifier: RecordingNotifier,
    }

    fn rig(config: &Config) -> Rig {
        let clock = Arc::new(ManualClock::new(t0()));
        let store = MemoryStore::new();
        let notifier = RecordingNotifier::new();
        let timer = ActivityTimer::new(
            TimerStateMachine::new(Box::new(store.clone())),
            NotificationCoordinator::new(Box::new(notifier.clone()), &config.reminder),
            clock.clone(),
            config,
        );
        Rig {
            timer,
            clock,
            store,
            notifier,
        }
    }

    #[test]
    fn facade_drives_reminders() {
        let mut r = rig(&Config::default());
        let id = "activity-timer-reminder";
        let every = StdDuration::from_secs(1200);

        r.timer.start("Reading", Some(every));
        assert_eq!(r.notifier.pending(id), Some(every));

        r.clock.advance(Duration::seconds(30));
        r.timer.pause();
        assert_eq!(r.notifier.pending(id), None);

        r.clock.advance(Duration::seconds(60));
        r.timer.resume();
        assert_eq!(r.notifier.pending(id), Some(every));

        r.clock.advance(Duration::seconds(10));
        let t = r.timer.end();
        assert_eq!(t.finished.unwrap().elapsed, Duration::seconds(40));
        assert_eq!(r.notifier.pending(id), None);
    }

    #[test]
    fn configured_default_interval_applies() {
        let mut config = Config::default();
        config.reminder.default_interval_secs = Some(300);
        let mut r = rig(&config);
        r.timer.start("Reading", None);
        assert_eq!(r.timer.state().reminder_interval, Some(StdDuration::from_secs(300)));
        match r.notifier.last() {
            Some(NotificationRequest::Schedule { after, body, .. }) => {
                assert_eq!(after, StdDuration::from_secs(300));
                assert_eq!(body, "Still tracking Reading");
            }
            other => panic!("expected a schedule request, got {other:?}"),
        }
    }

    #[test]
    fn no_op_makes_no_reminder_calls_and_no_events() {
        let mut r = rig(&Config::default());
        let mut rx = r.timer.subscribe();
        assert!(!r.timer.pause().changed);
        assert!(!r.timer.resume().changed);
        assert!(!r.timer.cancel().changed);
        assert!(r.notifier.requests().is_empty());
        assert!(rx.try_recv().is_err());
        assert_eq!(r.store.write_count(), 0);
    }

    #[test]
    fn transitions_are_broadcast() {
        let mut r = rig(&Config::default());
        let mut rx = r.timer.subscribe();

        r.timer.start("Reading", None);
        r.clock.advance(Duration::seconds(5));
        r.timer.pause();
        r.timer.resume();
        r.timer.cancel();

        assert!(matches!(rx.try_recv().unwrap(), Event::TimerStarted { ref subject_label, .. } if subject_label == "Reading"));
        assert!(matches!(rx.try_recv().unwrap(), Event::TimerPaused { elapsed_ms: 5000, .. }));
        assert!(matches!(rx.try_recv().unwrap(), Event::TimerResumed { elapsed_ms: 5000, .. }));
        assert!(matches!(rx.try_recv().unwrap(), Event::TimerCancelled { .. }));
    }

    #[test]
    fn notification_failure_is_reported_but_harmless() {
        let mut r = rig(&Config::default());
        r.notifier.set_failing(true);
        let t = r.timer.start("Reading", Some(StdDuration::from_secs(60)));
        assert!(t.changed);
        assert!(matches!(t.diagnostic, Some(CoreError::Notification(_))));
        r.clock.advance(Duration::seconds(42));
        assert_eq!(r.timer.elapsed(), Duration::seconds(42));
    }

    #[test]
    fn recover_rearms_running_reminder() {
        let config = Config::default();
        let mut r = rig(&config);
        r.timer.start("Reading", Some(StdDuration::from_secs(900)));
        r.clock.advance(Duration::minutes(45));

        // The process dies; a new one starts from the same store.
        let notifier = RecordingNotifier::new();
        let recovered = ActivityTimer::recover(
            Box::new(r.store.clone()),
            Box::new(notifier.clone()),
            r.clock.clone(),
            &config,
        );
        assert!(recovered.diagnostics.is_empty());
        assert_eq!(recovered.timer.elapsed(), Duration::minutes(45));
        assert_eq!(notifier.pending("activity-timer-reminder"), Some(StdDuration::from_secs(900)));
        assert!(matches!(
            recovered.event(),
            Some(Event::TimerRecovered {
                mode: TimerMode::Running,
                elapsed_ms: 2_700_000,
                ..
            })
        ));
    }

    #[test]
    fn tick_reports_without_changing_state() {
        let mut r = rig(&Config::default());
        r.timer.start("Reading", None);
        let before = r.timer.state().clone();
        r.clock.advance(Duration::seconds(3));
        assert!(matches!(
            r.timer.tick(),
            Event::Tick {
                mode: TimerMode::Running,
                elapsed_ms: 3000,
                ..
            }
        ));
        assert_eq!(r.timer.state(), &before);
        assert_eq!(r.store.write_count(), 1);
    }
}
