//! Periodic elapsed-time publisher.
//!
//! The tick driver only reads. It never transitions the timer, so it cannot
//! race with `start`/`pause`/`resume`/`end`. Missed ticks (host suspended the
//! process, runtime starved) are skipped rather than replayed: every tick
//! recomputes elapsed time from absolute instants.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::activity::SharedTimer;
use crate::events::Event;

pub struct TickDriver;

impl TickDriver {
    /// Spawn a driver publishing [`Event::Tick`] every `period`.
    ///
    /// Must be called from within a tokio runtime. A stopped driver is
    /// restarted by spawning a new one.
    pub fn spawn(timer: SharedTimer, period: Duration) -> TickHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::debug!(period_ms = period.as_millis() as u64, "tick driver started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let event = sample(&timer);
                        tracing::trace!(?event, "tick");
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("tick driver stopped");
        });

        TickHandle { stop: stop_tx, task }
    }
}

fn sample(timer: &SharedTimer) -> Event {
    let guard = timer.lock().unwrap_or_else(|e| e.into_inner());
    guard.tick()
}

/// Handle to a running [`TickDriver`]. Dropping it also stops the driver.
pub struct TickHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TickHandle {
    /// Signal the driver to stop and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "tick driver task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
