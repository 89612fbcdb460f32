//! Timer commands.
//!
//! Every invocation is a cold start: the timer is recovered from the
//! snapshot store, one command is applied, and the process exits.

use std::sync::Arc;
use std::time::Duration;

use activity_timer_core::{
    ActivityTimer, Config, CoreError, Event, LogNotifier, SqliteStore, SystemClock, TickDriver, Transition,
};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start timing an activity
    Start {
        /// What is being timed
        subject: String,
        /// Remind every N seconds while running
        #[arg(long, value_name = "SECS")]
        remind_every: Option<u64>,
    },
    /// Pause the running timer
    Pause,
    /// Resume the paused timer
    Resume,
    /// End the run and print its record
    End,
    /// Discard the run without a record
    Cancel,
    /// Print current timer state as JSON
    Status,
    /// Print elapsed time on every tick
    Watch {
        /// Stop after this many ticks (default: until interrupted)
        #[arg(long)]
        ticks: Option<u64>,
    },
}

fn open_timer(config: &Config) -> Result<ActivityTimer, Box<dyn std::error::Error>> {
    let store = SqliteStore::open()?;
    let recovered = ActivityTimer::recover(Box::new(store), Box::new(LogNotifier), Arc::new(SystemClock), config);
    for diagnostic in &recovered.diagnostics {
        eprintln!("warning: {diagnostic}");
    }
    if let Some(event) = recovered.event() {
        tracing::debug!(?event, "recovered timer");
    }
    Ok(recovered.timer)
}

/// Print the outcome of a transition. Rejections become errors.
fn report(timer: &ActivityTimer, transition: Transition) -> Result<(), Box<dyn std::error::Error>> {
    match transition.diagnostic {
        Some(CoreError::Validation(e)) => return Err(e.into()),
        Some(other) => eprintln!("warning: {other}"),
        None => {}
    }

    let output = match transition.finished {
        Some(run) => Event::TimerEnded { run },
        None => timer.snapshot(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let mut timer = open_timer(&config)?;

    match action {
        TimerAction::Start { subject, remind_every } => {
            let transition = timer.start(&subject, remind_every.map(Duration::from_secs));
            report(&timer, transition)
        }
        TimerAction::Pause => {
            let transition = timer.pause();
            report(&timer, transition)
        }
        TimerAction::Resume => {
            let transition = timer.resume();
            report(&timer, transition)
        }
        TimerAction::End => {
            let transition = timer.end();
            report(&timer, transition)
        }
        TimerAction::Cancel => {
            let transition = timer.cancel();
            report(&timer, transition)
        }
        TimerAction::Status => {
            println!("{}", serde_json::to_string_pretty(&timer.snapshot())?);
            Ok(())
        }
        TimerAction::Watch { ticks } => watch(timer, config.ticker.period(), ticks),
    }
}

fn watch(timer: ActivityTimer, period: Duration, ticks: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    if ticks == Some(0) {
        return Ok(());
    }
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let mut events = timer.subscribe();
        let shared = timer.into_shared();
        let handle = TickDriver::spawn(shared, period);
        let mut seen = 0u64;

        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event @ Event::Tick { .. }) => {
                        println!("{}", serde_json::to_string(&event)?);
                        seen += 1;
                        if ticks.is_some_and(|limit| seen >= limit) {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "watch output lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        handle.stop().await;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
