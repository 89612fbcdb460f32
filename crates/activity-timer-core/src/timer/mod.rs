mod engine;
mod recovery;
mod state;

pub use engine::{TimerStateMachine, Transition};
pub use recovery::{Recovery, RecoveryOutcome, RecoveryProcedure};
pub use state::{FinishedRun, TimerMode, TimerSnapshot, TimerState, MAX_REMINDER_INTERVAL};
