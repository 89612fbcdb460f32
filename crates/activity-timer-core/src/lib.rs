//! # Activity Timer Core Library
//!
//! A stopwatch for timing one activity at a time that survives the process
//! being suspended, killed and restarted without losing elapsed time, and
//! that keeps a single "timer still running" reminder in step with it.
//!
//! ## Architecture
//!
//! - **Timer state machine**: wall-clock based; every operation takes `now`
//!   and persists a snapshot as a side effect
//! - **Recovery**: rebuilds the live timer from the last snapshot at cold
//!   start, fast-forwarding a running timer through the downtime
//! - **Reminders**: transitions yield schedule/cancel instructions that a
//!   coordinator forwards to a notification backend
//! - **Storage**: SQLite snapshot store and TOML configuration
//!
//! ## Key Components
//!
//! - [`ActivityTimer`]: caller-facing timer with an event stream
//! - [`TimerStateMachine`]: the transition core
//! - [`RecoveryProcedure`]: cold-start reconstruction
//! - [`NotificationCoordinator`]: reminder scheduling
//! - [`TickDriver`]: periodic elapsed-time publisher

pub mod activity;
pub mod clock;
pub mod error;
pub mod events;
pub mod notify;
pub mod storage;
pub mod ticker;
pub mod timer;

pub use activity::{ActivityTimer, Recovered, SharedTimer};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, NotifyError, StoreError, ValidationError};
pub use events::Event;
pub use notify::{LogNotifier, NotificationCoordinator, NotificationInstruction, NotificationService, RecordingNotifier};
pub use storage::{Config, MemoryStore, PersistenceStore, SqliteStore};
pub use ticker::{TickDriver, TickHandle};
pub use timer::{
    FinishedRun, RecoveryOutcome, RecoveryProcedure, TimerMode, TimerSnapshot, TimerState, TimerStateMachine,
    Transition,
};
