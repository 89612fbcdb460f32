//! "Timer still running" reminder coordination.
//!
//! The state machine never talks to a notification backend. Each transition
//! yields a [`NotificationInstruction`]; the [`NotificationCoordinator`] turns
//! it into a call on a [`NotificationService`].

mod coordinator;
mod service;

pub use coordinator::NotificationCoordinator;
pub use service::{LogNotifier, NotificationRequest, NotificationService, RecordingNotifier};

use std::time::Duration;

/// What a transition asks of the reminder backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationInstruction {
    /// Leave any pending reminder alone.
    #[default]
    None,
    /// Replace any pending reminder with one firing `after` from now.
    Schedule { after: Duration },
    /// Drop the pending reminder, if any.
    Cancel,
}
