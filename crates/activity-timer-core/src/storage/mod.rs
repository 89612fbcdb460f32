mod config;
pub mod database;
pub mod memory;

pub use config::{Config, ReminderConfig, TickerConfig};
pub use database::SqliteStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use crate::error::{ConfigError, StoreError};
use crate::timer::TimerSnapshot;

/// Durable home for the single live timer snapshot.
///
/// Implementations must survive process restarts. Writes are synchronous:
/// a transition counts as persisted once `write_snapshot` returns.
pub trait PersistenceStore: Send {
    fn write_snapshot(&self, snapshot: &TimerSnapshot) -> Result<(), StoreError>;

    /// `Ok(None)` when nothing was ever written or the snapshot was cleared.
    fn read_snapshot(&self) -> Result<Option<TimerSnapshot>, StoreError>;

    fn clear_snapshot(&self) -> Result<(), StoreError>;
}

impl<T: PersistenceStore + ?Sized> PersistenceStore for Box<T> {
    fn write_snapshot(&self, snapshot: &TimerSnapshot) -> Result<(), StoreError> {
        (**self).write_snapshot(snapshot)
    }

    fn read_snapshot(&self) -> Result<Option<TimerSnapshot>, StoreError> {
        (**self).read_snapshot()
    }

    fn clear_snapshot(&self) -> Result<(), StoreError> {
        (**self).clear_snapshot()
    }
}

/// Returns the data directory, creating it if needed.
///
/// `ACTIVITY_TIMER_HOME` overrides the location outright. Otherwise this is
/// `~/.config/activity-timer[-dev]/`, with the `-dev` suffix selected by
/// `ACTIVITY_TIMER_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("ACTIVITY_TIMER_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("ACTIVITY_TIMER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("activity-timer-dev")
            } else {
                base_dir.join("activity-timer")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
