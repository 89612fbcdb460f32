//! Core error types for activity-timer-core.
//!
//! Errors never abort a timer transition. The state machine carries them back
//! to the caller as diagnostics; only configuration and CLI code propagate
//! them with `?`.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for activity-timer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Snapshot store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Reminder delivery errors
    #[error("Notification error: {0}")]
    Notification(#[from] NotifyError),

    /// Rejected transitions and invalid snapshots
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Snapshot store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    Query(String),

    /// Database is locked
    #[error("Store is locked")]
    Locked,

    /// Snapshot could not be encoded or decoded
    #[error("Snapshot encoding failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Store is unavailable (used by in-memory stores that simulate outages)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Reminder delivery errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The platform refused the schedule request
    #[error("Failed to schedule reminder '{id}': {message}")]
    ScheduleFailed { id: String, message: String },

    /// The platform refused the cancel request
    #[error("Failed to cancel reminder '{id}': {message}")]
    CancelFailed { id: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Rejected transitions and structurally invalid snapshots.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `start` called while a run is already active
    #[error("A run is already {mode}; end or cancel it before starting another")]
    AlreadyActive { mode: String },

    /// Subject label is empty
    #[error("Subject label must not be empty")]
    EmptySubject,

    /// Reminder interval is zero or longer than a year
    #[error("Reminder interval must be positive and at most a year")]
    InvalidInterval,

    /// Persisted snapshot is incomplete or inconsistent
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                StoreError::Locked
            }
            _ => StoreError::Query(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
