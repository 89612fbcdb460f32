//! In-process snapshot store.
//!
//! Keeps the snapshot as serialized JSON, exactly as a durable store would,
//! so precision loss and corrupt payloads behave the same way. Clones share
//! the same slot, which lets a test hand one handle to an engine and keep
//! another to inspect or to simulate a restart.

use std::sync::{Arc, Mutex, MutexGuard};

use super::PersistenceStore;
use crate::error::StoreError;
use crate::timer::TimerSnapshot;

#[derive(Debug, Default)]
struct Slot {
    raw: Option<String>,
    writes: usize,
    failing: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Slot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The raw persisted payload, if any.
    pub fn raw(&self) -> Option<String> {
        self.slot().raw.clone()
    }

    /// Overwrite the payload directly (e.g. with a truncated write).
    pub fn put_raw(&self, raw: impl Into<String>) {
        self.slot().raw = Some(raw.into());
    }

    /// Number of successful writes and clears.
    pub fn write_count(&self) -> usize {
        self.slot().writes
    }

    /// Make every subsequent operation fail until switched back off.
    pub fn set_failing(&self, failing: bool) {
        self.slot().failing = failing;
    }
}

impl PersistenceStore for MemoryStore {
    fn write_snapshot(&self, snapshot: &TimerSnapshot) -> Result<(), StoreError> {
        let json = serde_json::to_string(snapshot)?;
        let mut slot = self.slot();
        if slot.failing {
            return Err(StoreError::Unavailable("write rejected".into()));
        }
        slot.raw = Some(json);
        slot.writes += 1;
        Ok(())
    }

    fn read_snapshot(&self) -> Result<Option<TimerSnapshot>, StoreError> {
        let slot = self.slot();
        if slot.failing {
            return Err(StoreError::Unavailable("read rejected".into()));
        }
        match slot.raw.as_deref() {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    fn clear_snapshot(&self) -> Result<(), StoreError> {
        let mut slot = self.slot();
        if slot.failing {
            return Err(StoreError::Unavailable("clear rejected".into()));
        }
        slot.raw = None;
        slot.writes += 1;
        Ok(())
    }
}
