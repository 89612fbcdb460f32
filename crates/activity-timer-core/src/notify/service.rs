use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::NotifyError;

/// Platform notification backend.
///
/// Both calls must be idempotent: scheduling an id that is already pending
/// replaces it, and cancelling an id that is not pending does nothing.
pub trait NotificationService: Send {
    fn schedule(&self, id: &str, after: Duration, title: &str, body: &str) -> Result<(), NotifyError>;

    fn cancel(&self, id: &str) -> Result<(), NotifyError>;
}

impl<T: NotificationService + ?Sized> NotificationService for Box<T> {
    fn schedule(&self, id: &str, after: Duration, title: &str, body: &str) -> Result<(), NotifyError> {
        (**self).schedule(id, after, title, body)
    }

    fn cancel(&self, id: &str) -> Result<(), NotifyError> {
        (**self).cancel(id)
    }
}

/// Backend that only logs requests. Used where no platform service exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl NotificationService for LogNotifier {
    fn schedule(&self, id: &str, after: Duration, title: &str, body: &str) -> Result<(), NotifyError> {
        tracing::info!(id, after_secs = after.as_secs(), title, body, "reminder scheduled");
        Ok(())
    }

    fn cancel(&self, id: &str) -> Result<(), NotifyError> {
        tracing::info!(id, "reminder cancelled");
        Ok(())
    }
}

/// A reminder request as seen by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationRequest {
    Schedule {
        id: String,
        after: Duration,
        title: String,
        body: String,
    },
    Cancel {
        id: String,
    },
}

#[derive(Debug, Default)]
struct Recorded {
    requests: Vec<NotificationRequest>,
    failing: bool,
}

/// In-memory backend that keeps every request. Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<NotificationRequest> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).requests.clone()
    }

    pub fn last(&self) -> Option<NotificationRequest> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .requests
            .last()
            .cloned()
    }

    /// The reminder that would currently be pending for `id`.
    pub fn pending(&self, id: &str) -> Option<Duration> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut pending = None;
        for req in &inner.requests {
            match req {
                NotificationRequest::Schedule { id: rid, after, .. } if rid == id => pending = Some(*after),
                NotificationRequest::Cancel { id: rid } if rid == id => pending = None,
                _ => {}
            }
        }
        pending
    }

    /// Reject every subsequent request until switched back off.
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).failing = failing;
    }
}

impl NotificationService for RecordingNotifier {
    fn schedule(&self, id: &str, after: Duration, title: &str, body: &str) -> Result<(), NotifyError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.failing {
            return Err(NotifyError::ScheduleFailed {
                id: id.to_string(),
                message: "service unavailable".into(),
            });
        }
        inner.requests.push(NotificationRequest::Schedule {
            id: id.to_string(),
            after,
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    fn cancel(&self, id: &str) -> Result<(), NotifyError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.failing {
            return Err(NotifyError::CancelFailed {
                id: id.to_string(),
                message: "service unavailable".into(),
            });
        }
        inner.requests.push(NotificationRequest::Cancel { id: id.to_string() });
        Ok(())
    }
}
