use super::{NotificationInstruction, NotificationService};
use crate::error::NotifyError;
use crate::storage::ReminderConfig;

/// Maps transition instructions onto a [`NotificationService`].
///
/// Only one reminder exists at a time, addressed by a fixed id, so a new
/// schedule always replaces the previous one.
pub struct NotificationCoordinator {
    service: Box<dyn NotificationService>,
    reminder_id: String,
    title: String,
    body_template: String,
}

impl NotificationCoordinator {
    pub fn new(service: Box<dyn NotificationService>, reminder: &ReminderConfig) -> Self {
        Self {
            service,
            reminder_id: reminder.id.clone(),
            title: reminder.title.clone(),
            body_template: reminder.body.clone(),
        }
    }

    pub fn reminder_id(&self) -> &str {
        &self.reminder_id
    }

    /// Carry out `instruction` for a run timing `subject`.
    pub fn apply(&self, instruction: NotificationInstruction, subject: Option<&str>) -> Result<(), NotifyError> {
        match instruction {
            NotificationInstruction::None => Ok(()),
            NotificationInstruction::Schedule { after } => {
                let body = self.body_template.replace("{subject}", subject.unwrap_or("your activity"));
                tracing::debug!(id = %self.reminder_id, after_secs = after.as_secs(), "scheduling reminder");
                self.service.schedule(&self.reminder_id, after, &self.title, &body)
            }
            NotificationInstruction::Cancel => {
                tracing::debug!(id = %self.reminder_id, "cancelling reminder");
                self.service.cancel(&self.reminder_id)
            }
        }
    }
}

impl std::fmt::Debug for NotificationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationCoordinator")
            .field("reminder_id", &self.reminder_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{NotificationRequest, RecordingNotifier};
    use std::time::Duration;

    fn coordinator() -> (NotificationCoordinator, RecordingNotifier) {
        let recorder = RecordingNotifier::new();
        let coord = NotificationCoordinator::new(Box::new(recorder.clone()), &ReminderConfig::default());
        (coord, recorder)
    }

    #[test]
    fn schedule_fills_in_subject() {
        let (coord, recorder) = coordinator();
        coord
            .apply(
                NotificationInstruction::Schedule {
                    after: Duration::from_secs(600),
                },
                Some("Reading"),
            )
            .unwrap();
        assert_eq!(
            recorder.last(),
            Some(NotificationRequest::Schedule {
                id: "activity-timer-reminder".into(),
                after: Duration::from_secs(600),
                title: "Timer still running".into(),
                body: "Still tracking Reading".into(),
            })
        );
    }

    #[test]
    fn none_makes_no_call() {
        let (coord, recorder) = coordinator();
        coord.apply(NotificationInstruction::None, Some("Reading")).unwrap();
        assert!(recorder.requests().is_empty());
    }

    #[test]
    fn redundant_calls_are_harmless() {
        let (coord, recorder) = coordinator();
        let id = coord.reminder_id().to_string();
        coord.apply(NotificationInstruction::Cancel, None).unwrap();
        assert_eq!(recorder.pending(&id), None);

        let schedule = NotificationInstruction::Schedule {
            after: Duration::from_secs(60),
        };
        coord.apply(schedule, Some("A")).unwrap();
        coord
            .apply(
                NotificationInstruction::Schedule {
                    after: Duration::from_secs(120),
                },
                Some("A"),
            )
            .unwrap();
        assert_eq!(recorder.pending(&id), Some(Duration::from_secs(120)));

        coord.apply(NotificationInstruction::Cancel, None).unwrap();
        coord.apply(NotificationInstruction::Cancel, None).unwrap();
        assert_eq!(recorder.pending(&id), None);
    }

    #[test]
    fn service_failure_is_returned() {
        let (coord, recorder) = coordinator();
        recorder.set_failing(true);
        let err = coord.apply(NotificationInstruction::Cancel, None).unwrap_err();
        assert!(matches!(err, NotifyError::CancelFailed { .. }));
    }
}
