use crate::notify::{Notification, Notifier, NotifyError};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct SentNotification {
    pub user_id: String,
    pub notification: Notification,
}

/// Captures every notification for later assertions. Construct with
/// `failing()` to exercise the log-and-continue path in callers.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, user_id: &str, notification: &Notification) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Delivery("mock delivery failure".to_string()));
        }
        let mut guard = self
            .sent
            .lock()
            .map_err(|_| NotifyError::Delivery("mock lock poisoned".to_string()))?;
        guard.push(SentNotification {
            user_id: user_id.to_string(),
            notification: notification.clone(),
        });
        Ok(())
    }
}
