//! Push-notification seam.
//!
//! Delivery is best-effort and fire-and-forget: callers log failures and move
//! on. The production transport (web push) lives outside this crate; the
//! default implementation records intent in the log.

use thiserror::Error;
use tracing::info;

pub mod mock;

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

pub trait Notifier: Send + Sync {
    fn send(&self, user_id: &str, notification: &Notification) -> Result<(), NotifyError>;
}

/// Logs each notification instead of delivering it.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, user_id: &str, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            user_id = user_id,
            title = %notification.title,
            body = %notification.body,
            "Would send push notification"
        );
        Ok(())
    }
}
