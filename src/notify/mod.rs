//! Outbound push notifications.

pub mod pushover;

use async_trait::async_trait;

use crate::error::NotifyError;

pub use pushover::PushoverNotifier;

/// A single push notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Sink for push notifications. Delivery is best-effort and never retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}
