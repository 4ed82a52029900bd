pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::models::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Recipient {
    User(String),
    Role(Role),
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub recipient: Recipient,
    pub subject: String,
    pub body: String,
    pub booking_id: Option<String>,
}

#[async_trait]
pub trait NotificationProvider: Send + Sync {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Used when no delivery endpoint is configured.
pub struct LogNotifier;

#[async_trait]
impl NotificationProvider for LogNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        tracing::info!(
            recipient = ?notification.recipient,
            subject = %notification.subject,
            booking_id = ?notification.booking_id,
            "notification"
        );
        Ok(())
    }
}

/// Fire-and-forget delivery. Failures are logged and never reach the caller.
pub fn dispatch(notifier: &Arc<dyn NotificationProvider>, notification: Notification) {
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&notification).await {
            tracing::warn!(error = %e, subject = %notification.subject, "failed to deliver notification");
        }
    });
}
