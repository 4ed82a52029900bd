use anyhow::Context;
use async_trait::async_trait;

use super::{Notification, NotificationProvider};

/// Posts each notification as JSON to a delivery service.
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotificationProvider for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .context("failed to send notification")?
            .error_for_status()
            .context("notification endpoint returned error")?;

        Ok(())
    }
}
