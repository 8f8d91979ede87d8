//! Generic webhook: POSTs the full result as JSON

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;

use crate::config::NotifierConfig;
use crate::external::client::post_json;
use crate::models::{Event, FullCheckResult, Notification, kinds};
use crate::services::notifications::{NotifyError, Sender};

pub struct WebhookSender {
    timeout: Duration,
}

impl WebhookSender {
    pub fn new(config: &NotifierConfig) -> Self {
        Self {
            timeout: config.http_timeout(),
        }
    }

    fn destination(notification: &Notification) -> Result<Url, NotifyError> {
        let invalid = || NotifyError::InvalidDestination {
            kind: kinds::WEBHOOK,
            value: notification.value.clone(),
        };

        let url = Url::parse(notification.value.trim()).map_err(|_| invalid())?;
        match url.scheme() {
            "http" | "https" if url.host_str().is_some() => Ok(url),
            _ => Err(invalid()),
        }
    }
}

#[async_trait]
impl Sender for WebhookSender {
    /// Any status of 300 or above fails the delivery.
    async fn send(&self, notification: &Notification, event: &Event) -> Result<(), NotifyError> {
        let url = Self::destination(notification)?;
        let body = FullCheckResult::try_from(&event.result)?;

        post_json(kinds::WEBHOOK, url.as_str(), &body, self.timeout, None).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        kinds::WEBHOOK
    }
}
