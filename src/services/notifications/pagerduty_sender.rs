//! PagerDuty incidents keyed by check id

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::NotifierConfig;
use crate::external::pagerduty::{EventType, LinkContext, PagerDutyClient, PagerDutyEvent};
use crate::models::{Event, FullCheckResult, Notification, kinds};
use crate::services::notifications::content::{customer_id, ensure_consistent, headline};
use crate::services::notifications::{NotifyError, Sender};
use crate::store::CredentialStore;

pub struct PagerDutySender {
    client: PagerDutyClient,
    credentials: Arc<dyn CredentialStore>,
    config: NotifierConfig,
}

impl PagerDutySender {
    pub fn new(
        config: &NotifierConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, NotifyError> {
        let pagerduty = &config.pagerduty;
        if pagerduty.events_url.trim().is_empty() {
            return Err(NotifyError::not_configured(kinds::PAGERDUTY, "missing events_url"));
        }

        Ok(Self {
            client: PagerDutyClient::new(&pagerduty.events_url, config.http_timeout()),
            credentials,
            config: config.clone(),
        })
    }

    /// Fails closed: no record, a disabled record or an empty key are all inactive
    async fn service_key(&self, customer_id: &str) -> Result<String, NotifyError> {
        let integration = self.credentials.pagerduty_integration(customer_id).await?;
        integration
            .as_ref()
            .and_then(|i| i.active_service_key())
            .map(str::to_string)
            .ok_or_else(|| NotifyError::inactive(kinds::PAGERDUTY, customer_id))
    }

    fn build_event(&self, service_key: String, event: &Event) -> Result<PagerDutyEvent, NotifyError> {
        let result = &event.result;
        let details = serde_json::to_value(FullCheckResult::try_from(result)?)?;

        Ok(PagerDutyEvent {
            service_key,
            event_type: if result.passing {
                EventType::Resolve
            } else {
                EventType::Trigger
            },
            incident_key: result.check_id.clone(),
            description: headline(event),
            client: self.config.pagerduty.client_name.clone(),
            client_url: self.config.check_url(&result.check_id),
            details,
            contexts: event
                .json_url()
                .map(|url| LinkContext::link(url, "Response JSON"))
                .into_iter()
                .collect(),
        })
    }
}

#[async_trait]
impl Sender for PagerDutySender {
    async fn send(&self, notification: &Notification, event: &Event) -> Result<(), NotifyError> {
        ensure_consistent(&event.result)?;

        let service_key = self.service_key(customer_id(notification, event)).await?;
        let request = self.build_event(service_key, event)?;
        let response = self.client.send_event(&request).await?;

        if response.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Rejected {
                backend: kinds::PAGERDUTY,
                message: format!("{}: {}", response.status, response.errors.join("; ")),
            })
        }
    }

    fn name(&self) -> &'static str {
        kinds::PAGERDUTY
    }
}
