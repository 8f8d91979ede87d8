//! PagerDuty generic Events API (v1)

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::external::client::{ExternalApiError, post_json_for};

const API: &str = "pagerduty";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Trigger,
    Resolve,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkContext {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub href: String,
    pub text: String,
}

impl LinkContext {
    pub fn link(href: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: "link",
            href: href.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagerDutyEvent {
    pub service_key: String,
    pub event_type: EventType,
    pub incident_key: String,
    pub description: String,
    pub client: String,
    pub client_url: String,
    pub details: JsonValue,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<LinkContext>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PagerDutyResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub incident_key: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl PagerDutyResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone)]
pub struct PagerDutyClient {
    events_url: String,
    timeout: Duration,
}

impl PagerDutyClient {
    pub fn new(events_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            events_url: events_url.into(),
            timeout,
        }
    }

    pub async fn send_event(
        &self,
        event: &PagerDutyEvent,
    ) -> Result<PagerDutyResponse, ExternalApiError> {
        post_json_for(API, &self.events_url, event, self.timeout, None).await
    }
}
