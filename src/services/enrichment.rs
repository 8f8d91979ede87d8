//! Event construction with best-effort enrichment
//!
//! When an enrichment endpoint is configured the full result is POSTed to
//! `{endpoint}/screenshot`, which answers with links to rendered artifacts.
//! Any failure there leaves the event un-enriched; delivery never waits on
//! a second attempt.

use std::time::Duration;

use thiserror::Error;

use crate::config::EnrichmentConfig;
use crate::external::ExternalApiError;
use crate::external::client::{endpoint, post_json_for};
use crate::models::{CheckResult, DecodeError, Enrichment, Event, FullCheckResult, Notification};

const API: &str = "enrichment";

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error(transparent)]
    Api(#[from] ExternalApiError),

    #[error("cannot render check result: {0}")]
    Payload(#[from] DecodeError),
}

#[derive(Debug, Clone)]
pub struct EnrichmentClient {
    url: String,
    timeout: Duration,
}

impl EnrichmentClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            url: endpoint(base_url, "screenshot"),
            timeout,
        }
    }

    pub async fn enrich(&self, result: &CheckResult) -> Result<Enrichment, EnrichmentError> {
        let body = FullCheckResult::try_from(result)?;
        Ok(post_json_for(API, &self.url, &body, self.timeout, None).await?)
    }
}

/// Turns decoded results into events; each worker owns one.
#[derive(Debug, Clone, Default)]
pub struct EventBuilder {
    client: Option<EnrichmentClient>,
}

impl EventBuilder {
    pub fn new(client: Option<EnrichmentClient>) -> Self {
        Self { client }
    }

    pub fn from_settings(config: &EnrichmentConfig, timeout: Duration) -> Self {
        let client = config
            .endpoint
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .map(|url| EnrichmentClient::new(url, timeout));
        Self::new(client)
    }

    pub fn is_enriching(&self) -> bool {
        self.client.is_some()
    }

    pub async fn build(&self, notification: &Notification, result: CheckResult) -> Event {
        let Some(client) = self.client.as_ref() else {
            return Event::new(result);
        };

        match client.enrich(&result).await {
            Ok(enrichment) => {
                tracing::debug!(
                    check_id = %result.check_id,
                    notification_type = %notification.notification_type,
                    images = enrichment.image_urls.len(),
                    "Enriched event"
                );
                Event::new(result).with_enrichment(enrichment)
            }
            Err(e) => {
                tracing::warn!(
                    check_id = %result.check_id,
                    notification_type = %notification.notification_type,
                    error = %e,
                    "Enrichment failed, sending without it"
                );
                Event::new(result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::check::fixtures::failing_result;
    use crate::models::kinds;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notification() -> Notification {
        Notification::new("check-1", kinds::EMAIL, "ops@example.com")
    }

    #[tokio::test]
    async fn test_without_endpoint_builds_plain_event() {
        let builder = EventBuilder::from_settings(&EnrichmentConfig::default(), Duration::from_secs(5));
        assert!(!builder.is_enriching());

        let event = builder.build(&notification(), failing_result("check-1")).await;
        assert!(event.enrichment.is_none());
        assert!(!event.test);
    }

    #[test]
    fn test_blank_endpoint_disables_enrichment() {
        let config = EnrichmentConfig {
            endpoint: Some("  ".to_string()),
        };
        assert!(!EventBuilder::from_settings(&config, Duration::from_secs(5)).is_enriching());
    }

    #[tokio::test]
    async fn test_enrichment_links_are_attached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/screenshot"))
            .and(body_partial_json(json!({"check_id": "check-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "image_urls": {"default": "https://shots.example.com/a.png"},
                "json_url": "https://shots.example.com/a.json"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let builder = EventBuilder::from_settings(
            &EnrichmentConfig {
                endpoint: Some(server.uri()),
            },
            Duration::from_secs(5),
        );
        let event = builder.build(&notification(), failing_result("check-1")).await;

        assert_eq!(event.image_url(), Some("https://shots.example.com/a.png"));
        assert_eq!(event.json_url(), Some("https://shots.example.com/a.json"));
    }

    #[tokio::test]
    async fn test_enrichment_failure_is_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let builder = EventBuilder::new(Some(EnrichmentClient::new(
            &server.uri(),
            Duration::from_secs(5),
        )));
        let result = failing_result("check-1");
        let event = builder.build(&notification(), result.clone()).await;

        assert!(event.enrichment.is_none());
        assert_eq!(event.result, result);
    }

    #[tokio::test]
    async fn test_unreadable_enrichment_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = EnrichmentClient::new(&server.uri(), Duration::from_secs(5));
        let err = client.enrich(&failing_result("check-1")).await.unwrap_err();
        assert!(matches!(err, EnrichmentError::Api(ExternalApiError::Decode { .. })));
    }
}
