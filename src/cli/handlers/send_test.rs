//! Send-test command handler
//!
//! Delivers `Event::test_event()` to a single destination so an operator can
//! check a backend end to end. Only the Slack and PagerDuty backends need
//! stored credentials, so only they open a database connection.

use std::sync::Arc;

use crate::config::settings::Settings;
use crate::db::establish_async_connection_pool;
use crate::error::{AppError, AppResult};
use crate::models::{Event, Notification, TEST_CHECK_ID, kinds};
use crate::services::{Notifier, NotifyError};
use crate::store::{CredentialStore, InMemoryStore, PgStore};

pub struct SendTestCommandHandler {
    config: Settings,
}

impl SendTestCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    pub async fn execute(&self, kind: &str, value: &str, customer_id: Option<&str>) -> AppResult<()> {
        let credentials: Arc<dyn CredentialStore> = if needs_credentials(kind) {
            let pool = establish_async_connection_pool(&self.config.database).await?;
            Arc::new(PgStore::new(pool))
        } else {
            Arc::new(InMemoryStore::new())
        };

        let (notifier, mut errors) = Notifier::from_settings(&self.config.notifier, credentials);
        if !notifier.supports(kind) {
            return Err(match errors.remove(kind) {
                Some(error) => error.into(),
                None => AppError::Validation {
                    field: format!("notifier.{}", config_section(kind)),
                    reason: format!("the {kind} backend is disabled"),
                },
            });
        }

        send_test(&notifier, kind, value, customer_id).await?;
        println!("✓ Test notification sent to {kind} destination '{value}'");
        Ok(())
    }
}

fn needs_credentials(kind: &str) -> bool {
    kind == kinds::SLACK_BOT || kind == kinds::PAGERDUTY
}

fn config_section(kind: &str) -> &str {
    if kind == kinds::SLACK_BOT { "slack" } else { kind }
}

/// Sends the synthetic failing event to one destination
pub async fn send_test(
    notifier: &Notifier,
    kind: &str,
    value: &str,
    customer_id: Option<&str>,
) -> Result<(), NotifyError> {
    let mut event = Event::test_event();
    let mut notification = Notification::new(TEST_CHECK_ID, kind, value);
    if let Some(customer_id) = customer_id {
        notification = notification.with_customer(customer_id);
        event.result.customer_id = customer_id.to_string();
    }

    tracing::info!(notification_type = kind, value, "Sending test notification");
    notifier.send(&notification, &event).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::services::notifications::WebhookSender;
    use crate::services::notifications::test_support::notifier_config;

    fn webhook_notifier() -> Notifier {
        let mut notifier = Notifier::new();
        notifier.register(
            kinds::WEBHOOK,
            Arc::new(WebhookSender::new(&notifier_config("http://unused"))),
        );
        notifier
    }

    #[tokio::test]
    async fn test_send_test_posts_synthetic_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "check_id": TEST_CHECK_ID,
                "check_name": "Test Check",
                "customer_id": "customer-9",
                "passing": false
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/hook", server.uri());
        send_test(&webhook_notifier(), kinds::WEBHOOK, &url, Some("customer-9"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_test_surfaces_delivery_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = send_test(&webhook_notifier(), kinds::WEBHOOK, &server.uri(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Delivery { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_disabled_backend_is_reported() {
        let mut config = Settings::default();
        config.notifier.webhook.enabled = false;
        let handler = SendTestCommandHandler::new(config);

        let err = handler
            .execute(kinds::WEBHOOK, "https://hooks.example.com/x", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "notifier.webhook"));
    }

    #[tokio::test]
    async fn test_misconfigured_backend_is_reported() {
        let handler = SendTestCommandHandler::new(Settings::default());

        let err = handler
            .execute(kinds::EMAIL, "ops@example.com", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Delivery(NotifyError::NotConfigured { .. })));
    }

    #[test]
    fn test_only_credentialed_backends_need_the_database() {
        assert!(needs_credentials(kinds::SLACK_BOT));
        assert!(needs_credentials(kinds::PAGERDUTY));
        assert!(!needs_credentials(kinds::EMAIL));
        assert!(!needs_credentials(kinds::WEBHOOK));
    }
}
