//! Templated email through Mandrill

use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};

use crate::config::NotifierConfig;
use crate::external::mandrill::{MandrillClient, MergeVar, Recipient, TemplateMessage};
use crate::models::check::{CheckResponse, TARGET_DB_INSTANCE};
use crate::models::view::CheckResponseView;
use crate::models::{Event, Notification, kinds};
use crate::services::notifications::content::{ensure_consistent, template_name};
use crate::services::notifications::{NotifyError, Sender};

pub struct EmailSender {
    client: MandrillClient,
    from_email: String,
    from_name: String,
    config: NotifierConfig,
}

impl EmailSender {
    pub fn new(config: &NotifierConfig) -> Result<Self, NotifyError> {
        let email = &config.email;
        if email.api_key.trim().is_empty() {
            return Err(NotifyError::not_configured(kinds::EMAIL, "missing api_key"));
        }

        Ok(Self {
            client: MandrillClient::new(&email.api_url, &email.api_key, config.http_timeout()),
            from_email: email.from_email.clone(),
            from_name: email.from_name.clone(),
            config: config.clone(),
        })
    }

    fn merge_vars(&self, event: &Event) -> Result<Vec<MergeVar>, NotifyError> {
        let result = &event.result;
        let first_response = result
            .representative_response()
            .map(response_json)
            .transpose()?
            .unwrap_or(JsonValue::Null);

        let mut vars = vec![
            MergeVar::new("check_id", result.check_id.as_str()),
            MergeVar::new("check_name", result.check_name.as_str()),
            MergeVar::new("group_id", result.group_id()),
            MergeVar::new("group_name", result.group_name()),
            MergeVar::new("first_response", first_response),
            MergeVar::new("instance_count", result.responses.len()),
            MergeVar::new("instances", json!(result.instance_ids())),
            MergeVar::new("fail_count", result.failing_count()),
            MergeVar::new("app_host", self.config.app_host.as_str()),
            MergeVar::new("check_url", self.config.check_url(&result.check_id)),
            MergeVar::new("json_url", event.json_url().unwrap_or_default()),
            MergeVar::new("image_url", event.image_url().unwrap_or_default()),
            MergeVar::new("test", event.test),
        ];

        if result.target_type() == TARGET_DB_INSTANCE {
            vars.push(MergeVar::new("rds_db_name", result.group_id()));
        }

        Ok(vars)
    }
}

fn response_json(response: &CheckResponse) -> Result<JsonValue, NotifyError> {
    Ok(serde_json::to_value(CheckResponseView::try_from(response)?)?)
}

fn valid_address(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !address.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[async_trait]
impl Sender for EmailSender {
    async fn send(&self, notification: &Notification, event: &Event) -> Result<(), NotifyError> {
        ensure_consistent(&event.result)?;

        let address = notification.value.trim();
        if !valid_address(address) {
            return Err(NotifyError::InvalidDestination {
                kind: kinds::EMAIL,
                value: notification.value.clone(),
            });
        }

        let template = template_name(event);
        let message = TemplateMessage {
            to: vec![Recipient {
                email: address.to_string(),
                kind: "to",
            }],
            from_email: self.from_email.clone(),
            from_name: self.from_name.clone(),
            merge: true,
            merge_language: "handlebars",
            global_merge_vars: self.merge_vars(event)?,
            tags: vec![template.clone()],
        };

        let results = self.client.send_template(&template, &message).await?;
        if let Some(refused) = results.iter().find(|r| r.is_refused()) {
            return Err(NotifyError::Rejected {
                backend: kinds::EMAIL,
                message: format!(
                    "{} {} ({})",
                    refused.email,
                    refused.status,
                    refused.reject_reason.as_deref().unwrap_or("no reason given")
                ),
            });
        }

        tracing::debug!(template = %template, recipient = %address, "Email accepted by Mandrill");
        Ok(())
    }

    fn name(&self) -> &'static str {
        kinds::EMAIL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::check::fixtures::*;
    use crate::services::notifications::test_support::notifier_config;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notification(value: &str) -> Notification {
        Notification::new("check-1", kinds::EMAIL, value).with_customer("customer-1")
    }

    #[test]
    fn test_requires_api_key() {
        let mut config = notifier_config("http://127.0.0.1:9");
        config.email.api_key.clear();
        assert!(matches!(
            EmailSender::new(&config),
            Err(NotifyError::NotConfigured { backend: "email", .. })
        ));
    }

    #[test]
    fn test_address_validation() {
        assert!(valid_address("ops@example.com"));
        assert!(!valid_address("ops"));
        assert!(!valid_address("@example.com"));
        assert!(!valid_address("ops@localhost"));
        assert!(!valid_address("o ps@example.com"));
    }

    #[test]
    fn test_merge_vars() {
        let sender = EmailSender::new(&notifier_config("http://127.0.0.1:9")).unwrap();
        let vars = sender.merge_vars(&Event::new(failing_result("check-1"))).unwrap();
        let lookup = |name: &str| {
            vars.iter()
                .find(|v| v.name == name)
                .map(|v| v.content.clone())
                .unwrap()
        };

        assert_eq!(lookup("check_id"), "check-1");
        assert_eq!(lookup("group_name"), "web");
        assert_eq!(lookup("instance_count"), 2);
        assert_eq!(lookup("fail_count"), 1);
        assert_eq!(lookup("instances"), json!(["i-1", "i-2"]));
        assert_eq!(lookup("first_response")["target"]["id"], "i-1");
        assert_eq!(lookup("check_url"), "https://app.example.com/check/check-1");
        assert_eq!(lookup("test"), false);
        assert!(vars.iter().all(|v| v.name != "rds_db_name"));
    }

    #[tokio::test]
    async fn test_sends_failure_template() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages/send-template.json"))
            .and(body_partial_json(json!({
                "key": "md-test",
                "template_name": "check-fail",
                "message": {"to": [{"email": "ops@example.com", "type": "to"}]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"email": "ops@example.com", "status": "sent"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let sender = EmailSender::new(&notifier_config(&server.uri())).unwrap();
        sender
            .send(&notification("ops@example.com"), &Event::new(failing_result("check-1")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rejected_recipient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"email": "ops@example.com", "status": "rejected", "reject_reason": "spam"}
            ])))
            .mount(&server)
            .await;

        let sender = EmailSender::new(&notifier_config(&server.uri())).unwrap();
        let err = sender
            .send(&notification("ops@example.com"), &Event::new(failing_result("check-1")))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Rejected { backend: "email", .. }));
    }

    #[tokio::test]
    async fn test_inconsistent_result_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let sender = EmailSender::new(&notifier_config(&server.uri())).unwrap();
        let result = check_result("check-1", false, vec![http_response("i-1", 200, true)]);
        let err = sender
            .send(&notification("ops@example.com"), &Event::new(result))
            .await
            .unwrap_err();
        assert!(err.is_inconsistent_data());
    }

    #[tokio::test]
    async fn test_invalid_address_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let sender = EmailSender::new(&notifier_config(&server.uri())).unwrap();
        let err = sender
            .send(&notification("not-an-address"), &Event::new(failing_result("check-1")))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::InvalidDestination { kind: "email", .. }));
    }
}
