//! Slack bot messages posted with the customer's bot token

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::NotifierConfig;
use crate::external::slack::{Attachment, AttachmentField, PostMessage, SlackClient};
use crate::models::{Event, Notification, kinds};
use crate::services::notifications::content::{
    customer_id, describe_response, ensure_consistent, headline, state_label,
};
use crate::services::notifications::{NotifyError, Sender};
use crate::store::CredentialStore;

pub struct SlackBotSender {
    client: SlackClient,
    credentials: Arc<dyn CredentialStore>,
    config: NotifierConfig,
}

impl SlackBotSender {
    pub fn new(
        config: &NotifierConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, NotifyError> {
        if config.slack.api_url.trim().is_empty() {
            return Err(NotifyError::not_configured(kinds::SLACK_BOT, "missing api_url"));
        }

        Ok(Self {
            client: SlackClient::new(&config.slack.api_url, config.http_timeout()),
            credentials,
            config: config.clone(),
        })
    }

    async fn bot_token(&self, customer_id: &str) -> Result<String, NotifyError> {
        let oauth = self.credentials.slack_oauth(customer_id).await?;
        oauth
            .as_ref()
            .and_then(|response| response.bot_token())
            .map(str::to_string)
            .ok_or_else(|| NotifyError::inactive(kinds::SLACK_BOT, customer_id))
    }

    fn message(&self, channel: &str, event: &Event) -> PostMessage {
        let result = &event.result;
        let check_url = self.config.check_url(&result.check_id);

        let mut fields = vec![
            AttachmentField {
                title: "Target".to_string(),
                value: result.group_name().to_string(),
                short: true,
            },
            AttachmentField {
                title: "Failing".to_string(),
                value: format!("{} / {}", result.failing_count(), result.responses.len()),
                short: true,
            },
        ];
        if let Some(response) = result.representative_response() {
            fields.push(AttachmentField {
                title: "Response".to_string(),
                value: describe_response(response),
                short: false,
            });
        }

        let links = match event.json_url() {
            Some(json_url) => format!("<{check_url}|View check> | <{json_url}|Response JSON>"),
            None => format!("<{check_url}|View check>"),
        };

        let attachment = Attachment {
            fallback: headline(event),
            color: (if result.passing { "good" } else { "danger" }).to_string(),
            title: format!("{} is {}", result.check_name, state_label(result)),
            title_link: Some(check_url),
            text: Some(links),
            fields,
            image_url: event.image_url().map(str::to_string),
            footer: "checkrelay".to_string(),
            ts: result.observed_at().map(|t| t.as_second()).unwrap_or_default(),
        };

        PostMessage {
            channel: channel.to_string(),
            text: headline(event),
            attachments: vec![attachment],
        }
    }
}

#[async_trait]
impl Sender for SlackBotSender {
    async fn send(&self, notification: &Notification, event: &Event) -> Result<(), NotifyError> {
        ensure_consistent(&event.result)?;

        let channel = notification.value.trim();
        if channel.is_empty() {
            return Err(NotifyError::InvalidDestination {
                kind: kinds::SLACK_BOT,
                value: notification.value.clone(),
            });
        }

        let customer = customer_id(notification, event);
        let token = self.bot_token(customer).await?;
        let response = self
            .client
            .post_message(&token, &self.message(channel, event))
            .await?;

        if response.ok {
            return Ok(());
        }
        if response.is_inactive() {
            return Err(NotifyError::inactive(kinds::SLACK_BOT, customer));
        }
        Err(NotifyError::Rejected {
            backend: kinds::SLACK_BOT,
            message: response.error.unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    fn name(&self) -> &'static str {
        kinds::SLACK_BOT
    }
}
