//! Slack Web API: `chat.postMessage`

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::external::client::{ExternalApiError, endpoint, post_json_for};

const API: &str = "slack";

/// Errors meaning the installation is gone rather than a transient failure
pub const INACTIVE_ERRORS: [&str; 3] = ["invalid_auth", "account_inactive", "token_revoked"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachmentField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Attachment {
    pub fallback: String,
    pub color: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub fields: Vec<AttachmentField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub footer: String,
    pub ts: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostMessage {
    pub channel: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

/// Slack answers 200 for most failures and reports them through `ok`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PostMessageResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
}

impl PostMessageResponse {
    pub fn is_inactive(&self) -> bool {
        self.error
            .as_deref()
            .is_some_and(|error| INACTIVE_ERRORS.contains(&error))
    }
}

#[derive(Debug, Clone)]
pub struct SlackClient {
    api_url: String,
    timeout: Duration,
}

impl SlackClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_url: api_url.into(),
            timeout,
        }
    }

    pub async fn post_message(
        &self,
        token: &str,
        message: &PostMessage,
    ) -> Result<PostMessageResponse, ExternalApiError> {
        post_json_for(
            API,
            &endpoint(&self.api_url, "chat.postMessage"),
            message,
            self.timeout,
            Some(token),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_post_message_uses_bot_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(header("authorization", "Bearer xoxb-1"))
            .and(body_partial_json(json!({"channel": "C123", "text": "hello"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": true, "ts": "1.2"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = SlackClient::new(server.uri(), Duration::from_secs(5));
        let response = client
            .post_message(
                "xoxb-1",
                &PostMessage {
                    channel: "C123".to_string(),
                    text: "hello".to_string(),
                    attachments: Vec::new(),
                },
            )
            .await
            .unwrap();
        assert!(response.ok);
        assert_eq!(response.ts.as_deref(), Some("1.2"));
    }

    #[test]
    fn test_inactive_errors() {
        let revoked: PostMessageResponse =
            serde_json::from_value(json!({"ok": false, "error": "token_revoked"})).unwrap();
        assert!(revoked.is_inactive());

        let missing: PostMessageResponse =
            serde_json::from_value(json!({"ok": false, "error": "channel_not_found"})).unwrap();
        assert!(!missing.is_inactive());
    }

    #[test]
    fn test_attachment_skips_empty_links() {
        let value = serde_json::to_value(Attachment {
            title: "t".to_string(),
            ..Attachment::default()
        })
        .unwrap();
        assert!(value.get("title_link").is_none());
        assert!(value.get("image_url").is_none());
    }
}
