//! Mandrill transactional email API

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::external::client::{ExternalApiError, endpoint, post_json_for};

const API: &str = "mandrill";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeVar {
    pub name: String,
    pub content: JsonValue,
}

impl MergeVar {
    pub fn new(name: impl Into<String>, content: impl Into<JsonValue>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipient {
    pub email: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateMessage {
    pub to: Vec<Recipient>,
    pub from_email: String,
    pub from_name: String,
    pub merge: bool,
    pub merge_language: &'static str,
    pub global_merge_vars: Vec<MergeVar>,
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SendTemplateRequest<'a> {
    key: &'a str,
    template_name: &'a str,
    /// Required by the API even when every block comes from merge vars
    template_content: [JsonValue; 0],
    message: &'a TemplateMessage,
}

/// Per-recipient outcome of a send
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SendResult {
    pub email: String,
    pub status: String,
    #[serde(default)]
    pub reject_reason: Option<String>,
    #[serde(default, rename = "_id")]
    pub id: Option<String>,
}

impl SendResult {
    pub fn is_refused(&self) -> bool {
        matches!(self.status.as_str(), "rejected" | "invalid")
    }
}

#[derive(Debug, Clone)]
pub struct MandrillClient {
    api_url: String,
    api_key: String,
    timeout: Duration,
}

impl MandrillClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            timeout,
        }
    }

    pub async fn send_template(
        &self,
        template_name: &str,
        message: &TemplateMessage,
    ) -> Result<Vec<SendResult>, ExternalApiError> {
        let request = SendTemplateRequest {
            key: &self.api_key,
            template_name,
            template_content: [],
            message,
        };

        post_json_for(
            API,
            &endpoint(&self.api_url, "messages/send-template.json"),
            &request,
            self.timeout,
            None,
        )
        .await
    }
}
