//! Per-customer integration credentials stored as OAuth responses

use serde::{Deserialize, Serialize};

/// Bot section of a Slack OAuth response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackBotCredentials {
    #[serde(default)]
    pub bot_user_id: String,
    #[serde(default)]
    pub bot_access_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackOAuthResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub bot: Option<SlackBotCredentials>,
}

impl SlackOAuthResponse {
    /// The bot token, if the installation granted one
    pub fn bot_token(&self) -> Option<&str> {
        self.bot
            .as_ref()
            .map(|bot| bot.bot_access_token.as_str())
            .filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagerDutyIntegration {
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub service_key: String,
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub enabled: bool,
}

impl PagerDutyIntegration {
    /// Service key of an enabled integration
    pub fn active_service_key(&self) -> Option<&str> {
        (self.enabled && !self.service_key.is_empty()).then_some(self.service_key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slack_bot_token_from_stored_json() {
        let stored = serde_json::json!({
            "access_token": "xoxp-1",
            "team_name": "ops",
            "bot": {"bot_user_id": "U1", "bot_access_token": "xoxb-1"}
        });
        let response: SlackOAuthResponse = serde_json::from_value(stored).unwrap();
        assert_eq!(response.bot_token(), Some("xoxb-1"));
    }

    #[test]
    fn test_slack_without_bot_has_no_token() {
        let response: SlackOAuthResponse =
            serde_json::from_value(serde_json::json!({"access_token": "xoxp-1"})).unwrap();
        assert_eq!(response.bot_token(), None);

        let empty = SlackOAuthResponse {
            bot: Some(SlackBotCredentials::default()),
            ..SlackOAuthResponse::default()
        };
        assert_eq!(empty.bot_token(), None);
    }

    #[test]
    fn test_disabled_pagerduty_has_no_key() {
        let mut integration = PagerDutyIntegration {
            service_key: "pd-key".to_string(),
            enabled: true,
            ..PagerDutyIntegration::default()
        };
        assert_eq!(integration.active_service_key(), Some("pd-key"));

        integration.enabled = false;
        assert_eq!(integration.active_service_key(), None);
    }
}
