//! Notification destinations registered against a check

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Sender type keys stored in `notifications.type`
pub mod kinds {
    pub const EMAIL: &str = "email";
    pub const SLACK_BOT: &str = "slack_bot";
    pub const WEBHOOK: &str = "webhook";
    pub const PAGERDUTY: &str = "pagerduty";

    pub const ALL: [&str; 4] = [EMAIL, SLACK_BOT, WEBHOOK, PAGERDUTY];
}

/// One configured destination: `value` is an email address, channel id,
/// webhook URL or service name depending on `notification_type`
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Notification {
    pub id: i32,
    pub customer_id: String,
    pub user_id: i32,
    pub check_id: String,
    pub value: String,
    #[serde(rename = "type")]
    pub notification_type: String,
}

impl Notification {
    pub fn new(
        check_id: impl Into<String>,
        notification_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            customer_id: String::new(),
            user_id: 0,
            check_id: check_id.into(),
            value: value.into(),
            notification_type: notification_type.into(),
        }
    }

    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = customer_id.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_type_field() {
        let notification =
            Notification::new("check-1", kinds::WEBHOOK, "https://hooks.example.com/x")
                .with_customer("customer-1");
        let value = serde_json::to_value(&notification).unwrap();
        assert_eq!(value["type"], "webhook");
        assert_eq!(value["customer_id"], "customer-1");
        assert!(value.get("notification_type").is_none());
    }
}
