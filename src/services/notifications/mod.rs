//! Notification dispatch
//!
//! A `Notifier` maps notification types to `Sender`s. Every worker builds
//! its own notifier; senders share the process-wide HTTP client.

mod content;
mod email_sender;
mod error;
mod notifier;
mod pagerduty_sender;
mod sender;
mod slack_sender;
mod webhook_sender;

pub use email_sender::EmailSender;
pub use error::NotifyError;
pub use notifier::{InitErrors, Notifier};
pub use pagerduty_sender::PagerDutySender;
pub use sender::Sender;
pub use slack_sender::SlackBotSender;
pub use webhook_sender::WebhookSender;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{NotifyError, Sender};
    use crate::config::NotifierConfig;
    use crate::models::{Event, Notification};

    /// Notifier settings with every backend pointed at `base_url`
    pub fn notifier_config(base_url: &str) -> NotifierConfig {
        let mut config = NotifierConfig {
            http_timeout: 5,
            ..NotifierConfig::default()
        };
        config.email.api_url = base_url.to_string();
        config.email.api_key = "md-test".to_string();
        config.slack.api_url = base_url.to_string();
        config.pagerduty.events_url = format!("{base_url}/generic/2010-04-15/create_event.json");
        config
    }

    /// Sender that records `(check_id, type)` per call
    pub struct RecordingSender {
        name: &'static str,
        fail: bool,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl RecordingSender {
        pub fn succeeding(name: &'static str) -> Self {
            Self {
                name,
                fail: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(name: &'static str) -> Self {
            Self {
                fail: true,
                ..Self::succeeding(name)
            }
        }

        pub fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sender for RecordingSender {
        async fn send(&self, notification: &Notification, event: &Event) -> Result<(), NotifyError> {
            self.calls.lock().unwrap().push((
                event.result.check_id.clone(),
                notification.notification_type.clone(),
            ));

            if self.fail {
                Err(NotifyError::Delivery {
                    backend: self.name,
                    status: 500,
                    body: "injected failure".to_string(),
                })
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }
}
