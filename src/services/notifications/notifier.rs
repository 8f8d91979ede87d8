//! Routes notifications to the sender registered for their type

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::config::NotifierConfig;
use crate::models::{Event, Notification, kinds};
use crate::services::notifications::{
    EmailSender, NotifyError, PagerDutySender, Sender, SlackBotSender, WebhookSender,
};
use crate::store::CredentialStore;

/// Backend initialization failures, keyed by backend name
pub type InitErrors = BTreeMap<&'static str, NotifyError>;

/// Sender registry owned by a single worker.
#[derive(Default)]
pub struct Notifier {
    senders: HashMap<String, Arc<dyn Sender>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every enabled backend; the ones that fail are reported rather
    /// than registered, leaving the caller to decide whether a degraded
    /// notifier is acceptable.
    pub fn from_settings(
        config: &NotifierConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> (Self, InitErrors) {
        let mut notifier = Self::new();
        let mut errors = InitErrors::new();

        if config.email.enabled {
            notifier.register_result(kinds::EMAIL, EmailSender::new(config), &mut errors);
        }
        if config.slack.enabled {
            notifier.register_result(
                kinds::SLACK_BOT,
                SlackBotSender::new(config, credentials.clone()),
                &mut errors,
            );
        }
        if config.webhook.enabled {
            notifier.register(kinds::WEBHOOK, Arc::new(WebhookSender::new(config)));
        }
        if config.pagerduty.enabled {
            notifier.register_result(
                kinds::PAGERDUTY,
                PagerDutySender::new(config, credentials),
                &mut errors,
            );
        }

        (notifier, errors)
    }

    fn register_result<S: Sender + 'static>(
        &mut self,
        kind: &'static str,
        sender: Result<S, NotifyError>,
        errors: &mut InitErrors,
    ) {
        match sender {
            Ok(sender) => self.register(kind, Arc::new(sender)),
            Err(e) => {
                errors.insert(kind, e);
            }
        }
    }

    /// Registers `sender` for `kind`, replacing any previous one
    pub fn register(&mut self, kind: impl Into<String>, sender: Arc<dyn Sender>) {
        self.senders.insert(kind.into(), sender);
    }

    pub fn supports(&self, kind: &str) -> bool {
        self.senders.contains_key(kind)
    }

    /// Registered types, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.senders.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Dispatches by exact type match; the sender's result is returned unchanged.
    pub async fn send(&self, notification: &Notification, event: &Event) -> Result<(), NotifyError> {
        let sender = self
            .senders
            .get(&notification.notification_type)
            .ok_or_else(|| NotifyError::NoSender(notification.notification_type.clone()))?;

        tracing::debug!(
            backend = sender.name(),
            check_id = %event.result.check_id,
            "Dispatching to sender"
        );
        sender.send(notification, event).await
    }
}
