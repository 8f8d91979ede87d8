//! In-memory store for tests and local runs

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::models::{Notification, PagerDutyIntegration, SlackOAuthResponse};
use crate::store::{CredentialStore, NotificationStore, StoreError};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    notifications: DashMap<String, Vec<Notification>>,
    slack: DashMap<String, SlackOAuthResponse>,
    pagerduty: DashMap<String, PagerDutyIntegration>,
    fail_lookups: AtomicBool,
    lookups: AtomicUsize,
    credential_lookups: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_notification(&self, notification: Notification) {
        self.notifications
            .entry(notification.check_id.clone())
            .or_default()
            .push(notification);
    }

    pub fn set_slack_oauth(&self, customer_id: impl Into<String>, response: SlackOAuthResponse) {
        self.slack.insert(customer_id.into(), response);
    }

    pub fn set_pagerduty(&self, customer_id: impl Into<String>, integration: PagerDutyIntegration) {
        self.pagerduty.insert(customer_id.into(), integration);
    }

    /// Makes every notification lookup fail until reset
    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn credential_lookup_count(&self) -> usize {
        self.credential_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn notifications_by_check_id(
        &self,
        check_id: &str,
    ) -> Result<Vec<Notification>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected lookup failure".to_string()));
        }

        Ok(self
            .notifications
            .get(check_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn slack_oauth(
        &self,
        customer_id: &str,
    ) -> Result<Option<SlackOAuthResponse>, StoreError> {
        self.credential_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.slack.get(customer_id).map(|entry| entry.value().clone()))
    }

    async fn pagerduty_integration(
        &self,
        customer_id: &str,
    ) -> Result<Option<PagerDutyIntegration>, StoreError> {
        self.credential_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.pagerduty.get(customer_id).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::kinds;

    #[tokio::test]
    async fn test_lookup_by_check_id() {
        let store = InMemoryStore::new();
        store.add_notification(Notification::new("check-1", kinds::EMAIL, "ops@example.com"));
        store.add_notification(Notification::new("check-1", kinds::WEBHOOK, "https://x.test/h"));
        store.add_notification(Notification::new("check-2", kinds::EMAIL, "dev@example.com"));

        let found = store.notifications_by_check_id("check-1").await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(store.notifications_by_check_id("check-3").await.unwrap().is_empty());
        assert_eq!(store.lookup_count(), 2);
    }

    #[tokio::test]
    async fn test_injected_lookup_failure() {
        let store = InMemoryStore::new();
        store.fail_lookups(true);
        assert!(matches!(
            store.notifications_by_check_id("check-1").await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_credentials_by_customer() {
        let store = InMemoryStore::new();
        store.set_pagerduty(
            "customer-1",
            PagerDutyIntegration {
                service_key: "pd".to_string(),
                enabled: true,
                ..PagerDutyIntegration::default()
            },
        );

        assert!(store.pagerduty_integration("customer-1").await.unwrap().is_some());
        assert!(store.pagerduty_integration("customer-2").await.unwrap().is_none());
        assert!(store.slack_oauth("customer-1").await.unwrap().is_none());
        assert_eq!(store.credential_lookup_count(), 3);
        assert_eq!(store.lookup_count(), 0);
    }
}
