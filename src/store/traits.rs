use async_trait::async_trait;

use crate::models::{Notification, PagerDutyIntegration, SlackOAuthResponse};
use crate::store::StoreError;

/// Read access to configured destinations
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Every notification registered for `check_id`, across customers.
    ///
    /// Only the queue path calls this; no per-customer filter is applied.
    async fn notifications_by_check_id(
        &self,
        check_id: &str,
    ) -> Result<Vec<Notification>, StoreError>;
}

/// Per-customer integration credentials; `Ok(None)` means nothing on file
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn slack_oauth(&self, customer_id: &str)
    -> Result<Option<SlackOAuthResponse>, StoreError>;

    async fn pagerduty_integration(
        &self,
        customer_id: &str,
    ) -> Result<Option<PagerDutyIntegration>, StoreError>;
}
