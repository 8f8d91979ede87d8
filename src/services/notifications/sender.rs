//! Per-backend delivery capability

use async_trait::async_trait;

use crate::models::{Event, Notification};
use crate::services::notifications::NotifyError;

/// Delivers one event to one configured destination.
///
/// Implementations hold only shared, stateless transport handles, so a
/// sender may be called concurrently. The `Notifier` owning it is never
/// shared between workers.
#[async_trait]
pub trait Sender: Send + Sync {
    async fn send(&self, notification: &Notification, event: &Event) -> Result<(), NotifyError>;

    /// Backend name used in logs and initialization reports
    fn name(&self) -> &'static str;
}
