//! Everything a worker needs, shared by the foreman and all workers

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ForemanConfig, QueueConfig};
use crate::consumer::registry::WorkerRegistry;
use crate::consumer::retry::RetryPolicy;
use crate::queue::MessageQueue;
use crate::services::notifications::InitErrors;
use crate::services::{DiagnosticReporter, EventBuilder, LogReporter, Notifier};
use crate::store::NotificationStore;

/// Builds a fresh notifier for each worker
pub type NotifierFactory = Arc<dyn Fn() -> (Notifier, InitErrors) + Send + Sync>;

/// Builds a fresh event builder for each worker
pub type EventBuilderFactory = Arc<dyn Fn() -> EventBuilder + Send + Sync>;

/// Receive batch limit imposed by the queue contract
pub const MAX_BATCH: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    pub batch_size: u32,
    pub wait: Duration,
    /// Consecutive receive errors before a worker backs off at full delay
    pub error_threshold: u32,
    pub delete_policy: RetryPolicy,
    pub receive_backoff: RetryPolicy,
}

impl WorkerSettings {
    pub fn from_config(queue: &QueueConfig, foreman: &ForemanConfig) -> Self {
        Self {
            batch_size: queue.batch_size.clamp(1, MAX_BATCH),
            wait: queue.wait(),
            error_threshold: foreman.error_threshold.max(1),
            delete_policy: RetryPolicy::with_attempts(queue.delete_attempts),
            receive_backoff: RetryPolicy::default(),
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self::from_config(&QueueConfig::default(), &ForemanConfig::default())
    }
}

pub struct Site {
    pub queue: Arc<dyn MessageQueue>,
    pub store: Arc<dyn NotificationStore>,
    pub notifiers: NotifierFactory,
    pub event_builders: EventBuilderFactory,
    pub diagnostics: Arc<dyn DiagnosticReporter>,
    pub registry: Arc<WorkerRegistry>,
    pub settings: WorkerSettings,
}

impl Site {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        store: Arc<dyn NotificationStore>,
        notifiers: NotifierFactory,
    ) -> Self {
        Self {
            queue,
            store,
            notifiers,
            event_builders: Arc::new(EventBuilder::default),
            diagnostics: Arc::new(LogReporter),
            registry: Arc::new(WorkerRegistry::new()),
            settings: WorkerSettings::default(),
        }
    }

    pub fn with_event_builders(mut self, event_builders: EventBuilderFactory) -> Self {
        self.event_builders = event_builders;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticReporter>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_settings(mut self, settings: WorkerSettings) -> Self {
        self.settings = settings;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let queue = QueueConfig {
            batch_size: 25,
            delete_attempts: 3,
            ..QueueConfig::default()
        };
        let settings = WorkerSettings::from_config(&queue, &ForemanConfig::default());

        assert_eq!(settings.batch_size, MAX_BATCH);
        assert_eq!(settings.wait, Duration::from_secs(20));
        assert_eq!(settings.error_threshold, 10);
        assert_eq!(settings.delete_policy.max_attempts, 3);
    }
}
