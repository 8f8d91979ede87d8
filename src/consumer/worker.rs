//! Queue consumer
//!
//! Each pass of `work` receives one batch and takes every message through
//! decode, lookup, event building, dispatch and acknowledgement. A message
//! is deleted when it is malformed, when nothing is registered for its
//! check, or when at least one send succeeded; otherwise it is left for the
//! queue to redeliver.

use std::sync::Arc;

use crate::consumer::registry::{ForemanCommand, WorkerId, WorkerRegistration};
use crate::consumer::site::Site;
use crate::models::{CheckResult, DecodeError};
use crate::queue::{QueueMessage, Receipt};
use crate::services::{Diagnostic, EventBuilder, Notifier};

/// What happened to one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Undecodable; dropped
    Malformed,
    /// Store unavailable; left for redelivery
    LookupFailed,
    /// No destinations for the check; dropped
    NoNotifications,
    /// At least one send succeeded
    Delivered { succeeded: usize, failed: usize },
    /// Every send failed; left for redelivery
    Undelivered { failed: usize },
}

impl MessageOutcome {
    pub fn acknowledges(&self) -> bool {
        matches!(
            self,
            MessageOutcome::Malformed
                | MessageOutcome::NoNotifications
                | MessageOutcome::Delivered { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkStatus {
    /// Outcome per received message, in receive order
    Processed(Vec<MessageOutcome>),
    /// The receive failed; `error_count` consecutive failures so far
    ReceiveFailed { error_count: u32 },
}

pub struct Worker {
    site: Arc<Site>,
    notifier: Notifier,
    events: EventBuilder,
    registration: WorkerRegistration,
    error_count: u32,
}

impl Worker {
    /// Builds the worker's own notifier and event builder, then joins the
    /// registry.
    ///
    /// Backends that fail to initialize are logged and left out.
    pub fn new(site: Arc<Site>) -> Self {
        let registration = site.registry.register();
        let (notifier, failures) = (site.notifiers)();
        for (backend, error) in &failures {
            tracing::warn!(
                worker_id = %registration.id(),
                backend,
                error = %error,
                "Sender unavailable for this worker"
            );
        }
        let events = (site.event_builders)();

        Self {
            site,
            notifier,
            events,
            registration,
            error_count: 0,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.registration.id()
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    /// Works until a `Quit` arrives; the registration is released on return.
    pub async fn run(mut self) {
        tracing::info!(worker_id = %self.id(), "Worker started");

        loop {
            if let Some(ForemanCommand::Quit) = self.registration.poll_command() {
                tracing::info!(worker_id = %self.id(), "Worker quitting");
                break;
            }
            self.work().await;
        }
    }

    /// Receives one batch and processes it
    pub async fn work(&mut self) -> WorkStatus {
        let settings = self.site.settings;
        let batch = match self
            .site
            .queue
            .receive(settings.batch_size, settings.wait)
            .await
        {
            Ok(batch) => batch,
            Err(e) => {
                self.error_count += 1;
                let error_count = self.error_count;

                let delay = if error_count >= settings.error_threshold {
                    self.error_count = settings.error_threshold / 2;
                    tracing::warn!(
                        worker_id = %self.id(),
                        error = %e,
                        error_count,
                        "Receive errors reached threshold, backing off"
                    );
                    settings.receive_backoff.max_delay
                } else {
                    tracing::error!(
                        worker_id = %self.id(),
                        error = %e,
                        error_count,
                        "Failed to receive messages"
                    );
                    settings.receive_backoff.delay_for(error_count)
                };

                tokio::time::sleep(delay).await;
                return WorkStatus::ReceiveFailed { error_count };
            }
        };

        self.error_count = 0;
        if !batch.is_empty() {
            tracing::debug!(worker_id = %self.id(), messages = batch.len(), "Received messages");
        }

        let mut outcomes = Vec::with_capacity(batch.len());
        for message in batch {
            let outcome = self.process(&message).await;
            if outcome.acknowledges() {
                self.acknowledge(&message.receipt).await;
            }
            outcomes.push(outcome);
        }
        WorkStatus::Processed(outcomes)
    }

    async fn process(&self, message: &QueueMessage) -> MessageOutcome {
        let decoded = message
            .body
            .as_deref()
            .ok_or(DecodeError::MissingBody)
            .and_then(CheckResult::from_message_body);

        let result = match decoded {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    worker_id = %self.id(),
                    receipt = %message.receipt,
                    error = %e,
                    "Dropping undecodable message"
                );
                self.site
                    .diagnostics
                    .report(Diagnostic::new("decode", &e, message.body.clone()));
                return MessageOutcome::Malformed;
            }
        };

        let check_id = result.check_id.clone();
        let notifications = match self.site.store.notifications_by_check_id(&check_id).await {
            Ok(notifications) => notifications,
            Err(e) => {
                tracing::warn!(
                    worker_id = %self.id(),
                    check_id = %check_id,
                    error = %e,
                    "Notification lookup failed, leaving message for redelivery"
                );
                return MessageOutcome::LookupFailed;
            }
        };

        let Some(first) = notifications.first() else {
            tracing::info!(worker_id = %self.id(), check_id = %check_id, "No notifications for check");
            return MessageOutcome::NoNotifications;
        };

        let event = self.events.build(first, result).await;
        tracing::info!(
            worker_id = %self.id(),
            check_id = %check_id,
            customer_id = %event.result.customer_id,
            passing = event.result.passing,
            notifications = notifications.len(),
            "Dispatching notifications"
        );

        let (mut succeeded, mut failed) = (0, 0);
        for notification in &notifications {
            match self.notifier.send(notification, &event).await {
                Ok(()) => {
                    succeeded += 1;
                    tracing::info!(
                        worker_id = %self.id(),
                        check_id = %check_id,
                        customer_id = %notification.customer_id,
                        notification_type = %notification.notification_type,
                        "Notification sent"
                    );
                }
                Err(e) if e.is_integration_inactive() || e.is_inconsistent_data() => {
                    failed += 1;
                    tracing::warn!(
                        worker_id = %self.id(),
                        check_id = %check_id,
                        customer_id = %notification.customer_id,
                        notification_type = %notification.notification_type,
                        error = %e,
                        "Notification not sent"
                    );
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(
                        worker_id = %self.id(),
                        check_id = %check_id,
                        customer_id = %notification.customer_id,
                        notification_type = %notification.notification_type,
                        error = %e,
                        "Notification delivery failed"
                    );
                }
            }
        }

        if succeeded > 0 {
            MessageOutcome::Delivered { succeeded, failed }
        } else {
            MessageOutcome::Undelivered { failed }
        }
    }

    async fn acknowledge(&self, receipt: &Receipt) {
        let queue = &self.site.queue;
        let deleted = self
            .site
            .settings
            .delete_policy
            .run("delete message", |_| queue.delete(receipt))
            .await;

        if let Err(e) = deleted {
            tracing::error!(
                worker_id = %self.id(),
                receipt = %receipt,
                error = %e,
                "Failed to delete message, it may be redelivered"
            );
        }
    }
}
