//! Run command handler
//!
//! Wires the Postgres pool, the pgmq queue, the notification store and the
//! senders into a foreman, then consumes until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::config::{EnrichmentConfig, Environment, NotifierConfig, settings::Settings};
use crate::consumer::{EventBuilderFactory, Foreman, NotifierFactory, Site, WorkerSettings};
use crate::db::establish_async_connection_pool;
use crate::error::{AppError, AppResult};
use crate::queue::{MessageQueue, PgmqQueue};
use crate::services::{EventBuilder, Notifier, reporter_from_settings};
use crate::store::{CredentialStore, PgStore};

pub struct RunCommandHandler {
    config: Settings,
}

impl RunCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    pub async fn execute(&self, dry_run: bool) -> AppResult<()> {
        if dry_run {
            self.validate_only()
        } else {
            self.run().await
        }
    }

    /// Validates configuration and reports what `run` would do
    pub fn validate_only(&self) -> AppResult<()> {
        self.config.validate()?;

        let foreman = &self.config.foreman;
        println!("✓ Configuration is valid");
        println!("✓ Queue: {}", self.config.queue.name);
        println!(
            "✓ Workers: {} to {} (optimal work estimate {}, resized every {}s)",
            foreman.min_workers,
            foreman.max_workers,
            foreman.optimal_work_estimate,
            foreman.update_period
        );
        println!("✓ Backends: {}", enabled_backends(&self.config.notifier).join(", "));
        println!(
            "✓ Enrichment: {}",
            self.config.enrichment.endpoint.as_deref().unwrap_or("disabled")
        );
        println!("Dry run completed successfully - configuration is ready for deployment");
        Ok(())
    }

    async fn run(&self) -> AppResult<()> {
        tracing::info!(
            app_name = %self.config.application.name,
            app_version = %self.config.application.version,
            environment = %Environment::from_env().as_str(),
            "Application starting"
        );

        let pool = establish_async_connection_pool(&self.config.database).await?;
        let queue: Arc<dyn MessageQueue> =
            Arc::new(PgmqQueue::new(pool.clone(), &self.config.queue));
        let store = Arc::new(PgStore::new(pool));

        let notifiers = notifier_factory(self.config.notifier.clone(), store.clone());
        ensure_senders(&notifiers)?;

        let timeout = self.config.notifier.http_timeout();
        let site = Site::new(queue, store, notifiers)
            .with_event_builders(event_builder_factory(self.config.enrichment.clone(), timeout))
            .with_diagnostics(reporter_from_settings(
                &self.config.diagnostics,
                &self.config.application,
                timeout,
            ))
            .with_settings(WorkerSettings::from_config(
                &self.config.queue,
                &self.config.foreman,
            ));

        let mut foreman = Foreman::new(Arc::new(site), self.config.foreman.clone());
        foreman.init().await?;

        let cancel = CancellationToken::new();
        tokio::spawn(cancel_on_signal(cancel.clone()));
        foreman.run(cancel).await;

        tracing::info!("Shutdown complete");
        Ok(())
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}

fn enabled_backends(config: &NotifierConfig) -> Vec<&'static str> {
    [
        ("email", config.email.enabled),
        ("slack_bot", config.slack.enabled),
        ("webhook", config.webhook.enabled),
        ("pagerduty", config.pagerduty.enabled),
    ]
    .into_iter()
    .filter_map(|(name, enabled)| enabled.then_some(name))
    .collect()
}

/// Each call builds an independent notifier from the same settings
pub fn notifier_factory(
    config: NotifierConfig,
    credentials: Arc<dyn CredentialStore>,
) -> NotifierFactory {
    Arc::new(move || Notifier::from_settings(&config, Arc::clone(&credentials)))
}

pub fn event_builder_factory(config: EnrichmentConfig, timeout: Duration) -> EventBuilderFactory {
    Arc::new(move || EventBuilder::from_settings(&config, timeout))
}

/// Fails when no backend can be built: the pool could deliver nothing
pub fn ensure_senders(notifiers: &NotifierFactory) -> AppResult<()> {
    let (notifier, errors) = notifiers();
    for (backend, error) in &errors {
        tracing::warn!(backend, error = %error, "Sender failed to initialize");
    }

    if notifier.is_empty() {
        return Err(AppError::startup(if errors.is_empty() {
            "no notification backend is enabled".to_string()
        } else {
            format!("every notification backend failed to initialize ({})", errors.len())
        }));
    }

    tracing::info!(backends = ?notifier.kinds(), "Notification backends ready");
    Ok(())
}

/// Cancels `token` on Ctrl+C or SIGTERM
async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
    token.cancel();
}
