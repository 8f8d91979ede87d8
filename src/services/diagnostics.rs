//! Out-of-band reporting of payloads the consumer had to drop

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::{ApplicationConfig, DiagnosticsConfig};
use crate::external::client::post_json;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Where the problem surfaced, e.g. `decode`
    pub context: String,
    pub error: String,
    /// Raw payload, when there was one
    pub payload: Option<String>,
}

impl Diagnostic {
    pub fn new(context: impl Into<String>, error: impl ToString, payload: Option<String>) -> Self {
        Self {
            context: context.into(),
            error: error.to_string(),
            payload,
        }
    }
}

/// Never blocks the caller and never fails.
pub trait DiagnosticReporter: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl DiagnosticReporter for LogReporter {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::error!(
            target: "checkrelay::diagnostics",
            context = %diagnostic.context,
            error = %diagnostic.error,
            payload = diagnostic.payload.as_deref().unwrap_or_default(),
            "Dropped payload"
        );
    }
}

#[derive(Debug, Serialize)]
struct DiagnosticBody<'a> {
    #[serde(flatten)]
    diagnostic: &'a Diagnostic,
    service: &'a str,
    version: &'a str,
}

/// Logs, then POSTs the report in a detached task
#[derive(Debug, Clone)]
pub struct WebhookReporter {
    url: String,
    service: String,
    version: String,
    timeout: Duration,
}

impl WebhookReporter {
    pub fn new(url: impl Into<String>, application: &ApplicationConfig, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            service: application.name.clone(),
            version: application.version.clone(),
            timeout,
        }
    }
}

impl DiagnosticReporter for WebhookReporter {
    fn report(&self, diagnostic: Diagnostic) {
        LogReporter.report(diagnostic.clone());

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(url = %self.url, "No runtime available, diagnostic not forwarded");
            return;
        };

        let reporter = self.clone();
        runtime.spawn(async move {
            let body = DiagnosticBody {
                diagnostic: &diagnostic,
                service: &reporter.service,
                version: &reporter.version,
            };
            if let Err(e) = post_json("diagnostics", &reporter.url, &body, reporter.timeout, None).await {
                tracing::warn!(url = %reporter.url, error = %e, "Failed to forward diagnostic");
            }
        });
    }
}

pub fn reporter_from_settings(
    config: &DiagnosticsConfig,
    application: &ApplicationConfig,
    timeout: Duration,
) -> Arc<dyn DiagnosticReporter> {
    match config.endpoint.as_deref().filter(|url| !url.trim().is_empty()) {
        Some(url) => Arc::new(WebhookReporter::new(url, application, timeout)),
        None => Arc::new(LogReporter),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use super::{Diagnostic, DiagnosticReporter};

    #[derive(Debug, Default)]
    pub struct CollectingReporter {
        reports: Mutex<Vec<Diagnostic>>,
    }

    impl CollectingReporter {
        pub fn reports(&self) -> Vec<Diagnostic> {
            self.reports.lock().unwrap().clone()
        }
    }

    impl DiagnosticReporter for CollectingReporter {
        fn report(&self, diagnostic: Diagnostic) {
            self.reports.lock().unwrap().push(diagnostic);
        }
    }
}
