//! Services used by the consumer: delivery, enrichment and diagnostics.

pub mod diagnostics;
pub mod enrichment;
pub mod notifications;

pub use diagnostics::{
    Diagnostic, DiagnosticReporter, LogReporter, WebhookReporter, reporter_from_settings,
};
pub use enrichment::{EnrichmentClient, EnrichmentError, EventBuilder};
pub use notifications::{Notifier, NotifyError, Sender};
