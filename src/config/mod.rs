//! Settings management for checkrelay
//!
//! Priority, lowest to highest:
//! 1. `default.toml`
//! 2. `{environment}.toml`
//! 3. `local.toml` (not committed)
//! 4. `CHECKRELAY_*` environment variables

pub mod environment;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use environment::Environment;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use settings::{
    ApplicationConfig, DatabaseConfig, DiagnosticsConfig, EmailConfig, EnrichmentConfig,
    ForemanConfig, NotifierConfig, PagerDutyConfig, QueueConfig, Settings, SlackConfig, WebhookConfig,
};
