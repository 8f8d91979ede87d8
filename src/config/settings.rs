//! Settings structures for checkrelay
//!
//! Every section deserializes from TOML or `CHECKRELAY_*` environment
//! variables and falls back to the defaults below when a key is absent.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "checkrelay".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_max_connections() -> u32 {
    32
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_queue_name() -> String {
    "check_results".to_string()
}

fn default_batch_size() -> u32 {
    10
}

fn default_wait_seconds() -> u64 {
    20
}

fn default_visibility_timeout() -> u64 {
    30
}

fn default_delete_attempts() -> u32 {
    5
}

fn default_min_workers() -> i64 {
    1
}

fn default_max_workers() -> i64 {
    25
}

fn default_optimal_work_estimate() -> i64 {
    1000
}

fn default_update_period() -> u64 {
    60
}

fn default_error_threshold() -> u32 {
    10
}

fn default_shutdown_grace() -> u64 {
    30
}

fn default_app_host() -> String {
    "https://app.example.com".to_string()
}

fn default_http_timeout() -> u64 {
    15
}

fn default_mandrill_url() -> String {
    "https://mandrillapp.com/api/1.0".to_string()
}

fn default_from_email() -> String {
    "alerts@example.com".to_string()
}

fn default_from_name() -> String {
    "Check Alerts".to_string()
}

fn default_slack_url() -> String {
    "https://slack.com/api".to_string()
}

fn default_pagerduty_url() -> String {
    "https://events.pagerduty.com/generic/2010-04-15/create_event.json".to_string()
}

fn default_pagerduty_client() -> String {
    "checkrelay".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/checkrelay.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

// ============================================================================
// Application Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Database Configuration
// ============================================================================

/// Postgres connection used by both the pgmq queue and the notification store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,

    /// Every worker holds one connection while long-polling, so keep this above `foreman.max_workers`
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout: default_connection_timeout(),
        }
    }
}

// ============================================================================
// Queue Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// pgmq queue holding base64 encoded check results
    #[serde(default = "default_queue_name")]
    pub name: String,

    /// Messages requested per receive (1..=10)
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Long-poll wait per receive, in seconds
    #[serde(default = "default_wait_seconds")]
    pub wait_seconds: u64,

    /// Seconds a received message stays hidden before redelivery
    #[serde(default = "default_visibility_timeout")]
    pub visibility_timeout: u64,

    #[serde(default = "default_delete_attempts")]
    pub delete_attempts: u32,
}

impl QueueConfig {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_seconds)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: default_queue_name(),
            batch_size: default_batch_size(),
            wait_seconds: default_wait_seconds(),
            visibility_timeout: default_visibility_timeout(),
            delete_attempts: default_delete_attempts(),
        }
    }
}

// ============================================================================
// Foreman Configuration
// ============================================================================

/// Worker pool sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForemanConfig {
    #[serde(default = "default_min_workers")]
    pub min_workers: i64,

    #[serde(default = "default_max_workers")]
    pub max_workers: i64,

    /// Backlog readings below this value are raised to it before smoothing
    #[serde(default = "default_optimal_work_estimate")]
    pub optimal_work_estimate: i64,

    /// Seconds between sizing cycles
    #[serde(default = "default_update_period")]
    pub update_period: u64,

    /// Consecutive receive errors before a worker halves its count and backs off
    #[serde(default = "default_error_threshold")]
    pub error_threshold: u32,

    /// Seconds to wait for workers to exit on shutdown
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace: u64,
}

impl ForemanConfig {
    pub fn update_period(&self) -> Duration {
        Duration::from_secs(self.update_period)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace)
    }
}

impl Default for ForemanConfig {
    fn default() -> Self {
        Self {
            min_workers: default_min_workers(),
            max_workers: default_max_workers(),
            optimal_work_estimate: default_optimal_work_estimate(),
            update_period: default_update_period(),
            error_threshold: default_error_threshold(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

// ============================================================================
// Notifier Configuration
// ============================================================================

/// Mandrill templated email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_mandrill_url")]
    pub api_url: String,

    /// Keep out of committed files; set `CHECKRELAY_NOTIFIER__EMAIL__API_KEY`
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_from_email")]
    pub from_email: String,

    #[serde(default = "default_from_name")]
    pub from_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            api_url: default_mandrill_url(),
            api_key: String::new(),
            from_email: default_from_email(),
            from_name: default_from_name(),
        }
    }
}

/// Slack bot delivery; tokens come from each customer's stored OAuth response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_slack_url")]
    pub api_url: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            api_url: default_slack_url(),
        }
    }
}

/// PagerDuty Events API v1; service keys come from each customer's integration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagerDutyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_pagerduty_url")]
    pub events_url: String,

    #[serde(default = "default_pagerduty_client")]
    pub client_name: String,
}

impl Default for PagerDutyConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            events_url: default_pagerduty_url(),
            client_name: default_pagerduty_client(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Base URL of the web app, used to build links back to a check
    #[serde(default = "default_app_host")]
    pub app_host: String,

    /// Per-request timeout for every outbound delivery call, in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout: u64,

    #[serde(default)]
    pub email: EmailConfig,

    #[serde(default)]
    pub slack: SlackConfig,

    #[serde(default)]
    pub pagerduty: PagerDutyConfig,

    #[serde(default)]
    pub webhook: WebhookConfig,
}

impl NotifierConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }

    /// Link to a check in the web app
    pub fn check_url(&self, check_id: &str) -> String {
        format!("{}/check/{}", self.app_host.trim_end_matches('/'), check_id)
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            app_host: default_app_host(),
            http_timeout: default_http_timeout(),
            email: EmailConfig::default(),
            slack: SlackConfig::default(),
            pagerduty: PagerDutyConfig::default(),
            webhook: WebhookConfig::default(),
        }
    }
}

// ============================================================================
// Enrichment / Diagnostics Configuration
// ============================================================================

/// Screenshot service; enrichment is skipped when no endpoint is set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Out-of-band sink for undecodable messages; logging only when no endpoint is set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
}

// ============================================================================
// Logger Settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            colored: default_true(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_path")]
    pub path: String,

    #[serde(default = "default_true")]
    pub append: bool,

    /// "full", "compact" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: default_true(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Level or full `EnvFilter` directive, e.g. `info,checkrelay::consumer=debug`
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub console: ConsoleSettings,

    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Converts the file representation into the runtime logger configuration
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let format: LogFormat = self
            .file
            .format
            .parse()
            .map_err(|e: crate::logger::LoggerError| {
                ConfigError::validation("logger.file.format", e.to_string())
            })?;

        let config = LoggerConfig {
            level: self.level,
            console: ConsoleConfig {
                enabled: self.console.enabled,
                colored: self.console.colored,
            },
            file: FileConfig {
                enabled: self.file.enabled,
                path: PathBuf::from(self.file.path),
                append: self.file.append,
                format,
            },
        };

        config
            .validate()
            .map_err(|e| ConfigError::validation("logger", e.to_string()))?;
        Ok(config)
    }
}

// ============================================================================
// Root Settings
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub foreman: ForemanConfig,

    #[serde(default)]
    pub notifier: NotifierConfig,

    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    #[serde(default)]
    pub logger: LoggerSettings,
}
