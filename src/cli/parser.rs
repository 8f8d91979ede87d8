//! CLI argument parsing with clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Dispatches monitoring check results to notification backends
#[derive(Parser, Debug)]
#[command(name = "checkrelay")]
#[command(about = "Dispatches monitoring check results to notification backends")]
#[command(long_about = "
checkrelay consumes check results from a Postgres (pgmq) queue and delivers
them to the email, Slack, webhook and PagerDuty destinations configured for
each check. A foreman sizes the worker pool to the queue backlog.

EXAMPLES:
    # Consume the queue with default configuration
    checkrelay run

    # Bound the worker pool
    checkrelay run --min-workers 2 --max-workers 40

    # Use a single configuration file
    checkrelay --config /etc/checkrelay/production.toml run

    # Check configuration without connecting to anything
    checkrelay run --dry-run

    # Send a test notification to one destination
    checkrelay send-test --type webhook --value https://hooks.example.com/checks
")]
#[command(version = crate::clap_long_version())]
pub struct Cli {
    /// Subcommand to execute; `run` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    ///
    /// Loads this TOML file instead of the layered `config/` directory.
    /// `CHECKRELAY_*` environment variables still apply on top.
    ///
    /// Example: --config /etc/checkrelay/production.toml
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Selects which `{environment}.toml` layer is loaded.
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Consume the queue until interrupted (default)
    ///
    /// Connects to Postgres, starts the foreman and runs until SIGINT or
    /// SIGTERM, then retires every worker.
    ///
    /// Examples:
    ///   checkrelay run                              # Start with defaults
    ///   checkrelay run --max-workers 40             # Raise the pool ceiling
    ///   checkrelay run --dry-run                    # Validate config and exit
    Run {
        /// Minimum number of workers
        #[arg(long, value_name = "N", value_parser = super::validation::validate_worker_count)]
        min_workers: Option<i64>,

        /// Maximum number of workers
        #[arg(long, value_name = "N", value_parser = super::validation::validate_worker_count)]
        max_workers: Option<i64>,

        /// Log level override, taking precedence over --verbose/--quiet
        #[arg(long, value_enum)]
        log_level: Option<LogLevel>,

        /// Validate configuration, print the effective pool bounds and exit
        #[arg(long)]
        dry_run: bool,
    },
    /// Send a synthetic failing check result to one destination
    ///
    /// Examples:
    ///   checkrelay send-test --type email --value ops@example.com
    ///   checkrelay send-test --type slack_bot --value C0123456 --customer-id 42
    SendTest {
        /// Notification type: email, slack_bot, webhook or pagerduty
        #[arg(long = "type", value_name = "TYPE", value_parser = super::validation::validate_notification_type)]
        kind: String,

        /// Destination: address, channel id or URL depending on the type
        #[arg(long, value_name = "VALUE")]
        value: String,

        /// Customer whose integration credentials are used
        #[arg(long, value_name = "ID")]
        customer_id: Option<String>,
    },
}

/// Environment options
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

/// Log level options
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LogLevel {
    #[value(name = "error")]
    Error,
    #[value(name = "warn", alias = "warning")]
    Warn,
    #[value(name = "info")]
    Info,
    #[value(name = "debug")]
    Debug,
    #[value(name = "trace")]
    Trace,
}

impl Cli {
    /// Checks argument combinations clap cannot express
    pub fn validate(&self) -> Result<(), String> {
        if let Some(Commands::Run {
            min_workers: Some(min),
            max_workers: Some(max),
            ..
        }) = self.command
            && min > max
        {
            return Err(format!(
                "--min-workers ({min}) cannot be greater than --max-workers ({max})"
            ));
        }

        if self.verbose && self.quiet {
            return Err("Cannot use --verbose and --quiet together".to_string());
        }

        Ok(())
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => "error".to_string(),
            LogLevel::Warn => "warn".to_string(),
            LogLevel::Info => "info".to_string(),
            LogLevel::Debug => "debug".to_string(),
            LogLevel::Trace => "trace".to_string(),
        }
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Test => crate::config::Environment::Test,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
        }
    }
}
