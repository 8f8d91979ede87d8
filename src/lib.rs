//! checkrelay
//!
//! Consumes monitoring check results from a queue and delivers them to the
//! email, Slack, webhook and PagerDuty destinations configured per check.

use shadow_rs::shadow;
shadow!(build);

pub mod cli;
pub mod config;
pub mod consumer;
pub mod db;
pub mod error;
pub mod external;
pub mod logger;
pub mod models;
pub mod queue;
pub mod schema;
pub mod services;
pub mod store;

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}

pub fn clap_long_version() -> &'static str {
    build::CLAP_LONG_VERSION
}
