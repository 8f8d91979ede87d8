//! Third-party HTTP APIs used for delivery

pub mod client;
pub mod mandrill;
pub mod pagerduty;
pub mod slack;

pub use client::{ExternalApiError, HTTP_CLIENT};
