use thiserror::Error;

use crate::config::ConfigError;
use crate::logger::LoggerError;
use crate::queue::QueueError;
use crate::services::notifications::NotifyError;
use crate::store::StoreError;

/// Errors that stop the process or fail a CLI command
#[derive(Error, Debug)]
pub enum AppError {
    /// Settings could not be loaded or were invalid
    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Database operation failed: {operation}")]
    Database {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Connection pool error")]
    ConnectionPool {
        #[source]
        source: anyhow::Error,
    },

    #[error("Queue unavailable: {0}")]
    Queue(#[from] QueueError),

    /// The worker pool cannot do useful work, e.g. every sender failed to initialise
    #[error("Startup failed: {reason}")]
    Startup { reason: String },

    #[error("Delivery failed: {0}")]
    Delivery(#[from] NotifyError),

    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn startup(reason: impl Into<String>) -> Self {
        AppError::Startup {
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::ValidationError { field, message } => AppError::Validation {
                field,
                reason: message,
            },
            other => AppError::Configuration {
                key: "settings".to_string(),
                source: other.into(),
            },
        }
    }
}

impl From<LoggerError> for AppError {
    fn from(error: LoggerError) -> Self {
        AppError::Configuration {
            key: "logger".to_string(),
            source: error.into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Pool(message) => AppError::ConnectionPool {
                source: anyhow::anyhow!(message),
            },
            other => AppError::Database {
                operation: "notification store".to_string(),
                source: other.into(),
            },
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

pub type AppResult<T> = Result<T, AppError>;
