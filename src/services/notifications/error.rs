use thiserror::Error;

use crate::external::ExternalApiError;
use crate::models::DecodeError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("no sender registered for notification type '{0}'")]
    NoSender(String),

    /// A failing result without a single failing response
    #[error("check {check_id} is failing but carries no failing responses")]
    InconsistentData { check_id: String },

    /// The customer's credential for this backend is missing, disabled or revoked
    #[error("{integration} integration inactive for customer '{customer_id}'")]
    IntegrationInactive {
        integration: &'static str,
        customer_id: String,
    },

    #[error("invalid {kind} destination '{value}'")]
    InvalidDestination { kind: &'static str, value: String },

    #[error("{backend} delivery failed with HTTP {status}: {body}")]
    Delivery {
        backend: &'static str,
        status: u16,
        body: String,
    },

    /// The backend answered but refused the message
    #[error("{backend} rejected the message: {message}")]
    Rejected {
        backend: &'static str,
        message: String,
    },

    #[error("{backend} sender is not configured: {reason}")]
    NotConfigured {
        backend: &'static str,
        reason: String,
    },

    #[error("{backend} request failed: {source}")]
    Http {
        backend: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to serialize notification payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("credential lookup failed: {0}")]
    Store(#[from] StoreError),

    #[error("undecodable check result payload: {0}")]
    Payload(#[from] DecodeError),
}

impl NotifyError {
    pub fn is_integration_inactive(&self) -> bool {
        matches!(self, NotifyError::IntegrationInactive { .. })
    }

    pub fn is_inconsistent_data(&self) -> bool {
        matches!(self, NotifyError::InconsistentData { .. })
    }

    pub(crate) fn not_configured(backend: &'static str, reason: impl Into<String>) -> Self {
        NotifyError::NotConfigured {
            backend,
            reason: reason.into(),
        }
    }

    pub(crate) fn inactive(integration: &'static str, customer_id: impl Into<String>) -> Self {
        NotifyError::IntegrationInactive {
            integration,
            customer_id: customer_id.into(),
        }
    }
}

impl From<ExternalApiError> for NotifyError {
    fn from(err: ExternalApiError) -> Self {
        match err {
            ExternalApiError::Status { api, status, body } => NotifyError::Delivery {
                backend: api,
                status,
                body,
            },
            ExternalApiError::Transport { api, source }
            | ExternalApiError::Decode { api, source } => NotifyError::Http {
                backend: api,
                source,
            },
        }
    }
}
