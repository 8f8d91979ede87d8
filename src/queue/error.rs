use diesel_async::pooled_connection::PoolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue connection unavailable: {0}")]
    Connection(#[from] bb8::RunError<PoolError>),

    #[error("queue query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("invalid receipt handle '{0}'")]
    InvalidReceipt(String),

    #[error("queue unavailable: {0}")]
    Unavailable(String),
}
