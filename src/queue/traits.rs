use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::queue::QueueError;

/// Opaque handle used to acknowledge one received message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Receipt(String);

impl Receipt {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A received message; hidden from other consumers until its visibility
/// timeout lapses or it is deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub receipt: Receipt,
    /// Base64 encoded check result; `None` when the payload was not a string
    pub body: Option<String>,
}

/// Queue capability consumed by workers and the foreman
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Receives up to `max_messages`, waiting at most `wait` for the first one
    async fn receive(
        &self,
        max_messages: u32,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError>;

    /// Acknowledges a message; deleting an already removed message succeeds
    async fn delete(&self, receipt: &Receipt) -> Result<(), QueueError>;

    /// Approximate number of messages waiting, visible or not
    async fn backlog(&self) -> Result<i64, QueueError>;

    fn name(&self) -> &str;
}
