//! Message queue capability and adapters
//!
//! - `PgmqQueue`: pgmq queues on Postgres, used in production
//! - `InMemoryQueue`: visibility-timeout queue for tests and local runs

mod error;
pub mod memory;
pub mod pgmq;
mod traits;

pub use error::QueueError;
pub use memory::InMemoryQueue;
pub use pgmq::PgmqQueue;
pub use traits::{MessageQueue, QueueMessage, Receipt};
