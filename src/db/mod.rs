//! Postgres connection pool shared by the pgmq queue and the notification store

mod pool;

pub use pool::{AsyncDbPool, DbConnection, establish_async_connection_pool};
