//! Async connection pool built with bb8 and diesel-async.

use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};

use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};

/// bb8::Pool is internally reference counted; cloning shares the pool.
pub type AsyncDbPool = Pool<AsyncPgConnection>;

pub type DbConnection<'a> = PooledConnection<'a, AsyncPgConnection>;

/// Builds the pool and checks that one connection can be opened.
///
/// # Errors
///
/// `AppError::ConnectionPool` when the database is unreachable within
/// `connection_timeout`.
pub async fn establish_async_connection_pool(config: &DatabaseConfig) -> AppResult<AsyncDbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(config.url.as_str());

    let pool = Pool::builder()
        .max_size(config.max_connections)
        .min_idle(Some(config.min_connections))
        .connection_timeout(Duration::from_secs(config.connection_timeout))
        .build(manager)
        .await
        .map_err(|e| AppError::ConnectionPool {
            source: anyhow::Error::from(e),
        })?;

    // build() does not surface connection errors when min_idle is zero
    pool.get().await.map_err(|e| AppError::ConnectionPool {
        source: anyhow::anyhow!("initial connection failed: {e}"),
    })?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database pool ready"
    );

    Ok(pool)
}
