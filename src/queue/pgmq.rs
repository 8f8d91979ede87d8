//! pgmq adapter
//!
//! Messages are JSON strings holding the base64 body. Receives long-poll
//! through `pgmq.read_with_poll`, which holds a pooled connection for up to
//! the wait time.

use std::time::Duration;

use async_trait::async_trait;
use diesel::QueryableByName;
use diesel::sql_types::{BigInt, Bool, Integer, Jsonb, Nullable, Text};
use diesel_async::RunQueryDsl;
use serde_json::Value as JsonValue;

use crate::config::QueueConfig;
use crate::db::{AsyncDbPool, DbConnection};
use crate::queue::{MessageQueue, QueueError, QueueMessage, Receipt};

#[derive(QueryableByName)]
struct ReadRow {
    #[diesel(sql_type = BigInt)]
    msg_id: i64,
    #[diesel(sql_type = Nullable<Jsonb>)]
    message: Option<JsonValue>,
}

#[derive(QueryableByName)]
struct DeleteRow {
    #[diesel(sql_type = Bool)]
    deleted: bool,
}

#[derive(QueryableByName)]
struct MetricsRow {
    #[diesel(sql_type = BigInt)]
    queue_length: i64,
}

#[derive(Clone)]
pub struct PgmqQueue {
    pool: AsyncDbPool,
    queue: String,
    visibility_timeout: i32,
}

impl PgmqQueue {
    pub fn new(pool: AsyncDbPool, config: &QueueConfig) -> Self {
        Self {
            pool,
            queue: config.name.clone(),
            visibility_timeout: saturating_i32(config.visibility_timeout),
        }
    }

    async fn connection(&self) -> Result<DbConnection<'_>, QueueError> {
        Ok(self.pool.get().await?)
    }
}

fn saturating_i32(value: u64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Producers enqueue the body as a JSON string; `{"body": "..."}` is accepted too
fn message_body(message: Option<JsonValue>) -> Option<String> {
    match message? {
        JsonValue::String(body) => Some(body),
        JsonValue::Object(mut fields) => match fields.remove("body") {
            Some(JsonValue::String(body)) => Some(body),
            _ => None,
        },
        _ => None,
    }
}

#[async_trait]
impl MessageQueue for PgmqQueue {
    async fn receive(
        &self,
        max_messages: u32,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let mut conn = self.connection().await?;

        let rows: Vec<ReadRow> = diesel::sql_query(
            "SELECT msg_id, message FROM pgmq.read_with_poll($1, $2, $3, $4)",
        )
        .bind::<Text, _>(&self.queue)
        .bind::<Integer, _>(self.visibility_timeout)
        .bind::<Integer, _>(saturating_i32(u64::from(max_messages)))
        .bind::<Integer, _>(saturating_i32(wait.as_secs()))
        .load(&mut conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| QueueMessage {
                receipt: Receipt::new(row.msg_id.to_string()),
                body: message_body(row.message),
            })
            .collect())
    }

    async fn delete(&self, receipt: &Receipt) -> Result<(), QueueError> {
        let msg_id: i64 = receipt
            .as_str()
            .parse()
            .map_err(|_| QueueError::InvalidReceipt(receipt.to_string()))?;
        let mut conn = self.connection().await?;

        let row: DeleteRow = diesel::sql_query("SELECT pgmq.delete($1, $2) AS deleted")
            .bind::<Text, _>(&self.queue)
            .bind::<BigInt, _>(msg_id)
            .get_result(&mut conn)
            .await?;

        if !row.deleted {
            tracing::debug!(queue = %self.queue, receipt = %receipt, "Message already removed");
        }
        Ok(())
    }

    async fn backlog(&self) -> Result<i64, QueueError> {
        let mut conn = self.connection().await?;

        let row: MetricsRow = diesel::sql_query("SELECT queue_length FROM pgmq.metrics($1)")
            .bind::<Text, _>(&self.queue)
            .get_result(&mut conn)
            .await?;

        Ok(row.queue_length)
    }

    fn name(&self) -> &str {
        &self.queue
    }
}
