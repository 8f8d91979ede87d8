//! Postgres store backed by the shared diesel-async pool.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::db::{AsyncDbPool, DbConnection};
use crate::models::{Notification, PagerDutyIntegration, SlackOAuthResponse};
use crate::store::{CredentialStore, NotificationStore, StoreError};

#[derive(Clone)]
pub struct PgStore {
    pool: AsyncDbPool,
}

impl PgStore {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> Result<DbConnection<'_>, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }
}

fn decode_document<T: DeserializeOwned>(
    entity: &'static str,
    data: Option<JsonValue>,
) -> Result<Option<T>, StoreError> {
    data.map(serde_json::from_value)
        .transpose()
        .map_err(|source| StoreError::Corrupt { entity, source })
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn notifications_by_check_id(
        &self,
        check: &str,
    ) -> Result<Vec<Notification>, StoreError> {
        use crate::schema::notifications::dsl::*;
        let mut conn = self.connection().await?;

        notifications
            .filter(check_id.eq(check))
            .order(id.asc())
            .select(Notification::as_select())
            .load(&mut conn)
            .await
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn slack_oauth(
        &self,
        customer: &str,
    ) -> Result<Option<SlackOAuthResponse>, StoreError> {
        use crate::schema::slack_oauth_responses::dsl::*;
        let mut conn = self.connection().await?;

        let document: Option<JsonValue> = slack_oauth_responses
            .filter(customer_id.eq(customer))
            .order(id.desc())
            .select(data)
            .first(&mut conn)
            .await
            .optional()?;

        decode_document("slack oauth response", document)
    }

    async fn pagerduty_integration(
        &self,
        customer: &str,
    ) -> Result<Option<PagerDutyIntegration>, StoreError> {
        use crate::schema::pagerduty_oauth_responses::dsl::*;
        let mut conn = self.connection().await?;

        let document: Option<JsonValue> = pagerduty_oauth_responses
            .filter(customer_id.eq(customer))
            .order(id.desc())
            .select(data)
            .first(&mut conn)
            .await
            .optional()?;

        decode_document("pagerduty integration", document)
    }
}
