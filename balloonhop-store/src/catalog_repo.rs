use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use balloonhop_core::models::{FeatureFlag, Festival, NewSubscription, NotificationSubscription};
use balloonhop_core::repository::{CatalogRepository, NotificationRepository};
use balloonhop_core::StoreResult;

use crate::database::db_err;

/// Festivals, feature flags and notification sign-ups.
pub struct StoreCatalogRepository {
    pool: PgPool,
}

impl StoreCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FestivalRow {
    festival_id: Uuid,
    name: String,
    location: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    description: Option<String>,
}

#[derive(sqlx::FromRow)]
struct FeatureFlagRow {
    key: String,
    enabled: bool,
    description: Option<String>,
}

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    subscription_id: Uuid,
    email: Option<String>,
    phone_number: Option<String>,
    zip_code: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<SubscriptionRow> for NotificationSubscription {
    fn from(row: SubscriptionRow) -> Self {
        Self {
            subscription_id: row.subscription_id,
            email: row.email,
            phone_number: row.phone_number,
            zip_code: row.zip_code,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl CatalogRepository for StoreCatalogRepository {
    async fn upcoming_festivals(&self, now: DateTime<Utc>) -> StoreResult<Vec<Festival>> {
        let rows = sqlx::query_as::<_, FestivalRow>(
            "SELECT festival_id, name, location, start_date, end_date, description \
             FROM festivals WHERE end_date >= $1 ORDER BY start_date ASC",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|r| Festival {
                festival_id: r.festival_id,
                name: r.name,
                location: r.location,
                start_date: r.start_date,
                end_date: r.end_date,
                description: r.description,
            })
            .collect())
    }

    async fn feature_flags(&self) -> StoreResult<Vec<FeatureFlag>> {
        let rows = sqlx::query_as::<_, FeatureFlagRow>("SELECT key, enabled, description FROM feature_flags ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|r| FeatureFlag {
                key: r.key,
                enabled: r.enabled,
                description: r.description,
            })
            .collect())
    }
}

#[async_trait]
impl NotificationRepository for StoreCatalogRepository {
    async fn find_subscription(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> StoreResult<Option<NotificationSubscription>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            "SELECT subscription_id, email, phone_number, zip_code, created_at \
             FROM notification_subscriptions \
             WHERE ($1::text IS NOT NULL AND email = $1) OR ($2::text IS NOT NULL AND phone_number = $2) \
             LIMIT 1",
        )
        .bind(email)
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn create_subscription(&self, subscription: NewSubscription) -> StoreResult<NotificationSubscription> {
        let subscription = subscription.into_subscription(Utc::now());
        sqlx::query(
            "INSERT INTO notification_subscriptions (subscription_id, email, phone_number, zip_code, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(subscription.subscription_id)
        .bind(&subscription.email)
        .bind(&subscription.phone_number)
        .bind(&subscription.zip_code)
        .bind(subscription.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(subscription)
    }
}
