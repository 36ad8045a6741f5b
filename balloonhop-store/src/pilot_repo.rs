use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use balloonhop_core::models::{
    AdminActionDraft, ConnectAccountStatus, PilotApplication, PilotDetails, PilotProfile, PilotStatus,
    PilotSummary, StatusChange, User, UserSummary,
};
use balloonhop_core::repository::PilotRepository;
use balloonhop_core::{StoreError, StoreResult};

use crate::database::db_err;
use crate::rows::{convert_all, ApplicationRow, PilotRow, UserRow, APPLICATION_COLUMNS, PILOT_COLUMNS, USER_COLUMNS};

pub struct StorePilotRepository {
    pool: PgPool,
}

impl StorePilotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_pilot<T>(&self, column: &str, value: T) -> StoreResult<Option<PilotProfile>>
    where
        T: for<'q> sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres> + Send + 'static,
    {
        let sql = format!("SELECT {PILOT_COLUMNS} FROM pilot_profiles WHERE {column} = $1");
        let row = sqlx::query_as::<_, PilotRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(PilotProfile::try_from).transpose()
    }

    async fn details_for(&self, profile: PilotProfile) -> StoreResult<PilotDetails> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
        let user: User = sqlx::query_as::<_, UserRow>(&sql)
            .bind(profile.user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?
            .try_into()?;

        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM pilot_applications WHERE pilot_id = $1 \
             ORDER BY created_at DESC LIMIT 1"
        );
        let latest_application = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(profile.pilot_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(PilotApplication::try_from)
            .transpose()?;

        Ok(PilotDetails {
            user: UserSummary::from(&user),
            profile,
            latest_application,
        })
    }

    async fn set_connect(
        &self,
        pilot_id: Uuid,
        account_id: Option<&str>,
        status: ConnectAccountStatus,
    ) -> StoreResult<PilotProfile> {
        let sql = format!(
            "UPDATE pilot_profiles SET \
             stripe_connect_account_id = COALESCE($2, stripe_connect_account_id), \
             stripe_account_status = $3, updated_at = NOW() \
             WHERE pilot_id = $1 RETURNING {PILOT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PilotRow>(&sql)
            .bind(pilot_id)
            .bind(account_id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| StoreError::NotFound(format!("pilot {}", pilot_id)))?;
        row.try_into()
    }
}

#[async_trait]
impl PilotRepository for StorePilotRepository {
    async fn find_pilot(&self, pilot_id: Uuid) -> StoreResult<Option<PilotProfile>> {
        self.fetch_pilot("pilot_id", pilot_id).await
    }

    async fn find_pilot_by_user(&self, user_id: Uuid) -> StoreResult<Option<PilotProfile>> {
        self.fetch_pilot("user_id", user_id).await
    }

    async fn find_pilot_by_connect_account(&self, account_id: &str) -> StoreResult<Option<PilotProfile>> {
        self.fetch_pilot("stripe_connect_account_id", account_id.to_string()).await
    }

    async fn pilot_details(&self, pilot_id: Uuid) -> StoreResult<Option<PilotDetails>> {
        match self.find_pilot(pilot_id).await? {
            Some(profile) => Ok(Some(self.details_for(profile).await?)),
            None => Ok(None),
        }
    }

    async fn list_pilot_details(&self, status: PilotStatus) -> StoreResult<Vec<PilotDetails>> {
        let sql = format!("SELECT {PILOT_COLUMNS} FROM pilot_profiles WHERE status = $1 ORDER BY created_at ASC");
        let rows = sqlx::query_as::<_, PilotRow>(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut details = Vec::with_capacity(rows.len());
        for profile in convert_all::<_, PilotProfile>(rows)? {
            details.push(self.details_for(profile).await?);
        }
        Ok(details)
    }

    async fn list_approved_pilots(&self) -> StoreResult<Vec<PilotSummary>> {
        let rows: Vec<(Uuid, String, String)> = sqlx::query_as(
            "SELECT p.pilot_id, u.first_name, u.last_name FROM pilot_profiles p \
             JOIN users u ON u.user_id = p.user_id \
             WHERE p.status = 'APPROVED' ORDER BY u.first_name, u.last_name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|(pilot_id, first, last)| PilotSummary {
                pilot_id,
                name: format!("{} {}", first, last).trim().to_string(),
            })
            .collect())
    }

    async fn transition_status(
        &self,
        pilot_id: Uuid,
        status: PilotStatus,
        action: AdminActionDraft,
    ) -> StoreResult<StatusChange> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let sql = format!(
            "UPDATE pilot_profiles SET status = $2, updated_at = NOW() \
             WHERE pilot_id = $1 AND status <> $2 RETURNING {PILOT_COLUMNS}"
        );
        let Some(row) = sqlx::query_as::<_, PilotRow>(&sql)
            .bind(pilot_id)
            .bind(status.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
        else {
            let current: Option<String> = sqlx::query_scalar("SELECT status FROM pilot_profiles WHERE pilot_id = $1")
                .bind(pilot_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
            return match current {
                Some(current) => Ok(StatusChange::Unchanged(current.parse()?)),
                None => Ok(StatusChange::NotFound),
            };
        };

        let action = action.into_action(Utc::now());
        sqlx::query(
            "INSERT INTO admin_actions (action_id, admin_id, action_type, target_id, details, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(action.action_id)
        .bind(action.admin_id)
        .bind(action.action_type.as_str())
        .bind(action.target_id)
        .bind(&action.details)
        .bind(action.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(StatusChange::Applied(row.try_into()?))
    }

    async fn link_connect_account(
        &self,
        pilot_id: Uuid,
        account_id: &str,
        status: ConnectAccountStatus,
    ) -> StoreResult<PilotProfile> {
        self.set_connect(pilot_id, Some(account_id), status).await
    }

    async fn update_connect_status(
        &self,
        pilot_id: Uuid,
        status: ConnectAccountStatus,
    ) -> StoreResult<PilotProfile> {
        self.set_connect(pilot_id, None, status).await
    }

    async fn count_pilots(&self, status: Option<PilotStatus>) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM pilot_profiles WHERE ($1::text IS NULL OR status = $1)")
            .bind(status.map(|s| s.as_str()))
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}
