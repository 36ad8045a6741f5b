use async_trait::async_trait;
use sqlx::PgPool;

use balloonhop_core::models::AdminActionView;
use balloonhop_core::repository::AdminRepository;
use balloonhop_core::StoreResult;

use crate::database::db_err;
use crate::rows::{convert_all, AdminActionRow};

pub struct StoreAdminRepository {
    pool: PgPool,
}

impl StoreAdminRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminRepository for StoreAdminRepository {
    async fn list_actions(&self, offset: i64, limit: i64) -> StoreResult<Vec<AdminActionView>> {
        let rows = sqlx::query_as::<_, AdminActionRow>(
            "SELECT a.action_id, a.admin_id, a.action_type, a.target_id, a.details, a.created_at, \
                    u.first_name AS admin_first_name, u.last_name AS admin_last_name, u.email AS admin_email \
             FROM admin_actions a LEFT JOIN users u ON u.user_id = a.admin_id \
             ORDER BY a.created_at DESC OFFSET $1 LIMIT $2",
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        convert_all(rows)
    }

    async fn count_actions(&self) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM admin_actions")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}
