use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use balloonhop_core::models::{NewUser, PilotApplication, PilotProfile, User};
use balloonhop_core::repository::{PilotRegistrationRecord, UserRepository};
use balloonhop_core::StoreResult;

use crate::database::db_err;
use crate::rows::{UserRow, USER_COLUMNS};

pub struct StoreUserRepository {
    pool: PgPool,
}

impl StoreUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(User::try_from).transpose()
    }
}

const INSERT_USER: &str = "INSERT INTO users \
     (user_id, first_name, last_name, email, phone_number, home_zip_code, password_hash, role, created_at, updated_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)";

fn bind_user<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    user: &'q User,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(user.user_id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(&user.home_zip_code)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
}

#[async_trait]
impl UserRepository for StoreUserRepository {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let user = user.into_user(Utc::now());
        bind_user(sqlx::query(INSERT_USER), &user)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(user)
    }

    async fn register_pilot(
        &self,
        user: NewUser,
        pilot_license_number: String,
    ) -> StoreResult<PilotRegistrationRecord> {
        let now = Utc::now();
        let user = user.into_user(now);
        let pilot = PilotProfile::new(user.user_id, now);
        let application = PilotApplication::new(pilot.pilot_id, pilot_license_number, now);

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        bind_user(sqlx::query(INSERT_USER), &user)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        sqlx::query(
            "INSERT INTO pilot_profiles (pilot_id, user_id, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(pilot.pilot_id)
        .bind(pilot.user_id)
        .bind(pilot.status.as_str())
        .bind(pilot.created_at)
        .bind(pilot.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "INSERT INTO pilot_applications \
             (application_id, pilot_id, pilot_license_number, license_verification_status, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(application.application_id)
        .bind(application.pilot_id)
        .bind(&application.pilot_license_number)
        .bind(application.license_verification_status.as_str())
        .bind(application.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        Ok(PilotRegistrationRecord {
            user,
            pilot,
            application,
        })
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.find_one("email", email).await
    }

    async fn find_user_by_phone(&self, phone_number: &str) -> StoreResult<Option<User>> {
        self.find_one("phone_number", phone_number).await
    }
}
