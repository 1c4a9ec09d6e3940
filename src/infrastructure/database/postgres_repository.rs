use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{
    Booking, BookingStatus, BookingStore, Credential, CredentialStore, InsertOutcome, User,
};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    display_name: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            username: r.username,
            display_name: r.display_name,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: Vec<u8>,
    user_id: Uuid,
    public_key: Vec<u8>,
    sign_count: i64,
    backup_eligible: bool,
    backup_state: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<CredentialRow> for Credential {
    type Error = anyhow::Error;

    fn try_from(r: CredentialRow) -> Result<Self> {
        Ok(Credential {
            id: r.id,
            user_id: r.user_id,
            public_key: r.public_key,
            sign_count: u32::try_from(r.sign_count)?,
            backup_eligible: r.backup_eligible,
            backup_state: r.backup_state,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = anyhow::Error;

    fn try_from(r: BookingRow) -> Result<Self> {
        Ok(Booking {
            id: r.id,
            user_id: r.user_id,
            start: r.start_time,
            end: r.end_time,
            status: r.status.parse::<BookingStatus>()?,
            created_at: r.created_at,
        })
    }
}

const CREDENTIAL_COLUMNS: &str =
    "id, user_id, public_key, sign_count, backup_eligible, backup_state, created_at";

const BOOKING_COLUMNS: &str = "id, user_id, start_time, end_time, status, created_at";

pub fn create_postgres_repository(pool: PgPool) -> Arc<PostgresRepository> {
    // ---
    Arc::new(PostgresRepository::new(pool))
}

/// Postgres-backed users, credentials and bookings.
pub struct PostgresRepository {
    // ---
    pool: PgPool,
}

impl PostgresRepository {
    // ---
    pub fn new(pool: PgPool) -> Self {
        // ---
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CredentialStore for PostgresRepository {
    // ---
    async fn create_user(&self, user: User) -> Result<InsertOutcome<User>> {
        // ---
        let result = sqlx::query(
            "INSERT INTO users (id, username, display_name, created_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (username) DO NOTHING",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(InsertOutcome::Duplicate);
        }
        Ok(InsertOutcome::Created(user))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        // ---
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, display_name, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        // ---
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, display_name, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn save_credential(&self, credential: Credential) -> Result<()> {
        // ---
        sqlx::query(
            "INSERT INTO credentials
                (id, user_id, public_key, sign_count, backup_eligible, backup_state, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&credential.id)
        .bind(credential.user_id)
        .bind(&credential.public_key)
        .bind(i64::from(credential.sign_count))
        .bind(credential.backup_eligible)
        .bind(credential.backup_state)
        .bind(credential.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_credentials_by_user(&self, user_id: Uuid) -> Result<Vec<Credential>> {
        // ---
        let rows = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE user_id = $1 ORDER BY created_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Credential::try_from).collect()
    }

    async fn get_credential_by_id(&self, credential_id: &[u8]) -> Result<Option<Credential>> {
        // ---
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE id = $1"
        ))
        .bind(credential_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Credential::try_from).transpose()
    }

    async fn update_sign_count(
        &self,
        credential_id: &[u8],
        sign_count: u32,
        backup_state: bool,
    ) -> Result<()> {
        // ---
        let result =
            sqlx::query("UPDATE credentials SET sign_count = $1, backup_state = $2 WHERE id = $3")
                .bind(i64::from(sign_count))
                .bind(backup_state)
                .bind(credential_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("credential {} does not exist", hex::encode(credential_id));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        // ---
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl BookingStore for PostgresRepository {
    // ---
    async fn insert_if_free(&self, booking: Booking) -> Result<InsertOutcome<Booking>> {
        // ---
        let mut tx = self.pool.begin().await?;

        // Serializes booking creation per user until commit.
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(booking.user_id)
            .fetch_optional(&mut *tx)
            .await?;

        let conflict: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM bookings
             WHERE user_id = $1 AND status = 'active'
               AND start_time < $3 AND end_time > $2
             LIMIT 1",
        )
        .bind(booking.user_id)
        .bind(booking.start)
        .bind(booking.end)
        .fetch_optional(&mut *tx)
        .await?;

        if conflict.is_some() {
            tx.rollback().await?;
            return Ok(InsertOutcome::Duplicate);
        }

        sqlx::query(
            "INSERT INTO bookings (id, user_id, start_time, end_time, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.start)
        .bind(booking.end)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(InsertOutcome::Created(booking))
    }

    async fn find_active_at(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<Option<Booking>> {
        // ---
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE user_id = $1 AND status = 'active'
               AND start_time <= $2 AND end_time >= $2
             ORDER BY start_time DESC
             LIMIT 1"
        ))
        .bind(user_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Booking::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>> {
        // ---
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY start_time DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Booking::try_from).collect()
    }
}
