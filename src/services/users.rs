use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::user::{NewUser, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique-key conflict on email or google_id.
    #[error("duplicate user")]
    Duplicate,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Fields a login or profile edit may refresh on an existing user.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub avatar: Option<String>,
}

/// Persistence contract the auth subsystem needs. All operations act on a
/// single logical user row and are atomic in the backing store.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn create(&self, fields: NewUser) -> Result<User, StoreError>;
    async fn update(&self, id: i64, patch: UserPatch) -> Result<User, StoreError>;
    /// Idempotent schema setup backing `/api/auth/init-db`.
    async fn init_schema(&self) -> Result<(), StoreError>;
}

const USER_COLUMNS: &str = "id, email, name, google_id, avatar, role, created_at, updated_at";

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE google_id = $1 LIMIT 1"
        ))
        .bind(google_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create(&self, fields: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, name, google_id, avatar, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&fields.email)
        .bind(&fields.name)
        .bind(&fields.google_id)
        .bind(&fields.avatar)
        .bind(fields.role.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
            _ => StoreError::Database(e),
        })?;
        Ok(user)
    }

    async fn update(&self, id: i64, patch: UserPatch) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET name = COALESCE($1, name),
                 avatar = COALESCE($2, avatar),
                 updated_at = NOW()
             WHERE id = $3
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&patch.name)
        .bind(&patch.avatar)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                email VARCHAR(255) UNIQUE NOT NULL,
                name VARCHAR(255) NOT NULL,
                google_id VARCHAR(255) UNIQUE NOT NULL,
                avatar TEXT,
                role VARCHAR(16) NOT NULL DEFAULT 'user',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Find the user for a google id, creating the row on first login. A
/// duplicate-key failure on create means a concurrent login won the race;
/// re-read and return the winner's row so the operation stays idempotent.
pub async fn find_or_create(
    store: &dyn UserStore,
    fields: NewUser,
) -> Result<User, StoreError> {
    if let Some(user) = store.find_by_google_id(&fields.google_id).await? {
        return Ok(user);
    }

    let google_id = fields.google_id.clone();
    match store.create(fields).await {
        Ok(user) => Ok(user),
        Err(StoreError::Duplicate) => store
            .find_by_google_id(&google_id)
            .await?
            .ok_or(StoreError::Duplicate),
        Err(e) => Err(e),
    }
}
