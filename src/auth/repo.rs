use axum::async_trait;
use sqlx::PgConnection;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::{Session, User};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint `{constraint}` violated")]
    UniqueViolation { constraint: String },
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return StoreError::UniqueViolation {
                    constraint: db.constraint().unwrap_or_default().to_owned(),
                };
            }
        }
        StoreError::Database(e)
    }
}

/// Persistence used by registration, login and session lookup.
///
/// Implemented for a checked-out [`PgConnection`], so one request runs all of
/// its statements on the connection it holds.
#[async_trait]
pub trait AccountStore: Send {
    async fn insert_user(
        &mut self,
        id: Uuid,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError>;

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&mut self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn insert_session(&mut self, session: &Session) -> Result<(), StoreError>;

    async fn find_session(&mut self, token: &str) -> Result<Option<Session>, StoreError>;
}

#[async_trait]
impl AccountStore for PgConnection {
    async fn insert_user(
        &mut self,
        id: Uuid,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut *self)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *self)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self)
        .await?;
        Ok(user)
    }

    async fn insert_session(&mut self, session: &Session) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, token, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.token)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&mut *self)
        .await?;
        Ok(())
    }

    async fn find_session(&mut self, token: &str) -> Result<Option<Session>, StoreError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, token, expires_at, created_at
            FROM sessions
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&mut *self)
        .await?;
        Ok(session)
    }
}
