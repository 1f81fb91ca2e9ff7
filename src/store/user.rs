//! User Repository
//!
//! Identity lookups the ledger needs to establish ownership scope. Signup,
//! login and password hashing live outside this crate; `create` takes an
//! already-computed credential hash.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::User;
use crate::error::{LedgerError, LedgerResult};

use super::classify_insert_error;

type UserRow = (i64, String, String, DateTime<Utc>);

fn user_from_row((id, email, credential_hash, created_at): UserRow) -> User {
    User {
        id,
        email,
        credential_hash,
        created_at,
    }
}

/// Repository for the users relation
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a user; fails with `Conflict` if the email is taken
    pub async fn create(&self, email: &str, credential_hash: &str) -> LedgerResult<User> {
        let email = email.trim();
        if email.is_empty() {
            return Err(LedgerError::InvalidData("email must not be empty".to_string()));
        }

        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (email, credential_hash)
            VALUES ($1, $2)
            RETURNING id, email, credential_hash, created_at
            "#,
        )
        .bind(email)
        .bind(credential_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify_insert_error(e, || format!("user {:?} already exists", email)))?;

        let user = user_from_row(row);
        tracing::info!(user_id = user.id, "User created");
        Ok(user)
    }

    /// Get a user by ID
    pub async fn get_by_id(&self, user_id: i64) -> LedgerResult<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, credential_hash, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row)
            .ok_or_else(|| LedgerError::UserNotFound(format!("user ID {} not found", user_id)))
    }

    /// Get a user by email
    pub async fn get_by_email(&self, email: &str) -> LedgerResult<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, credential_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row)
            .ok_or_else(|| LedgerError::UserNotFound(email.to_string()))
    }
}
