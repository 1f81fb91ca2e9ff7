//! Idempotency Repository
//!
//! Caller-supplied keys that make ledger writes safe to retry. A key is
//! stored in the same unit of work as the transaction it produced, so a key
//! exists if and only if its transaction committed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};

/// Stored idempotency key information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyKey {
    pub user_id: i64,
    pub key: Uuid,
    pub request_hash: String,
    pub transaction_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Repository for managing idempotency keys
#[derive(Debug, Clone)]
pub struct IdempotencyRepository {
    pool: PgPool,
}

impl IdempotencyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get an existing idempotency key
    pub async fn get(&self, user_id: i64, key: Uuid) -> LedgerResult<Option<IdempotencyKey>> {
        let row: Option<(i64, Uuid, String, i64, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT user_id, key, request_hash, transaction_id, created_at, expires_at
            FROM idempotency_keys
            WHERE user_id = $1 AND key = $2
            "#,
        )
        .bind(user_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(user_id, key, request_hash, transaction_id, created_at, expires_at)| IdempotencyKey {
                user_id,
                key,
                request_hash,
                transaction_id,
                created_at,
                expires_at,
            },
        ))
    }

    /// Transaction already produced by this key, if any.
    ///
    /// A key replayed with a different request fails with `Conflict`.
    /// Expired keys are ignored even before the maintenance job removes them.
    pub(crate) async fn find_in(
        conn: &mut PgConnection,
        user_id: i64,
        key: Uuid,
        request_hash: &str,
    ) -> LedgerResult<Option<i64>> {
        let row: Option<(String, i64)> = sqlx::query_as(
            r#"
            SELECT request_hash, transaction_id
            FROM idempotency_keys
            WHERE user_id = $1 AND key = $2 AND expires_at > NOW()
            "#,
        )
        .bind(user_id)
        .bind(key)
        .fetch_optional(conn)
        .await?;

        match row {
            Some((stored_hash, _)) if stored_hash != request_hash => Err(LedgerError::Conflict(
                format!("idempotency key {} was used for a different request", key),
            )),
            Some((_, transaction_id)) => Ok(Some(transaction_id)),
            None => Ok(None),
        }
    }

    /// Store the key next to the transaction it produced.
    ///
    /// An expired row for the same key is replaced. A live row, including one
    /// committed by a concurrent request holding the same key, makes this fail
    /// with `Conflict`; retrying then returns the winner's transaction.
    pub(crate) async fn record_in(
        conn: &mut PgConnection,
        user_id: i64,
        key: Uuid,
        request_hash: &str,
        transaction_id: i64,
    ) -> LedgerResult<()> {
        let stored = sqlx::query(
            r#"
            INSERT INTO idempotency_keys (user_id, key, request_hash, transaction_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, key) DO UPDATE
            SET request_hash = EXCLUDED.request_hash,
                transaction_id = EXCLUDED.transaction_id,
                created_at = NOW(),
                expires_at = NOW() + INTERVAL '24 hours'
            WHERE idempotency_keys.expires_at <= NOW()
            "#,
        )
        .bind(user_id)
        .bind(key)
        .bind(request_hash)
        .bind(transaction_id)
        .execute(conn)
        .await?
        .rows_affected();

        if stored == 0 {
            return Err(LedgerError::Conflict(format!(
                "idempotency key {} is being used by a concurrent request",
                key
            )));
        }

        Ok(())
    }

    /// Compute SHA-256 hash of request body for conflict detection
    pub fn compute_request_hash(body: &[u8]) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(body);
        hex::encode(hasher.finalize())
    }

    /// Request hash of a serializable command
    pub fn hash_command<T: Serialize>(command: &T) -> LedgerResult<String> {
        let body = serde_json::to_vec(command)
            .map_err(|e| LedgerError::Internal(format!("serialize request: {}", e)))?;
        Ok(Self::compute_request_hash(&body))
    }
}
