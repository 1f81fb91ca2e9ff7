//! Account Repository
//!
//! Owns account records scoped to a user. `(user_id, name)` is unique and the
//! unique index, not a prior lookup, decides which concurrent create wins.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::domain::{check_bounds, Account, User};
use crate::error::{LedgerError, LedgerResult};

use super::{classify_insert_error, normalize_name};

pub(crate) type AccountRow = (i64, i64, String, String, i64, DateTime<Utc>);

pub(crate) fn account_from_row(
    (id, user_id, name, currency, initial_balance, created_at): AccountRow,
) -> Account {
    Account {
        id,
        user_id,
        name,
        currency,
        initial_balance,
        created_at,
    }
}

/// Upper-cased ISO-4217 style code (three ASCII letters)
fn normalize_currency(currency: &str) -> LedgerResult<String> {
    let code = currency.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(LedgerError::InvalidData(format!(
            "currency must be a three-letter code (got {:?})",
            currency
        )));
    }
    Ok(code)
}

/// Repository for the accounts relation
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an account for `user`.
    ///
    /// Fails with `Conflict` if the user already has an account with that
    /// name, and with `InvalidData` if `|initial_balance|` exceeds 10^15.
    ///
    /// A missing user is reported as `UserNotFound`, not the generic
    /// `NotFound`; use `LedgerError::is_not_found` to match either.
    pub async fn create(
        &self,
        user: &User,
        name: &str,
        currency: &str,
        initial_balance: i64,
    ) -> LedgerResult<Account> {
        let name = normalize_name("account", name)?;
        let currency = normalize_currency(currency)?;
        let initial_balance = check_bounds(initial_balance)?;

        let result: Result<AccountRow, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO accounts (user_id, name, currency, initial_balance)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, name, currency, initial_balance, created_at
            "#,
        )
        .bind(user.id)
        .bind(name)
        .bind(&currency)
        .bind(initial_balance)
        .fetch_one(&self.pool)
        .await;

        let row = match result {
            Ok(row) => row,
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                return Err(LedgerError::UserNotFound(format!("user ID {} not found", user.id)));
            }
            Err(e) => {
                return Err(classify_insert_error(e, || {
                    format!("account {:?} already exists", name)
                }))
            }
        };

        let account = account_from_row(row);
        tracing::info!(
            user_id = user.id,
            account_id = account.id,
            account = %account.name,
            currency = %account.currency,
            "Account created"
        );
        Ok(account)
    }

    /// Get an account by name; fails with `AccountNotFound` if absent
    pub async fn get_by_name(&self, user: &User, name: &str) -> LedgerResult<Account> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, name, currency, initial_balance, created_at
            FROM accounts
            WHERE user_id = $1 AND name = $2
            "#,
        )
        .bind(user.id)
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.map(account_from_row)
            .ok_or_else(|| LedgerError::AccountNotFound(name.to_string()))
    }

    /// All accounts of a user
    pub async fn list_for_user(&self, user: &User) -> LedgerResult<Vec<Account>> {
        let rows: Vec<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, name, currency, initial_balance, created_at
            FROM accounts
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(account_from_row).collect())
    }

    /// Take the row lock that serializes every balance-checked debit of an
    /// account. Held until the surrounding transaction ends.
    ///
    /// `NO KEY UPDATE` leaves the key-share locks taken by entry foreign keys
    /// free, so opposite transfers between two accounts cannot deadlock.
    pub(crate) async fn lock_for_update(
        conn: &mut PgConnection,
        account: &Account,
    ) -> LedgerResult<()> {
        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM accounts WHERE id = $1 FOR NO KEY UPDATE")
                .bind(account.id)
                .fetch_optional(&mut *conn)
                .await?;

        locked
            .map(|_| ())
            .ok_or_else(|| LedgerError::AccountNotFound(account.name.clone()))
    }
}
